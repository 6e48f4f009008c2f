//! Application routing configuration with middleware stack.
//!
//! # Route Table
//!
//! | Method | Path                          | Layers                           |
//! |--------|-------------------------------|----------------------------------|
//! | GET    | `/hello-world`                | tracking                         |
//! | GET    | `/v1/hello-world`             | tracking                         |
//! | POST   | `/v1/jokes`                   | auth → tracking                  |
//! | GET    | `/v1/jokes`                   | rate limit → tracking            |
//! | GET    | `/v1/jokes/{id}`              | rate limit → tracking            |
//! | PATCH  | `/v1/jokes/{id}`              | auth → tracking                  |
//! | DELETE | `/v1/jokes/{id}`              | auth → tracking                  |
//!
//! # Router-wide Middleware (outermost first)
//!
//! ```text
//! Request
//!    │
//!    ▼
//! ┌──────────────────┐
//! │  Set Request ID  │ ← Generates X-Request-Id if absent
//! └────────┬─────────┘
//!          ▼
//! ┌──────────────────┐
//! │     Tracing      │ ← HTTP request/response spans
//! └────────┬─────────┘
//!          ▼
//! ┌──────────────────┐
//! │ Propagate Req ID │ ← Copies X-Request-Id to the response
//! └────────┬─────────┘
//!          ▼
//! ┌──────────────────┐
//! │    Body Limit    │ ← 413 past MAX_REQUEST_BODY_SIZE
//! └────────┬─────────┘
//!          ▼
//!     Route layers → Handler
//! ```

use axum::Router;
use axum::extract::DefaultBodyLimit;
use axum::handler::Handler;
use axum::middleware::from_fn_with_state;
use axum::routing::get;
use tower::ServiceBuilder;
use tower_http::request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer};
use tower_http::trace::TraceLayer;
use tracing::info;

use crate::handlers;
use crate::middleware::{BearerAuthLayer, RateLimitLayer, RequestTimeout, track_request};
use crate::state::AppState;

/// Prefix under which the API is mounted.
pub const API_PREFIX: &str = "/v1";

/// Build the application router with all routes and middleware configured.
pub fn build_router(state: AppState) -> Router {
    let config = &state.config;

    let timeout = RequestTimeout::new(config.request_timeout);
    let tracked = from_fn_with_state(timeout, track_request);

    let limited = ServiceBuilder::new()
        .layer(RateLimitLayer::new(
            state.rate_limiter.clone(),
            state.trusted_proxies.clone(),
        ))
        .layer(tracked.clone());

    let guarded = ServiceBuilder::new()
        .layer(BearerAuthLayer::new(config.auth_token.as_str()))
        .layer(tracked.clone());

    info!(
        rps = config.rate_limit_rps,
        burst = config.rate_limit_burst,
        forwarded_for = state.trusted_proxies.is_enabled(),
        timeout_ms = config.request_timeout.as_millis(),
        "Request middleware configured"
    );

    // =========================================================================
    // Versioned API
    // =========================================================================
    let api = Router::new()
        .route(
            "/hello-world",
            get(handlers::hello_world.layer(tracked.clone())),
        )
        .route(
            "/jokes",
            get(handlers::list_jokes.layer(limited.clone()))
                .post(handlers::create_joke.layer(guarded.clone())),
        )
        .route(
            "/jokes/{id}",
            get(handlers::get_joke.layer(limited))
                .patch(handlers::update_joke.layer(guarded.clone()))
                .delete(handlers::delete_joke.layer(guarded)),
        );

    // =========================================================================
    // Apply Middleware Stack (order matters - applied bottom to top)
    // =========================================================================
    let max_body = config.max_request_body_size;

    Router::new()
        .route("/hello-world", get(handlers::hello_world.layer(tracked)))
        .nest(API_PREFIX, api)
        .layer(DefaultBodyLimit::max(max_body))
        .layer(PropagateRequestIdLayer::x_request_id())
        .layer(TraceLayer::new_for_http())
        .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
        .with_state(state)
}
