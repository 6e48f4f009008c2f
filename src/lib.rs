//! # Jokes API
//!
//! A small REST service that stores short jokes, built on Axum:
//!
//! - **CRUD**: create, fetch, page through, edit and delete jokes under `/v1`
//! - **Security**: static bearer token on mutating routes
//! - **Fairness**: per-IP token bucket rate limiting on reads
//! - **Observability**: request IDs, structured logging, Prometheus metrics
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                      Axum HTTP Server                       │
//! ├─────────────────────────────────────────────────────────────┤
//! │  Router-wide (Request ID → Trace → Body Limit)              │
//! ├─────────────────────────────────────────────────────────────┤
//! │  Per route (Rate Limit | Auth) → Request Tracking           │
//! ├─────────────────────────────────────────────────────────────┤
//! │  Handlers (health, jokes)                                   │
//! ├─────────────────────────────────────────────────────────────┤
//! │  JokeService → JokeRepository                               │
//! ├─────────────────────────────────────────────────────────────┤
//! │  MemoryStore                                                │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//!
//! use jokes_api::store::MemoryStore;
//! use jokes_api::{AppState, Config, JokeServiceImpl, build_router};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = Config::from_env()?;
//!     let service = Arc::new(JokeServiceImpl::new(Arc::new(MemoryStore::new())));
//!
//!     let state = AppState::new(service, config)?;
//!     let app = build_router(state);
//!
//!     // Start the server...
//!     Ok(())
//! }
//! ```
//!
//! ## Security Configuration
//!
//! ```bash
//! AUTH_TOKEN=your-secret-token cargo run
//! ```
//!
//! Tune rate limiting:
//! ```bash
//! RATE_LIMIT_RPS=2 RATE_LIMIT_BURST=10 cargo run
//! ```

pub mod config;
pub mod error;
pub mod handlers;
pub mod metrics;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod services;
pub mod state;
pub mod store;
pub mod utils;
pub mod validation;

// Re-exports for convenience
pub use config::{Config, ConfigError, LogFormat};
pub use error::{AppError, AppResult, ErrorResponse};
pub use routes::build_router;
pub use services::{JokeService, JokeServiceImpl};
pub use state::AppState;
