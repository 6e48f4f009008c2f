//! Per-request tracking: deadline, timing and outcome logging.

use std::time::Instant;

use axum::extract::{OriginalUri, Request, State};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use tracing::{info, warn};

use super::timeout::{DEADLINE_EXCEEDED_MESSAGE, RequestTimeout};
use crate::error::{AppError, HandlerFailure};
use crate::metrics;

/// Wrap a handler with a deadline, timing and a structured outcome log line.
///
/// Install with `axum::middleware::from_fn_with_state(timeout, track_request)`.
///
/// Failures are recognised by the [`HandlerFailure`] extension that
/// [`AppError`] attaches to its responses; the error body itself is already
/// serialized by then. A handler that overruns the deadline is dropped and
/// answered with a 500.
pub async fn track_request(
    State(timeout): State<RequestTimeout>,
    mut req: Request,
    next: Next,
) -> Response {
    let start = Instant::now();
    let method = req.method().clone();
    let path = req
        .extensions()
        .get::<OriginalUri>()
        .map_or_else(|| req.uri().path().to_string(), |uri| uri.path().to_string());

    let deadline = timeout.deadline();
    req.extensions_mut().insert(deadline);

    let response = match tokio::time::timeout_at(deadline.instant(), next.run(req)).await {
        Ok(response) => response,
        Err(_) => AppError::Internal(DEADLINE_EXCEEDED_MESSAGE.to_string()).into_response(),
    };

    let elapsed = start.elapsed();
    let duration_ms = elapsed.as_secs_f64() * 1000.0;
    metrics::record_request_duration(
        method.as_str(),
        response.status().as_u16(),
        elapsed.as_secs_f64(),
    );

    match response.extensions().get::<HandlerFailure>() {
        Some(failure) => warn!(
            error = %failure.message,
            status = failure.status.as_u16(),
            method = %method,
            path = %path,
            duration_ms,
            "Request failed"
        ),
        None => info!(
            method = %method,
            path = %path,
            duration_ms,
            "Request completed"
        ),
    }

    response
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use crate::middleware::Deadline;
    use axum::Router;
    use axum::body::{Body, to_bytes};
    use axum::http::StatusCode;
    use axum::middleware::from_fn_with_state;
    use axum::routing::get;
    use std::time::Duration;
    use tower::ServiceExt;

    fn app(timeout: RequestTimeout) -> Router {
        Router::new()
            .route("/ok", get(|| async { "fine" }))
            .route(
                "/fail",
                get(|| async { AppError::NotFound("nothing here".to_string()) }),
            )
            .route(
                "/slow",
                get(|| async {
                    tokio::time::sleep(Duration::from_secs(30)).await;
                    "too late"
                }),
            )
            .route(
                "/deadline",
                get(|deadline: Deadline| async move {
                    let latest = tokio::time::Instant::now() + Duration::from_millis(200);
                    format!("{}", deadline.instant() <= latest)
                }),
            )
            .layer(from_fn_with_state(timeout, track_request))
    }

    async fn get_path(app: Router, path: &str) -> (StatusCode, String) {
        let response = app
            .oneshot(Request::builder().uri(path).body(Body::empty()).unwrap())
            .await
            .unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, String::from_utf8(bytes.to_vec()).unwrap())
    }

    #[tokio::test]
    async fn test_success_passes_through() {
        let (status, body) = get_path(app(RequestTimeout::default()), "/ok").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, "fine");
    }

    #[tokio::test]
    async fn test_failure_keeps_status_and_json_body() {
        let (status, body) = get_path(app(RequestTimeout::default()), "/fail").await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body, r#"{"error":"nothing here"}"#);
    }

    #[tokio::test]
    async fn test_overrun_is_internal_error() {
        let (status, body) = get_path(app(RequestTimeout::new(Duration::from_millis(50))), "/slow").await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body, r#"{"error":"request deadline exceeded"}"#);
    }

    #[tokio::test]
    async fn test_handler_sees_configured_deadline() {
        let (status, body) = get_path(app(RequestTimeout::new(Duration::from_millis(200))), "/deadline").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, "true");
    }
}
