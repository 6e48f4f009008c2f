//! Extractors that reject with [`AppError`] instead of axum's plain-text
//! rejections.

use axum::body::Bytes;
use axum::extract::{FromRequest, FromRequestParts, Path, Query, Request};

use crate::error::AppError;

/// [`Path`] with a JSON rejection.
#[derive(Debug, FromRequestParts)]
#[from_request(via(Path), rejection(AppError))]
pub struct ApiPath<T>(pub T);

/// [`Query`] with a JSON rejection.
#[derive(Debug, FromRequestParts)]
#[from_request(via(Query), rejection(AppError))]
pub struct ApiQuery<T>(pub T);

/// Raw request body with a JSON rejection.
///
/// Oversized bodies surface as 413 through [`AppError::PayloadTooLarge`].
#[derive(Debug)]
pub struct ApiBytes(pub Bytes);

impl<S> FromRequest<S> for ApiBytes
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        Ok(Self(Bytes::from_request(req, state).await?))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use axum::Router;
    use axum::body::{Body, to_bytes};
    use axum::extract::DefaultBodyLimit;
    use axum::http::StatusCode;
    use axum::response::Response;
    use axum::routing::{get, post};
    use tower::ServiceExt;

    use crate::error::ErrorResponse;

    fn app() -> Router {
        Router::new()
            .route("/items/{id}", get(|ApiPath(id): ApiPath<String>| async move { id }))
            .route(
                "/items",
                get(|ApiQuery(pairs): ApiQuery<Vec<(String, String)>>| async move {
                    pairs.len().to_string()
                })
                .post(|ApiBytes(body): ApiBytes| async move { body.len().to_string() }),
            )
            .layer(DefaultBodyLimit::max(8))
    }

    async fn send(req: axum::http::Request<Body>) -> Response {
        app().oneshot(req).await.unwrap()
    }

    async fn error_of(response: Response) -> String {
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice::<ErrorResponse>(&bytes).unwrap().error
    }

    #[tokio::test]
    async fn test_path_extracts_value() {
        let req = axum::http::Request::get("/items/abc").body(Body::empty()).unwrap();
        let response = send(req).await;
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_invalid_utf8_path_is_json_bad_request() {
        let req = axum::http::Request::get("/items/%FF").body(Body::empty()).unwrap();
        let response = send(req).await;

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(error_of(response).await, "invalid id in request path");
    }

    #[tokio::test]
    async fn test_query_keeps_repeated_pairs() {
        let req = axum::http::Request::get("/items?page=1&page=2")
            .body(Body::empty())
            .unwrap();
        let response = send(req).await;

        assert_eq!(response.status(), StatusCode::OK);
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        assert_eq!(&bytes[..], b"2");
    }

    #[tokio::test]
    async fn test_oversized_body_is_json_413() {
        let req = axum::http::Request::post("/items")
            .body(Body::from("far more than eight bytes"))
            .unwrap();
        let response = send(req).await;

        assert_eq!(response.status(), StatusCode::PAYLOAD_TOO_LARGE);
        assert_eq!(error_of(response).await, "request body too large");
    }
}
