//! Liveness endpoint.
//!
//! `GET /hello-world` (also under `/v1`) answers `200 Hello world` without
//! authentication or rate limiting, so load balancers can probe it freely.

use tracing::instrument;

/// Body returned by the health endpoint.
pub const HEALTH_BODY: &str = "Hello world";

/// Health check endpoint.
#[instrument]
pub async fn hello_world() -> &'static str {
    HEALTH_BODY
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_hello_world_body() {
        assert_eq!(hello_world().await, "Hello world");
    }
}
