//! Test doubles shared by the middleware tests.

use std::convert::Infallible;
use std::future::{Ready, ready};
use std::task::{Context, Poll};

use axum::body::Body;
use axum::http::{Request, Response, StatusCode};
use axum::response::IntoResponse;
use tower::Service;

/// Inner service that answers 200 only when called on the instance that was
/// polled ready, and 500 otherwise.
///
/// Clones start out not ready, like a freshly cloned service would.
#[derive(Debug, Default)]
pub(crate) struct ReadyCheckedService {
    ready: bool,
}

impl Clone for ReadyCheckedService {
    fn clone(&self) -> Self {
        Self::default()
    }
}

impl Service<Request<Body>> for ReadyCheckedService {
    type Response = Response<Body>;
    type Error = Infallible;
    type Future = Ready<Result<Self::Response, Self::Error>>;

    fn poll_ready(&mut self, _cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.ready = true;
        Poll::Ready(Ok(()))
    }

    fn call(&mut self, _req: Request<Body>) -> Self::Future {
        let status = if std::mem::take(&mut self.ready) {
            StatusCode::OK
        } else {
            StatusCode::INTERNAL_SERVER_ERROR
        };
        ready(Ok(status.into_response()))
    }
}
