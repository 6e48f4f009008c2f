//! Bearer token authentication middleware.
//!
//! Mutating routes require an `Authorization` header of the form:
//!
//! ```text
//! Authorization: Bearer <token>
//! ```
//!
//! where `<token>` equals the `AUTH_TOKEN` configured at startup. The scheme
//! is matched case-insensitively; the token is compared in constant time.
//!
//! # Failure Responses
//!
//! All failures are `401` with a `WWW-Authenticate: Bearer` header and a JSON
//! body naming the problem:
//!
//! | Condition                               | `error`                                 |
//! |-----------------------------------------|-----------------------------------------|
//! | header absent                           | `authorization header is not provided`  |
//! | fewer than two whitespace-separated parts | `invalid authorization header format` |
//! | scheme other than `bearer`              | `unsupported authorization type <type>` |
//! | token mismatch                          | `invalid token`                         |

use std::sync::Arc;
use std::task::{Context, Poll};

use axum::body::Body;
use axum::http::{HeaderValue, Request, Response, header};
use axum::response::IntoResponse;
use subtle::ConstantTimeEq;
use tower::{Layer, Service};
use tracing::{debug, warn};

use crate::error::AppError;
use crate::metrics;

/// The only supported authorization scheme (lowercase).
pub const BEARER_SCHEME: &str = "bearer";

/// Why an `Authorization` header was rejected.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthFailure {
    MissingHeader,
    InvalidFormat,
    UnsupportedType(String),
    InvalidToken,
}

impl AuthFailure {
    /// Client-facing message.
    pub fn message(&self) -> String {
        match self {
            AuthFailure::MissingHeader => "authorization header is not provided".to_string(),
            AuthFailure::InvalidFormat => "invalid authorization header format".to_string(),
            AuthFailure::UnsupportedType(kind) => format!("unsupported authorization type {kind}"),
            AuthFailure::InvalidToken => "invalid token".to_string(),
        }
    }

    /// Short label for metrics.
    fn reason(&self) -> &'static str {
        match self {
            AuthFailure::MissingHeader => "missing_header",
            AuthFailure::InvalidFormat => "invalid_format",
            AuthFailure::UnsupportedType(_) => "unsupported_type",
            AuthFailure::InvalidToken => "invalid_token",
        }
    }
}

/// Validate an `Authorization` header value against the expected token.
///
/// `None` means the header was absent. Non-UTF-8 values are treated as
/// malformed.
pub fn check_authorization(header: Option<&HeaderValue>, expected: &str) -> Result<(), AuthFailure> {
    let header = header.ok_or(AuthFailure::MissingHeader)?;
    let value = header.to_str().map_err(|_| AuthFailure::InvalidFormat)?;

    let mut fields = value.split_whitespace();
    let (Some(scheme), Some(token)) = (fields.next(), fields.next()) else {
        return Err(AuthFailure::InvalidFormat);
    };

    let scheme = scheme.to_lowercase();
    if scheme != BEARER_SCHEME {
        return Err(AuthFailure::UnsupportedType(scheme));
    }

    if !constant_time_eq(token, expected) {
        return Err(AuthFailure::InvalidToken);
    }

    Ok(())
}

/// Bearer token authentication layer.
#[derive(Clone)]
pub struct BearerAuthLayer {
    expected_token: Arc<str>,
}

impl BearerAuthLayer {
    /// Create a layer accepting exactly `token`.
    pub fn new(token: impl Into<Arc<str>>) -> Self {
        Self {
            expected_token: token.into(),
        }
    }
}

impl<S> Layer<S> for BearerAuthLayer {
    type Service = BearerAuthService<S>;

    fn layer(&self, inner: S) -> Self::Service {
        BearerAuthService {
            inner,
            expected_token: self.expected_token.clone(),
        }
    }
}

/// Bearer token authentication service wrapper.
#[derive(Clone)]
pub struct BearerAuthService<S> {
    inner: S,
    expected_token: Arc<str>,
}

impl<S> Service<Request<Body>> for BearerAuthService<S>
where
    S: Service<Request<Body>, Response = Response<Body>> + Clone + Send + 'static,
    S::Future: Send,
{
    type Response = Response<Body>;
    type Error = S::Error;
    type Future = std::pin::Pin<
        Box<dyn std::future::Future<Output = Result<Self::Response, Self::Error>> + Send>,
    >;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, req: Request<Body>) -> Self::Future {
        let clone = self.inner.clone();
        let mut inner = std::mem::replace(&mut self.inner, clone);
        let outcome = check_authorization(
            req.headers().get(header::AUTHORIZATION),
            &self.expected_token,
        );

        Box::pin(async move {
            match outcome {
                Ok(()) => {
                    debug!("Bearer authentication successful");
                    inner.call(req).await
                }
                Err(failure) => {
                    warn!(
                        method = %req.method(),
                        path = %req.uri().path(),
                        reason = failure.reason(),
                        "Bearer authentication failed"
                    );
                    metrics::record_auth_failure(failure.reason());
                    Ok(unauthorized_response(&failure))
                }
            }
        })
    }
}

/// Perform constant-time comparison of two strings.
fn constant_time_eq(a: &str, b: &str) -> bool {
    a.as_bytes().ct_eq(b.as_bytes()).into()
}

/// Build an unauthorized (401) response.
fn unauthorized_response(failure: &AuthFailure) -> Response<Body> {
    let mut response = AppError::Unauthorized(failure.message()).into_response();
    response
        .headers_mut()
        .insert(header::WWW_AUTHENTICATE, HeaderValue::from_static("Bearer"));
    response
}
