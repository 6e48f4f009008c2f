//! HTTP middleware for authentication, rate limiting, and request tracking.
//!
//! - **Rate Limiting**: Per-IP token buckets with idle eviction
//! - **Bearer Authentication**: Constant-time comparison against a static token
//! - **Request Tracking**: Deadline, timing, and outcome logging per request
//! - **Client IP Resolution**: Peer address with trusted-proxy forwarding
//!
//! # Architecture
//!
//! Layers are attached per route rather than to the whole router, so each
//! method on a path gets exactly the checks it needs:
//!
//! ```text
//! GET  /v1/jokes[/{id}]  → Rate Limiter ──────────→ Request Tracking → Handler
//! POST/PATCH/DELETE      → Auth ──────────────────→ Request Tracking → Handler
//!                             ↓                         ↓
//!                      401 / 429 / 500            deadline, timing, logs
//! ```
//!
//! Rejections from the rate limiter and the auth gate never reach request
//! tracking or the handler.

pub mod auth;
pub mod ip;
pub mod rate_limit;
pub mod request;
pub mod timeout;

#[cfg(test)]
mod testing;

pub use auth::{AuthFailure, BearerAuthLayer, check_authorization};
pub use ip::{CidrRange, ClientIp, TrustedProxyConfig, resolve_client_ip};
pub use rate_limit::{ClientRateLimiter, RateLimitError, RateLimitLayer};
pub use request::track_request;
pub use timeout::{DEFAULT_REQUEST_TIMEOUT, Deadline, RequestTimeout};
