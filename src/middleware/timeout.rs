//! Request deadlines.
//!
//! Every tracked request gets a [`Deadline`] derived from the configured
//! [`RequestTimeout`] (5 seconds by default). The deadline is stored in the
//! request extensions so handlers can extract it and bound each downstream
//! call with [`Deadline::bound`]:
//!
//! ```rust,ignore
//! async fn handler(deadline: Deadline, State(state): State<AppState>) -> AppResult<Json<Joke>> {
//!     let joke = deadline.bound(state.service.get_joke(&id)).await?;
//!     Ok(Json(joke))
//! }
//! ```
//!
//! [`track_request`](super::request::track_request) also enforces the same
//! deadline around the whole handler, so a handler that forgets to bound a
//! call is still cut off.

use std::convert::Infallible;
use std::future::Future;
use std::time::Duration;

use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use tokio::time::Instant;

use crate::store::{StoreError, StoreResult};

/// Default per-request deadline.
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(5);

/// Message reported when a request overruns its deadline.
pub const DEADLINE_EXCEEDED_MESSAGE: &str = "request deadline exceeded";

/// Server-side timeout applied to each tracked request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RequestTimeout {
    pub duration: Duration,
}

impl RequestTimeout {
    pub fn new(duration: Duration) -> Self {
        Self { duration }
    }

    /// Deadline for a request starting now.
    pub fn deadline(&self) -> Deadline {
        Deadline::after(self.duration)
    }
}

impl Default for RequestTimeout {
    fn default() -> Self {
        Self::new(DEFAULT_REQUEST_TIMEOUT)
    }
}

/// Point in time by which a request must complete.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Deadline {
    at: Instant,
}

impl Deadline {
    /// Deadline `duration` from now.
    pub fn after(duration: Duration) -> Self {
        Self {
            at: Instant::now() + duration,
        }
    }

    pub fn instant(&self) -> Instant {
        self.at
    }

    /// Run a storage call, failing with [`StoreError::DeadlineExceeded`] if
    /// it does not finish before the deadline.
    pub async fn bound<F, T>(&self, fut: F) -> StoreResult<T>
    where
        F: Future<Output = StoreResult<T>>,
    {
        tokio::time::timeout_at(self.at, fut)
            .await
            .unwrap_or(Err(StoreError::DeadlineExceeded))
    }
}

impl<S> FromRequestParts<S> for Deadline
where
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(parts
            .extensions
            .get::<Deadline>()
            .copied()
            .unwrap_or_else(|| RequestTimeout::default().deadline()))
    }
}
