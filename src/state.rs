//! Shared application state for Axum handlers.
//!
//! This module provides thread-safe, clonable state that is shared across
//! all request handlers. It includes:
//!
//! - **Service**: The joke service collaborator behind a trait object
//! - **Configuration**: Runtime configuration access
//! - **Rate Limiter**: The per-client token bucket table and trusted proxies
//!
//! # Structured Concurrency
//!
//! The idle-client sweep runs as a background task managed by
//! `tokio_util::task::TaskTracker` and `CancellationToken`. Call `shutdown()`
//! to stop it before application exit.

use std::sync::Arc;

use tokio::time::interval;
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;
use tracing::{debug, info};

use crate::config::Config;
use crate::middleware::{ClientRateLimiter, RateLimitError, TrustedProxyConfig};
use crate::services::JokeService;

/// Shared application state for Axum handlers.
///
/// This struct is cloned for each request handler. All internal data
/// is wrapped in `Arc` for efficient sharing.
///
/// # Lifecycle
///
/// The sweep task is spawned when the state is created, so construction
/// must happen inside a Tokio runtime:
///
/// ```rust,ignore
/// let state = AppState::new(service, config)?;
/// // ... serve ...
/// state.shutdown().await;
/// ```
#[derive(Clone)]
pub struct AppState {
    /// Joke service collaborator
    pub service: Arc<dyn JokeService>,
    /// Application configuration
    pub config: Arc<Config>,
    /// Per-client rate limiter table
    pub rate_limiter: Arc<ClientRateLimiter>,
    /// Trusted proxy ranges for client IP resolution
    pub trusted_proxies: Arc<TrustedProxyConfig>,
    /// Tracks spawned background tasks for graceful shutdown
    task_tracker: TaskTracker,
    /// Cancellation token for signaling background tasks to stop
    cancellation_token: CancellationToken,
}

impl AppState {
    /// Create new application state from a service and configuration.
    ///
    /// # Errors
    ///
    /// Returns `RateLimitError` if the configured rate or burst is zero.
    pub fn new(service: Arc<dyn JokeService>, config: Config) -> Result<Self, RateLimitError> {
        let rate_limiter = Arc::new(ClientRateLimiter::new(
            config.rate_limit_rps,
            config.rate_limit_burst,
            config.rate_limit_idle_ttl,
        )?);
        let trusted_proxies = Arc::new(TrustedProxyConfig::new(&config.trusted_proxies));

        let state = Self {
            service,
            config: Arc::new(config),
            rate_limiter,
            trusted_proxies,
            task_tracker: TaskTracker::new(),
            cancellation_token: CancellationToken::new(),
        };

        state.spawn_rate_limit_sweep_task();

        Ok(state)
    }

    /// Spawn the background task that evicts idle rate limiter entries.
    fn spawn_rate_limit_sweep_task(&self) {
        let limiter = self.rate_limiter.clone();
        let period = self.config.rate_limit_sweep_interval;
        let cancel = self.cancellation_token.clone();

        self.task_tracker.spawn(async move {
            let mut ticker = interval(period);
            ticker.tick().await; // Skip first immediate tick

            loop {
                tokio::select! {
                    biased;

                    _ = cancel.cancelled() => {
                        debug!("Rate limit sweep task received cancellation signal");
                        break;
                    }
                    _ = ticker.tick() => {
                        let evicted = limiter.sweep_idle();
                        debug!(
                            evicted,
                            remaining = limiter.tracked_clients(),
                            "Swept idle rate limit entries"
                        );
                    }
                }
            }

            debug!("Rate limit sweep task shutting down");
        });
    }

    /// Gracefully shutdown all background tasks.
    ///
    /// Signals cancellation, closes the tracker and waits for every task to
    /// finish.
    pub async fn shutdown(&self) {
        info!("Initiating graceful shutdown of background tasks");

        self.cancellation_token.cancel();
        self.task_tracker.close();
        self.task_tracker.wait().await;

        info!("All background tasks have completed");
    }
}
