//! Per-client rate limiting using the token bucket algorithm.
//!
//! # Algorithm
//!
//! Each client IP gets its own Governor direct limiter, which implements the
//! Generic Cell Rate Algorithm (GCRA). With the defaults (1 rps, burst 5) a
//! new client may fire 5 requests immediately, after which it is admitted at
//! one request per second.
//!
//! # Client Table
//!
//! Limiters live in a single `parking_lot::Mutex<HashMap<..>>` keyed by IP.
//! Entries are created lazily with a full bucket and record when they were
//! last looked up. A background sweep (see [`crate::state::AppState`]) calls
//! [`ClientRateLimiter::sweep_idle`] periodically to evict clients that have
//! been idle past the configured TTL.
//!
//! # Response Headers
//!
//! On rate limit exceeded (429):
//! - `Retry-After`: Seconds until the next request will be accepted
//! - `X-RateLimit-Limit`: Configured RPS limit
//! - `X-RateLimit-Remaining`: Always `0`

use std::collections::HashMap;
use std::fmt;
use std::num::NonZeroU32;
use std::sync::Arc;
use std::task::{Context, Poll};
use std::time::{Duration, Instant};

use axum::body::Body;
use axum::http::{HeaderValue, Request, Response, header};
use axum::response::IntoResponse;
use governor::clock::{Clock, DefaultClock};
use governor::state::{InMemoryState, NotKeyed};
use governor::{Quota, RateLimiter};
use parking_lot::Mutex;
use tower::{Layer, Service};
use tracing::{debug, warn};

use super::ip::{TrustedProxyConfig, resolve_client_ip};
use crate::error::AppError;
use crate::metrics;

/// Error type for rate limiter configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RateLimitError {
    /// RPS value cannot be zero.
    ZeroRps,
    /// Burst capacity cannot be zero.
    ZeroBurst,
}

impl fmt::Display for RateLimitError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RateLimitError::ZeroRps => write!(f, "RPS must be greater than 0"),
            RateLimitError::ZeroBurst => write!(f, "burst must be greater than 0"),
        }
    }
}

impl std::error::Error for RateLimitError {}

type DirectLimiter = RateLimiter<NotKeyed, InMemoryState, DefaultClock>;

struct ClientEntry {
    limiter: DirectLimiter,
    last_seen: Instant,
}

/// Table of per-client token buckets.
pub struct ClientRateLimiter {
    clients: Mutex<HashMap<String, ClientEntry>>,
    quota: Quota,
    rps: u32,
    idle_ttl: Duration,
    clock: DefaultClock,
}

impl ClientRateLimiter {
    /// Create a limiter admitting `rps` sustained requests per second per
    /// client with a bucket of `burst`, forgetting clients idle for longer
    /// than `idle_ttl`.
    ///
    /// # Errors
    ///
    /// Returns an error if `rps` or `burst` is zero.
    pub fn new(rps: u32, burst: u32, idle_ttl: Duration) -> Result<Self, RateLimitError> {
        let rps_nonzero = NonZeroU32::new(rps).ok_or(RateLimitError::ZeroRps)?;
        let burst_nonzero = NonZeroU32::new(burst).ok_or(RateLimitError::ZeroBurst)?;

        Ok(Self {
            clients: Mutex::new(HashMap::new()),
            quota: Quota::per_second(rps_nonzero).allow_burst(burst_nonzero),
            rps,
            idle_ttl,
            clock: DefaultClock::default(),
        })
    }

    /// Whether a request from `client_ip` may proceed right now.
    ///
    /// Consumes one token when admitted.
    pub fn allow(&self, client_ip: &str) -> bool {
        self.check(client_ip).is_ok()
    }

    /// Like [`allow`](Self::allow) but reports how long until the next token
    /// on denial.
    pub fn check(&self, client_ip: &str) -> Result<(), Duration> {
        let now = Instant::now();
        let mut clients = self.clients.lock();

        let entry = clients
            .entry(client_ip.to_string())
            .or_insert_with(|| ClientEntry {
                limiter: RateLimiter::direct(self.quota),
                last_seen: now,
            });
        entry.last_seen = now;

        entry
            .limiter
            .check()
            .map_err(|not_until| not_until.wait_time_from(self.clock.now()))
    }

    /// Evict clients idle past the TTL. Returns how many were removed.
    pub fn sweep_idle(&self) -> usize {
        self.sweep_idle_at(Instant::now())
    }

    /// Evict clients whose last lookup is older than the TTL as of `now`.
    pub fn sweep_idle_at(&self, now: Instant) -> usize {
        let mut clients = self.clients.lock();
        let before = clients.len();

        clients.retain(|_, entry| now.saturating_duration_since(entry.last_seen) <= self.idle_ttl);

        let evicted = before - clients.len();
        metrics::set_tracked_clients(clients.len());
        evicted
    }

    /// Number of clients currently tracked.
    pub fn tracked_clients(&self) -> usize {
        self.clients.lock().len()
    }

    /// Configured sustained rate.
    pub fn rps(&self) -> u32 {
        self.rps
    }
}

impl fmt::Debug for ClientRateLimiter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClientRateLimiter")
            .field("rps", &self.rps)
            .field("idle_ttl", &self.idle_ttl)
            .field("tracked_clients", &self.tracked_clients())
            .finish()
    }
}

/// Rate limiting layer for Tower middleware stack.
///
/// # Example
///
/// ```rust,ignore
/// let layer = RateLimitLayer::new(limiter, trusted_proxies);
/// let route = get(handler.layer(layer));
/// ```
#[derive(Clone)]
pub struct RateLimitLayer {
    limiter: Arc<ClientRateLimiter>,
    trusted_proxies: Arc<TrustedProxyConfig>,
}

impl RateLimitLayer {
    pub fn new(limiter: Arc<ClientRateLimiter>, trusted_proxies: Arc<TrustedProxyConfig>) -> Self {
        Self {
            limiter,
            trusted_proxies,
        }
    }
}

impl<S> Layer<S> for RateLimitLayer {
    type Service = RateLimitService<S>;

    fn layer(&self, inner: S) -> Self::Service {
        RateLimitService {
            inner,
            limiter: self.limiter.clone(),
            trusted_proxies: self.trusted_proxies.clone(),
        }
    }
}

/// Rate limiting service wrapper.
#[derive(Clone)]
pub struct RateLimitService<S> {
    inner: S,
    limiter: Arc<ClientRateLimiter>,
    trusted_proxies: Arc<TrustedProxyConfig>,
}

impl<S> Service<Request<Body>> for RateLimitService<S>
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
        let limiter = self.limiter.clone();
        // The instance readied by `poll_ready` serves this request
        let clone = self.inner.clone();
        let mut inner = std::mem::replace(&mut self.inner, clone);

        let client_ip = resolve_client_ip(&req, &self.trusted_proxies);

        Box::pin(async move {
            let Some(client_ip) = client_ip else {
                warn!(path = %req.uri().path(), "Request has no peer address");
                return Ok(AppError::Internal("unable to determine IP".to_string()).into_response());
            };
            let client_ip = client_ip.addr().to_string();

            match limiter.check(&client_ip) {
                Ok(()) => {
                    debug!(client_ip = %client_ip, "Rate limit check passed");
                    inner.call(req).await
                }
                Err(wait_time) => {
                    let retry_after = wait_time.as_secs().max(1);

                    warn!(
                        client_ip = %client_ip,
                        path = %req.uri().path(),
                        retry_after_secs = retry_after,
                        "Rate limit exceeded for IP"
                    );
                    metrics::record_rate_limited();

                    Ok(rate_limited_response(limiter.rps(), retry_after))
                }
            }
        })
    }
}

/// Build a 429 response with rate limit headers.
fn rate_limited_response(limit: u32, retry_after: u64) -> Response<Body> {
    let mut response =
        AppError::TooManyRequests("rate limit exceeded".to_string()).into_response();

    let headers = response.headers_mut();
    headers.insert(header::RETRY_AFTER, HeaderValue::from(retry_after));
    headers.insert("x-ratelimit-limit", HeaderValue::from(limit));
    headers.insert("x-ratelimit-remaining", HeaderValue::from_static("0"));

    response
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    fn default_limiter() -> ClientRateLimiter {
        ClientRateLimiter::new(1, 5, Duration::from_secs(180)).unwrap()
    }

    #[test]
    fn test_zero_rps_returns_error() {
        let result = ClientRateLimiter::new(0, 5, Duration::from_secs(180));
        assert!(matches!(result, Err(RateLimitError::ZeroRps)));
    }

    #[test]
    fn test_zero_burst_returns_error() {
        let result = ClientRateLimiter::new(1, 0, Duration::from_secs(180));
        assert!(matches!(result, Err(RateLimitError::ZeroBurst)));
    }

    #[test]
    fn test_burst_then_deny() {
        let limiter = default_limiter();

        for i in 0..5 {
            assert!(limiter.allow("1.2.3.4"), "request {i} should be admitted");
        }
        assert!(!limiter.allow("1.2.3.4"), "sixth request should be denied");
    }

    #[test]
    fn test_denial_reports_wait_time() {
        let limiter = default_limiter();
        for _ in 0..5 {
            limiter.check("1.2.3.4").unwrap();
        }

        let wait = limiter.check("1.2.3.4").unwrap_err();
        assert!(wait <= Duration::from_secs(1));
    }

    #[test]
    fn test_refill_after_one_second() {
        let limiter = default_limiter();
        for _ in 0..5 {
            assert!(limiter.allow("1.2.3.4"));
        }
        assert!(!limiter.allow("1.2.3.4"));

        std::thread::sleep(Duration::from_millis(1050));

        assert!(limiter.allow("1.2.3.4"));
        assert!(!limiter.allow("1.2.3.4"));
    }

    #[test]
    fn test_clients_are_independent() {
        let limiter = default_limiter();
        for _ in 0..5 {
            assert!(limiter.allow("10.0.0.1"));
        }
        assert!(!limiter.allow("10.0.0.1"));
        assert!(limiter.allow("10.0.0.2"));
        assert_eq!(limiter.tracked_clients(), 2);
    }

    #[test]
    fn test_sweep_evicts_only_idle_clients() {
        let limiter = default_limiter();
        limiter.allow("10.0.0.1");
        limiter.allow("10.0.0.2");

        // Nothing is idle yet
        assert_eq!(limiter.sweep_idle(), 0);
        assert_eq!(limiter.tracked_clients(), 2);

        let later = Instant::now() + Duration::from_secs(181);
        assert_eq!(limiter.sweep_idle_at(later), 2);
        assert_eq!(limiter.tracked_clients(), 0);
    }

    #[test]
    fn test_sweep_keeps_client_at_exact_ttl() {
        let limiter = ClientRateLimiter::new(1, 5, Duration::from_secs(180)).unwrap();
        limiter.allow("10.0.0.1");

        let last_seen = limiter
            .clients
            .lock()
            .get("10.0.0.1")
            .map(|e| e.last_seen)
            .unwrap();

        assert_eq!(limiter.sweep_idle_at(last_seen + Duration::from_secs(180)), 0);
        assert_eq!(limiter.sweep_idle_at(last_seen + Duration::from_secs(181)), 1);
    }

    #[test]
    fn test_evicted_client_starts_with_full_bucket() {
        let limiter = default_limiter();
        for _ in 0..5 {
            limiter.allow("10.0.0.1");
        }
        assert!(!limiter.allow("10.0.0.1"));

        limiter.sweep_idle_at(Instant::now() + Duration::from_secs(600));

        for _ in 0..5 {
            assert!(limiter.allow("10.0.0.1"));
        }
    }

    #[test]
    fn test_denied_lookup_refreshes_last_seen() {
        let limiter = ClientRateLimiter::new(1, 1, Duration::from_secs(180)).unwrap();
        assert!(limiter.allow("10.0.0.1"));

        let first_seen = limiter.clients.lock().get("10.0.0.1").map(|e| e.last_seen).unwrap();
        std::thread::sleep(Duration::from_millis(5));
        assert!(!limiter.allow("10.0.0.1"));
        let second_seen = limiter.clients.lock().get("10.0.0.1").map(|e| e.last_seen).unwrap();

        assert!(second_seen > first_seen);
    }

    #[test]
    fn test_rate_limited_response_headers() {
        let response = rate_limited_response(1, 1);

        assert_eq!(response.status(), axum::http::StatusCode::TOO_MANY_REQUESTS);
        assert_eq!(response.headers().get(header::RETRY_AFTER).unwrap(), "1");
        assert_eq!(response.headers().get("x-ratelimit-limit").unwrap(), "1");
        assert_eq!(response.headers().get("x-ratelimit-remaining").unwrap(), "0");
    }

    #[tokio::test]
    async fn test_request_is_served_by_readied_inner_service() {
        use crate::middleware::testing::ReadyCheckedService;
        use axum::extract::ConnectInfo;
        use std::net::SocketAddr;
        use tower::ServiceExt;

        let layer = RateLimitLayer::new(
            Arc::new(default_limiter()),
            Arc::new(TrustedProxyConfig::new(&[])),
        );
        let mut service = layer.layer(ReadyCheckedService::default());

        let mut req = Request::builder().body(Body::empty()).unwrap();
        req.extensions_mut()
            .insert(ConnectInfo(SocketAddr::from(([192, 0, 2, 7], 4000))));

        let response = service.ready().await.unwrap().call(req).await.unwrap();
        assert_eq!(response.status(), axum::http::StatusCode::OK);
    }
}
