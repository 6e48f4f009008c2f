//! Application configuration loaded from environment variables.
//!
//! # Configuration Hierarchy
//!
//! All configuration is loaded from environment variables with sensible defaults
//! for development. A `.env` file in the working directory is read first if present.
//!
//! # Security Configuration
//!
//! - `AUTH_TOKEN`: Static bearer token required on mutating routes (required)
//! - `TRUSTED_PROXIES`: Comma-separated CIDR ranges whose `X-Forwarded-For` is honored
//!
//! # Rate Limiting
//!
//! - `RATE_LIMIT_RPS`: Sustained requests per second per client IP (default: 1)
//! - `RATE_LIMIT_BURST`: Bucket capacity per client IP (default: 5)
//! - `RATE_LIMIT_SWEEP_INTERVAL_SECS`: How often idle clients are evicted (default: 60)
//! - `RATE_LIMIT_IDLE_TTL_SECS`: Idle time after which a client is evicted (default: 180)

use std::env;
use std::fmt;
use std::net::SocketAddr;
use std::str::FromStr;
use std::time::Duration;

use thiserror::Error;

/// Invalid or missing configuration.
#[derive(Debug, Error)]
#[error("configuration error: {0}")]
pub struct ConfigError(pub String);

/// Log output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    /// Human-readable lines
    #[default]
    Text,
    /// One JSON object per line
    Json,
}

impl FromStr for LogFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "text" | "pretty" => Ok(LogFormat::Text),
            "json" => Ok(LogFormat::Json),
            other => Err(format!("unknown log format {other:?}, expected text or json")),
        }
    }
}

/// Application configuration loaded from environment variables.
///
/// # Example
///
/// ```rust,ignore
/// let config = Config::from_env()?;
/// println!("Server will listen on {}", config.server_addr());
/// ```
#[derive(Clone)]
pub struct Config {
    // =========================================================================
    // Server Configuration
    // =========================================================================
    /// Server host address (default: "0.0.0.0")
    pub host: String,

    /// Server port (default: 3000)
    pub port: u16,

    /// Per-request deadline (default: 5s)
    pub request_timeout: Duration,

    /// Maximum request body size in bytes (default: 1 MiB)
    pub max_request_body_size: usize,

    /// How long in-flight requests may drain after a shutdown signal (default: 15s)
    pub shutdown_grace_period: Duration,

    // =========================================================================
    // Security Configuration
    // =========================================================================
    /// Static bearer token for mutating routes
    pub auth_token: String,

    /// Trusted proxy CIDR ranges for X-Forwarded-For handling
    pub trusted_proxies: Vec<String>,

    // =========================================================================
    // Rate Limiting Configuration
    // =========================================================================
    /// Sustained requests per second per client IP (default: 1)
    pub rate_limit_rps: u32,

    /// Token bucket capacity per client IP (default: 5)
    pub rate_limit_burst: u32,

    /// Interval between idle-client sweeps (default: 60s)
    pub rate_limit_sweep_interval: Duration,

    /// Idle time after which a client entry is evicted (default: 180s)
    pub rate_limit_idle_ttl: Duration,

    // =========================================================================
    // Observability Configuration
    // =========================================================================
    /// Log level filter (default: "info")
    pub log_level: String,

    /// Log output format (default: text)
    pub log_format: LogFormat,

    /// Port for Prometheus metrics endpoint (default: 0 = disabled)
    pub metrics_port: u16,
}

impl Config {
    /// Load configuration from environment variables with sensible defaults.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if a value fails to parse, `AUTH_TOKEN` is
    /// missing, or validation fails.
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load an .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();

        Self::from_lookup(|name| env::var(name).ok())
    }

    /// Build configuration from an arbitrary variable source.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();

        let config = Self {
            // Server
            host: lookup("HOST").unwrap_or(defaults.host),
            port: parse_var(&lookup, "PORT", defaults.port)?,
            request_timeout: Duration::from_millis(parse_var(&lookup, "REQUEST_TIMEOUT_MS", 5000)?),
            max_request_body_size: parse_var(
                &lookup,
                "MAX_REQUEST_BODY_SIZE",
                defaults.max_request_body_size,
            )?,
            shutdown_grace_period: Duration::from_secs(parse_var(
                &lookup,
                "SHUTDOWN_GRACE_PERIOD_SECS",
                15,
            )?),

            // Security
            auth_token: lookup("AUTH_TOKEN")
                .filter(|t| !t.is_empty())
                .ok_or_else(|| ConfigError("AUTH_TOKEN must be set".to_string()))?,
            trusted_proxies: parse_list(lookup("TRUSTED_PROXIES")),

            // Rate limiting
            rate_limit_rps: parse_var(&lookup, "RATE_LIMIT_RPS", defaults.rate_limit_rps)?,
            rate_limit_burst: parse_var(&lookup, "RATE_LIMIT_BURST", defaults.rate_limit_burst)?,
            rate_limit_sweep_interval: Duration::from_secs(parse_var(
                &lookup,
                "RATE_LIMIT_SWEEP_INTERVAL_SECS",
                60,
            )?),
            rate_limit_idle_ttl: Duration::from_secs(parse_var(
                &lookup,
                "RATE_LIMIT_IDLE_TTL_SECS",
                180,
            )?),

            // Observability
            log_level: lookup("RUST_LOG").unwrap_or(defaults.log_level),
            log_format: parse_var(&lookup, "LOG_FORMAT", defaults.log_format)?,
            metrics_port: parse_var(&lookup, "METRICS_PORT", defaults.metrics_port)?,
        };

        config.validate()?;

        Ok(config)
    }

    /// Validate configuration values for consistency and correctness.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if validation fails.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.auth_token.is_empty() {
            return Err(ConfigError("AUTH_TOKEN must not be empty".to_string()));
        }

        if self.request_timeout.is_zero() {
            return Err(ConfigError(
                "REQUEST_TIMEOUT_MS must be greater than 0".to_string(),
            ));
        }

        if self.rate_limit_rps == 0 {
            return Err(ConfigError(
                "RATE_LIMIT_RPS must be greater than 0".to_string(),
            ));
        }

        if self.rate_limit_burst == 0 {
            return Err(ConfigError(
                "RATE_LIMIT_BURST must be greater than 0".to_string(),
            ));
        }

        if self.rate_limit_sweep_interval.is_zero() {
            return Err(ConfigError(
                "RATE_LIMIT_SWEEP_INTERVAL_SECS must be greater than 0".to_string(),
            ));
        }

        if self.max_request_body_size == 0 {
            return Err(ConfigError(
                "MAX_REQUEST_BODY_SIZE must be greater than 0".to_string(),
            ));
        }

        Ok(())
    }

    /// Get the full server address for binding.
    pub fn server_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Check if Prometheus metrics export is enabled.
    pub fn metrics_enabled(&self) -> bool {
        self.metrics_port > 0
    }

    /// Get the metrics endpoint address.
    ///
    /// Returns `None` if metrics are disabled (port = 0).
    pub fn metrics_addr(&self) -> Option<SocketAddr> {
        self.metrics_enabled()
            .then(|| SocketAddr::from(([0, 0, 0, 0], self.metrics_port)))
    }
}

/// Parse a variable into the specified type, falling back to a default when unset.
fn parse_var<F, T>(lookup: &F, name: &str, default: T) -> Result<T, ConfigError>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
    T::Err: fmt::Display,
{
    match lookup(name) {
        Some(val) => val
            .trim()
            .parse()
            .map_err(|e| ConfigError(format!("Invalid {name}: {e}"))),
        None => Ok(default),
    }
}

/// Split a comma-separated list, dropping empty items.
fn parse_list(raw: Option<String>) -> Vec<String> {
    raw.map(|s| {
        s.split(',')
            .map(|p| p.trim().to_string())
            .filter(|p| !p.is_empty())
            .collect()
    })
    .unwrap_or_default()
}

impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Config")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("request_timeout", &self.request_timeout)
            .field("max_request_body_size", &self.max_request_body_size)
            .field("shutdown_grace_period", &self.shutdown_grace_period)
            .field("auth_token", &"<redacted>")
            .field("trusted_proxies", &self.trusted_proxies)
            .field("rate_limit_rps", &self.rate_limit_rps)
            .field("rate_limit_burst", &self.rate_limit_burst)
            .field("rate_limit_sweep_interval", &self.rate_limit_sweep_interval)
            .field("rate_limit_idle_ttl", &self.rate_limit_idle_ttl)
            .field("log_level", &self.log_level)
            .field("log_format", &self.log_format)
            .field("metrics_port", &self.metrics_port)
            .finish()
    }
}

/// Default configuration for testing and development.
///
/// The token is empty, so a default config fails [`Config::validate`] until
/// one is set. Production deployments should use `Config::from_env()` instead.
impl Default for Config {
    fn default() -> Self {
        Self {
            // Server
            host: "0.0.0.0".to_string(),
            port: 3000,
            request_timeout: Duration::from_secs(5),
            max_request_body_size: 1024 * 1024, // 1MB
            shutdown_grace_period: Duration::from_secs(15),
            // Security
            auth_token: String::new(),
            trusted_proxies: vec![],
            // Rate limiting
            rate_limit_rps: 1,
            rate_limit_burst: 5,
            rate_limit_sweep_interval: Duration::from_secs(60),
            rate_limit_idle_ttl: Duration::from_secs(180),
            // Observability
            log_level: "info".to_string(),
            log_format: LogFormat::Text,
            metrics_port: 0,
        }
    }
}
