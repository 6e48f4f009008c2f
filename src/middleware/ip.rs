//! Client IP resolution for per-client rate limiting.
//!
//! The client is identified by the bare IP of the TCP peer, taken from the
//! `ConnectInfo<SocketAddr>` extension that `axum::serve` installs when the
//! app is served with `into_make_service_with_connect_info::<SocketAddr>()`.
//!
//! # Trusted Proxies
//!
//! `X-Forwarded-For` is client-controlled and is ignored unless the peer
//! address falls inside one of the configured `TRUSTED_PROXIES` CIDR ranges.
//! In that case the first entry of the header is used, provided it parses as
//! an IP address; anything else falls back to the peer IP.
//!
//! ```text
//!   peer in TRUSTED_PROXIES?
//!        │ no                      │ yes
//!        ▼                         ▼
//!    peer IP             first X-Forwarded-For entry parses?
//!                             │ no            │ yes
//!                             ▼               ▼
//!                         peer IP       forwarded IP
//! ```
//!
//! IPv4-mapped IPv6 peers (`::ffff:a.b.c.d`) are canonicalized so that a
//! dual-stack listener does not track the same client under two keys.

use std::net::{IpAddr, SocketAddr};

use axum::extract::ConnectInfo;
use axum::http::Request;
use tracing::{debug, warn};

/// Header carrying the original client address when behind a proxy.
pub const FORWARDED_FOR_HEADER: &str = "x-forwarded-for";

// =============================================================================
// Trusted Proxy CIDR Matching
// =============================================================================

/// Parsed CIDR network range for trusted proxy validation.
#[derive(Debug, Clone)]
pub struct CidrRange {
    /// Network address
    network: IpAddr,
    /// Prefix length (e.g., 24 for /24)
    prefix_len: u8,
}

impl CidrRange {
    /// Parse a CIDR notation string (e.g., "10.0.0.0/8" or "::1/128").
    ///
    /// A bare address is accepted as a single-host range.
    pub fn parse(cidr: &str) -> Option<Self> {
        let cidr = cidr.trim();

        let Some((addr, prefix)) = cidr.split_once('/') else {
            let network: IpAddr = cidr.parse().ok()?;
            return Some(Self {
                network,
                prefix_len: max_prefix(&network),
            });
        };

        let network: IpAddr = addr.parse().ok()?;
        let prefix_len: u8 = prefix.parse().ok()?;

        if prefix_len > max_prefix(&network) {
            return None;
        }

        Some(Self {
            network,
            prefix_len,
        })
    }

    /// Check if an IP address is contained within this CIDR range.
    pub fn contains(&self, ip: &IpAddr) -> bool {
        match (&self.network, ip) {
            (IpAddr::V4(net), IpAddr::V4(addr)) => {
                let mask = u32::MAX
                    .checked_shl(32 - u32::from(self.prefix_len))
                    .unwrap_or(0);
                (u32::from(*net) & mask) == (u32::from(*addr) & mask)
            }
            (IpAddr::V6(net), IpAddr::V6(addr)) => {
                let mask = u128::MAX
                    .checked_shl(128 - u32::from(self.prefix_len))
                    .unwrap_or(0);
                (u128::from(*net) & mask) == (u128::from(*addr) & mask)
            }
            _ => false,
        }
    }
}

fn max_prefix(ip: &IpAddr) -> u8 {
    match ip {
        IpAddr::V4(_) => 32,
        IpAddr::V6(_) => 128,
    }
}

/// Configuration for trusted proxy validation.
///
/// With no ranges configured nothing is trusted and `X-Forwarded-For` is
/// never consulted.
#[derive(Debug, Clone, Default)]
pub struct TrustedProxyConfig {
    ranges: Vec<CidrRange>,
}

impl TrustedProxyConfig {
    /// Create a new trusted proxy configuration from CIDR strings.
    ///
    /// Invalid CIDR strings are logged as warnings and skipped.
    pub fn new(cidrs: &[String]) -> Self {
        let ranges: Vec<CidrRange> = cidrs
            .iter()
            .filter_map(|cidr| {
                let parsed = CidrRange::parse(cidr);
                if parsed.is_none() {
                    warn!(cidr = %cidr, "Invalid CIDR range in TRUSTED_PROXIES, skipping");
                }
                parsed
            })
            .collect();

        if !ranges.is_empty() {
            debug!(count = ranges.len(), "Trusted proxy ranges configured");
        }

        Self { ranges }
    }

    /// Check if trusted proxy handling is enabled (any ranges configured).
    pub fn is_enabled(&self) -> bool {
        !self.ranges.is_empty()
    }

    /// Check if an address belongs to a trusted proxy.
    pub fn is_trusted(&self, ip: &IpAddr) -> bool {
        self.ranges.iter().any(|range| range.contains(ip))
    }
}

// =============================================================================
// Client IP Resolution
// =============================================================================

/// Where the resolved client IP came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClientIp {
    /// The TCP peer address.
    Peer(IpAddr),
    /// The first `X-Forwarded-For` entry, relayed by a trusted proxy.
    Forwarded(IpAddr),
}

impl ClientIp {
    /// The resolved address regardless of source.
    pub fn addr(self) -> IpAddr {
        match self {
            ClientIp::Peer(ip) | ClientIp::Forwarded(ip) => ip,
        }
    }
}

/// Resolve the client IP of a request.
///
/// Returns `None` when the request carries no peer address, which happens
/// when the app is served without connect info.
pub fn resolve_client_ip<B>(req: &Request<B>, trusted: &TrustedProxyConfig) -> Option<ClientIp> {
    let ConnectInfo(peer) = req.extensions().get::<ConnectInfo<SocketAddr>>()?;
    let peer = peer.ip().to_canonical();

    if trusted.is_trusted(&peer)
        && let Some(forwarded) = first_forwarded_ip(req)
    {
        debug!(peer = %peer, client_ip = %forwarded, "Using X-Forwarded-For from trusted proxy");
        return Some(ClientIp::Forwarded(forwarded));
    }

    Some(ClientIp::Peer(peer))
}

#[inline]
fn first_forwarded_ip<B>(req: &Request<B>) -> Option<IpAddr> {
    let value = req.headers().get(FORWARDED_FOR_HEADER)?.to_str().ok()?;
    let first = value.split(',').next()?.trim();
    first.parse::<IpAddr>().ok().map(|ip| ip.to_canonical())
}
