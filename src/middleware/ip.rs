//! Client IP extraction from proxy headers.
//!
//! # Header Priority
//!
//! 1. `CF-Connecting-IP` (Cloudflare edge)
//! 2. `X-Real-IP`
//! 3. First entry of `X-Forwarded-For`
//! 4. The socket peer address (`ConnectInfo<SocketAddr>`), when the server
//!    was started with connect info
//! 5. [`UNKNOWN_IP`]
//!
//! # Security Warning: IP Spoofing Risk
//!
//! **These functions trust client-provided headers.** Deploy behind a proxy
//! that overwrites (not appends to) these headers before using the result as a
//! rate-limit key, or clients can rotate spoofed addresses freely.
//!
//! All requests without an identifiable address share the `"unknown"` key and
//! are therefore rate limited collectively.

use std::borrow::Cow;
use std::net::SocketAddr;

use axum::extract::ConnectInfo;
use axum::http::{HeaderMap, Request};

use crate::headers::{CF_CONNECTING_IP, X_FORWARDED_FOR, X_REAL_IP};

/// Fallback IP value when no client IP can be determined.
pub const UNKNOWN_IP: &str = "unknown";

/// Where a client address was found.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IpSource {
    Cloudflare,
    RealIp,
    ForwardedFor,
    Peer,
    Unknown,
}

/// Find the client address in proxy headers without allocating.
fn ip_from_headers(headers: &HeaderMap) -> Option<(&str, IpSource)> {
    if let Some(value) = headers.get(CF_CONNECTING_IP)
        && let Ok(ip) = value.to_str()
    {
        return Some((ip.trim(), IpSource::Cloudflare));
    }

    if let Some(value) = headers.get(X_REAL_IP)
        && let Ok(ip) = value.to_str()
    {
        return Some((ip.trim(), IpSource::RealIp));
    }

    // Format: "client, proxy1, proxy2" - we want the first (client) IP
    if let Some(value) = headers.get(X_FORWARDED_FOR)
        && let Ok(list) = value.to_str()
        && let Some(first) = list.split(',').next()
    {
        return Some((first.trim(), IpSource::ForwardedFor));
    }

    None
}

/// Resolve the client address from headers, then the socket peer.
///
/// Returns `Cow::Borrowed(UNKNOWN_IP)` without allocating when nothing is known.
pub fn client_ip(headers: &HeaderMap, peer: Option<SocketAddr>) -> (Cow<'static, str>, IpSource) {
    match (ip_from_headers(headers), peer) {
        (Some((ip, source)), _) => (Cow::Owned(ip.to_string()), source),
        (None, Some(addr)) => (Cow::Owned(addr.ip().to_string()), IpSource::Peer),
        (None, None) => (Cow::Borrowed(UNKNOWN_IP), IpSource::Unknown),
    }
}

/// Extract the client IP for a request.
#[inline]
pub fn extract_client_ip<B>(req: &Request<B>) -> Cow<'static, str> {
    let peer = req
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| *addr);
    client_ip(req.headers(), peer).0
}
