//! Host header allow-list.
//!
//! Requests are accepted only when the `Host` header, with any port
//! stripped, exactly matches an allow-listed hostname. There is no wildcard
//! matching and no case folding.

use std::collections::HashSet;

use axum::extract::Request;
use axum::http::header::HOST;
use axum::response::Response;
use tracing::warn;

use crate::error::{AppError, AppResult};
use crate::metrics;
use crate::pipeline::{BoxFuture, Middleware, Next};

/// Strip a trailing `:port` from a Host header value.
///
/// Bracketed IPv6 literals keep their brackets: `[::1]:8080` becomes `[::1]`.
pub fn strip_port(host: &str) -> &str {
    if host.starts_with('[') {
        return match host.find(']') {
            Some(end) => &host[..=end],
            None => host,
        };
    }

    match host.rsplit_once(':') {
        // A second colon means an unbracketed IPv6 literal, not a port
        Some((name, port)) if !name.contains(':') && port.bytes().all(|b| b.is_ascii_digit()) => {
            name
        }
        _ => host,
    }
}

/// Rejects requests whose host is not allow-listed.
#[derive(Debug, Clone)]
pub struct HostValidation {
    allowed: HashSet<String>,
}

impl HostValidation {
    pub fn new<I, S>(allowed: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            allowed: allowed.into_iter().map(Into::into).collect(),
        }
    }

    pub fn is_allowed(&self, host: &str) -> bool {
        self.allowed.contains(strip_port(host))
    }
}

impl Middleware for HostValidation {
    fn name(&self) -> &'static str {
        "host_validation"
    }

    fn respond<'a>(&'a self, request: Request, next: Next<'a>) -> BoxFuture<'a, AppResult<Response>> {
        Box::pin(async move {
            let Some(raw) = request.headers().get(HOST) else {
                metrics::record_host_rejection();
                return Err(AppError::Forbidden("Missing host header".to_string()));
            };

            let host = raw.to_str().unwrap_or_default();
            if !self.is_allowed(host) {
                warn!(host = %String::from_utf8_lossy(raw.as_bytes()), "Rejected request for host not in allow-list");
                metrics::record_host_rejection();
                return Err(AppError::Forbidden("Host not allowed".to_string()));
            }

            next.run(request).await
        })
    }
}
