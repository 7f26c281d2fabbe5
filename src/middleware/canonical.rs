//! Canonical host redirects.
//!
//! Any request whose `Host` differs from the canonical host is permanently
//! redirected to the same path and query on the canonical host. The scheme
//! (and port, unless the canonical host names one) comes from the configured
//! base URL. Canonicalization is best-effort: when the target cannot be
//! built, the failure is logged and the request is served as-is.

use axum::extract::Request;
use axum::http::Uri;
use axum::http::header::HOST;
use axum::response::Response;
use tracing::{debug, error};
use url::Url;

use super::host::strip_port;
use super::permanent_redirect;
use crate::error::{AppError, AppResult};
use crate::metrics::{self, RedirectKind};
use crate::pipeline::{BoxFuture, Middleware, Next};

/// Build the canonical form of `uri`.
///
/// # Errors
///
/// Returns `AppError::BadRequest` if the canonical host or port cannot be set
/// on `base_url` (for example a `data:` base or an invalid hostname).
pub fn canonical_url(base_url: &Url, canonical_host: &str, uri: &Uri) -> AppResult<Url> {
    let mut url = base_url.clone();
    let host = strip_port(canonical_host);

    url.set_host(Some(host))
        .map_err(|e| AppError::BadRequest(format!("Invalid canonical host {canonical_host}: {e}")))?;

    if host.len() < canonical_host.len() {
        let port = canonical_host
            .get(host.len() + 1..)
            .and_then(|p| p.parse::<u16>().ok())
            .ok_or_else(|| AppError::BadRequest(format!("Invalid canonical port in {canonical_host}")))?;
        url.set_port(Some(port))
            .map_err(|()| AppError::BadRequest("Base URL cannot carry a port".to_string()))?;
    }

    url.set_path(uri.path());
    url.set_query(uri.query());
    Ok(url)
}

/// Redirects non-canonical hosts to the canonical one.
#[derive(Debug, Clone)]
pub struct CanonicalRedirect {
    canonical_host: String,
    base_url: Url,
}

impl CanonicalRedirect {
    pub fn new(canonical_host: impl Into<String>, base_url: Url) -> Self {
        Self {
            canonical_host: canonical_host.into(),
            base_url,
        }
    }

    /// Whether `host` already names the canonical host.
    ///
    /// When the canonical host carries no port, any port on the request is
    /// ignored so that a non-default base URL port cannot cause a redirect loop.
    pub fn is_canonical(&self, host: &str) -> bool {
        if self.canonical_host.contains(':') {
            host == self.canonical_host
        } else {
            strip_port(host) == self.canonical_host
        }
    }
}

impl Middleware for CanonicalRedirect {
    fn name(&self) -> &'static str {
        "canonical_redirect"
    }

    fn respond<'a>(&'a self, request: Request, next: Next<'a>) -> BoxFuture<'a, AppResult<Response>> {
        Box::pin(async move {
            let Some(host) = request.headers().get(HOST).and_then(|v| v.to_str().ok()) else {
                return next.run(request).await;
            };

            if self.is_canonical(host) {
                return next.run(request).await;
            }

            match canonical_url(&self.base_url, &self.canonical_host, request.uri())
                .and_then(|target| permanent_redirect(target.as_str()))
            {
                Ok(response) => {
                    debug!(from = %host, to = %self.canonical_host, "Redirecting to canonical host");
                    metrics::record_redirect(RedirectKind::Canonical);
                    Ok(response)
                }
                Err(e) => {
                    error!(uri = %request.uri(), error = %e, "Failed to create canonical URL");
                    next.run(request).await
                }
            }
        })
    }
}
