//! Plaintext-to-HTTPS redirects and HSTS.
//!
//! TLS is expected to terminate at a proxy, so `X-Forwarded-Proto` is trusted
//! over the request's own scheme. Secure responses get
//! `Strict-Transport-Security`; redirects never do.

use axum::extract::Request;
use axum::http::HeaderValue;
use axum::http::header::HOST;
use axum::response::Response;
use tracing::{debug, info, warn};
use url::Url;

use super::permanent_redirect;
use crate::error::{AppError, AppResult};
use crate::headers::{STRICT_TRANSPORT_SECURITY, X_FORWARDED_PROTO};
use crate::metrics::{self, RedirectKind};
use crate::pipeline::{BoxFuture, Middleware, Next};

/// HSTS policy stamped on secure responses (one year, preload eligible).
pub const HSTS_POLICY: &str = "max-age=31536000; includeSubDomains; preload";

/// Scheme the client actually used.
pub fn effective_scheme(request: &Request) -> &str {
    request
        .headers()
        .get(X_FORWARDED_PROTO)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .or_else(|| request.uri().scheme_str())
        .unwrap_or("http")
}

/// Build the `https` equivalent of the request URL.
///
/// # Errors
///
/// Returns `AppError::BadRequest` if `host` does not form a valid URL.
pub fn https_url(host: &str, request: &Request) -> AppResult<Url> {
    let path_and_query = request
        .uri()
        .path_and_query()
        .map_or("/", |pq| pq.as_str());

    Url::parse(&format!("https://{host}{path_and_query}"))
        .map_err(|e| AppError::BadRequest(format!("Invalid redirect target: {e}")))
}

/// Redirects plaintext requests to HTTPS when enabled.
#[derive(Debug, Clone, Copy)]
pub struct HttpsRedirect {
    enabled: bool,
}

impl HttpsRedirect {
    pub const fn new(enabled: bool) -> Self {
        Self { enabled }
    }
}

impl Middleware for HttpsRedirect {
    fn name(&self) -> &'static str {
        "https_redirect"
    }

    fn respond<'a>(&'a self, request: Request, next: Next<'a>) -> BoxFuture<'a, AppResult<Response>> {
        Box::pin(async move {
            if !self.enabled {
                return next.run(request).await;
            }

            let scheme = effective_scheme(&request);
            if scheme != "https" {
                let Some(host) = request.headers().get(HOST) else {
                    warn!("HTTPS redirect failed: missing Host header");
                    return Err(AppError::BadRequest("Missing Host header".to_string()));
                };
                let Ok(host) = host.to_str() else {
                    warn!("HTTPS redirect failed: Host header is not valid UTF-8");
                    return Err(AppError::BadRequest("Invalid Host header".to_string()));
                };

                let target = https_url(host, &request)?;
                info!(from = %format!("{scheme}://{host}"), to = %target, "Redirecting to HTTPS");
                metrics::record_redirect(RedirectKind::Https);
                return permanent_redirect(target.as_str());
            }

            let mut response = next.run(request).await?;
            response.headers_mut().insert(
                STRICT_TRANSPORT_SECURITY,
                HeaderValue::from_static(HSTS_POLICY),
            );
            debug!("HTTPS validation passed");
            Ok(response)
        })
    }
}
