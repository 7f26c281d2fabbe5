//! Pipeline stages for security, routing, rate limiting, and observability.
//!
//! # Architecture
//!
//! ```text
//! Request → HTTPS → CORS → Timing → Error Boundary → Context → Static → Host → Canonical → app stages
//!             ↓       ↓                    ↓                      ↓       ↓        ↓
//!         301/HSTS preflight        renders errors            file hit   403      301
//! ```
//!
//! Application stages usually include [`RateLimiting`] and a [`Routing`]
//! stage. See [`Application`](crate::app::Application) for how the order is
//! assembled.
//!
//! # Security Considerations
//!
//! - HTTPS redirects happen before any other stage can produce side effects
//! - Host validation is a strict allow-list without wildcard matching
//! - Client IP extraction trusts proxy headers (see [`ip`])
//! - Routing diagnostics are only rendered in development

pub mod canonical;
pub mod closure;
pub mod context_scope;
pub mod cors;
pub mod error_boundary;
pub mod host;
pub mod https;
pub mod ip;
pub mod rate_limit;
pub mod router;
pub mod static_files;
pub mod timing;

pub use canonical::{CanonicalRedirect, canonical_url};
pub use closure::FnMiddleware;
pub use context_scope::ContextScope;
pub use cors::Cors;
pub use error_boundary::ErrorBoundary;
pub use host::{HostValidation, strip_port};
pub use https::{HSTS_POLICY, HttpsRedirect};
pub use ip::{UNKNOWN_IP, extract_client_ip};
pub use rate_limit::{Limiter, RateLimitResult, RateLimiting, WindowLimiter};
pub use router::{ParseError, RequestData, RouteParser, Routing};
pub use static_files::{PublicDirectory, StaticAssets, StaticFiles};
pub use timing::RequestTiming;

use axum::http::header::LOCATION;
use axum::http::{HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};

use crate::error::{AppError, AppResult};

/// `301 Moved Permanently` to `location`.
pub(crate) fn permanent_redirect(location: &str) -> AppResult<Response> {
    let location = HeaderValue::from_str(location)
        .map_err(|_| AppError::BadRequest(format!("Invalid redirect target: {location}")))?;
    Ok((StatusCode::MOVED_PERMANENTLY, [(LOCATION, location)]).into_response())
}
