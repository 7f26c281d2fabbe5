//! Request timing and access logging.
//!
//! Each request is logged exactly once after the inner chain returns:
//!
//! ```text
//! 200 | 3ms | GET /api/echo?message=hi | request-id=8f0c...
//! ```
//!
//! | Outcome                 | Level |
//! |-------------------------|-------|
//! | 5xx or inner error      | error |
//! | 4xx                     | warn  |
//! | 304                     | debug |
//! | static asset            | debug |
//! | anything else           | info  |
//!
//! The stage wraps the error boundary, so rejections arrive as rendered
//! responses and are leveled by their status.
//!
//! Static classification looks only at the response and the request path,
//! never the filesystem.

use std::time::Instant;

use axum::extract::Request;
use axum::http::header::CONTENT_TYPE;
use axum::http::{Method, StatusCode};
use axum::response::Response;
use tracing::{Level, debug, error, info, warn};

use crate::error::AppResult;
use crate::headers::X_REQUEST_ID;
use crate::metrics;
use crate::pipeline::{BoxFuture, Middleware, Next};

const STATIC_CONTENT_TYPES: &[&str] = &[
    "image/",
    "text/css",
    "application/javascript",
    "font/",
    "video/",
    "audio/",
];

const STATIC_EXTENSIONS: &[&str] = &[
    ".css", ".js", ".jpg", ".jpeg", ".png", ".gif", ".svg", ".ico", ".woff", ".woff2", ".ttf",
];

/// Whether a response counts as a static asset.
pub fn is_static_asset(
    method: &Method,
    status: StatusCode,
    content_type: Option<&str>,
    path: &str,
) -> bool {
    if *method != Method::GET && *method != Method::HEAD {
        return false;
    }
    if status != StatusCode::OK && status != StatusCode::NOT_MODIFIED {
        return false;
    }

    content_type.is_some_and(|ct| STATIC_CONTENT_TYPES.iter().any(|p| ct.starts_with(p)))
        || STATIC_EXTENSIONS.iter().any(|ext| path.ends_with(ext))
}

/// Log level for a completed response.
pub fn level_for(status: StatusCode, is_static: bool) -> Level {
    if status.is_server_error() {
        Level::ERROR
    } else if status.is_client_error() {
        Level::WARN
    } else if status == StatusCode::NOT_MODIFIED || is_static {
        Level::DEBUG
    } else {
        Level::INFO
    }
}

/// Measures and logs every request.
#[derive(Debug, Clone, Copy)]
pub struct RequestTiming {
    classify_static: bool,
}

impl RequestTiming {
    /// With `classify_static` unset every response is logged as dynamic.
    pub const fn new(classify_static: bool) -> Self {
        Self { classify_static }
    }
}

impl Default for RequestTiming {
    fn default() -> Self {
        Self::new(true)
    }
}

impl Middleware for RequestTiming {
    fn name(&self) -> &'static str {
        "request_timing"
    }

    fn respond<'a>(&'a self, request: Request, next: Next<'a>) -> BoxFuture<'a, AppResult<Response>> {
        Box::pin(async move {
            let start = Instant::now();
            let method = request.method().clone();
            let uri = request.uri().clone();
            let request_id = request
                .headers()
                .get(X_REQUEST_ID)
                .and_then(|v| v.to_str().ok())
                .unwrap_or("-")
                .to_string();

            let result = next.run(request).await;
            let elapsed = start.elapsed();
            let millis = elapsed.as_millis();

            match result {
                Ok(response) => {
                    let status = response.status();
                    let is_static = self.classify_static
                        && is_static_asset(
                            &method,
                            status,
                            response
                                .headers()
                                .get(CONTENT_TYPE)
                                .and_then(|v| v.to_str().ok()),
                            uri.path(),
                        );

                    let line = format!(
                        "{} | {millis}ms | {method} {uri} | request-id={request_id}",
                        status.as_u16()
                    );
                    match level_for(status, is_static) {
                        Level::ERROR => error!("{line}"),
                        Level::WARN => warn!("{line}"),
                        Level::DEBUG => debug!("{line}"),
                        _ => info!("{line}"),
                    }

                    metrics::record_request(method.as_str(), status, elapsed.as_secs_f64());
                    Ok(response)
                }
                Err(e) => {
                    error!(request_id = %request_id, "{method} {uri} -> ERROR [{millis}ms]: {e}");
                    metrics::record_request(method.as_str(), e.status(), elapsed.as_secs_f64());
                    Err(e)
                }
            }
        })
    }
}
