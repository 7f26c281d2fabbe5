//! Health and landing endpoints.
//!
//! # Endpoints
//!
//! - `GET /` - Service name and version
//! - `GET /health` - Health check, always 200 while the process serves
//! - `GET /robots.txt` - Crawler policy

use axum::response::Response;
use chrono::Utc;
use tracing::instrument;

use crate::environment::Environment;
use crate::envelope::Envelope;
use crate::models::HealthResponse;
use crate::responses;

/// Paths crawlers should skip.
const ROBOTS_DISALLOW: &str = "Disallow: /api/";

pub fn home() -> Response {
    responses::json_object([
        ("name", env!("CARGO_PKG_NAME")),
        ("version", env!("CARGO_PKG_VERSION")),
    ])
}

/// Health check endpoint.
///
/// # Response Body
///
/// ```json
/// {
///   "data": {
///     "environment": "production",
///     "status": "healthy",
///     "timestamp": "2024-01-15T10:30:00Z",
///     "version": "0.1.0"
///   },
///   "success": true
/// }
/// ```
#[instrument]
pub fn health_check(environment: Environment) -> Envelope<HealthResponse> {
    Envelope::ok(HealthResponse {
        status: "healthy".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        environment: environment.to_string(),
        timestamp: Utc::now(),
    })
}

pub fn robots() -> Response {
    responses::robots(ROBOTS_DISALLOW)
}
