use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::context::GeoLocation;

/// Health check response.
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    /// Service health status
    pub status: String,
    /// Service version
    pub version: String,
    /// Deployment environment
    pub environment: String,
    /// Current timestamp
    pub timestamp: DateTime<Utc>,
}

/// Body of `POST /api/echo`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct EchoRequest {
    pub message: String,
}

/// Echoed message.
#[derive(Debug, Serialize)]
pub struct EchoResponse {
    pub message: String,
    /// Length in characters
    pub length: usize,
    pub received_at: DateTime<Utc>,
}

/// What the pipeline knows about the caller.
#[derive(Debug, Serialize)]
pub struct ClientInfoResponse {
    pub ip: String,
    pub locale: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub geo: Option<GeoLocation>,
    pub ajax: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub request_id: Option<String>,
}

/// Body of `POST /api/consent`, JSON or url-encoded.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ConsentRequest {
    pub choice: String,
}
