//! Canonical JSON envelope for handler results.
//!
//! ```json
//! {
//!   "data": { "id": 1 },
//!   "message": "Created",
//!   "success": true
//! }
//! ```
//!
//! Output is pretty-printed with keys sorted at every level, slashes left
//! unescaped and dates in ISO-8601 (chrono's RFC 3339 serialization), so
//! identical values always encode to identical bytes. Absent `data` and
//! `message` are omitted rather than encoded as `null`.

use axum::http::header::CONTENT_TYPE;
use axum::http::{HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use serde::{Deserialize, Serialize};
use tracing::error;

/// Content type of encoded envelopes.
pub const JSON_UTF8: &str = "application/json; charset=utf-8";

/// Body returned when an envelope cannot be encoded.
pub const ENCODE_FAILURE_BODY: &str = "Failed to encode response";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Envelope<T> {
    pub success: bool,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,

    #[serde(skip)]
    status: Option<StatusCode>,
}

impl<T> Envelope<T> {
    pub fn new(success: bool, data: Option<T>, message: Option<String>) -> Self {
        Self {
            success,
            data,
            message,
            status: None,
        }
    }

    /// `success: true` carrying `data`.
    pub fn ok(data: T) -> Self {
        Self::new(true, Some(data), None)
    }

    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }

    /// Override the response status (default: 200 on success, 400 otherwise).
    pub fn with_status(mut self, status: StatusCode) -> Self {
        self.status = Some(status);
        self
    }

    pub fn status(&self) -> StatusCode {
        self.status.unwrap_or(if self.success {
            StatusCode::OK
        } else {
            StatusCode::BAD_REQUEST
        })
    }
}

impl Envelope<()> {
    /// Envelope without data.
    pub fn message(success: bool, message: impl Into<String>) -> Self {
        Self::new(success, None, Some(message.into()))
    }

    /// `success: false` with an explanatory message.
    pub fn failure(message: impl Into<String>) -> Self {
        Self::message(false, message)
    }
}

impl<T: Serialize> Envelope<T> {
    /// Encode with sorted keys.
    ///
    /// # Errors
    ///
    /// Returns the serializer error when `data` cannot be represented as JSON
    /// (for example a map with non-string keys).
    pub fn encode(&self) -> Result<Vec<u8>, serde_json::Error> {
        // serde_json::Value objects are BTreeMaps, so this sorts every level
        let value = serde_json::to_value(self)?;
        serde_json::to_vec_pretty(&value)
    }
}

impl<T: Serialize> IntoResponse for Envelope<T> {
    fn into_response(self) -> Response {
        match self.encode() {
            Ok(body) => {
                let mut response = (self.status(), body).into_response();
                response
                    .headers_mut()
                    .insert(CONTENT_TYPE, HeaderValue::from_static(JSON_UTF8));
                response
            }
            Err(e) => {
                error!(error = %e, "Failed to encode response envelope");
                (StatusCode::INTERNAL_SERVER_ERROR, ENCODE_FAILURE_BODY).into_response()
            }
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    use axum::body::to_bytes;
    use chrono::{TimeZone, Utc};
    use serde_json::json;

    #[derive(Serialize)]
    struct Unsorted {
        zebra: u8,
        apple: u8,
    }

    #[test]
    fn test_keys_sorted_at_every_level() {
        let text = String::from_utf8(
            Envelope::ok(Unsorted { zebra: 1, apple: 2 })
                .with_message("hi")
                .encode()
                .unwrap(),
        )
        .unwrap();

        let data = text.find("\"data\"").unwrap();
        let message = text.find("\"message\"").unwrap();
        let success = text.find("\"success\"").unwrap();
        assert!(data < message && message < success);
        assert!(text.find("\"apple\"").unwrap() < text.find("\"zebra\"").unwrap());
    }

    #[test]
    fn test_decode_reconstructs_envelope() {
        let original = Envelope::ok(json!({"id": 1}));
        let decoded: Envelope<serde_json::Value> =
            serde_json::from_slice(&original.encode().unwrap()).unwrap();
        assert_eq!(decoded, original);
    }

    #[test]
    fn test_absent_fields_omitted() {
        let value: serde_json::Value =
            serde_json::from_slice(&Envelope::failure("nope").encode().unwrap()).unwrap();
        assert_eq!(value, json!({"success": false, "message": "nope"}));
    }

    #[test]
    fn test_slashes_and_dates() {
        let at = Utc.with_ymd_and_hms(2024, 1, 2, 3, 4, 5).unwrap();
        let text = String::from_utf8(
            Envelope::ok(json!({"url": "https://example.com/a", "at": at}))
                .encode()
                .unwrap(),
        )
        .unwrap();
        assert!(text.contains("https://example.com/a"));
        assert!(text.contains("2024-01-02T03:04:05Z"));
    }

    #[test]
    fn test_status_defaults() {
        assert_eq!(Envelope::ok(1).status(), StatusCode::OK);
        assert_eq!(Envelope::failure("x").status(), StatusCode::BAD_REQUEST);
        assert_eq!(
            Envelope::ok(1).with_status(StatusCode::CREATED).status(),
            StatusCode::CREATED
        );
    }

    #[tokio::test]
    async fn test_into_response_sets_json_content_type() {
        let response = Envelope::ok(json!({"id": 1})).into_response();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.headers()[CONTENT_TYPE], JSON_UTF8);
    }

    #[tokio::test]
    async fn test_encode_failure_degrades_to_plain_500() {
        let mut bad = HashMap::new();
        bad.insert((1, 2), "tuple keys are not JSON");

        let response = Envelope::ok(bad).into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        assert_eq!(&body[..], ENCODE_FAILURE_BODY.as_bytes());
    }
}
