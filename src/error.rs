use axum::http::header::RETRY_AFTER;
use axum::http::{HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use chrono::{DateTime, Utc};
use serde::Serialize;
use thiserror::Error;

/// Reason shown to non-development clients in place of server-side failures.
pub const GENERIC_FAILURE_REASON: &str = "Something went wrong.";

/// Default `Retry-After` used by [`AppError::rate_limited_until`] when no
/// next-allowed timestamp is known.
pub const DEFAULT_RETRY_AFTER_SECS: i64 = 60;

/// Pipeline-wide error types with appropriate HTTP status codes.
///
/// # Classes
///
/// - Client errors (`BadRequest`, `NotFound`, `PayloadTooLarge`)
/// - Policy rejections (`Forbidden`, `TooManyRequests`)
/// - Unhandled failures (`Internal`, `Serialization`, `Config`), which only the
///   error boundary is allowed to render as a generic 500
#[derive(Error, Debug)]
pub enum AppError {
    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Invalid request: {0}")]
    BadRequest(String),

    #[error("Resource not found: {0}")]
    NotFound(String),

    #[error("Payload too large: {0}")]
    PayloadTooLarge(String),

    #[error("Too many requests, retry after {retry_after}s")]
    TooManyRequests { retry_after: u64 },

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Internal server error: {0}")]
    Internal(String),

    #[error("Configuration error: {0}")]
    Config(String),
}

/// Error response body for rejected requests.
#[derive(Serialize)]
struct ErrorResponse<'a> {
    error: &'a str,
    reason: &'a str,
}

impl AppError {
    /// Build a 429 rejection from an optional next-allowed timestamp.
    ///
    /// The delay is the number of whole seconds until `next_allowed_attempt`,
    /// or `default_delay_secs` when no timestamp is known. It never drops
    /// below one second.
    pub fn rate_limited_until(
        next_allowed_attempt: Option<DateTime<Utc>>,
        default_delay_secs: i64,
    ) -> Self {
        Self::TooManyRequests {
            retry_after: retry_delay_secs(next_allowed_attempt, default_delay_secs),
        }
    }

    /// Build a 429 rejection from an explicit delay in seconds (floored at 1).
    pub fn rate_limited_for(delay_secs: i64) -> Self {
        Self::TooManyRequests {
            retry_after: floor_delay(delay_secs),
        }
    }

    /// HTTP status this error renders with.
    pub fn status(&self) -> StatusCode {
        match self {
            AppError::Forbidden(_) => StatusCode::FORBIDDEN,
            AppError::BadRequest(_) => StatusCode::BAD_REQUEST,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::PayloadTooLarge(_) => StatusCode::PAYLOAD_TOO_LARGE,
            AppError::TooManyRequests { .. } => StatusCode::TOO_MANY_REQUESTS,
            AppError::Serialization(_) | AppError::Internal(_) | AppError::Config(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    /// Machine-readable error kind used in response bodies.
    pub fn kind(&self) -> &'static str {
        match self {
            AppError::Forbidden(_) => "forbidden",
            AppError::BadRequest(_) => "bad_request",
            AppError::NotFound(_) => "not_found",
            AppError::PayloadTooLarge(_) => "payload_too_large",
            AppError::TooManyRequests { .. } => "too_many_requests",
            AppError::Serialization(_) => "serialization_error",
            AppError::Internal(_) => "internal_error",
            AppError::Config(_) => "config_error",
        }
    }

    /// Whether the reason text may reach a client outside development.
    pub fn is_client_visible(&self) -> bool {
        !self.status().is_server_error()
    }

    /// Reason text without the variant prefix.
    fn reason(&self) -> String {
        match self {
            AppError::Forbidden(reason)
            | AppError::BadRequest(reason)
            | AppError::NotFound(reason)
            | AppError::PayloadTooLarge(reason)
            | AppError::Internal(reason)
            | AppError::Config(reason) => reason.clone(),
            AppError::TooManyRequests { .. } => "Too many requests".to_string(),
            AppError::Serialization(e) => e.to_string(),
        }
    }

    /// Render the error as a response.
    ///
    /// With `expose_internal` unset, server-side failures carry only
    /// [`GENERIC_FAILURE_REASON`]; client errors always keep their reason.
    pub fn render(&self, expose_internal: bool) -> Response {
        let reason = if expose_internal || self.is_client_visible() {
            self.reason()
        } else {
            GENERIC_FAILURE_REASON.to_string()
        };

        let body = ErrorResponse {
            error: self.kind(),
            reason: &reason,
        };
        let mut response = (self.status(), axum::Json(body)).into_response();

        if let AppError::TooManyRequests { retry_after } = self {
            response
                .headers_mut()
                .insert(RETRY_AFTER, HeaderValue::from(*retry_after));
        }

        response
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        if self.status().is_server_error() {
            tracing::error!(error = %self, "Request failed");
        } else {
            tracing::debug!(error = %self, "Request rejected");
        }
        self.render(false)
    }
}

/// Whole seconds until `next_allowed_attempt`, or `default_delay_secs` when
/// unknown; never less than 1.
pub fn retry_delay_secs(next_allowed_attempt: Option<DateTime<Utc>>, default_delay_secs: i64) -> u64 {
    let delay = next_allowed_attempt
        .map(|at| (at - Utc::now()).num_seconds())
        .unwrap_or(default_delay_secs);
    floor_delay(delay)
}

fn floor_delay(delay_secs: i64) -> u64 {
    u64::try_from(delay_secs.max(1)).unwrap_or(1)
}

/// Convenience type alias for Results with AppError.
pub type AppResult<T> = Result<T, AppError>;

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use axum::body::to_bytes;

    fn retry_after_of(error: &AppError) -> u64 {
        match error {
            AppError::TooManyRequests { retry_after } => *retry_after,
            other => panic!("expected TooManyRequests, got {other:?}"),
        }
    }

    #[test]
    fn test_rate_limited_for_floors_at_one_second() {
        assert_eq!(retry_after_of(&AppError::rate_limited_for(0)), 1);
        assert_eq!(retry_after_of(&AppError::rate_limited_for(-30)), 1);
        assert_eq!(retry_after_of(&AppError::rate_limited_for(42)), 42);
    }

    #[test]
    fn test_rate_limited_until_past_timestamp_floors() {
        let past = Utc::now() - chrono::Duration::seconds(10);
        assert_eq!(retry_after_of(&AppError::rate_limited_until(Some(past), 60)), 1);
    }

    #[test]
    fn test_rate_limited_until_future_timestamp() {
        let future = Utc::now() + chrono::Duration::seconds(120);
        let delay = retry_after_of(&AppError::rate_limited_until(Some(future), 60));
        assert!((118..=120).contains(&delay), "delay was {delay}");
    }

    #[test]
    fn test_rate_limited_until_without_timestamp_uses_default() {
        assert_eq!(retry_after_of(&AppError::rate_limited_until(None, 60)), 60);
        assert_eq!(retry_after_of(&AppError::rate_limited_until(None, 0)), 1);
    }

    #[test]
    fn test_status_mapping() {
        assert_eq!(
            AppError::Forbidden("x".into()).status(),
            StatusCode::FORBIDDEN
        );
        assert_eq!(
            AppError::BadRequest("x".into()).status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            AppError::rate_limited_for(5).status(),
            StatusCode::TOO_MANY_REQUESTS
        );
        assert_eq!(
            AppError::Internal("x".into()).status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[tokio::test]
    async fn test_render_hides_internal_reason() {
        let response = AppError::Internal("db password leaked".into()).render(false);
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);

        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let text = String::from_utf8(body.to_vec()).unwrap();
        assert!(!text.contains("db password"));
        assert!(text.contains(GENERIC_FAILURE_REASON));
    }

    #[tokio::test]
    async fn test_render_keeps_client_reason() {
        let response = AppError::Forbidden("Host not allowed".into()).render(false);
        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let json: serde_json::Value = serde_json::from_slice(&body).unwrap();

        assert_eq!(json["error"], "forbidden");
        assert_eq!(json["reason"], "Host not allowed");
    }

    #[test]
    fn test_render_too_many_requests_sets_retry_after() {
        let response = AppError::rate_limited_for(7).render(false);
        assert_eq!(response.headers()[RETRY_AFTER], "7");
    }
}
