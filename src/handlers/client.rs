//! Caller information and consent endpoints.
//!
//! # Endpoints
//!
//! - `GET /api/whoami` - What the pipeline knows about the caller
//! - `POST /api/consent` - Record a cookie consent choice

use axum::http::StatusCode;
use axum::http::header::LOCATION;
use axum::response::{IntoResponse, Response};
use chrono::Utc;
use tracing::{info, instrument};

use crate::context::RequestContext;
use crate::envelope::Envelope;
use crate::error::AppResult;
use crate::models::ClientInfoResponse;
use crate::state::{AppState, CONSENT_COOKIE};
use crate::validation::validate_consent_choice;

/// Describe the current caller from the ambient request context.
///
/// # Response Body
///
/// ```json
/// {
///   "data": {
///     "ajax": false,
///     "ip": "203.0.113.7",
///     "locale": "en-GB",
///     "request_id": "0d6f6e2a-3c1b-4f53-9d1e-7e1c4c2f8a10"
///   },
///   "success": true
/// }
/// ```
///
/// # Errors
///
/// Returns `AppError::Internal` when called outside a request scope.
#[instrument]
pub fn whoami() -> AppResult<Envelope<ClientInfoResponse>> {
    let context = RequestContext::current()?;

    Ok(Envelope::ok(ClientInfoResponse {
        ip: context.real_ip(),
        locale: context.locale(),
        geo: context.geo_location(),
        ajax: context.is_ajax_request(),
        request_id: context.request_id().map(str::to_string),
    }))
}

/// Store the consent choice in a cookie.
///
/// Traditional form posts are sent back to `/` with `303 See Other`; other
/// clients receive an envelope.
///
/// # Errors
///
/// Returns `AppError::BadRequest` for an unknown choice.
#[instrument(skip(state))]
pub fn consent(state: &AppState, choice: &str) -> AppResult<Response> {
    let accepted = validate_consent_choice(choice)?;
    let value = if accepted { "accepted" } else { "declined" };

    let cookie = state.cookies.cookie(CONSENT_COOKIE, value, Utc::now());
    info!(choice = value, "Consent recorded");

    let traditional = RequestContext::try_current()
        .is_some_and(|context| context.is_traditional_form_submission());

    let mut response = if traditional {
        (StatusCode::SEE_OTHER, [(LOCATION, "/")]).into_response()
    } else {
        Envelope::message(true, format!("Consent {value}")).into_response()
    };
    cookie.append_to(response.headers_mut())?;

    Ok(response)
}
