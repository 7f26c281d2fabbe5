//! Echo endpoints.
//!
//! # Endpoints
//!
//! - `GET /api/echo?message=...` - Echo a query parameter
//! - `POST /api/echo` - Echo a JSON body `{"message": "..."}`

use chrono::Utc;
use tracing::{debug, instrument};

use crate::envelope::Envelope;
use crate::error::AppResult;
use crate::models::EchoResponse;
use crate::validation::validate_message;

/// Echo a message back inside an envelope.
///
/// # Response Body
///
/// ```json
/// {
///   "data": {
///     "length": 5,
///     "message": "hello",
///     "received_at": "2024-01-15T10:30:00Z"
///   },
///   "success": true
/// }
/// ```
///
/// # Errors
///
/// Returns `AppError::BadRequest` if the message is empty, too long or holds
/// control characters.
#[instrument(skip(message), fields(len = message.len()))]
pub fn echo(message: &str) -> AppResult<Envelope<EchoResponse>> {
    let message = validate_message(message)?;
    debug!("Echoing message");

    Ok(Envelope::ok(EchoResponse {
        message: message.to_string(),
        length: message.chars().count(),
        received_at: Utc::now(),
    }))
}
