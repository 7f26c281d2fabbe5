use crate::error::{AppError, AppResult};

// =============================================================================
// Validation Constants
// =============================================================================

/// Maximum length of an echoed message, in characters.
pub const MAX_MESSAGE_LENGTH: usize = 1024;

/// Maximum length of a consent choice.
pub const MAX_CHOICE_LENGTH: usize = 32;

/// Validate a message submitted to the echo endpoints.
///
/// Rules:
/// - Must contain at least one non-whitespace character
/// - Must not exceed 1024 characters
/// - Cannot contain control characters other than tab and newline
///
/// Returns the message with surrounding whitespace removed.
pub fn validate_message(message: &str) -> AppResult<&str> {
    let trimmed = message.trim();

    if trimmed.is_empty() {
        return Err(AppError::BadRequest("Message cannot be empty".to_string()));
    }

    if trimmed.chars().count() > MAX_MESSAGE_LENGTH {
        return Err(AppError::BadRequest(format!(
            "Message cannot exceed {MAX_MESSAGE_LENGTH} characters"
        )));
    }

    if let Some((i, c)) = trimmed
        .chars()
        .enumerate()
        .find(|(_, c)| c.is_control() && *c != '\t' && *c != '\n')
    {
        return Err(AppError::BadRequest(format!(
            "Message contains control character {:#06x} at position {i}",
            c as u32
        )));
    }

    Ok(trimmed)
}

/// Validate a consent choice (`accepted` or `declined`, any case).
pub fn validate_consent_choice(choice: &str) -> AppResult<bool> {
    if choice.len() > MAX_CHOICE_LENGTH {
        return Err(AppError::BadRequest(format!(
            "Consent choice cannot exceed {MAX_CHOICE_LENGTH} characters"
        )));
    }

    match choice.trim().to_ascii_lowercase().as_str() {
        "accepted" | "accept" | "yes" => Ok(true),
        "declined" | "decline" | "no" => Ok(false),
        other => Err(AppError::BadRequest(format!(
            "Unknown consent choice '{other}'. Expected 'accepted' or 'declined'"
        ))),
    }
}
