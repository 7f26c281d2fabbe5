//! Small response builders shared by handlers.

use std::collections::BTreeMap;

use axum::http::StatusCode;
use axum::http::header::CONTENT_TYPE;
use axum::response::{IntoResponse, Response};

use crate::envelope::JSON_UTF8;

/// `robots.txt` for all user agents followed by `disallows` verbatim.
pub fn robots(disallows: &str) -> Response {
    (
        StatusCode::OK,
        [(CONTENT_TYPE, mime::TEXT_PLAIN_UTF_8.as_ref())],
        format!("User-Agent: *\n{disallows}"),
    )
        .into_response()
}

/// A flat JSON object built from string pairs, keys sorted.
pub fn json_object<I, K, V>(pairs: I) -> Response
where
    I: IntoIterator<Item = (K, V)>,
    K: Into<String>,
    V: Into<String>,
{
    let object: BTreeMap<String, String> = pairs
        .into_iter()
        .map(|(k, v)| (k.into(), v.into()))
        .collect();

    match serde_json::to_vec(&object) {
        Ok(body) => (StatusCode::OK, [(CONTENT_TYPE, JSON_UTF8)], body).into_response(),
        Err(e) => crate::error::AppError::from(e).into_response(),
    }
}
