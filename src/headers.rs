//! Header names consumed or produced by the pipeline.
//!
//! Proxy headers (`X-Forwarded-Proto`, `X-Real-IP`, the Cloudflare `CF-*`
//! family) are input signals only; the pipeline never forwards them.

use axum::http::HeaderName;

pub const X_RATELIMIT_LIMIT: HeaderName = HeaderName::from_static("x-ratelimit-limit");
pub const X_RATELIMIT_REMAINING: HeaderName = HeaderName::from_static("x-ratelimit-remaining");
pub const X_RATELIMIT_RESET: HeaderName = HeaderName::from_static("x-ratelimit-reset");
pub const X_EMAIL_RATELIMIT_REMAINING: HeaderName =
    HeaderName::from_static("x-email-ratelimit-remaining");
pub const X_IP_RATELIMIT_REMAINING: HeaderName =
    HeaderName::from_static("x-ip-ratelimit-remaining");
pub const X_RATELIMIT_SOURCE: HeaderName = HeaderName::from_static("x-ratelimit-source");
pub const X_FORWARDED_PROTO: HeaderName = HeaderName::from_static("x-forwarded-proto");
pub const X_FORWARDED_FOR: HeaderName = HeaderName::from_static("x-forwarded-for");
pub const X_REQUESTED_WITH: HeaderName = HeaderName::from_static("x-requested-with");
pub const X_REQUEST_ID: HeaderName = HeaderName::from_static("x-request-id");
pub const REAUTHORIZATION: HeaderName = HeaderName::from_static("reauthorization");
pub const X_REAL_IP: HeaderName = HeaderName::from_static("x-real-ip");
pub const CF_CONNECTING_IP: HeaderName = HeaderName::from_static("cf-connecting-ip");
pub const CF_IPCOUNTRY: HeaderName = HeaderName::from_static("cf-ipcountry");
pub const CF_REGION: HeaderName = HeaderName::from_static("cf-region");
pub const CF_CITY: HeaderName = HeaderName::from_static("cf-city");

/// Re-exported so callers need a single import for every pipeline header.
pub use axum::http::header::STRICT_TRANSPORT_SECURITY;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_header_names_are_lowercase_wire_names() {
        assert_eq!(X_RATELIMIT_LIMIT.as_str(), "x-ratelimit-limit");
        assert_eq!(X_RATELIMIT_REMAINING.as_str(), "x-ratelimit-remaining");
        assert_eq!(X_RATELIMIT_RESET.as_str(), "x-ratelimit-reset");
        assert_eq!(
            X_EMAIL_RATELIMIT_REMAINING.as_str(),
            "x-email-ratelimit-remaining"
        );
        assert_eq!(X_IP_RATELIMIT_REMAINING.as_str(), "x-ip-ratelimit-remaining");
        assert_eq!(X_RATELIMIT_SOURCE.as_str(), "x-ratelimit-source");
        assert_eq!(X_FORWARDED_PROTO.as_str(), "x-forwarded-proto");
        assert_eq!(STRICT_TRANSPORT_SECURITY.as_str(), "strict-transport-security");
        assert_eq!(REAUTHORIZATION.as_str(), "reauthorization");
        assert_eq!(X_REAL_IP.as_str(), "x-real-ip");
        assert_eq!(CF_CONNECTING_IP.as_str(), "cf-connecting-ip");
        assert_eq!(CF_IPCOUNTRY.as_str(), "cf-ipcountry");
        assert_eq!(CF_REGION.as_str(), "cf-region");
        assert_eq!(CF_CITY.as_str(), "cf-city");
    }
}
