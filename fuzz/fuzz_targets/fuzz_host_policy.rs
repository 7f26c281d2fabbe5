//! Fuzz testing for host and path handling.
//!
//! Arbitrary `Host` values and request targets must never panic when split
//! into host and port, rebuilt into canonical URLs, or mapped onto the public
//! directory.
//!
//! # Running the Fuzz Tests
//!
//! ```bash
//! # Install cargo-fuzz (requires nightly)
//! cargo +nightly install cargo-fuzz
//!
//! # Run with a time limit (e.g., 60 seconds)
//! cargo +nightly fuzz run fuzz_host_policy -- -max_total_time=60
//! ```
//!
//! # What This Tests
//!
//! - `strip_port`: result is always a prefix of the input
//! - `canonical_url`: keeps the canonical host whenever it succeeds
//! - `PublicDirectory::resolve`: never yields a path outside the root
//! - `validate_message`: never panics

#![no_main]

use std::path::Path;

use axum::http::Uri;
use libfuzzer_sys::fuzz_target;
use request_pipeline::middleware::{PublicDirectory, canonical_url, strip_port};
use request_pipeline::validation::validate_message;
use url::Url;

fuzz_target!(|data: &[u8]| {
    let Ok(s) = std::str::from_utf8(data) else {
        return;
    };

    let host = strip_port(s);
    assert!(s.starts_with(host));

    let _ = validate_message(s);

    let public = PublicDirectory::new("/srv/public");
    if let Some(resolved) = public.resolve(s) {
        assert!(resolved.starts_with(Path::new("/srv/public")));
        assert!(!resolved.components().any(|c| c.as_os_str() == ".."));
    }

    if let (Ok(uri), Ok(base)) = (s.parse::<Uri>(), Url::parse("https://example.com")) {
        if let Ok(url) = canonical_url(&base, "example.com", &uri) {
            assert_eq!(url.host_str(), Some("example.com"));
        }
    }
});
