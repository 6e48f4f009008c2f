//! Fuzz testing for request input parsing.
//!
//! Every function exercised here sees raw client input, so none of them may
//! panic on any byte sequence.
//!
//! # Running the Fuzz Tests
//!
//! ```bash
//! cargo +nightly install cargo-fuzz
//! cargo +nightly fuzz run fuzz_validation -- -max_total_time=60
//! ```
//!
//! # What This Tests
//!
//! - `validate_joke_text` and `validate_id`: path and body text checks
//! - `parse_pagination`: `page` / `limit` query parsing, including overflow
//! - `ObjectId::parse_str`: hex identifier decoding
//! - `check_authorization`: Authorization header parsing

#![no_main]

use axum::http::HeaderValue;
use jokes_api::middleware::check_authorization;
use jokes_api::store::ObjectId;
use jokes_api::validation::{parse_pagination, validate_id, validate_joke_text};
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    if let Ok(s) = std::str::from_utf8(data) {
        let _ = validate_joke_text(s);
        let _ = validate_id(s);

        if let Ok(id) = ObjectId::parse_str(s) {
            assert_eq!(ObjectId::parse_str(&id.to_hex()), Ok(id));
        }

        // Split the input into a page and limit pair
        let (page, limit) = s.split_once('&').unwrap_or((s, ""));
        if let Ok(p) = parse_pagination(Some(page), Some(limit)) {
            assert!(p.page >= 1 && p.limit >= 1);
        }
    }

    if let Ok(value) = HeaderValue::from_bytes(data) {
        let _ = check_authorization(Some(&value), "fuzz-token");
    }
});
