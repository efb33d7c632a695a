//! Fuzz target for settings parsing.
//!
//! Tests that JSON and TOML settings parsing handles arbitrary input
//! without panicking.

#![no_main]

use dp_config::{validate_settings, Settings};
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    if let Ok(settings) = serde_json::from_slice::<Settings>(data) {
        let _ = validate_settings(&settings);
    }
    if let Ok(text) = std::str::from_utf8(data) {
        if let Ok(settings) = toml::from_str::<Settings>(text) {
            let _ = validate_settings(&settings);
        }
    }
});
