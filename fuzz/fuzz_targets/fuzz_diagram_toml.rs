//! Fuzz target for TOML diagram definitions.

#![no_main]

use dp_config::{validate_diagram_file, DiagramFile};
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    if let Ok(text) = std::str::from_utf8(data) {
        if let Ok(file) = DiagramFile::from_toml_str(text) {
            let _ = validate_diagram_file(&file);
        }
    }
});
