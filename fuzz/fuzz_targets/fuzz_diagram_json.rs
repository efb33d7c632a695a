//! Fuzz target for JSON diagram definitions.
//!
//! Parsing, validation and diagram generation must reject malformed input
//! with an error and never panic.

#![no_main]

use dp_config::{validate_diagram_file, DiagramFile};
use dp_core::loader::build_diagram;
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    let Ok(text) = std::str::from_utf8(data) else {
        return;
    };
    let Ok(file) = DiagramFile::from_json_str(text) else {
        return;
    };
    if validate_diagram_file(&file).is_err() {
        return;
    }
    // Keep generation bounded; the path space grows multiplicatively.
    if file.path_count().map_or(true, |n| n > 4096) {
        return;
    }
    let _ = build_diagram(&file);
});
