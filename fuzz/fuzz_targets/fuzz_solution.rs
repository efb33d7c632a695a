//! Fuzz target for solution files read back from external solvers.

#![no_main]

use std::sync::OnceLock;

use dp_config::DiagramFile;
use dp_core::loader::build_diagram;
use dp_core::model::Solution;
use dp_core::pipeline::{compile, CompiledModel};
use libfuzzer_sys::fuzz_target;

const DIAGRAM: &str = include_str!("../../test/fixtures/diagrams/used_car.json");

fn compiled() -> &'static CompiledModel {
    static MODEL: OnceLock<CompiledModel> = OnceLock::new();
    MODEL.get_or_init(|| {
        let file = DiagramFile::from_json_str(DIAGRAM).expect("fixture should parse");
        let diagram = build_diagram(&file).expect("fixture should build");
        compile(&file, &diagram).expect("fixture should compile")
    })
}

fuzz_target!(|data: &[u8]| {
    let Ok(text) = std::str::from_utf8(data) else {
        return;
    };
    let compiled = compiled();
    if let Ok(solution) = Solution::from_sol(&compiled.model, text) {
        let _ = compiled.strategy(&solution);
    }
});
