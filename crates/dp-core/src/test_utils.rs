//! Test utilities for dp-core.
//!
//! Shared by unit tests across modules and, behind the `test-utils`
//! feature, by downstream crates: a float assertion, fixture loading and
//! the used-car buyer diagram built through the public API.

use std::path::{Path, PathBuf};

use crate::decision::{DecisionStrategy, LocalDecisionStrategy};
use crate::diagram::{GenerateOptions, InfluenceDiagram, Node};

/// Assert that two floats agree within `epsilon` (default `1e-6`).
#[macro_export]
macro_rules! assert_approx_eq {
    ($a:expr, $b:expr) => {
        $crate::assert_approx_eq!($a, $b, 1e-6_f64)
    };
    ($a:expr, $b:expr, $epsilon:expr) => {{
        let a: f64 = $a;
        let b: f64 = $b;
        let eps: f64 = $epsilon;
        let diff = (a - b).abs();
        if diff > eps {
            panic!(
                "assertion failed: `(left ~= right)` (left: `{}`, right: `{}`, diff: `{}`, epsilon: `{}`)",
                a, b, diff, eps
            );
        }
    }};
}

// ============================================================================
// Fixtures
// ============================================================================

/// Path of a file under `test/fixtures/diagrams` at the workspace root.
pub fn fixture_path(name: &str) -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR"))
        .join("../../test/fixtures/diagrams")
        .join(name)
}

pub fn load_fixture(name: &str) -> std::io::Result<String> {
    std::fs::read_to_string(fixture_path(name))
}

// ============================================================================
// Used-car buyer
// ============================================================================

/// Assembled but not generated used-car diagram with every table set.
///
/// Node order: O, T, R, A, then value nodes V1, V2, V3.
pub fn used_car_assembled() -> InfluenceDiagram {
    let mut d = InfluenceDiagram::new();
    d.add_node(Node::chance("O", &[], &["lemon", "peach"])).unwrap();
    d.add_node(Node::decision("T", &[], &["no test", "test"])).unwrap();
    d.add_node(Node::chance("R", &["O", "T"], &["no test", "lemon", "peach"]))
        .unwrap();
    d.add_node(Node::decision(
        "A",
        &["R"],
        &["buy without guarantee", "buy with guarantee", "don't buy"],
    ))
    .unwrap();
    d.add_node(Node::value("V1", &["T"])).unwrap();
    d.add_node(Node::value("V2", &["A"])).unwrap();
    d.add_node(Node::value("V3", &["O", "A"])).unwrap();
    d.generate_arcs().unwrap();

    let mut o = d.probability_matrix("O").unwrap();
    o.set_row::<&str>(&[], &[0.2, 0.8]).unwrap();
    d.set_probabilities("O", o).unwrap();

    let mut r = d.probability_matrix("R").unwrap();
    r.set_row(&["lemon", "no test"], &[1.0, 0.0, 0.0]).unwrap();
    r.set_row(&["lemon", "test"], &[0.0, 1.0, 0.0]).unwrap();
    r.set_row(&["peach", "no test"], &[1.0, 0.0, 0.0]).unwrap();
    r.set_row(&["peach", "test"], &[0.0, 0.0, 1.0]).unwrap();
    d.set_probabilities("R", r).unwrap();

    let mut v1 = d.utility_matrix("V1").unwrap();
    v1.set_row::<&str>(&[], &[0.0, -25.0]).unwrap();
    d.set_utility("V1", v1).unwrap();

    let mut v2 = d.utility_matrix("V2").unwrap();
    v2.set_row::<&str>(&[], &[100.0, 40.0, 0.0]).unwrap();
    d.set_utility("V2", v2).unwrap();

    let mut v3 = d.utility_matrix("V3").unwrap();
    v3.set_row(&["lemon"], &[-200.0, 0.0, 0.0]).unwrap();
    v3.set_row(&["peach"], &[-40.0, -20.0, 0.0]).unwrap();
    d.set_utility("V3", v3).unwrap();
    d
}

/// Generated used-car diagram with default options.
pub fn used_car() -> InfluenceDiagram {
    used_car_with(GenerateOptions::default())
}

pub fn used_car_with(options: GenerateOptions) -> InfluenceDiagram {
    let mut d = used_car_assembled();
    d.generate(options).unwrap();
    d
}

/// The optimal strategy: test, then buy a peach without guarantee, a
/// lemon with guarantee, and nothing when untested.
pub fn used_car_strategy(diagram: &InfluenceDiagram) -> DecisionStrategy {
    DecisionStrategy::new(vec![
        LocalDecisionStrategy::new(diagram, "T", vec![1]).unwrap(),
        LocalDecisionStrategy::new(diagram, "A", vec![2, 1, 0]).unwrap(),
    ])
}
