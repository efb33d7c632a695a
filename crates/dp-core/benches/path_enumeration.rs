//! Criterion benchmarks for path enumeration and model compilation.
//!
//! Diagrams are generated in memory: a chain of binary chance nodes
//! observed by a single decision, so the path space doubles per node.

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use dp_config::DiagramFile;
use dp_core::loader::build_diagram;
use dp_core::paths::Paths;
use dp_core::pipeline::compile;
use serde_json::json;

// ── Helpers ──────────────────────────────────────────────────────────

fn chain_file(length: usize) -> DiagramFile {
    let mut nodes = Vec::new();
    let mut probabilities = serde_json::Map::new();
    for i in 0..length {
        let name = format!("C{i}");
        if i == 0 {
            nodes.push(json!({"name": name, "kind": "chance", "states": ["lo", "hi"]}));
            probabilities.insert(name, json!([0.5, 0.5]));
        } else {
            nodes.push(json!({
                "name": name,
                "kind": "chance",
                "information_set": [format!("C{}", i - 1)],
                "states": ["lo", "hi"],
            }));
            probabilities.insert(name, json!([[0.7, 0.3], [0.4, 0.6]]));
        }
    }
    nodes.push(json!({
        "name": "D",
        "kind": "decision",
        "information_set": [format!("C{}", length - 1)],
        "states": ["wait", "act"],
    }));
    nodes.push(json!({"name": "V", "kind": "value", "information_set": ["C0", "D"]}));

    let text = json!({
        "schema_version": "1.0.0",
        "nodes": nodes,
        "probabilities": probabilities,
        "utilities": {"V": [[0.0, -10.0], [0.0, 25.0]]},
    })
    .to_string();
    DiagramFile::from_json_str(&text).expect("generated diagram should parse")
}

// ── Benchmarks ───────────────────────────────────────────────────────

fn bench_paths(c: &mut Criterion) {
    let mut group = c.benchmark_group("paths");
    for axes in [6usize, 9, 12] {
        let states = vec![3usize; axes];
        group.bench_with_input(BenchmarkId::new("enumerate", axes), &states, |b, s| {
            b.iter(|| black_box(Paths::new(black_box(s)).count()));
        });
    }
    group.finish();
}

fn bench_compile(c: &mut Criterion) {
    let mut group = c.benchmark_group("compile");
    group.sample_size(20);
    for length in [4usize, 8, 12] {
        let file = chain_file(length);
        let diagram = build_diagram(&file).expect("generated diagram should build");
        group.bench_with_input(BenchmarkId::new("chain", length), &length, |b, _| {
            b.iter(|| {
                let compiled = compile(black_box(&file), black_box(&diagram))
                    .expect("model should compile");
                black_box(compiled.summary());
            });
        });
    }
    group.finish();
}

criterion_group!(benches, bench_paths, bench_compile);
criterion_main!(benches);
