//! Benchmarks for diagram validation.

use criterion::{Criterion, black_box, criterion_group, criterion_main};
use mermaid_dash::render::{MermaidRenderer, Renderer, diagram_kind};
use tokio::runtime::Runtime;

fn runtime() -> Runtime {
    tokio::runtime::Builder::new_current_thread()
        .build()
        .expect("failed to build runtime")
}

fn bench_kind_detection(c: &mut Criterion) {
    let source = include_str!("../tests/fixtures/checkout.mmd");
    c.bench_function("diagram_kind", |b| {
        b.iter(|| diagram_kind(black_box(source)).unwrap())
    });
}

fn bench_validate_simple(c: &mut Criterion) {
    let rt = runtime();
    let renderer = MermaidRenderer::new();
    c.bench_function("validate_simple", |b| {
        b.iter(|| rt.block_on(renderer.validate(black_box("graph TD\nA-->B"))).unwrap())
    });
}

fn bench_validate_medium(c: &mut Criterion) {
    let rt = runtime();
    let renderer = MermaidRenderer::new();
    let source = include_str!("../tests/fixtures/checkout.mmd");
    c.bench_function("validate_medium", |b| {
        b.iter(|| rt.block_on(renderer.validate(black_box(source))).unwrap())
    });
}

criterion_group!(
    benches,
    bench_kind_detection,
    bench_validate_simple,
    bench_validate_medium
);
criterion_main!(benches);
