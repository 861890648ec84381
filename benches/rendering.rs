//! Benchmarks for SVG generation and rasterization.

use criterion::{Criterion, black_box, criterion_group, criterion_main};
use mermaid_dash::render::raster::rasterize_svg;
use mermaid_dash::render::{MermaidRenderer, Renderer};
use tokio::runtime::Runtime;

fn runtime() -> Runtime {
    tokio::runtime::Builder::new_current_thread()
        .build()
        .expect("failed to build runtime")
}

fn bench_render_svg(c: &mut Criterion) {
    let rt = runtime();
    let renderer = MermaidRenderer::new();
    let source = include_str!("../tests/fixtures/checkout.mmd");
    c.bench_function("render_svg", |b| {
        b.iter(|| {
            rt.block_on(renderer.render(black_box("mermaid-bench"), black_box(source)))
                .unwrap()
        })
    });
}

fn bench_rasterize(c: &mut Criterion) {
    let source = include_str!("../tests/fixtures/checkout.mmd");
    let artifact = runtime()
        .block_on(MermaidRenderer::new().render("mermaid-bench", source))
        .unwrap();
    c.bench_function("rasterize_preview", |b| {
        b.iter(|| rasterize_svg(black_box(&artifact.svg), black_box(120)).unwrap())
    });
}

criterion_group!(benches, bench_render_svg, bench_rasterize);
criterion_main!(benches);
