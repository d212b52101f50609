//! Chunker benchmark over a synthetic document.
//! Run: cargo bench

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use textreel::chunker::chunk;
use textreel::fonts::CellEstimate;
use textreel::settings::RenderSettings;

fn bench_chunk(c: &mut Criterion) {
    let settings = RenderSettings::default();
    let measure = CellEstimate::new(settings.font_size);
    let paragraph = "the quick brown fox jumps over the lazy dog ".repeat(60);
    let document = vec![paragraph; 12].join("\n\n");

    let mut group = c.benchmark_group("chunk_text");
    group.sample_size(50);

    group.bench_function("twelve_paragraphs_1080p", |b| {
        b.iter(|| black_box(chunk(black_box(&document), &settings, &measure)));
    });

    group.finish();
}

criterion_group!(benches, bench_chunk);
criterion_main!(benches);
