use criterion::{criterion_group, criterion_main, Criterion};
use tidycast_core::tokenizer::tokenize;
use tidycast_core::{cast_dtm, tidy, CastOptions, Triplet};

fn synthetic_table(docs: usize, terms: usize) -> Vec<Triplet> {
    let mut rows = Vec::new();
    for d in 0..docs {
        for t in (d % 7..terms).step_by(7) {
            rows.push(Triplet::new(format!("doc{d}"), format!("term{t}"), ((d * t) % 5 + 1) as f64));
        }
    }
    rows
}

fn bench_cast(c: &mut Criterion) {
    let rows = synthetic_table(2_000, 5_000);
    let opts = CastOptions::default();
    c.bench_function("cast_2000x5000", |b| b.iter(|| cast_dtm(rows.clone(), &opts).unwrap()));

    let dtm = cast_dtm(rows, &opts).unwrap();
    c.bench_function("tidy_2000x5000", |b| b.iter(|| tidy(&dtm)));
}

fn bench_tokenize(c: &mut Criterion) {
    let text = "Running runners run past the cafe while markets rally and investors worry. ".repeat(200);
    c.bench_function("tokenize_paragraphs", |b| b.iter(|| tokenize(&text)));
}

criterion_group!(benches, bench_cast, bench_tokenize);
criterion_main!(benches);
