use criterion::{BenchmarkId, Criterion, black_box, criterion_group, criterion_main};
use web2onenote_core::extract::extract_content;
use web2onenote_core::preprocess::{PreprocessConfig, preprocess_html};
use web2onenote_core::{Document, ExtractConfig, extract_article, normalize_body};

fn fixture(name: &str) -> String {
    std::fs::read_to_string(format!("{}/../../tests/fixtures/{}", env!("CARGO_MANIFEST_DIR"), name)).unwrap()
}

fn bench_parse(c: &mut Criterion) {
    let small = fixture("body_only.html");
    let medium = fixture("article.html");
    let large = medium.repeat(20);

    let mut group = c.benchmark_group("parse");

    group.bench_with_input(BenchmarkId::new("small", "status"), &small, |b, html| {
        b.iter(|| Document::parse(black_box(html)))
    });

    group.bench_with_input(BenchmarkId::new("medium", "article"), &medium, |b, html| {
        b.iter(|| Document::parse(black_box(html)))
    });

    group.bench_with_input(BenchmarkId::new("large", "article x20"), &large, |b, html| {
        b.iter(|| Document::parse(black_box(html)))
    });

    group.finish();
}

fn bench_full_extraction(c: &mut Criterion) {
    let html = fixture("article.html");

    c.bench_function("full_extraction", |b| {
        b.iter(|| extract_article(black_box(&html), "https://blog.example.com/ownership"))
    });
}

fn bench_normalize(c: &mut Criterion) {
    let envelope = serde_json::json!({ "contents": fixture("article.html") }).to_string();

    c.bench_function("normalize_envelope", |b| b.iter(|| normalize_body(black_box(&envelope))));
}

fn bench_preprocess(c: &mut Criterion) {
    let html = fixture("article.html");
    let config = PreprocessConfig::default();

    c.bench_function("preprocess", |b| b.iter(|| preprocess_html(black_box(&html), &config)));
}

fn bench_scoring(c: &mut Criterion) {
    let html = fixture("article.html");
    let preprocessed = preprocess_html(&html, &PreprocessConfig::default());
    let doc = Document::parse(&preprocessed);
    let config = ExtractConfig::default();

    c.bench_function("scoring_and_selection", |b| {
        b.iter(|| extract_content(black_box(&doc), black_box(&config)))
    });
}

criterion_group!(
    benches,
    bench_parse,
    bench_full_extraction,
    bench_normalize,
    bench_preprocess,
    bench_scoring
);
criterion_main!(benches);
