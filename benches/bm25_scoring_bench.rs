use std::collections::HashMap;

use codetrace::config::Settings;
use codetrace::search::LexicalIndex;
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};

fn sample_documents(count: usize) -> HashMap<String, String> {
    (0..count)
        .map(|i| {
            let content = format!(
                "def parse_config_{i}(path):\n    db = connect_database(path)\n    return db.load(path)\n"
            );
            (format!("file_{i}.py"), content)
        })
        .collect()
}

fn bench_build(c: &mut Criterion) {
    let rt = tokio::runtime::Runtime::new().unwrap();
    let settings = Settings::default().search;

    let mut group = c.benchmark_group("build");
    for size in &[50, 200, 1000] {
        group.bench_with_input(BenchmarkId::from_parameter(size), size, |b, &size| {
            b.iter(|| {
                rt.block_on(async {
                    let mut index = LexicalIndex::new(&settings);
                    index.build(black_box(sample_documents(size))).await.unwrap();
                });
            });
        });
    }
    group.finish();
}

fn bench_query(c: &mut Criterion) {
    let rt = tokio::runtime::Runtime::new().unwrap();
    let settings = Settings::default().search;
    let index = rt.block_on(async {
        let mut index = LexicalIndex::new(&settings);
        index.build(sample_documents(1000)).await.unwrap();
        index
    });

    c.bench_function("bm25_query", |b| {
        b.iter(|| {
            rt.block_on(async { index.query(black_box("parse config"), 10).await.unwrap() });
        });
    });
}

fn bench_smart_search(c: &mut Criterion) {
    let rt = tokio::runtime::Runtime::new().unwrap();
    let settings = Settings::default().search;
    let exact_match_boost = settings.exact_match_boost;
    let index = rt.block_on(async {
        let mut index = LexicalIndex::new(&settings);
        index.build(sample_documents(1000)).await.unwrap();
        index
    });

    c.bench_function("smart_search", |b| {
        b.iter(|| {
            rt.block_on(async { index.smart_search(black_box("parseConfig"), 10, exact_match_boost).await.unwrap() });
        });
    });
}

criterion_group!(benches, bench_build, bench_query, bench_smart_search);
criterion_main!(benches);
