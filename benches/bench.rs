use std::hint::black_box;
use std::sync::Arc;

use criterion::{BenchmarkId, Criterion, Throughput, criterion_group, criterion_main};
use lotus::{CacheSetting, Engine, IndexConfig, Registry, TokenizeMode};

const WORDS: [&str; 16] = [
    "river", "stone", "harbor", "lantern", "meadow", "copper", "thunder", "violet", "canyon",
    "orchard", "ember", "glacier", "willow", "falcon", "summit", "marble",
];

fn generate_documents(count: usize) -> Vec<(i64, String)> {
    (0..count)
        .map(|i| {
            let text = (0..8)
                .map(|j| WORDS[(i * 7 + j * 3 + i / 16) % WORDS.len()])
                .collect::<Vec<_>>()
                .join(" ");
            (i as i64, text)
        })
        .collect()
}

fn build_engine(mode: TokenizeMode, depth: usize, cache: CacheSetting) -> Engine {
    let config = IndexConfig::builder()
        .mode(mode)
        .depth(depth)
        .cache(cache)
        .build();
    Engine::new(config, Arc::new(Registry::new())).unwrap()
}

fn bench_add(c: &mut Criterion) {
    let mut group = c.benchmark_group("Add");
    group.sample_size(10);
    let documents = generate_documents(1000);
    group.throughput(Throughput::Elements(documents.len() as u64));

    let modes = [
        ("strict", TokenizeMode::Strict, 0),
        ("strict-context", TokenizeMode::Strict, 2),
        ("forward", TokenizeMode::Forward, 0),
        ("full", TokenizeMode::Full, 0),
    ];
    for (name, mode, depth) in modes {
        group.bench_with_input(BenchmarkId::from_parameter(name), &mode, |b, mode| {
            b.iter(|| {
                let mut engine = build_engine(mode.clone(), depth, CacheSetting::Disabled);
                for (id, text) in &documents {
                    engine.add(*id, text).unwrap();
                }
                black_box(engine.len())
            })
        });
    }
    group.finish();
}

fn bench_search(c: &mut Criterion) {
    let mut group = c.benchmark_group("Search");
    let documents = generate_documents(5000);
    let queries = ["river", "lantern meadow", "thunder violet canyon", "falc"];

    let setups = [
        ("strict", TokenizeMode::Strict, 0, CacheSetting::Disabled),
        ("context", TokenizeMode::Strict, 2, CacheSetting::Disabled),
        ("forward", TokenizeMode::Forward, 0, CacheSetting::Disabled),
        ("cached", TokenizeMode::Forward, 0, CacheSetting::Capacity(64)),
    ];
    for (name, mode, depth, cache) in setups {
        let mut engine = build_engine(mode, depth, cache);
        for (id, text) in &documents {
            engine.add(*id, text).unwrap();
        }

        group.bench_function(BenchmarkId::from_parameter(name), |b| {
            b.iter(|| {
                for query in queries {
                    black_box(engine.search(query).unwrap());
                }
            })
        });
    }
    group.finish();
}

criterion_group!(benches, bench_add, bench_search);
criterion_main!(benches);
