//! Benchmarks for table profiling and loading throughput.

use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use std::hint::black_box;
use std::sync::Arc;
use std::time::Duration;
use term_prep::prelude::*;

const COLORS: [&str; 5] = ["red", "green", "blue", "cyan", "magenta"];

/// Mixed table: float, integer, categorical and free-text columns.
fn generate_table(rows: usize) -> String {
    let mut text = String::from("price,count,color,comment,label\n");
    for i in 0..rows {
        text.push_str(&format!(
            "{:.3},{},{},note {},{}\n",
            (i as f64 * 0.37).sin() * 100.0,
            i % 50,
            COLORS[i % COLORS.len()],
            i,
            if i % 3 == 0 { "yes" } else { "no" }
        ));
    }
    text
}

fn bench_profiling(c: &mut Criterion) {
    let mut group = c.benchmark_group("table_profiling");
    group.measurement_time(Duration::from_secs(8));

    for rows in [1_000, 10_000, 50_000] {
        let source = InMemorySource::new(generate_table(rows));
        let profiler = TableProfiler::default();
        group.throughput(Throughput::Elements(rows as u64));
        group.bench_with_input(BenchmarkId::new("two_pass", rows), &source, |b, source| {
            b.iter(|| profiler.profile(black_box(source)).unwrap());
        });
    }

    group.finish();
}

fn bench_loading(c: &mut Criterion) {
    let mut group = c.benchmark_group("table_loading");
    group.measurement_time(Duration::from_secs(8));

    let rows = 20_000;
    let source = InMemorySource::new(generate_table(rows));
    let report = ProfileReport::from(&TableProfiler::default().profile(&source).unwrap());
    let plain = LoadConfig::from_report(&report);
    let configs = vec![
        ("plain", plain.clone()),
        (
            "minmax_shuffle",
            LoadConfig {
                normalization: NormalizationMode::MinMax,
                shuffle: true,
                ..plain.clone()
            },
        ),
        (
            "oversample_split",
            LoadConfig {
                balancing: BalancingMode::Oversample,
                split: Some(term_prep::encoding::SplitBounds {
                    start: 0.0,
                    end: 80.0,
                }),
                ..plain
            },
        ),
    ];

    group.throughput(Throughput::Elements(rows as u64));
    for (name, config) in configs {
        let pipeline = PipelineConfig::default().with_shuffle_seed(42);
        group.bench_with_input(BenchmarkId::new("memory_sink", name), &config, |b, config| {
            b.iter(|| {
                let mut sink = MemorySink::new();
                load_table(
                    black_box(&source),
                    config,
                    &pipeline,
                    &mut sink,
                    Arc::new(CollectingDiagnostics::new()),
                )
                .unwrap()
            });
        });
    }

    group.finish();
}

criterion_group!(benches, bench_profiling, bench_loading);
criterion_main!(benches);
