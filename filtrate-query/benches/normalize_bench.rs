//! Benchmarks for transit decoding and clause normalization.
//!
//! Run with: `cargo bench --package filtrate-query --bench normalize_bench`

use criterion::{BenchmarkId, Criterion, Throughput, criterion_group, criterion_main};
use filtrate_query::prelude::*;
use filtrate_query::{normalize_clause, transit};
use std::hint::black_box;
use std::sync::Arc;
use tokio::runtime::Runtime;

fn create_runtime() -> Runtime {
    tokio::runtime::Builder::new_multi_thread()
        .worker_threads(4)
        .enable_all()
        .build()
        .unwrap()
}

fn options() -> FilterOptions {
    FilterOptions::new()
        .allow("$gte")
        .allow("$lt")
        .allow("$in")
        .interceptor("first", |value, _| {
            Ok(value.as_str().map(str::to_lowercase).map(Value::from).unwrap_or(value))
        })
}

/// An `$or` of `branches` clauses, each with three fields.
fn create_or_clause(branches: usize) -> Value {
    let items = (0..branches)
        .map(|i| {
            Value::map([
                ("first", Value::from(format!("Name{}", i))),
                ("age", Value::map([("$gte", i as i64), ("$lt", i as i64 + 10)])),
                ("tags", Value::map([("$in", Value::from(vec!["a", "b", "c"]))])),
            ])
        })
        .collect();
    Value::map([("$or", Value::List(items))])
}

// ============================================================================
// Codec Benchmarks
// ============================================================================

fn bench_transit(c: &mut Criterion) {
    let mut group = c.benchmark_group("transit");

    for branches in [1, 10, 100].iter() {
        let clause = create_or_clause(*branches);
        let encoded = transit::encode(&clause);
        group.throughput(Throughput::Bytes(encoded.len() as u64));

        group.bench_with_input(BenchmarkId::new("decode", branches), &encoded, |b, encoded| {
            b.iter(|| black_box(transit::decode(black_box(encoded)).unwrap()))
        });
        group.bench_with_input(BenchmarkId::new("encode", branches), &clause, |b, clause| {
            b.iter(|| black_box(transit::encode(black_box(clause))))
        });
    }

    group.finish();
}

// ============================================================================
// Normalization Benchmarks
// ============================================================================

fn bench_normalize(c: &mut Criterion) {
    let rt = create_runtime();
    let policy = Arc::new(options().validate().unwrap());
    let mut group = c.benchmark_group("normalize_clause");

    for branches in [1, 10, 100].iter() {
        let clause = create_or_clause(*branches);
        group.throughput(Throughput::Elements(*branches as u64));

        group.bench_with_input(BenchmarkId::from_parameter(branches), &clause, |b, clause| {
            b.to_async(&rt).iter(|| async {
                black_box(normalize_clause(clause, &policy, 1).await.unwrap());
            });
        });
    }

    group.finish();
}

fn bench_parse_filter(c: &mut Criterion) {
    let rt = create_runtime();
    let options = options();
    let query = RequestQuery::new().with_filter(transit::encode(&create_or_clause(10)));

    c.bench_function("parse_filter_10_branches", |b| {
        b.to_async(&rt).iter(|| async {
            black_box(parse_filter(&query, &options).await.unwrap());
        });
    });
}

criterion_group!(benches, bench_transit, bench_normalize, bench_parse_filter);
criterion_main!(benches);
