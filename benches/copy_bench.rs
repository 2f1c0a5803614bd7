#![allow(missing_docs)]

use criterion::{BenchmarkId, Criterion, Throughput, criterion_group, criterion_main};
use std::collections::HashMap;
use std::hint::black_box;
use transcopy::{CopyEngine, CopyOptions, Reflect};

#[derive(Reflect, Clone, Debug)]
struct Order {
    id: u64,
    customer: String,
    quantities: Vec<i32>,
    notes: HashMap<String, String>,
    discount: Option<f32>,
    a: i32,
    b: i32,
    c: i32,
    d: i32,
    e: i32,
    f: i32,
    g: i32,
}

#[derive(Reflect, Clone, Debug)]
struct OrderView {
    #[transcopy(alias = "id")]
    order_id: u64,
    customer: String,
    quantities: Vec<i64>,
    notes: HashMap<String, String>,
    discount: Option<f64>,
    a: i64,
    b: i64,
    c: i64,
    d: i64,
    e: i64,
    f: i64,
    g: i64,
}

fn order(i: usize) -> Order {
    let n = i as i32;
    Order {
        id: i as u64,
        customer: format!("customer-{i}"),
        quantities: (0..64).collect(),
        notes: (0..8).map(|k| (format!("k{k}"), format!("note {k}"))).collect(),
        discount: (i % 2 == 0).then_some(0.5),
        a: n,
        b: n + 1,
        c: n + 2,
        d: n + 3,
        e: n + 4,
        f: n + 5,
        g: n + 6,
    }
}

// --- BENCHMARKS ---

fn bench_copies(c: &mut Criterion) {
    let orders: Vec<Order> = (0..1_000).map(order).collect();

    let mut group = c.benchmark_group("Copy");
    group.throughput(Throughput::Elements(orders.len() as u64));

    for (label, options) in [
        ("parallel", CopyOptions::default().with_parallel_threshold(4)),
        ("sequential", CopyOptions::default().sequential()),
    ] {
        let engine = CopyEngine::builder().options(options).build();

        group.bench_with_input(BenchmarkId::new("same_type", label), &orders, |b, orders| {
            b.iter(|| {
                engine
                    .copy_typed_all(black_box(orders))
                    .expect("copy failed")
            });
        });

        group.bench_with_input(BenchmarkId::new("convert", label), &orders, |b, orders| {
            b.iter(|| {
                engine
                    .copy_typed_all_as::<Order, OrderView>(black_box(orders))
                    .expect("conversion failed")
            });
        });
    }
    group.finish();
}

fn bench_cold_cache(c: &mut Criterion) {
    let sample = order(1);
    c.bench_function("convert_cold_cache", |b| {
        b.iter(|| {
            let engine = CopyEngine::new();
            engine
                .copy_typed_as::<Order, OrderView>(black_box(&sample))
                .expect("conversion failed")
        });
    });
}

criterion_group!(benches, bench_copies, bench_cold_cache);
criterion_main!(benches);
