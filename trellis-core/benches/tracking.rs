//! Benchmarks for dependency tracking and flush throughput.

use criterion::{black_box, criterion_group, criterion_main, Criterion};

use trellis_core::{observe, run_ticks, watch, Value, WatchOptions};

fn bench_observe(c: &mut Criterion) {
    c.bench_function("observe_100_fields", |b| {
        b.iter(|| {
            let data = Value::map((0..100).map(|i| (format!("k{i}"), Value::Int(i))));
            black_box(observe(&data, false));
        })
    });
}

fn bench_tracked_read(c: &mut Criterion) {
    let data = Value::map([("a", Value::Int(1))]);
    observe(&data, false);
    let map = data.as_map().cloned().unwrap_or_default();

    let getter_map = map.clone();
    let _w = watch(
        &data,
        trellis_core::WatchSource::getter(move |_| getter_map.get("a")),
        |_, _| {},
        WatchOptions::default(),
    );

    c.bench_function("tracked_read", |b| b.iter(|| black_box(map.get("a"))));
}

fn bench_mutate_and_flush(c: &mut Criterion) {
    let data = Value::map([("count", Value::Int(0))]);
    observe(&data, false);
    let _w = watch(&data, "count", |_, _| {}, WatchOptions::default());
    let map = data.as_map().cloned().unwrap_or_default();

    c.bench_function("mutate_and_flush", |b| {
        let mut n = 0i64;
        b.iter(|| {
            n += 1;
            map.set("count", Value::Int(n));
            run_ticks();
        })
    });
}

criterion_group!(
    benches,
    bench_observe,
    bench_tracked_read,
    bench_mutate_and_flush
);
criterion_main!(benches);
