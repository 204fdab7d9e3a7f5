//! Performance benchmarks for the airtime calculator.
//!
//! The duty-cycle pacer calls [`uplink_airtime`] before every uplink, so
//! its cost should stay negligible next to the serial round trip it
//! schedules.
//!
//! Run benchmarks with:
//! ```sh
//! cargo bench --bench airtime_bench
//! ```

use asr650x_core::airtime::{airtime, uplink_airtime};
use criterion::{BenchmarkId, Criterion, Throughput, criterion_group, criterion_main};
use std::hint::black_box;

/// Benchmark one airtime computation per spreading factor.
fn bench_airtime_by_spreading_factor(c: &mut Criterion) {
    let mut group = c.benchmark_group("airtime_by_sf");
    group.throughput(Throughput::Elements(1));

    for sf in 7u8..=12 {
        group.bench_with_input(BenchmarkId::from_parameter(format!("sf{sf}")), &sf, |b, &sf| {
            b.iter(|| black_box(uplink_airtime(black_box(12), sf, 125_000.0)));
        });
    }

    group.finish();
}

/// Benchmark airtime across payload sizes at a fixed data rate.
fn bench_airtime_by_payload(c: &mut Criterion) {
    let mut group = c.benchmark_group("airtime_by_payload");
    group.throughput(Throughput::Elements(1));

    for payload_len in [4usize, 51, 115, 222].iter() {
        group.bench_with_input(
            BenchmarkId::from_parameter(payload_len),
            payload_len,
            |b, &len| {
                b.iter(|| black_box(uplink_airtime(black_box(len), 9, 125_000.0)));
            },
        );
    }

    group.finish();
}

/// Benchmark the raw formula with every parameter supplied.
fn bench_raw_formula(c: &mut Criterion) {
    let mut group = c.benchmark_group("raw_formula");
    group.throughput(Throughput::Elements(1));

    group.bench_function("explicit_parameters", |b| {
        b.iter(|| {
            black_box(airtime(
                black_box(17),
                black_box(12),
                black_box(125_000.0),
                1,
                8,
                true,
                true,
            ))
        });
    });

    group.finish();
}

/// Benchmark a duty-cycle planning pass over a day of uplinks.
fn bench_duty_cycle_plan(c: &mut Criterion) {
    let mut group = c.benchmark_group("duty_cycle_plan");

    // One uplink every 10 minutes for 24 hours.
    let uplinks = 144usize;
    group.throughput(Throughput::Elements(uplinks as u64));

    group.bench_function("sum_144_uplinks", |b| {
        b.iter(|| {
            let total: f64 = (0..uplinks)
                .map(|i| uplink_airtime(black_box(4 + i % 40), 9, 125_000.0))
                .sum();
            black_box(total);
        });
    });

    group.finish();
}

criterion_group!(
    benches,
    bench_airtime_by_spreading_factor,
    bench_airtime_by_payload,
    bench_raw_formula,
    bench_duty_cycle_plan,
);

criterion_main!(benches);
