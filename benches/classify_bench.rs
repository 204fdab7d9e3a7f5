//! Performance benchmarks for response-line classification.
//!
//! Classification runs once per received line inside the driver's read
//! loop, so these benchmarks track its per-line cost across the shapes
//! the module actually emits.
//!
//! Run benchmarks with:
//! ```sh
//! cargo bench --bench classify_bench
//! ```

use asr650x_protocol::{ResponseParser, format_uplink, inquiry_value};
use criterion::{BenchmarkId, Criterion, Throughput, criterion_group, criterion_main};
use std::hint::black_box;

/// One line of each classification outcome.
const LINE_SHAPES: &[(&str, &str)] = &[
    ("ok", "OK"),
    ("inquiry_value", "+CSTATUS:04"),
    ("join_outcome", "+CJOIN:OK"),
    ("send_progress", "OK+SEND:14"),
    ("downlink", "OK+RECV:1,5,3,AABBCC"),
    ("cme_error", "+CME ERROR:1"),
    ("command_echo", "AT+CSTATUS?"),
    ("console_prompt", "ASR6501:~#"),
];

/// Benchmark classifying each line shape individually.
fn bench_classify_shapes(c: &mut Criterion) {
    let mut group = c.benchmark_group("classify_shapes");
    group.throughput(Throughput::Elements(1));

    for (name, line) in LINE_SHAPES {
        group.bench_with_input(BenchmarkId::from_parameter(name), line, |b, line| {
            b.iter(|| black_box(ResponseParser::classify(black_box(line))));
        });
    }

    group.finish();
}

/// Benchmark classifying a downlink with the largest possible payload.
fn bench_classify_max_downlink(c: &mut Criterion) {
    let mut group = c.benchmark_group("classify_max_downlink");

    let payload = "AB".repeat(222);
    let line = format!("OK+RECV:0,5,222,{payload}");
    group.throughput(Throughput::Bytes(line.len() as u64));

    group.bench_function("classify_222_byte_downlink", |b| {
        b.iter(|| black_box(ResponseParser::classify(black_box(&line))));
    });

    group.finish();
}

/// Benchmark a full read-loop pass over a mixed line sequence.
fn bench_classify_mixed_stream(c: &mut Criterion) {
    let mut group = c.benchmark_group("classify_mixed_stream");

    let lines: Vec<&str> = LINE_SHAPES
        .iter()
        .cycle()
        .take(1000)
        .map(|(_, line)| *line)
        .collect();
    group.throughput(Throughput::Elements(lines.len() as u64));

    group.bench_function("classify_1000_lines", |b| {
        b.iter(|| {
            for line in &lines {
                black_box(ResponseParser::classify(black_box(line)));
            }
        });
    });

    group.finish();
}

/// Benchmark extracting inquiry values.
fn bench_inquiry_value(c: &mut Criterion) {
    let mut group = c.benchmark_group("inquiry_value");
    group.throughput(Throughput::Elements(1));

    for line in ["+CSTATUS:04", "+CGMI=ASR", "+CRXP:0,3,869525000"] {
        group.bench_with_input(BenchmarkId::from_parameter(line), &line, |b, line| {
            b.iter(|| black_box(inquiry_value(black_box(line))));
        });
    }

    group.finish();
}

/// Benchmark building uplink command lines across payload sizes.
fn bench_format_uplink(c: &mut Criterion) {
    let mut group = c.benchmark_group("format_uplink");

    for payload_len in [4, 51, 222].iter() {
        group.throughput(Throughput::Bytes(*payload_len as u64));

        let payload = vec![0x5Au8; *payload_len];
        group.bench_with_input(
            BenchmarkId::from_parameter(payload_len),
            &payload,
            |b, payload| {
                b.iter(|| black_box(format_uplink(false, 1, black_box(payload))));
            },
        );
    }

    group.finish();
}

criterion_group!(
    benches,
    bench_classify_shapes,
    bench_classify_max_downlink,
    bench_classify_mixed_stream,
    bench_inquiry_value,
    bench_format_uplink,
);

criterion_main!(benches);
