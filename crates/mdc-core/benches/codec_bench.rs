//! Criterion benchmarks for the MDC frame codec.
//!
//! Run with:
//! ```bash
//! cargo bench --package mdc-core --bench codec_bench
//! ```

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use mdc_core::protocol::codec::{decode_frame, encode_frame};
use mdc_core::CommandCode;

// ── Frame fixtures ────────────────────────────────────────────────────────────

fn fixtures() -> Vec<(&'static str, CommandCode, Vec<u8>)> {
    vec![
        ("temperature_query", CommandCode::CURRENT_TEMP, Vec::new()),
        ("power_on", CommandCode::POWER, vec![0x01]),
        ("video_wall", CommandCode::VIDEO_WALL_MODE, vec![1, 3, 3, 2, 2]),
        ("serial_reply", CommandCode::SERIAL_NUMBER, b"0K3N3CAM600123X  ".to_vec()),
        ("max_payload", CommandCode::OSD_DISPLAY, vec![0xA5; 255]),
    ]
}

fn bench_encode(c: &mut Criterion) {
    let mut group = c.benchmark_group("encode_frame");
    for (name, command, payload) in fixtures() {
        group.bench_with_input(BenchmarkId::from_parameter(name), &payload, |b, payload| {
            b.iter(|| encode_frame(black_box(1), black_box(command), black_box(payload)))
        });
    }
    group.finish();
}

fn bench_decode(c: &mut Criterion) {
    let mut group = c.benchmark_group("decode_frame");
    for (name, command, payload) in fixtures() {
        let bytes = encode_frame(1, command, &payload).expect("fixture must encode");
        group.bench_with_input(BenchmarkId::from_parameter(name), &bytes, |b, bytes| {
            b.iter(|| decode_frame(black_box(bytes), black_box(1)))
        });
    }
    group.finish();
}

criterion_group!(benches, bench_encode, bench_decode);
criterion_main!(benches);
