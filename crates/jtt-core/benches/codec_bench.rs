//! Criterion benchmarks for the JT/T 808 frame, header and packet codec.
//!
//! Run with:
//! ```bash
//! cargo bench --package jtt-core --bench codec_bench
//! ```

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use jtt_core::protocol::frame::{escape, unescape};
use jtt_core::protocol::{
    decode_packet, encode_packet, encode_segmented, MsgHeader, MsgId, ProtocolVersion, SegmentInfo,
    SerialNumberCounter,
};

// ── Fixtures ──────────────────────────────────────────────────────────────────

fn make_header_2013() -> MsgHeader {
    MsgHeader::new(MsgId::LOCATION_REPORT, "13800138000", 42)
}

fn make_header_2019() -> MsgHeader {
    MsgHeader::new(MsgId::LOCATION_REPORT, "13800138000", 42).with_version(ProtocolVersion::V2019, 1)
}

fn make_header_segmented() -> MsgHeader {
    MsgHeader::new(MsgId::MULTIMEDIA_UPLOAD, "13800138000", 42).with_segment(Some(SegmentInfo::new(8, 3)))
}

/// A location-report sized body with a sprinkling of bytes that need escaping.
fn make_body(len: usize) -> Vec<u8> {
    (0..len)
        .map(|i| match i % 64 {
            7 => 0x7E,
            19 => 0x7D,
            _ => (i % 251) as u8,
        })
        .collect()
}

// ── Benchmark groups ──────────────────────────────────────────────────────────

/// Benchmarks escaping and unescaping for typical body sizes.
fn bench_frame(c: &mut Criterion) {
    let mut group = c.benchmark_group("frame");
    for len in [28usize, 256, 1023] {
        let body = make_body(len);
        let framed = escape(&body);
        group.bench_with_input(BenchmarkId::new("escape", len), &body, |b, body| {
            b.iter(|| escape(black_box(body)))
        });
        group.bench_with_input(BenchmarkId::new("unescape", len), &framed, |b, framed| {
            b.iter(|| unescape(black_box(framed)))
        });
    }
    group.finish();
}

/// Benchmarks header encode and decode for each layout.
fn bench_header(c: &mut Criterion) {
    let headers: &[(&str, MsgHeader)] = &[
        ("2013", make_header_2013()),
        ("2019", make_header_2019()),
        ("segmented", make_header_segmented()),
    ];

    let mut group = c.benchmark_group("header");
    for (name, header) in headers {
        group.bench_with_input(BenchmarkId::new("encode", name), header, |b, header| {
            b.iter(|| black_box(header).encode().expect("encode must succeed"))
        });
        let bytes = header.encode().expect("encode must succeed for benchmark setup");
        group.bench_with_input(BenchmarkId::new("decode", name), &bytes, |b, bytes| {
            b.iter(|| MsgHeader::decode(black_box(bytes)).expect("decode must succeed"))
        });
    }
    group.finish();
}

/// Benchmarks a full packet encode+decode round-trip, the per-frame hot path.
fn bench_packet_roundtrip(c: &mut Criterion) {
    let mut group = c.benchmark_group("packet_roundtrip");

    let header = make_header_2013();
    let body = make_body(28);
    group.bench_function("location_2013", |b| {
        b.iter(|| {
            let frame = encode_packet(black_box(&header), black_box(&body)).unwrap();
            decode_packet(black_box(&frame)).unwrap()
        })
    });

    let header = make_header_2019();
    let body = make_body(1023);
    group.bench_function("max_body_2019", |b| {
        b.iter(|| {
            let frame = encode_packet(black_box(&header), black_box(&body)).unwrap();
            decode_packet(black_box(&frame)).unwrap()
        })
    });

    group.finish();
}

/// Benchmarks splitting a multimedia-sized body into segmented frames.
fn bench_segmented_encode(c: &mut Criterion) {
    let serials = SerialNumberCounter::new();
    let header = make_header_2013();
    let body = make_body(64 * 1024);

    c.bench_function("encode_segmented_64k", |b| {
        b.iter(|| encode_segmented(black_box(&header), black_box(&body), 1000, &serials).unwrap())
    });
}

criterion_group!(
    benches,
    bench_frame,
    bench_header,
    bench_packet_roundtrip,
    bench_segmented_encode
);
criterion_main!(benches);
