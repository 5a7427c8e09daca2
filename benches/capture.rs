// Copyright 2026 Layne Penney
// SPDX-License-Identifier: AGPL-3.0-or-later

//! Benchmarks for the capture hot paths.
//!
//! Run with: `cargo bench --bench capture`

use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use std::hint::black_box;
use std::io::{Cursor, Read};
use std::sync::Arc;

use bodytrace::capture::{
    AttributeValue, BodyDescriptor, BoundedBuffer, CaptureEngine, CaptureReader, ContentGate,
    IoHandle, IoKind, Progress, TraceSpan,
};
use bodytrace::config::CaptureConfig;

struct NoopSpan;

impl TraceSpan for NoopSpan {
    fn is_recording(&self) -> bool {
        true
    }

    fn set_attribute(&self, _key: &'static str, _value: AttributeValue) {}

    fn start_child(&self) -> Arc<dyn TraceSpan> {
        Arc::new(NoopSpan)
    }

    fn end(&self) {}
}

/// Benchmark content type matching.
fn bench_content_gate(c: &mut Criterion) {
    let gate = ContentGate::default();
    let mut group = c.benchmark_group("content_gate");

    for content_type in [
        "application/json",
        "application/vnd.api+json; charset=utf-8",
        "application/octet-stream",
    ] {
        group.bench_with_input(
            BenchmarkId::new("should_capture", content_type),
            content_type,
            |b, ct| b.iter(|| gate.should_capture(black_box(Some(ct)))),
        );
    }

    group.finish();
}

/// Benchmark buffer writes at different chunk sizes.
fn bench_buffer_writes(c: &mut Criterion) {
    let body = vec![b'x'; 64 * 1024];
    let mut group = c.benchmark_group("buffer_writes");
    group.throughput(Throughput::Bytes(body.len() as u64));

    for chunk in [1usize, 64, 8192] {
        group.bench_with_input(BenchmarkId::new("write_bytes", chunk), &chunk, |b, &chunk| {
            b.iter(|| {
                let buffer = BoundedBuffer::bytes(body.len());
                for part in body.chunks(chunk) {
                    buffer.write_bytes(black_box(part));
                }
                buffer.len()
            });
        });
    }

    group.finish();
}

/// Benchmark the progress path through the engine, including registry lookup.
fn bench_engine_progress(c: &mut Criterion) {
    let engine = CaptureEngine::new(CaptureConfig::default()).unwrap();
    let mut group = c.benchmark_group("engine");

    group.bench_function("on_progress_unassociated", |b| {
        let io = IoHandle::new(IoKind::ByteStream);
        b.iter(|| engine.on_progress(black_box(&io), Progress::Bytes(b"{}")));
    });

    group.bench_function("on_progress_associated", |b| {
        let io = IoHandle::new(IoKind::ByteStream);
        let ctx = engine
            .create_context(Arc::new(NoopSpan), BodyDescriptor::request(Some("application/json"), None))
            .unwrap();
        engine.associate(&io, ctx);
        b.iter(|| engine.on_progress(black_box(&io), Progress::Bytes(b"{}")));
    });

    group.finish();
}

/// Benchmark a full request body read through the blocking wrapper.
fn bench_reader(c: &mut Criterion) {
    let engine = Arc::new(CaptureEngine::new(CaptureConfig::default()).unwrap());
    let body = br#"{"user":{"id":42,"name":"ferris","tags":["crab","rust"]}}"#.repeat(64);
    let mut group = c.benchmark_group("reader");
    group.throughput(Throughput::Bytes(body.len() as u64));

    group.bench_function("read_to_end_captured", |b| {
        b.iter(|| {
            let ctx = engine.create_context(
                Arc::new(NoopSpan),
                BodyDescriptor::request(Some("application/json"), Some(body.len() as i64)),
            );
            let mut reader = CaptureReader::new(Cursor::new(body.as_slice()), Arc::clone(&engine), ctx);
            let mut out = Vec::with_capacity(body.len());
            reader.read_to_end(&mut out).unwrap();
            out.len()
        });
    });

    group.bench_function("read_to_end_passthrough", |b| {
        b.iter(|| {
            let mut reader = CaptureReader::new(Cursor::new(body.as_slice()), Arc::clone(&engine), None);
            let mut out = Vec::with_capacity(body.len());
            reader.read_to_end(&mut out).unwrap();
            out.len()
        });
    });

    group.finish();
}

criterion_group!(
    benches,
    bench_content_gate,
    bench_buffer_writes,
    bench_engine_progress,
    bench_reader,
);
criterion_main!(benches);
