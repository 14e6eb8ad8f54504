//! Throughput benchmarks for Adler-32.
//!
//! Covers single-shot checksums across data sizes and the cost of feeding
//! the same data in small chunks or one byte at a time.

use criterion::{BenchmarkId, Criterion, Throughput, criterion_group, criterion_main};
use std::hint::black_box;
use zflate_core::checksum::Adler32;

/// Text-like data
fn text_like(size: usize) -> Vec<u8> {
    let text = b"The quick brown fox jumps over the lazy dog. ";
    text.iter().copied().cycle().take(size).collect()
}

/// Benchmark Adler-32 across different data sizes
fn bench_adler_sizes(c: &mut Criterion) {
    let mut group = c.benchmark_group("adler32_sizes");

    let sizes = [
        ("256B", 256),
        ("4KB", 4 * 1024),
        ("64KB", 64 * 1024),
        ("1MB", 1024 * 1024),
    ];

    for (size_name, size) in sizes {
        let data = text_like(size);

        group.throughput(Throughput::Bytes(size as u64));
        group.bench_with_input(BenchmarkId::from_parameter(size_name), &data, |b, data| {
            b.iter(|| black_box(Adler32::checksum(black_box(data))));
        });
    }

    group.finish();
}

/// Compare bulk, chunked and bytewise updates on 64 KB
fn bench_adler_incremental(c: &mut Criterion) {
    let mut group = c.benchmark_group("adler32_incremental");
    let data = text_like(64 * 1024);
    group.throughput(Throughput::Bytes(data.len() as u64));

    group.bench_function("bulk", |b| {
        b.iter(|| black_box(Adler32::checksum(black_box(&data))));
    });

    group.bench_function("chunks_of_512", |b| {
        b.iter(|| {
            let mut adler = Adler32::new();
            for chunk in data.chunks(512) {
                adler.update(black_box(chunk));
            }
            black_box(adler.value())
        });
    });

    group.bench_function("bytewise", |b| {
        b.iter(|| {
            let mut adler = Adler32::new();
            for &byte in &data {
                adler.update_byte(black_box(byte));
            }
            black_box(adler.value())
        });
    });

    group.finish();
}

criterion_group!(benches, bench_adler_sizes, bench_adler_incremental);
criterion_main!(benches);
