//! Write/read throughput benchmarks

use criterion::{Criterion, Throughput, criterion_group, criterion_main};
use libarchive::{ArchiveReader, ArchiveWriter};
use std::hint::black_box;
use std::io::Read;
use tempfile::TempDir;

const PAYLOAD_SIZE: usize = 1024 * 1024;

/// Benchmark writing a single 1 MiB entry per format
fn bench_write(c: &mut Criterion) {
    let temp = TempDir::new().unwrap();
    let payload = vec![0xAAu8; PAYLOAD_SIZE];

    let mut group = c.benchmark_group("write_1m");
    group.throughput(Throughput::Bytes(PAYLOAD_SIZE as u64));

    for name in ["bench.tar", "bench.tar.gz", "bench.zip"] {
        let path = temp.path().join(name);
        group.bench_function(name, |b| {
            b.iter(|| {
                let mut writer = ArchiveWriter::create(&path).unwrap();
                writer.append_bytes("payload", black_box(&payload)).unwrap();
                writer.finish().unwrap();
            });
        });
    }
    group.finish();
}

/// Benchmark reading the entry back
fn bench_read(c: &mut Criterion) {
    let temp = TempDir::new().unwrap();
    let payload = vec![0xAAu8; PAYLOAD_SIZE];

    let mut group = c.benchmark_group("read_1m");
    group.throughput(Throughput::Bytes(PAYLOAD_SIZE as u64));

    for name in ["bench.tar", "bench.tar.gz", "bench.zip"] {
        let path = temp.path().join(name);
        let mut writer = ArchiveWriter::create(&path).unwrap();
        writer.append_bytes("payload", &payload).unwrap();
        writer.finish().unwrap();

        let mut buf = Vec::with_capacity(PAYLOAD_SIZE);
        group.bench_function(name, |b| {
            b.iter(|| {
                let mut reader = ArchiveReader::open(&path).unwrap();
                let mut entry = reader.next_entry().unwrap().unwrap();
                buf.clear();
                entry.read_to_end(&mut buf).unwrap();
                black_box(buf.len());
            });
        });
    }
    group.finish();
}

/// Benchmark header-only listing
fn bench_list(c: &mut Criterion) {
    let temp = TempDir::new().unwrap();
    let path = temp.path().join("many.tar");

    let mut writer = ArchiveWriter::create(&path).unwrap();
    for i in 0..1000 {
        writer
            .append_bytes(format!("dir/file_{:04}", i), b"x")
            .unwrap();
    }
    writer.finish().unwrap();

    c.bench_function("list_1000_entries", |b| {
        b.iter(|| {
            let count = ArchiveReader::open(&path).unwrap().entries().count();
            black_box(count);
        });
    });
}

criterion_group!(benches, bench_write, bench_read, bench_list);
criterion_main!(benches);
