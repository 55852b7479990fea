//! Criterion benchmark untuk pipeline viewer.
//!
//! Run dengan: cargo bench

use criterion::{black_box, criterion_group, criterion_main, Criterion, Throughput};

use demeter::core::{RawRecord, RecordQueue};
use demeter::protocol::{Assembler, AssemblyMode, LifeSample};
use demeter::render::TerminalRenderer;
use demeter::sim::CellMap;

fn bench_record_queue(c: &mut Criterion) {
    let mut group = c.benchmark_group("record_queue");
    group.throughput(Throughput::Elements(1));

    let mut map = CellMap::new(64, 64);
    map.randomize(0x5EED);
    let record = RawRecord::from_bytes(map.sample().as_bytes()).unwrap();

    group.bench_function("push_pop_cycle", |b| {
        let queue = RecordQueue::new();
        b.iter(|| {
            queue.push(black_box(record));
            let _ = queue.pop();
        });
    });

    group.finish();
}

fn bench_decode(c: &mut Criterion) {
    let mut group = c.benchmark_group("decode");
    group.throughput(Throughput::Bytes(4112));

    let mut map = CellMap::new(64, 64);
    map.randomize(0x5EED);
    let bytes = map.sample().as_bytes().to_vec();

    group.bench_function("life_sample", |b| {
        b.iter(|| LifeSample::decode(black_box(&bytes)).unwrap());
    });

    group.finish();
}

fn bench_assemble_render(c: &mut Criterion) {
    let mut group = c.benchmark_group("assemble_render");
    group.throughput(Throughput::Elements(1));

    let mut map = CellMap::new(64, 64);
    map.randomize(0x5EED);
    let single = map.sample().as_bytes().to_vec();
    let (first, second) = map.fragments();
    let first = first.as_bytes().to_vec();
    let second = second.as_bytes().to_vec();

    group.bench_function("single_record", |b| {
        let mut assembler = Assembler::new(AssemblyMode::SingleRecord);
        let mut renderer = TerminalRenderer::new();
        b.iter(|| {
            let snapshot = assembler.ingest(black_box(&single)).unwrap().unwrap();
            black_box(renderer.render(&snapshot).len())
        });
    });

    group.bench_function("two_record_fragments", |b| {
        let mut assembler = Assembler::new(AssemblyMode::TwoRecordFragments);
        let mut renderer = TerminalRenderer::new();
        b.iter(|| {
            assert!(assembler.ingest(black_box(&first)).unwrap().is_none());
            let snapshot = assembler.ingest(black_box(&second)).unwrap().unwrap();
            black_box(renderer.render(&snapshot).len())
        });
    });

    group.finish();
}

fn bench_next_generation(c: &mut Criterion) {
    let mut group = c.benchmark_group("cellmap");
    group.throughput(Throughput::Elements(64 * 64));

    group.bench_function("next_generation", |b| {
        let mut map = CellMap::new(64, 64);
        map.randomize(0x5EED);
        b.iter(|| {
            map.next_generation();
            black_box(map.generation())
        });
    });

    group.finish();
}

criterion_group!(
    benches,
    bench_record_queue,
    bench_decode,
    bench_assemble_render,
    bench_next_generation
);
criterion_main!(benches);
