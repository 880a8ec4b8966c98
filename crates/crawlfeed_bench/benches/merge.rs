//! Change merge benchmarks.

use crawlfeed_bench::utils::sorted_batch;
use crawlfeed_core::{
    ChangeKind, Checkpoint, Collation, DocumentList, DocumentSequence,
};
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};

/// Drain a list, counting emitted events.
fn drain(mut list: DocumentList) -> usize {
    let mut emitted = 0;
    loop {
        match list.next_document() {
            Ok(Some(_)) => emitted += 1,
            Ok(None) => return emitted,
            Err(e) if e.is_skipped() || e.is_per_item() => {}
            Err(e) => panic!("merge failed: {e}"),
        }
    }
}

/// Benchmark building and draining a three-stream merge.
fn bench_merge(c: &mut Criterion) {
    let mut group = c.benchmark_group("merge");

    for collation in [Collation::Lexical, Collation::MsSql] {
        for size in [100, 1_000, 10_000] {
            let adds = sorted_batch(ChangeKind::Add, size, collation);
            let deletes = sorted_batch(ChangeKind::DeletionEvent, size / 4, collation);
            let custom = sorted_batch(ChangeKind::CustomDelete, size / 4, collation);

            group.throughput(Throughput::Elements((size + size / 2) as u64));
            group.bench_with_input(
                BenchmarkId::new(collation.name(), size),
                &(adds, deletes, custom),
                |b, (adds, deletes, custom)| {
                    b.iter(|| {
                        let list = DocumentList::build(
                            adds.clone(),
                            deletes.clone(),
                            Some(custom.clone()),
                            Checkpoint::new(),
                            collation,
                        )
                        .unwrap();
                        black_box(drain(list));
                    });
                },
            );
        }
    }

    group.finish();
}

/// Benchmark checkpoint serialization after every event.
fn bench_checkpoint(c: &mut Criterion) {
    let mut group = c.benchmark_group("checkpoint");

    let adds = sorted_batch(ChangeKind::Add, 1_000, Collation::MsSql);
    group.throughput(Throughput::Elements(1_000));
    group.bench_function("serialize_per_event", |b| {
        b.iter(|| {
            let mut list = DocumentList::build(
                adds.clone(),
                Vec::new(),
                None,
                Checkpoint::new(),
                Collation::MsSql,
            )
            .unwrap();
            while let Ok(Some(_)) = list.next_document() {
                black_box(list.checkpoint());
            }
        });
    });

    let serialized = {
        let mut list =
            DocumentList::build(adds, Vec::new(), None, Checkpoint::new(), Collation::MsSql)
                .unwrap();
        while let Ok(Some(_)) = list.next_document() {}
        list.checkpoint()
    };
    group.bench_function("parse", |b| {
        b.iter(|| black_box(Checkpoint::parse(black_box(&serialized)).unwrap()));
    });

    group.finish();
}

criterion_group!(benches, bench_merge, bench_checkpoint);
criterion_main!(benches);
