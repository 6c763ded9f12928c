//! Basic benchmarks for the `chunk_pool` crate.
#![allow(
    missing_docs,
    reason = "No need for API documentation in benchmark code"
)]

use std::hint::black_box;
use std::iter;
use std::time::Instant;

use alloc_tracker::Allocator;
use chunk_pool::ChunkPool;
use criterion::{Criterion, criterion_group, criterion_main};
use new_zealand::nz;

criterion_group!(benches, entrypoint);
criterion_main!(benches);

#[global_allocator]
static ALLOCATOR: Allocator<std::alloc::System> = Allocator::system();

type TestItem = usize;

fn entrypoint(c: &mut Criterion) {
    let allocs = alloc_tracker::Session::new();

    let mut group = c.benchmark_group("chunk_basic");

    let allocs_op = allocs.operation("build_empty");
    group.bench_function("build_empty", |b| {
        b.iter_custom(|iters| {
            let _span = allocs_op.measure_thread().iterations(iters);

            let start = Instant::now();

            for _ in 0..iters {
                drop(black_box(ChunkPool::<TestItem>::with_capacity(nz!(128))));
            }

            start.elapsed()
        });
    });

    let allocs_op = allocs.operation("allocate_one");
    group.bench_function("allocate_one", |b| {
        b.iter_custom(|iters| {
            let mut pools = iter::repeat_with(|| ChunkPool::<TestItem>::with_capacity(nz!(1)))
                .take(usize::try_from(iters).unwrap())
                .collect::<Vec<_>>();

            let _span = allocs_op.measure_thread().iterations(iters);

            let start = Instant::now();

            for pool in &mut pools {
                _ = black_box(pool.allocate());
            }

            start.elapsed()
        });
    });

    // Issue and return a slot repeatedly; after warmup this is the hot path of a
    // pool-backed allocator and must not touch the heap at all.
    let allocs_op = allocs.operation("allocate_release_cycle");
    group.bench_function("allocate_release_cycle", |b| {
        b.iter_custom(|iters| {
            let mut pool = ChunkPool::<TestItem>::with_capacity(nz!(128));

            let _span = allocs_op.measure_thread().iterations(iters);

            let start = Instant::now();

            for _ in 0..iters {
                let slot = pool.allocate().expect("pool cycles back to empty each iteration");
                pool.deallocate(black_box(slot));
            }

            start.elapsed()
        });
    });

    let allocs_op = allocs.operation("fill_and_drain_128");
    group.bench_function("fill_and_drain_128", |b| {
        b.iter_custom(|iters| {
            let mut pool = ChunkPool::<TestItem>::with_capacity(nz!(128));
            let mut slots = Vec::with_capacity(128);

            let _span = allocs_op.measure_thread().iterations(iters);

            let start = Instant::now();

            for _ in 0..iters {
                while let Some(slot) = pool.allocate() {
                    slots.push(slot);
                }

                for slot in slots.drain(..).rev() {
                    pool.deallocate(slot);
                }
            }

            start.elapsed()
        });
    });

    group.finish();

    allocs.print_to_stdout();
}
