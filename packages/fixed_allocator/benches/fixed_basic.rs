//! Basic benchmarks for the `fixed_allocator` crate.
#![allow(
    missing_docs,
    reason = "No need for API documentation in benchmark code"
)]

use std::hint::black_box;
use std::iter;
use std::time::Instant;

use alloc_tracker::Allocator;
use criterion::{Criterion, criterion_group, criterion_main};
use fixed_allocator::{FixedAllocator, NodeList, NodeMap};
use new_zealand::nz;

criterion_group!(benches, entrypoint);
criterion_main!(benches);

#[global_allocator]
static ALLOCATOR: Allocator<std::alloc::System> = Allocator::system();

const POOL_CAPACITY: usize = 128;

fn entrypoint(c: &mut Criterion) {
    let allocs = alloc_tracker::Session::new();

    let mut group = c.benchmark_group("fixed_basic");

    let allocs_op = allocs.operation("list_fill_128_heap");
    group.bench_function("list_fill_128_heap", |b| {
        b.iter_custom(|iters| {
            let _span = allocs_op.measure_thread().iterations(iters);

            let start = Instant::now();

            for _ in 0..iters {
                let mut list = NodeList::new();

                for value in 0..POOL_CAPACITY {
                    list.push_front(black_box(value))
                        .expect("heap allocation failed");
                }

                drop(black_box(list));
            }

            start.elapsed()
        });
    });

    let allocs_op = allocs.operation("list_fill_128_pool");
    group.bench_function("list_fill_128_pool", |b| {
        // The pool buffers are built outside the measured span; the fill itself
        // should show zero heap allocations per iteration.
        b.iter_custom(|iters| {
            let allocators = iter::repeat_with(|| FixedAllocator::<usize>::new(nz!(128)))
                .take(usize::try_from(iters).unwrap())
                .collect::<Vec<_>>();

            let mut lists = allocators
                .iter()
                .map(NodeList::with_allocator)
                .collect::<Vec<_>>();

            let _span = allocs_op.measure_thread().iterations(iters);

            let start = Instant::now();

            for list in &mut lists {
                for value in 0..POOL_CAPACITY {
                    list.push_front(black_box(value))
                        .expect("pool has a slot for each entry");
                }
            }

            start.elapsed()
        });
    });

    let allocs_op = allocs.operation("list_push_pop_cycle_pool");
    group.bench_function("list_push_pop_cycle_pool", |b| {
        b.iter_custom(|iters| {
            let allocator = FixedAllocator::<usize>::new(nz!(128));
            let mut list = NodeList::with_allocator(&allocator);

            let _span = allocs_op.measure_thread().iterations(iters);

            let start = Instant::now();

            for _ in 0..iters {
                list.push_front(black_box(42_usize))
                    .expect("pool has a free slot");

                _ = black_box(list.pop_front());
            }

            start.elapsed()
        });
    });

    let allocs_op = allocs.operation("map_fill_128_heap");
    group.bench_function("map_fill_128_heap", |b| {
        b.iter_custom(|iters| {
            let _span = allocs_op.measure_thread().iterations(iters);

            let start = Instant::now();

            for _ in 0..iters {
                let mut map = NodeMap::new();

                for key in 0..POOL_CAPACITY {
                    map.insert(black_box(key), black_box(key))
                        .expect("heap allocation failed");
                }

                drop(black_box(map));
            }

            start.elapsed()
        });
    });

    let allocs_op = allocs.operation("map_fill_128_pool");
    group.bench_function("map_fill_128_pool", |b| {
        b.iter_custom(|iters| {
            let allocators = iter::repeat_with(|| FixedAllocator::<(usize, usize)>::new(nz!(128)))
                .take(usize::try_from(iters).unwrap())
                .collect::<Vec<_>>();

            let mut maps = allocators
                .iter()
                .map(NodeMap::with_allocator)
                .collect::<Vec<_>>();

            let _span = allocs_op.measure_thread().iterations(iters);

            let start = Instant::now();

            for map in &mut maps {
                for key in 0..POOL_CAPACITY {
                    map.insert(black_box(key), black_box(key))
                        .expect("pool has a slot for each entry");
                }
            }

            start.elapsed()
        });
    });

    group.finish();

    allocs.print_to_stdout();
}
