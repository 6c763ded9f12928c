//! Basic usage of the `fixed_allocator` crate:
//!
//! * Building a map over the default heap allocator.
//! * Building the same map over a pool-backed allocator with a fixed capacity.
//! * Observing clean exhaustion when the pool runs out of slots.

use std::num::NonZero;

use fixed_allocator::{FixedAllocator, NodeMap};

fn main() {
    // An ordinary map: every node comes from the global heap.
    let mut heap_map = NodeMap::new();

    let mut factorial = 1_u64;
    for n in 1..=10_u64 {
        factorial *= n;
        heap_map
            .insert(n, factorial)
            .expect("heap allocation failed");
    }

    println!("Factorials from the heap-backed map:");
    for (n, value) in &heap_map {
        println!("{n}! = {value}");
    }

    // The same map, but every node lives in a pool of exactly ten slots that was
    // allocated up front. Filling the map performs no heap allocation at all.
    //
    // The allocator is configured for the pair type; the map retargets it to its
    // internal node type while keeping the capacity.
    let allocator = FixedAllocator::<(u64, u64)>::new(NonZero::new(10).unwrap());
    let mut pooled_map = NodeMap::with_allocator(&allocator);

    let mut factorial = 1_u64;
    for n in 1..=10_u64 {
        factorial *= n;
        pooled_map
            .insert(n, factorial)
            .expect("pool has a slot for each of the ten entries");
    }

    println!();
    println!("Factorials from the pool-backed map:");
    for (n, value) in &pooled_map {
        println!("{n}! = {value}");
    }

    // An eleventh distinct key would need an eleventh node. The pool has exactly
    // ten slots and does not spill to the heap, so the insert fails as a value.
    let result = pooled_map.insert(11, 0);
    println!();
    println!("Inserting an 11th entry into the capacity-10 map: {result:?}");
}
