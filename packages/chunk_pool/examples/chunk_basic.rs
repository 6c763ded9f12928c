//! Basic usage of the `chunk_pool` crate:
//!
//! * Creating a pool with a fixed capacity.
//! * Issuing slots and writing values into them.
//! * Hitting capacity exhaustion.
//! * Returning slots in reverse order of issue.

use chunk_pool::ChunkPool;
use new_zealand::nz;

fn main() {
    let mut pool = ChunkPool::<u64>::builder().capacity(nz!(4)).build();

    println!(
        "Created a pool with capacity {} ({} slots issued)",
        pool.capacity(),
        pool.len()
    );

    // The pool hands out raw storage; initializing it is the caller's job.
    let mut slots = Vec::new();

    while let Some(slot) = pool.allocate() {
        let value = slots.len() as u64 * 100;

        // SAFETY: The slot is freshly issued and sized for one u64.
        unsafe { slot.write(value) };

        slots.push(slot);
    }

    println!("Issued {} slots; the pool is now exhausted", slots.len());

    // Exhaustion is a normal outcome, not an error - the pool just says no.
    assert!(pool.allocate().is_none());

    for slot in &slots {
        // SAFETY: Each slot was initialized above and the pool is still alive.
        let value = unsafe { slot.read() };
        println!("Slot at {slot:p} holds {value}");
    }

    // Slots return in reverse order of issue (stack discipline). u64 needs no
    // drop, so the raw storage can be handed back as-is.
    for slot in slots.into_iter().rev() {
        pool.deallocate(slot);
    }

    println!("All slots returned; {} issued", pool.len());
}
