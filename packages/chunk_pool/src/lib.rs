//! A fixed-capacity pool of single-value memory slots with O(1) issue and reclaim.
//!
//! This crate provides [`ChunkPool`], a pool that allocates one contiguous buffer of
//! `capacity` slots up front and then hands out raw, uninitialized storage for exactly
//! one `T` per request. Slots never move once the pool is created, making it safe to
//! hold pointers into the pool for as long as the pool itself is alive.
//!
//! # Key characteristics
//!
//! - **Fixed capacity**: The buffer is allocated once at construction and never grows.
//!   When every slot is issued, [`allocate()`](ChunkPool::allocate) reports exhaustion
//!   by returning `None` - running out of slots is a normal outcome, not a panic.
//! - **Raw storage**: The pool does not construct or drop values. Callers initialize
//!   the storage in place and are responsible for dropping whatever they put there
//!   before returning the slot.
//! - **Stack discipline**: Only the most recently issued, still-live slot can be
//!   reclaimed. Returning any other slot is accepted but has no effect until the slots
//!   issued after it have been returned first. See [`ChunkPool::deallocate`].
//! - **Stable addresses**: Slots are cells of one owned buffer; values never move.
//!
//! # Example
//!
//! ```rust
//! # use new_zealand::nz;
//! use chunk_pool::ChunkPool;
//!
//! let mut pool = ChunkPool::<u64>::builder().capacity(nz!(3)).build();
//!
//! let slot = pool.allocate().expect("pool is empty, so a slot is available");
//!
//! // The pool hands out raw storage; writing the value is on us.
//! // SAFETY: The pointer is freshly issued and points to storage sized for one u64.
//! unsafe { slot.write(42) };
//!
//! assert_eq!(pool.len(), 1);
//!
//! // u64 needs no drop, so we can return the slot as-is.
//! pool.deallocate(slot);
//! assert_eq!(pool.len(), 0);
//! ```
//!
//! # Thread safety
//!
//! The pool is thread-mobile ([`Send`] when `T: Send`) but not thread-safe ([`Sync`]).
//! Concurrent use from multiple threads requires external synchronization.

mod builder;
mod pool;

pub use builder::*;
pub use pool::ChunkPool;
