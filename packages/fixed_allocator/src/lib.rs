//! A generic node-allocator façade over a fixed-capacity chunk pool.
//!
//! This crate connects [`chunk_pool::ChunkPool`] to node-based containers through the
//! [`NodeAllocator`] trait, which models the classic generic-allocator capability set:
//! allocate, deallocate, in-place construct, in-place destroy, and retargeting to a
//! different element type.
//!
//! Two implementations are provided:
//!
//! - [`FixedAllocator`]: owns one pool and serves single-element requests from it in
//!   O(1). Multi-element requests go straight to the global heap - the pool only deals
//!   in single fixed-size slots. When the pool is exhausted, single-element requests
//!   fail instead of silently falling back to the heap, so callers see the fixed
//!   capacity they asked for.
//! - [`HeapAllocator`]: routes everything to the global heap. This is the default for
//!   the containers in this crate, mirroring a standard library allocator.
//!
//! Two node-based containers consume the trait:
//!
//! - [`NodeList`]: a singly-linked list whose nodes come from the allocator.
//! - [`NodeMap`]: an ordered key-value map over allocator-provided nodes. The map
//!   retargets the caller's pair allocator to its internal node type, preserving the
//!   configured capacity - the same shape as a standard map rebinding its allocator.
//!
//! # Example
//!
//! ```rust
//! use std::num::NonZero;
//!
//! use fixed_allocator::{FixedAllocator, NodeMap};
//!
//! // A map whose ten entries live in one pre-allocated pool buffer.
//! let allocator = FixedAllocator::<(u32, u64)>::new(NonZero::new(10).unwrap());
//! let mut map = NodeMap::with_allocator(&allocator);
//!
//! for i in 0..10_u32 {
//!     map.insert(i, u64::from(i) * 10).expect("pool has a slot for each of the ten entries");
//! }
//!
//! // The eleventh entry does not fit; the pool does not grow and does not
//! // fall back to the heap.
//! assert!(map.insert(10, 100).is_err());
//! ```
//!
//! # Stack discipline caveat
//!
//! The pool behind [`FixedAllocator`] reclaims slots in reverse allocation order only
//! (see the `chunk_pool` crate docs). A slot released out of order stays issued until
//! its turn - it is never corrupted, but capacity can run out earlier than the live
//! node count suggests. The containers in this crate tear themselves down head-first,
//! which for front-inserted nodes is exactly reverse allocation order.

mod allocator;
mod errors;
mod fixed;
mod heap;
mod node_list;
mod node_map;

pub use allocator::NodeAllocator;
pub use errors::InsufficientCapacity;
pub use fixed::FixedAllocator;
pub use heap::HeapAllocator;
pub use node_list::{ListNode, NodeList, NodeListIter};
pub use node_map::{MapNode, NodeMap, NodeMapIter};
