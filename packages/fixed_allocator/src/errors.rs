use thiserror::Error;

/// The fixed-capacity pool behind an allocator has no free slot left.
///
/// This is the recoverable, value-level form of pool exhaustion: the container
/// operation that needed a node fails, everything already stored stays intact, and
/// the caller decides whether to retry later, evict something, or give up.
///
/// # Example
///
/// ```rust
/// use std::num::NonZero;
///
/// use fixed_allocator::{FixedAllocator, InsufficientCapacity, NodeList};
///
/// let allocator = FixedAllocator::new(NonZero::new(1).unwrap());
/// let mut list = NodeList::with_allocator(&allocator);
///
/// list.push_front(1_u32).unwrap();
/// assert_eq!(list.push_front(2), Err(InsufficientCapacity));
///
/// // The list is untouched by the failed push.
/// assert_eq!(list.len(), 1);
/// ```
#[derive(Clone, Copy, Debug, Eq, Error, PartialEq)]
#[error("the fixed-capacity pool backing the allocator has no free slot")]
pub struct InsufficientCapacity;
