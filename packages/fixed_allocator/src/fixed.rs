use std::num::NonZero;
use std::ptr::NonNull;

use chunk_pool::ChunkPool;

use crate::{NodeAllocator, heap};

/// A [`NodeAllocator`] that serves single-element requests from an owned
/// fixed-capacity [`ChunkPool`].
///
/// The allocator holds exactly one pool by value. Requests for one element - the
/// only kind a node-based container makes for its nodes - are satisfied from the
/// pool in O(1). Requests for more than one contiguous element bypass the pool and
/// go to the global heap; the pool only deals in single fixed-size slots.
///
/// # Exhaustion
///
/// When every pool slot is issued, a single-element request returns `None` rather
/// than silently switching to the heap. A caller who configured a capacity of ten
/// gets exactly ten pooled nodes and then a clean failure to act on.
///
/// # Release routing
///
/// On release, the discriminator for single-element storage is *address validity*,
/// not the count alone: storage inside the pool buffer goes back to the pool,
/// anything else is released to the heap. The same allocator can therefore free
/// heap storage it (or a peer) routed past the pool earlier.
///
/// The pool reclaims only the most recently issued live slot (stack discipline); an
/// out-of-order return inside the pool is accepted and simply leaves the slot issued
/// until its turn comes.
///
/// # Example
///
/// ```rust
/// use std::num::NonZero;
///
/// use fixed_allocator::{FixedAllocator, NodeAllocator};
///
/// let mut allocator = FixedAllocator::<u64>::new(NonZero::new(2).unwrap());
///
/// let first = allocator.allocate(1).expect("pool has free slots");
/// let second = allocator.allocate(1).expect("pool has one slot left");
/// assert!(allocator.manages(first));
///
/// // The pool is exhausted; single-element requests now fail.
/// assert!(allocator.allocate(1).is_none());
///
/// // Multi-element requests never touch the pool.
/// let array = allocator.allocate(16).expect("heap allocation failed");
/// assert!(!allocator.manages(array));
///
/// // SAFETY: Each pointer goes back with the count it was allocated with.
/// unsafe {
///     allocator.deallocate(array, 16);
///     allocator.deallocate(second, 1);
///     allocator.deallocate(first, 1);
/// }
/// ```
#[derive(Debug)]
pub struct FixedAllocator<T> {
    pool: ChunkPool<T>,
}

impl<T> FixedAllocator<T> {
    /// Creates an allocator over a fresh pool with the given slot capacity.
    ///
    /// The pool buffer is allocated here, up front; serving node requests later
    /// performs no heap allocation at all.
    ///
    /// # Panics
    ///
    /// Panics if `T` is zero-sized.
    #[must_use]
    pub fn new(capacity: NonZero<usize>) -> Self {
        Self {
            pool: ChunkPool::with_capacity(capacity),
        }
    }

    /// The slot capacity of the owned pool, fixed at construction.
    #[must_use]
    pub fn capacity(&self) -> NonZero<usize> {
        self.pool.capacity()
    }

    /// The number of pool slots currently issued.
    ///
    /// Heap-routed storage is not tracked; this reflects only the pool.
    #[must_use]
    #[cfg_attr(test, mutants::skip)] // Can be mutated to infinitely growing memory use and/or infinite loop.
    pub fn len(&self) -> usize {
        self.pool.len()
    }

    /// Whether no pool slot is currently issued.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.pool.is_empty()
    }

    /// Whether `ptr` points into the owned pool's buffer.
    ///
    /// This is the same test the allocator applies when routing a release: pool
    /// addresses go back to the pool, foreign addresses to the heap.
    #[must_use]
    pub fn manages(&self, ptr: NonNull<T>) -> bool {
        self.pool.contains(ptr)
    }
}

impl<T> NodeAllocator<T> for FixedAllocator<T> {
    type Retargeted<U> = FixedAllocator<U>;

    fn allocate(&mut self, count: usize) -> Option<NonNull<T>> {
        match count {
            0 => None,
            // Pool exhaustion propagates as None - no heap fallback for nodes.
            1 => self.pool.allocate(),
            _ => heap::allocate_array(count),
        }
    }

    unsafe fn deallocate(&mut self, ptr: NonNull<T>, count: usize) {
        if count == 1 && self.pool.contains(ptr) {
            self.pool.deallocate(ptr);
            return;
        }

        if count == 0 {
            return;
        }

        // Single-element storage outside the pool came from the heap path, as did
        // every multi-element allocation.
        // SAFETY: Forwarding the provenance requirement to the caller.
        unsafe { heap::deallocate_array(ptr, count) };
    }

    fn retarget<U>(&self) -> FixedAllocator<U> {
        // A fresh pool for the new element type, same capacity configuration.
        FixedAllocator::new(self.pool.capacity())
    }
}

#[cfg(test)]
#[allow(
    clippy::undocumented_unsafe_blocks,
    clippy::multiple_unsafe_ops_per_block,
    reason = "test code doesn't need the same safety rigor as production code"
)]
mod tests {
    use new_zealand::nz;
    use static_assertions::{assert_impl_all, assert_not_impl_any};

    use super::*;
    use crate::HeapAllocator;

    assert_impl_all!(FixedAllocator<u32>: Send, std::fmt::Debug);
    assert_not_impl_any!(FixedAllocator<u32>: Sync, Clone);

    #[test]
    fn single_element_requests_come_from_the_pool() {
        let mut allocator = FixedAllocator::<u64>::new(nz!(3));

        let storage = allocator.allocate(1).expect("pool has free slots");
        assert!(allocator.manages(storage));
        assert_eq!(allocator.len(), 1);

        unsafe { allocator.deallocate(storage, 1) };
        assert_eq!(allocator.len(), 0);
    }

    #[test]
    fn exhaustion_propagates_instead_of_falling_back() {
        let mut allocator = FixedAllocator::<u64>::new(nz!(2));

        let _first = allocator.allocate(1).expect("pool has free slots");
        let _second = allocator.allocate(1).expect("pool has one slot left");

        // No silent heap fallback: the caller asked for a fixed capacity of two.
        assert!(allocator.allocate(1).is_none());
        assert_eq!(allocator.len(), 2);
    }

    #[test]
    fn multi_element_requests_go_to_the_heap() {
        let mut allocator = FixedAllocator::<u32>::new(nz!(1));

        let array = allocator.allocate(4).expect("heap allocation failed");
        assert!(!allocator.manages(array));

        // The pool was not involved at all.
        assert_eq!(allocator.len(), 0);

        for offset in 0..4 {
            unsafe { array.add(offset).write(u32::try_from(offset).unwrap()) };
        }

        unsafe { allocator.deallocate(array, 4) };
    }

    #[test]
    fn release_routing_follows_address_validity() {
        // Storage for one element that did NOT come from the pool must be released
        // to the heap, even though the count is 1.
        let mut heap_allocator = HeapAllocator::<u64>::new();
        let heap_storage = heap_allocator.allocate(1).expect("heap allocation failed");

        let mut allocator = FixedAllocator::<u64>::new(nz!(1));
        assert!(!allocator.manages(heap_storage));

        let pool_storage = allocator.allocate(1).expect("pool has a free slot");

        // Both releases go through the fixed allocator; only the pool slot returns
        // to the pool.
        unsafe {
            allocator.deallocate(heap_storage, 1);
            allocator.deallocate(pool_storage, 1);
        }

        assert!(allocator.is_empty());
    }

    #[test]
    fn zero_count_requests_are_refused() {
        let mut allocator = FixedAllocator::<u32>::new(nz!(1));
        assert!(allocator.allocate(0).is_none());
    }

    #[test]
    fn out_of_order_release_leaves_slot_issued() {
        let mut allocator = FixedAllocator::<u32>::new(nz!(2));

        let first = allocator.allocate(1).expect("pool has free slots");
        let _second = allocator.allocate(1).expect("pool has one slot left");

        // The pool's stack discipline: freeing below the top does nothing yet.
        unsafe { allocator.deallocate(first, 1) };
        assert_eq!(allocator.len(), 2);
    }

    #[test]
    fn retarget_preserves_the_capacity_configuration() {
        let allocator = FixedAllocator::<(u32, u64)>::new(nz!(10));

        let mut retargeted: FixedAllocator<[u8; 24]> = allocator.retarget();
        assert_eq!(retargeted.capacity(), nz!(10));

        // The retargeted allocator has its own fresh pool.
        let storage = retargeted.allocate(1).expect("fresh pool has free slots");
        assert!(retargeted.manages(storage));
        assert_eq!(allocator.len(), 0);

        unsafe { retargeted.deallocate(storage, 1) };
    }
}
