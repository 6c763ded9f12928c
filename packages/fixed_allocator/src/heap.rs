use std::alloc::{Layout, alloc, dealloc};
use std::marker::PhantomData;
use std::ptr::NonNull;

use crate::NodeAllocator;

/// A [`NodeAllocator`] that routes every request to the global heap.
///
/// This is the default allocator of the containers in this crate, playing the role a
/// standard library allocator plays for an ordinary container: no pooling, no fixed
/// capacity, allocation fails only when the heap itself does.
///
/// # Example
///
/// ```rust
/// use fixed_allocator::NodeList;
///
/// // NodeList uses HeapAllocator unless told otherwise.
/// let mut list = NodeList::new();
/// list.push_front("entry".to_string()).expect("heap allocation failed");
/// ```
#[derive(Debug)]
pub struct HeapAllocator<T> {
    _item: PhantomData<fn() -> T>,
}

impl<T> HeapAllocator<T> {
    /// Creates a new heap allocator.
    ///
    /// The allocator is stateless; all instances are interchangeable.
    #[must_use]
    pub fn new() -> Self {
        Self { _item: PhantomData }
    }
}

impl<T> Default for HeapAllocator<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> NodeAllocator<T> for HeapAllocator<T> {
    type Retargeted<U> = HeapAllocator<U>;

    fn allocate(&mut self, count: usize) -> Option<NonNull<T>> {
        if count == 0 {
            return None;
        }

        allocate_array(count)
    }

    unsafe fn deallocate(&mut self, ptr: NonNull<T>, count: usize) {
        if count == 0 {
            return;
        }

        // SAFETY: Forwarding the provenance requirement to the caller.
        unsafe { deallocate_array(ptr, count) };
    }

    fn retarget<U>(&self) -> HeapAllocator<U> {
        HeapAllocator::new()
    }
}

/// Allocates uninitialized heap storage for `count` contiguous elements.
///
/// Returns `None` when the heap refuses, making allocation failure a value-level
/// result rather than a panic, matching the pool's exhaustion contract.
pub(crate) fn allocate_array<T>(count: usize) -> Option<NonNull<T>> {
    debug_assert!(count > 0);

    let layout = array_layout::<T>(count);

    // SAFETY: The layout has non-zero size because T is non-zero-sized and
    // count > 0, as asserted by array_layout().
    let ptr = unsafe { alloc(layout) };

    NonNull::new(ptr).map(NonNull::cast)
}

/// Releases heap storage obtained from [`allocate_array`] with the same `count`.
///
/// # Safety
///
/// `ptr` must come from `allocate_array::<T>(count)` with the same `count` and must
/// not have been released already.
pub(crate) unsafe fn deallocate_array<T>(ptr: NonNull<T>, count: usize) {
    debug_assert!(count > 0);

    let layout = array_layout::<T>(count);

    // SAFETY: The caller guarantees the pointer came from allocate_array() with the
    // same count, which used this same layout.
    unsafe { dealloc(ptr.as_ptr().cast(), layout) };
}

fn array_layout<T>(count: usize) -> Layout {
    assert!(
        size_of::<T>() > 0,
        "heap-routed allocation requires a non-zero-sized element type"
    );

    Layout::array::<T>(count)
        .expect("array layout cannot overflow for a count that fits in memory")
}

#[cfg(test)]
#[allow(
    clippy::undocumented_unsafe_blocks,
    clippy::multiple_unsafe_ops_per_block,
    reason = "test code doesn't need the same safety rigor as production code"
)]
mod tests {
    use static_assertions::assert_impl_all;

    use super::*;

    assert_impl_all!(HeapAllocator<u32>: Send, Sync, std::fmt::Debug, Default);

    #[test]
    fn single_element_round_trip() {
        let mut allocator = HeapAllocator::<u64>::new();

        let storage = allocator.allocate(1).expect("heap allocation failed");
        unsafe { storage.write(42) };
        unsafe {
            assert_eq!(storage.read(), 42);
        }

        unsafe { allocator.deallocate(storage, 1) };
    }

    #[test]
    fn multi_element_round_trip() {
        let mut allocator = HeapAllocator::<u32>::new();

        let storage = allocator.allocate(8).expect("heap allocation failed");

        for offset in 0..8 {
            unsafe { storage.add(offset).write(u32::try_from(offset).unwrap()) };
        }

        for offset in 0..8 {
            unsafe {
                assert_eq!(storage.add(offset).read(), u32::try_from(offset).unwrap());
            }
        }

        unsafe { allocator.deallocate(storage, 8) };
    }

    #[test]
    fn zero_count_allocation_yields_nothing() {
        let mut allocator = HeapAllocator::<u32>::new();
        assert!(allocator.allocate(0).is_none());
    }

    #[test]
    fn retarget_produces_an_allocator_for_the_new_type() {
        let allocator = HeapAllocator::<u32>::new();
        let mut retargeted: HeapAllocator<String> = allocator.retarget();

        let storage = retargeted.allocate(1).expect("heap allocation failed");
        unsafe { retargeted.construct(storage, "retargeted".to_string()) };
        unsafe {
            assert_eq!(storage.as_ref(), "retargeted");
        }

        unsafe { retargeted.destroy(storage) };
        unsafe { retargeted.deallocate(storage, 1) };
    }
}
