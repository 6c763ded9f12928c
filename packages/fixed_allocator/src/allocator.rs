use std::ptr::NonNull;

/// The capability set a node-based container needs from its allocator.
///
/// This is the classic generic-allocator contract made explicit as a trait: raw
/// storage in and out via [`allocate()`](Self::allocate) and
/// [`deallocate()`](Self::deallocate), value lifecycle via
/// [`construct()`](Self::construct) and [`destroy()`](Self::destroy), and retargeting
/// to a different element type via [`retarget()`](Self::retarget).
///
/// Containers should depend only on this trait, not on a concrete allocator, so the
/// same container can run off the general heap ([`HeapAllocator`][1]) or off a
/// fixed-capacity pool ([`FixedAllocator`][2]).
///
/// # Storage vs. values
///
/// `allocate` hands out uninitialized storage and `deallocate` takes such storage
/// back; neither runs any constructors or destructors. `construct` and `destroy`
/// manage only the value at an address and never touch allocation bookkeeping. A
/// container pairs them up: allocate then construct on the way in, destroy then
/// deallocate on the way out.
///
/// [1]: crate::HeapAllocator
/// [2]: crate::FixedAllocator
pub trait NodeAllocator<T> {
    /// The allocator produced by retargeting to element type `U`.
    ///
    /// Retargeting preserves the allocator's configuration (for a pool-backed
    /// allocator, its fixed capacity) while changing the element type. Containers
    /// use this to allocate their internal node type from an allocator the caller
    /// configured for the user-visible value type.
    type Retargeted<U>: NodeAllocator<U>;

    /// Allocates uninitialized storage for `count` contiguous elements.
    ///
    /// Returns `None` when the storage cannot be provided. For a fixed-capacity
    /// allocator, single-element exhaustion is a normal outcome the container must
    /// handle - typically by failing the higher-level operation. A `count` of zero
    /// always returns `None`.
    fn allocate(&mut self, count: usize) -> Option<NonNull<T>>;

    /// Releases storage previously obtained from [`allocate()`](Self::allocate).
    ///
    /// Any values in the storage must already have been destroyed or moved out.
    ///
    /// # Safety
    ///
    /// `ptr` must come from a call to `allocate(count)` with the same `count` on an
    /// allocator that can recognize the storage (the same instance, or for heap
    /// storage any allocator that routes the release to the heap), and the storage
    /// must not be released twice.
    unsafe fn deallocate(&mut self, ptr: NonNull<T>, count: usize);

    /// Constructs a value in place at the given address.
    ///
    /// Does not interact with allocation bookkeeping in any way.
    ///
    /// # Safety
    ///
    /// `ptr` must point to uninitialized storage sized and aligned for one `T`.
    unsafe fn construct(&mut self, ptr: NonNull<T>, value: T) {
        // SAFETY: Forwarding the storage validity requirement to the caller.
        unsafe { ptr.write(value) };
    }

    /// Destroys the value at the given address, leaving the storage uninitialized.
    ///
    /// Does not interact with allocation bookkeeping in any way.
    ///
    /// # Safety
    ///
    /// `ptr` must point to an initialized `T` that is not referenced elsewhere and
    /// is not destroyed again afterward.
    unsafe fn destroy(&mut self, ptr: NonNull<T>) {
        // SAFETY: Forwarding the value validity requirement to the caller.
        unsafe { ptr.drop_in_place() };
    }

    /// Creates an allocator with the same configuration for element type `U`.
    fn retarget<U>(&self) -> Self::Retargeted<U>;
}

#[cfg(test)]
#[allow(
    clippy::undocumented_unsafe_blocks,
    clippy::multiple_unsafe_ops_per_block,
    reason = "test code doesn't need the same safety rigor as production code"
)]
mod tests {
    use std::cell::Cell;
    use std::rc::Rc;

    use super::*;
    use crate::HeapAllocator;

    struct DropCounter {
        drops: Rc<Cell<usize>>,
    }

    impl Drop for DropCounter {
        fn drop(&mut self) {
            self.drops.set(self.drops.get() + 1);
        }
    }

    #[test]
    fn construct_then_destroy_runs_the_value_lifecycle() {
        let drops = Rc::new(Cell::new(0));

        let mut allocator = HeapAllocator::<DropCounter>::new();
        let storage = allocator.allocate(1).expect("heap allocation failed");

        unsafe {
            allocator.construct(
                storage,
                DropCounter {
                    drops: Rc::clone(&drops),
                },
            );
        }
        assert_eq!(drops.get(), 0);

        unsafe { allocator.destroy(storage) };
        assert_eq!(drops.get(), 1);

        unsafe { allocator.deallocate(storage, 1) };
        assert_eq!(drops.get(), 1);
    }

    #[test]
    fn construct_does_not_drop_previous_contents() {
        // The storage from allocate() is uninitialized, so construct() must write
        // without reading or dropping what was there before.
        let mut allocator = HeapAllocator::<String>::new();
        let storage = allocator.allocate(1).expect("heap allocation failed");

        unsafe { allocator.construct(storage, "value".to_string()) };
        unsafe {
            assert_eq!(storage.as_ref(), "value");
        }

        unsafe { allocator.destroy(storage) };
        unsafe { allocator.deallocate(storage, 1) };
    }
}
