use std::alloc::{Layout, alloc, dealloc};
use std::mem::MaybeUninit;
use std::num::NonZero;
use std::ptr::NonNull;

use crate::ChunkPoolBuilder;

/// One slot of the pool's buffer: the neighbor links plus storage for one value.
///
/// The links are wired to the buffer-order neighbors once at pool construction and
/// never change afterward. Walking `next` from any slot visits the rest of the buffer
/// in order; walking `prev` goes back toward the first slot.
struct Chunk<T> {
    /// The next slot in buffer order, `None` for the last slot.
    next: Option<NonNull<Chunk<T>>>,

    /// The previous slot in buffer order, `None` for the first slot.
    prev: Option<NonNull<Chunk<T>>>,

    /// Storage for one value. The pool never initializes or drops this; whoever
    /// received the slot from `allocate()` is responsible for both.
    value: MaybeUninit<T>,
}

/// A fixed-capacity pool of single-value memory slots with O(1) issue and reclaim.
///
/// The pool owns one contiguous buffer of `capacity` slots, allocated at construction
/// and freed at drop. [`allocate()`](Self::allocate) hands out a pointer to the value
/// storage of the next unused slot; [`deallocate()`](Self::deallocate) returns a slot
/// to the pool.
///
/// # Stack discipline
///
/// Issued slots always form a prefix of the buffer, with an internal head marking the
/// most recently issued one. Only that head slot can be reclaimed in O(1); passing any
/// other pointer to [`deallocate()`](Self::deallocate) is accepted but does nothing.
/// A slot freed out of order stays issued (it is never corrupted) until every slot
/// issued after it has been returned. Callers that cannot free in reverse allocation
/// order must accept that exhaustion may arrive earlier than the live value count
/// suggests.
///
/// # Raw storage
///
/// The pool deals in uninitialized storage, not values. It never runs constructors or
/// destructors for slot contents - callers must initialize the storage behind the
/// returned pointer and must drop the value in place before returning the slot (or
/// accept the leak). Dropping the pool releases the buffer without touching slot
/// contents.
///
/// # Example
///
/// ```rust
/// use std::num::NonZero;
///
/// use chunk_pool::ChunkPool;
///
/// let mut pool = ChunkPool::<u32>::with_capacity(NonZero::new(2).unwrap());
///
/// let first = pool.allocate().expect("fresh pool has free slots");
/// let second = pool.allocate().expect("one slot still free");
///
/// // Capacity is fixed - the third request reports exhaustion.
/// assert!(pool.allocate().is_none());
/// assert!(pool.is_full());
///
/// // Slots come back in reverse order of issue.
/// pool.deallocate(second);
/// pool.deallocate(first);
/// assert_eq!(pool.len(), 0);
/// ```
///
/// # Thread safety
///
/// The pool is thread-mobile ([`Send`] when `T: Send`) but not thread-safe ([`Sync`]).
/// Using one pool from multiple threads requires external synchronization.
#[derive(Debug)]
pub struct ChunkPool<T> {
    /// First slot of the owned buffer. Non-null for the whole lifetime of the pool;
    /// exclusively owned, never aliased by another pool instance.
    buffer: NonNull<Chunk<T>>,

    /// Number of slots in the buffer. Fixed at construction.
    capacity: NonZero<usize>,

    /// Number of currently issued slots. Always `<= capacity`.
    length: usize,

    /// The most recently issued slot, `None` when nothing is issued. The issued
    /// slots are exactly this slot and everything reachable from it via `prev`.
    head: Option<NonNull<Chunk<T>>>,
}

impl<T> ChunkPool<T> {
    /// Starts building a new [`ChunkPool`].
    ///
    /// # Example
    ///
    /// ```rust
    /// use std::num::NonZero;
    ///
    /// use chunk_pool::ChunkPool;
    ///
    /// let pool = ChunkPool::<u32>::builder()
    ///     .capacity(NonZero::new(4).unwrap())
    ///     .build();
    ///
    /// assert!(pool.is_empty());
    /// ```
    pub fn builder() -> ChunkPoolBuilder<T> {
        ChunkPoolBuilder::new()
    }

    /// Creates a new [`ChunkPool`] with the given number of slots.
    ///
    /// Equivalent to `ChunkPool::builder().capacity(capacity).build()`.
    ///
    /// # Panics
    ///
    /// Panics if `T` is zero-sized.
    ///
    /// # Example
    ///
    /// ```rust
    /// use std::num::NonZero;
    ///
    /// use chunk_pool::ChunkPool;
    ///
    /// let pool = ChunkPool::<String>::with_capacity(NonZero::new(10).unwrap());
    ///
    /// assert_eq!(pool.capacity().get(), 10);
    /// ```
    #[must_use]
    pub fn with_capacity(capacity: NonZero<usize>) -> Self {
        Self::builder().capacity(capacity).build()
    }

    /// # Panics
    ///
    /// Panics if `T` is zero-sized.
    #[must_use]
    pub(crate) fn new_inner(capacity: NonZero<usize>) -> Self {
        assert!(size_of::<T>() > 0, "ChunkPool must have non-zero item size");

        let layout = Self::buffer_layout(capacity);

        // SAFETY: The layout has non-zero size because T is non-zero-sized and the
        // capacity is non-zero.
        let buffer = NonNull::new(unsafe { alloc(layout) })
            .expect("we do not intend to handle allocation failure as a real possibility - OOM results in panic")
            .cast::<Chunk<T>>();

        // Wire every slot to its buffer-order neighbors. The chain is static: set up
        // once here, never rewired.
        for index in 0..capacity.get() {
            let prev = if index == 0 {
                None
            } else {
                // SAFETY: 1 <= index < capacity, so index - 1 is in bounds.
                Some(unsafe { buffer.add(index.wrapping_sub(1)) })
            };

            let next = if index.wrapping_add(1) == capacity.get() {
                None
            } else {
                // SAFETY: index + 1 < capacity, so the offset is in bounds.
                Some(unsafe { buffer.add(index.wrapping_add(1)) })
            };

            // SAFETY: index < capacity, so the offset stays within our allocation.
            let chunk = unsafe { buffer.add(index) };

            // SAFETY: The pointer is properly aligned storage we just allocated for
            // exactly this Chunk<T>, written once before any read.
            unsafe {
                chunk.write(Chunk {
                    next,
                    prev,
                    value: MaybeUninit::uninit(),
                });
            }
        }

        Self {
            buffer,
            capacity,
            length: 0,
            head: None,
        }
    }

    /// The number of slots in the pool, fixed at construction.
    #[must_use]
    pub fn capacity(&self) -> NonZero<usize> {
        self.capacity
    }

    /// The number of currently issued slots.
    ///
    /// # Example
    ///
    /// ```rust
    /// use std::num::NonZero;
    ///
    /// use chunk_pool::ChunkPool;
    ///
    /// let mut pool = ChunkPool::<u32>::with_capacity(NonZero::new(4).unwrap());
    /// assert_eq!(pool.len(), 0);
    ///
    /// let slot = pool.allocate().unwrap();
    /// assert_eq!(pool.len(), 1);
    ///
    /// pool.deallocate(slot);
    /// assert_eq!(pool.len(), 0);
    /// ```
    #[must_use]
    #[cfg_attr(test, mutants::skip)] // Can be mutated to infinitely growing memory use and/or infinite loop.
    pub fn len(&self) -> usize {
        self.length
    }

    /// Whether the pool has no issued slots.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.length == 0
    }

    /// Whether every slot is issued, meaning the next [`allocate()`](Self::allocate)
    /// will report exhaustion.
    ///
    /// # Example
    ///
    /// ```rust
    /// use std::num::NonZero;
    ///
    /// use chunk_pool::ChunkPool;
    ///
    /// let mut pool = ChunkPool::<u32>::with_capacity(NonZero::new(1).unwrap());
    /// assert!(!pool.is_full());
    ///
    /// let _slot = pool.allocate().unwrap();
    /// assert!(pool.is_full());
    /// ```
    #[must_use]
    pub fn is_full(&self) -> bool {
        self.length == self.capacity.get()
    }

    /// Issues the next unused slot and returns a pointer to its value storage.
    ///
    /// Returns `None` when every slot is issued. Exhaustion is a normal outcome of a
    /// fixed-capacity pool, to be handled by the caller - it is never a panic.
    ///
    /// The storage behind the returned pointer is uninitialized. The caller must
    /// write a value before reading through the pointer and must drop that value in
    /// place before returning the slot via [`deallocate()`](Self::deallocate).
    ///
    /// # Example
    ///
    /// ```rust
    /// use std::num::NonZero;
    ///
    /// use chunk_pool::ChunkPool;
    ///
    /// let mut pool = ChunkPool::<u32>::with_capacity(NonZero::new(1).unwrap());
    ///
    /// let slot = pool.allocate().expect("fresh pool has free slots");
    ///
    /// // SAFETY: The slot is freshly issued and sized for one u32.
    /// unsafe { slot.write(7) };
    ///
    /// // SAFETY: The slot was just initialized and nothing else references it.
    /// assert_eq!(unsafe { slot.read() }, 7);
    ///
    /// pool.deallocate(slot);
    /// ```
    #[must_use]
    pub fn allocate(&mut self) -> Option<NonNull<T>> {
        let chunk = match self.head {
            // Nothing is issued: the first buffer slot becomes the head. This also
            // covers a pool that was drained back to empty.
            None => self.buffer,
            Some(head) => {
                // SAFETY: The head always points to an initialized chunk inside our
                // buffer, and holding &mut self means no other reference exists.
                let head = unsafe { head.as_ref() };

                // The slot after the head is the next unused one in buffer order.
                // No such slot means every slot is issued.
                head.next?
            }
        };

        self.head = Some(chunk);

        // Cannot overflow because the count is bounded by the fixed capacity.
        self.length = self.length.wrapping_add(1);

        #[cfg(debug_assertions)]
        self.integrity_check();

        Some(Self::value_ptr(chunk))
    }

    /// Returns a slot to the pool.
    ///
    /// Only the most recently issued live slot is reclaimed; this is the stack
    /// discipline of the pool. If `ptr` does not address that slot's value storage -
    /// because it points at an earlier slot, at foreign memory, or nothing is issued
    /// at all - the call is a no-op and the slot (if any) stays issued.
    ///
    /// The pool does not drop the value in the slot. If the caller initialized the
    /// storage with something that needs dropping, it must drop it in place first.
    ///
    /// # Example
    ///
    /// ```rust
    /// use std::num::NonZero;
    ///
    /// use chunk_pool::ChunkPool;
    ///
    /// let mut pool = ChunkPool::<u32>::with_capacity(NonZero::new(2).unwrap());
    ///
    /// let first = pool.allocate().unwrap();
    /// let second = pool.allocate().unwrap();
    ///
    /// // Freeing below the top of the stack does nothing.
    /// pool.deallocate(first);
    /// assert_eq!(pool.len(), 2);
    ///
    /// // Freeing the most recent issue reclaims it.
    /// pool.deallocate(second);
    /// assert_eq!(pool.len(), 1);
    ///
    /// // Now `first` is the most recent live issue and can be reclaimed.
    /// pool.deallocate(first);
    /// assert_eq!(pool.len(), 0);
    /// ```
    pub fn deallocate(&mut self, ptr: NonNull<T>) {
        let Some(head) = self.head else {
            // Nothing is issued, so there is nothing this pointer could refer to.
            return;
        };

        if ptr != Self::value_ptr(head) {
            // Not the most recently issued live slot. Out-of-order returns are a
            // deliberate no-op: the slot stays issued until its turn comes.
            return;
        }

        // SAFETY: The head points to an initialized chunk inside our buffer.
        self.head = unsafe { head.as_ref() }.prev;

        // Cannot underflow because the head was non-null, so at least one slot is issued.
        self.length = self.length.wrapping_sub(1);

        #[cfg(debug_assertions)]
        self.integrity_check();
    }

    /// Whether `ptr` lies within the pool's slot buffer.
    ///
    /// This is the guard an allocator façade uses to decide whether a pointer it is
    /// asked to free came from this pool or from the general heap.
    ///
    /// # Example
    ///
    /// ```rust
    /// use std::num::NonZero;
    /// use std::ptr::NonNull;
    ///
    /// use chunk_pool::ChunkPool;
    ///
    /// let mut pool = ChunkPool::<u32>::with_capacity(NonZero::new(2).unwrap());
    ///
    /// let slot = pool.allocate().unwrap();
    /// assert!(pool.contains(slot));
    ///
    /// let heap_value = Box::new(42_u32);
    /// let heap_ptr = NonNull::from(Box::as_ref(&heap_value));
    /// assert!(!pool.contains(heap_ptr));
    /// # pool.deallocate(slot);
    /// ```
    #[must_use]
    pub fn contains(&self, ptr: NonNull<T>) -> bool {
        let start = self.buffer.addr().get();

        // Cannot overflow: the buffer is a live allocation, so its one-past-the-end
        // address fits in usize.
        let end = start.wrapping_add(self.capacity.get().wrapping_mul(size_of::<Chunk<T>>()));

        let addr = ptr.addr().get();
        addr >= start && addr < end
    }

    /// Creates an independent pool with the same capacity and the same issued prefix.
    ///
    /// Deep duplication is deliberately an explicit operation rather than a `Clone`
    /// impl: it allocates a whole fresh buffer, which should be visible in the
    /// calling code. The issued slots of the new pool occupy the same buffer
    /// positions as in the source and their storage is copied bitwise, which is why
    /// `T` must be `Copy`.
    ///
    /// # Example
    ///
    /// ```rust
    /// use std::num::NonZero;
    ///
    /// use chunk_pool::ChunkPool;
    ///
    /// let mut pool = ChunkPool::<u32>::with_capacity(NonZero::new(4).unwrap());
    /// let slot = pool.allocate().unwrap();
    /// // SAFETY: The slot is freshly issued and sized for one u32.
    /// unsafe { slot.write(99) };
    ///
    /// let copy = pool.duplicate();
    /// assert_eq!(copy.len(), 1);
    /// assert_eq!(copy.capacity(), pool.capacity());
    ///
    /// // The copy owns separate memory.
    /// assert!(!copy.contains(slot));
    /// # pool.deallocate(slot);
    /// ```
    #[must_use]
    pub fn duplicate(&self) -> Self
    where
        T: Copy,
    {
        let mut duplicate = Self::new_inner(self.capacity);

        // Issued slots always form a prefix of the buffer, so copying slots
        // 0..length transfers exactly the issued storage.
        for index in 0..self.length {
            // SAFETY: index < length <= capacity keeps the offset in bounds.
            let source = unsafe { self.buffer.add(index) };

            // SAFETY: The duplicate has the same capacity, so the same index is in
            // bounds of its buffer too.
            let target = unsafe { duplicate.buffer.add(index) };

            // SAFETY: The source chunk is initialized and MaybeUninit<T> is Copy
            // for T: Copy, so a bitwise read is valid even if the caller never
            // wrote the slot.
            let value = unsafe { (*source.as_ptr()).value };

            // SAFETY: The target chunk is initialized; we overwrite only its value
            // storage, leaving the links intact.
            unsafe {
                (*target.as_ptr()).value = value;
            }
        }

        if self.length > 0 {
            // SAFETY: length <= capacity, so the last issued index is in bounds.
            duplicate.head = Some(unsafe { duplicate.buffer.add(self.length.wrapping_sub(1)) });
        }

        duplicate.length = self.length;

        #[cfg(debug_assertions)]
        duplicate.integrity_check();

        duplicate
    }

    fn value_ptr(chunk: NonNull<Chunk<T>>) -> NonNull<T> {
        // SAFETY: The chunk points into a live slot buffer, so projecting to its
        // value field stays within the same allocation.
        let value = unsafe { &raw mut (*chunk.as_ptr()).value };

        // SAFETY: A field projection from a non-null pointer is non-null.
        unsafe { NonNull::new_unchecked(value.cast::<T>()) }
    }

    fn buffer_layout(capacity: NonZero<usize>) -> Layout {
        Layout::array::<Chunk<T>>(capacity.get())
            .expect("slot buffer layout cannot overflow for a capacity that fits in memory")
    }

    /// Verifies the bookkeeping against the buffer contents.
    ///
    /// Only available in debug builds; used by tests and the debug assertions
    /// sprinkled through the mutating operations.
    #[cfg(debug_assertions)]
    #[cfg_attr(test, mutants::skip)] // This is essentially test logic, mutation is meaningless.
    pub(crate) fn integrity_check(&self) {
        assert!(
            self.length <= self.capacity.get(),
            "issued count {} exceeds capacity {}",
            self.length,
            self.capacity.get()
        );

        assert_eq!(
            self.head.is_none(),
            self.length == 0,
            "head must be unset exactly when no slot is issued"
        );

        if let Some(head) = self.head {
            // The issued slots are a prefix, so the head must be the slot at
            // index length - 1.
            // SAFETY: length >= 1 here and length <= capacity, so in bounds.
            let expected = unsafe { self.buffer.add(self.length.wrapping_sub(1)) };

            assert_eq!(
                head, expected,
                "head does not mark the end of the issued prefix"
            );
        }

        // The static chain must still mirror buffer order.
        for index in 0..self.capacity.get() {
            // SAFETY: index < capacity keeps the offset in bounds.
            let chunk_ptr = unsafe { self.buffer.add(index) };

            // SAFETY: Every chunk was initialized at construction and we hold &self.
            let chunk = unsafe { chunk_ptr.as_ref() };

            let expected_prev = if index == 0 {
                None
            } else {
                // SAFETY: 1 <= index < capacity, in bounds.
                Some(unsafe { self.buffer.add(index.wrapping_sub(1)) })
            };

            let expected_next = if index.wrapping_add(1) == self.capacity.get() {
                None
            } else {
                // SAFETY: index + 1 < capacity, in bounds.
                Some(unsafe { self.buffer.add(index.wrapping_add(1)) })
            };

            assert_eq!(chunk.prev, expected_prev, "slot {index} prev link rewired");
            assert_eq!(chunk.next, expected_next, "slot {index} next link rewired");
        }
    }
}

impl<T> Drop for ChunkPool<T> {
    fn drop(&mut self) {
        // The pool deals in raw storage and never constructed any values, so there
        // is nothing to drop in the slots themselves.
        //
        // SAFETY: The buffer was allocated in new_inner() with this same layout and
        // is released exactly once, here, by its sole owner.
        unsafe {
            dealloc(
                self.buffer.as_ptr().cast(),
                Self::buffer_layout(self.capacity),
            );
        }
    }
}

// SAFETY: The pool exclusively owns its buffer; the raw pointers never alias another
// pool's memory and no thread-local state is involved. Moving the pool to another
// thread moves the stored values with it, hence the T: Send bound.
unsafe impl<T: Send> Send for ChunkPool<T> {}

#[cfg(test)]
#[allow(
    clippy::undocumented_unsafe_blocks,
    clippy::multiple_unsafe_ops_per_block,
    clippy::arithmetic_side_effects,
    reason = "test code doesn't need the same safety rigor as production code"
)]
mod tests {
    use std::num::NonZero;
    use std::ptr::NonNull;

    use new_zealand::nz;
    use static_assertions::{assert_impl_all, assert_not_impl_any};

    use super::*;

    assert_impl_all!(ChunkPool<u32>: Send, std::fmt::Debug);
    assert_not_impl_any!(ChunkPool<u32>: Sync, Clone);
    assert_not_impl_any!(ChunkPool<std::rc::Rc<u32>>: Send);

    #[test]
    fn fresh_pool_is_empty() {
        let pool = ChunkPool::<u32>::with_capacity(nz!(5));

        assert_eq!(pool.len(), 0);
        assert!(pool.is_empty());
        assert!(!pool.is_full());
        assert_eq!(pool.capacity(), nz!(5));
    }

    #[test]
    fn allocates_exactly_capacity_then_reports_exhaustion() {
        let mut pool = ChunkPool::<u64>::with_capacity(nz!(4));

        for expected_len in 1..=4 {
            assert!(pool.allocate().is_some());
            assert_eq!(pool.len(), expected_len);
        }

        assert!(pool.is_full());
        assert!(pool.allocate().is_none());

        // A failed allocation changes nothing.
        assert_eq!(pool.len(), 4);
        assert!(pool.is_full());
    }

    #[test]
    fn slots_are_issued_in_buffer_order() {
        let mut pool = ChunkPool::<u32>::with_capacity(nz!(3));

        let a0 = pool.allocate().unwrap();
        let a1 = pool.allocate().unwrap();
        let a2 = pool.allocate().unwrap();

        let stride = size_of::<Chunk<u32>>();
        assert_eq!(a1.addr().get() - a0.addr().get(), stride);
        assert_eq!(a2.addr().get() - a1.addr().get(), stride);
    }

    #[test]
    fn values_round_trip_through_slot_storage() {
        let mut pool = ChunkPool::<u32>::with_capacity(nz!(2));

        let first = pool.allocate().unwrap();
        let second = pool.allocate().unwrap();

        unsafe {
            first.write(11);
            second.write(22);
        }

        unsafe {
            assert_eq!(first.read(), 11);
            assert_eq!(second.read(), 22);
        }

        pool.deallocate(second);
        pool.deallocate(first);
    }

    #[test]
    fn lifo_reclaim_reissues_same_slot() {
        let mut pool = ChunkPool::<u32>::with_capacity(nz!(3));

        let _a = pool.allocate().unwrap();
        let _b = pool.allocate().unwrap();
        let c = pool.allocate().unwrap();

        pool.deallocate(c);
        assert_eq!(pool.len(), 2);

        // The next issue reproduces the slot we just returned.
        let c_again = pool.allocate().unwrap();
        assert_eq!(c_again, c);
        assert_eq!(pool.len(), 3);
    }

    #[test]
    fn out_of_order_free_is_a_no_op() {
        let mut pool = ChunkPool::<u32>::with_capacity(nz!(3));

        let a = pool.allocate().unwrap();
        let _b = pool.allocate().unwrap();
        let _c = pool.allocate().unwrap();

        // The oldest slot is not the head, so this must change nothing.
        pool.deallocate(a);
        assert_eq!(pool.len(), 3);
        assert!(pool.is_full());
    }

    #[test]
    fn spec_scenario_capacity_three() {
        let mut pool = ChunkPool::<u32>::with_capacity(nz!(3));

        let a0 = pool.allocate().unwrap();
        let _a1 = pool.allocate().unwrap();
        let a2 = pool.allocate().unwrap();

        pool.deallocate(a2);
        assert_eq!(pool.len(), 2);

        let reissued = pool.allocate().unwrap();
        assert_eq!(reissued, a2);

        pool.deallocate(a0);
        assert_eq!(pool.len(), 3);
    }

    #[test]
    fn deallocate_on_empty_pool_is_a_no_op() {
        let mut pool = ChunkPool::<u32>::with_capacity(nz!(2));

        let slot = pool.allocate().unwrap();
        pool.deallocate(slot);
        assert_eq!(pool.len(), 0);

        // Nothing is issued; returning the stale pointer again must do nothing.
        pool.deallocate(slot);
        assert_eq!(pool.len(), 0);
    }

    #[test]
    fn foreign_pointer_is_rejected() {
        let mut pool = ChunkPool::<u32>::with_capacity(nz!(1));

        let _slot = pool.allocate().unwrap();

        let heap_value = Box::new(42_u32);
        let heap_ptr = NonNull::from(Box::as_ref(&heap_value));

        pool.deallocate(heap_ptr);
        assert_eq!(pool.len(), 1);
    }

    #[test]
    fn contains_distinguishes_pool_and_heap_addresses() {
        let mut pool = ChunkPool::<u32>::with_capacity(nz!(3));

        let mut slots = Vec::new();
        while let Some(slot) = pool.allocate() {
            slots.push(slot);
        }

        for slot in &slots {
            assert!(pool.contains(*slot));
        }

        let heap_value = Box::new(0_u32);
        assert!(!pool.contains(NonNull::from(Box::as_ref(&heap_value))));
    }

    #[test]
    fn drained_pool_reissues_from_the_start() {
        let mut pool = ChunkPool::<u32>::with_capacity(nz!(2));

        let first = pool.allocate().unwrap();
        let second = pool.allocate().unwrap();

        pool.deallocate(second);
        pool.deallocate(first);
        assert!(pool.is_empty());

        // An emptied pool starts over at the first buffer slot.
        assert_eq!(pool.allocate().unwrap(), first);
    }

    #[test]
    fn moving_the_pool_preserves_its_state() {
        let mut pool = ChunkPool::<u32>::with_capacity(nz!(3));

        let _a = pool.allocate().unwrap();
        let b = pool.allocate().unwrap();
        pool.deallocate(b);

        let expected_next = b;
        let len_before = pool.len();

        // A move transfers buffer ownership; drop runs only on the final owner.
        let mut moved = pool;

        assert_eq!(moved.len(), len_before);
        assert_eq!(moved.allocate().unwrap(), expected_next);
    }

    #[test]
    fn pool_can_move_between_threads() {
        // NonNull is not Send by itself; the wrapper carries the slot pointer to
        // the thread that owns the pool it points into. The accessor is a method
        // so the closure captures the whole wrapper, not the non-Send field.
        struct SendSlot(NonNull<u32>);
        unsafe impl Send for SendSlot {}
        impl SendSlot {
            fn into_inner(self) -> NonNull<u32> {
                self.0
            }
        }

        let mut pool = ChunkPool::<u32>::with_capacity(nz!(2));
        let slot = pool.allocate().unwrap();
        unsafe { slot.write(7) };

        let slot = SendSlot(slot);
        let handle = std::thread::spawn(move || {
            let slot = slot.into_inner();
            let value = unsafe { slot.read() };
            drop(pool);
            value
        });

        assert_eq!(handle.join().unwrap(), 7);
    }

    #[test]
    fn duplicate_copies_the_issued_prefix() {
        let mut pool = ChunkPool::<u32>::with_capacity(nz!(4));

        let first = pool.allocate().unwrap();
        let second = pool.allocate().unwrap();
        unsafe {
            first.write(5);
            second.write(6);
        }

        let mut duplicate = pool.duplicate();

        assert_eq!(duplicate.len(), 2);
        assert_eq!(duplicate.capacity(), pool.capacity());

        // Separate arena: the original slots are not part of the duplicate.
        assert!(!duplicate.contains(first));
        assert!(!duplicate.contains(second));

        // Same relative order: the next issue in the duplicate is the third slot,
        // carrying on from the copied prefix.
        let third = duplicate.allocate().unwrap();
        assert!(duplicate.contains(third));
        assert_eq!(duplicate.len(), 3);

        // The copied values are in the first two slots of the new buffer.
        let stride = size_of::<Chunk<u32>>();
        let dup_second = NonNull::new(third.as_ptr().wrapping_byte_sub(stride)).unwrap();
        let dup_first = NonNull::new(third.as_ptr().wrapping_byte_sub(stride * 2)).unwrap();
        unsafe {
            assert_eq!(dup_first.read(), 5);
            assert_eq!(dup_second.read(), 6);
        }
    }

    #[test]
    fn duplicate_of_empty_pool_is_empty() {
        let pool = ChunkPool::<u32>::with_capacity(nz!(2));
        let mut duplicate = pool.duplicate();

        assert!(duplicate.is_empty());
        assert!(duplicate.allocate().is_some());
    }

    #[test]
    fn values_needing_drop_can_be_dropped_in_place() {
        let mut pool = ChunkPool::<String>::with_capacity(nz!(1));

        let slot = pool.allocate().unwrap();
        unsafe { slot.write("pooled".to_string()) };

        unsafe {
            assert_eq!(slot.as_ref(), "pooled");
        }

        // The pool never drops values; that duty stays with us.
        unsafe { slot.drop_in_place() };
        pool.deallocate(slot);

        assert!(pool.is_empty());
    }

    #[test]
    #[should_panic]
    fn zero_capacity_cannot_be_expressed() {
        let capacity = NonZero::new(0).unwrap();
        drop(ChunkPool::<u32>::with_capacity(capacity));
    }

    #[test]
    #[cfg(debug_assertions)]
    fn integrity_check_passes_through_a_full_cycle() {
        let mut pool = ChunkPool::<u64>::with_capacity(nz!(3));
        pool.integrity_check();

        let mut slots = Vec::new();
        while let Some(slot) = pool.allocate() {
            slots.push(slot);
            pool.integrity_check();
        }

        for slot in slots.into_iter().rev() {
            pool.deallocate(slot);
            pool.integrity_check();
        }
    }
}
