use std::marker::PhantomData;
use std::ptr::NonNull;

use crate::{HeapAllocator, InsufficientCapacity, NodeAllocator};

/// One node of a [`NodeList`]: the forward link plus the stored value.
///
/// Only the containing list touches the fields; the type is public solely so that
/// allocator type parameters can name it.
#[derive(Debug)]
pub struct ListNode<T> {
    next: Option<NonNull<ListNode<T>>>,
    value: T,
}

/// A singly-linked list whose nodes come from a [`NodeAllocator`].
///
/// The list itself is deliberately small: it demonstrates the container side of the
/// allocator contract. Each `push_front` performs one `allocate(1)` + `construct`
/// pair; each `pop_front` and the final drop perform the matching `destroy` +
/// `deallocate(ptr, 1)`.
///
/// With the default [`HeapAllocator`] this behaves like any linked list. With a
/// [`FixedAllocator`][1] the list holds at most `capacity` nodes and `push_front`
/// surfaces exhaustion as [`InsufficientCapacity`]. Because the list only ever adds
/// and removes at the front, its node releases happen in exact reverse allocation
/// order - the pattern the pool's stack discipline reclaims fully.
///
/// # Example
///
/// ```rust
/// use std::num::NonZero;
///
/// use fixed_allocator::{FixedAllocator, NodeList};
///
/// let allocator = FixedAllocator::new(NonZero::new(3).unwrap());
/// let mut list = NodeList::with_allocator(&allocator);
///
/// list.push_front(1_u32).unwrap();
/// list.push_front(2).unwrap();
/// list.push_front(3).unwrap();
///
/// // All three pool slots are taken now.
/// assert!(list.push_front(4).is_err());
///
/// assert_eq!(list.iter().copied().collect::<Vec<_>>(), [3, 2, 1]);
///
/// assert_eq!(list.pop_front(), Some(3));
/// assert_eq!(list.len(), 2);
///
/// // The freed slot is available again.
/// list.push_front(5).unwrap();
/// ```
///
/// [1]: crate::FixedAllocator
pub struct NodeList<T, A = HeapAllocator<ListNode<T>>>
where
    A: NodeAllocator<ListNode<T>>,
{
    head: Option<NonNull<ListNode<T>>>,
    length: usize,
    allocator: A,
}

impl<T> NodeList<T> {
    /// Creates an empty list backed by the global heap.
    #[must_use]
    pub fn new() -> Self {
        Self {
            head: None,
            length: 0,
            allocator: HeapAllocator::new(),
        }
    }
}

impl<T> Default for NodeList<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T, A> NodeList<T, A>
where
    A: NodeAllocator<ListNode<T>>,
{
    /// Creates an empty list whose nodes come from the given allocator's
    /// configuration, retargeted to the list's node type.
    ///
    /// The caller configures an allocator for the value type; the list retargets it
    /// to [`ListNode<T>`] while preserving the configuration (for a pool-backed
    /// allocator, its fixed capacity).
    ///
    /// # Example
    ///
    /// ```rust
    /// use std::num::NonZero;
    ///
    /// use fixed_allocator::{FixedAllocator, NodeList};
    ///
    /// let allocator = FixedAllocator::<String>::new(NonZero::new(8).unwrap());
    /// let mut list = NodeList::with_allocator(&allocator);
    ///
    /// list.push_front("first".to_string()).unwrap();
    /// assert_eq!(list.len(), 1);
    /// ```
    #[must_use]
    pub fn with_allocator<P>(value_allocator: &P) -> Self
    where
        P: NodeAllocator<T, Retargeted<ListNode<T>> = A>,
    {
        Self {
            head: None,
            length: 0,
            allocator: value_allocator.retarget::<ListNode<T>>(),
        }
    }

    /// The number of values in the list.
    #[must_use]
    #[cfg_attr(test, mutants::skip)] // Can be mutated to infinitely growing memory use and/or infinite loop.
    pub fn len(&self) -> usize {
        self.length
    }

    /// Whether the list holds no values.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.length == 0
    }

    /// Inserts a value at the front of the list.
    ///
    /// Fails with [`InsufficientCapacity`] when the allocator cannot provide a node,
    /// leaving the list unchanged - running a fixed-capacity list full is a normal,
    /// recoverable outcome.
    pub fn push_front(&mut self, value: T) -> Result<(), InsufficientCapacity> {
        let node_ptr = self.allocator.allocate(1).ok_or(InsufficientCapacity)?;

        // SAFETY: The storage is freshly allocated for exactly one node and is
        // initialized here before anything reads it.
        unsafe {
            self.allocator.construct(
                node_ptr,
                ListNode {
                    next: self.head,
                    value,
                },
            );
        }

        self.head = Some(node_ptr);

        // Cannot overflow: every value occupies memory, bounding the count far
        // below usize::MAX.
        self.length = self.length.wrapping_add(1);

        Ok(())
    }

    /// Removes and returns the value at the front of the list.
    ///
    /// Returns `None` when the list is empty.
    pub fn pop_front(&mut self) -> Option<T> {
        let node_ptr = self.head?;

        // SAFETY: The head node is constructed and exclusively ours via &mut self.
        let next = unsafe { node_ptr.as_ref() }.next;

        // Move the value out of the node without dropping it; the node storage
        // then goes back as raw memory, so no destroy() here.
        // SAFETY: The node is initialized and nothing will read its value field
        // again after this.
        let value = unsafe { (&raw const (*node_ptr.as_ptr()).value).read() };

        // SAFETY: The node came from allocate(1) on this same allocator and is
        // released exactly once.
        unsafe { self.allocator.deallocate(node_ptr, 1) };

        self.head = next;

        // Cannot underflow: the head existed, so at least one value was counted.
        self.length = self.length.wrapping_sub(1);

        Some(value)
    }

    /// Iterates over the values from front to back.
    pub fn iter(&self) -> NodeListIter<'_, T> {
        NodeListIter {
            next: self.head,
            _lifetime: PhantomData,
        }
    }
}

impl<T, A> Drop for NodeList<T, A>
where
    A: NodeAllocator<ListNode<T>>,
{
    fn drop(&mut self) {
        // Head-first teardown: for a front-inserted list this releases nodes in
        // exact reverse allocation order, which a pool-backed allocator reclaims
        // fully.
        let mut current = self.head;

        while let Some(node_ptr) = current {
            // SAFETY: Nodes reachable from the head are constructed and ours alone.
            current = unsafe { node_ptr.as_ref() }.next;

            // SAFETY: The node value is initialized and destroyed exactly once.
            unsafe { self.allocator.destroy(node_ptr) };

            // SAFETY: The node came from allocate(1) on this same allocator.
            unsafe { self.allocator.deallocate(node_ptr, 1) };
        }
    }
}

impl<T, A> std::fmt::Debug for NodeList<T, A>
where
    A: NodeAllocator<ListNode<T>>,
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NodeList")
            .field("length", &self.length)
            .finish_non_exhaustive()
    }
}

// SAFETY: The list exclusively owns its nodes and allocator; moving it to another
// thread moves the stored values and the allocator with it.
unsafe impl<T, A> Send for NodeList<T, A>
where
    T: Send,
    A: NodeAllocator<ListNode<T>> + Send,
{
}

/// Iterator over the values of a [`NodeList`], front to back.
#[derive(Debug)]
pub struct NodeListIter<'a, T> {
    next: Option<NonNull<ListNode<T>>>,
    _lifetime: PhantomData<&'a ListNode<T>>,
}

impl<'a, T> Iterator for NodeListIter<'a, T> {
    type Item = &'a T;

    fn next(&mut self) -> Option<Self::Item> {
        let node_ptr = self.next?;

        // SAFETY: The node outlives the list borrow 'a and no exclusive reference
        // can exist while we hold that borrow.
        let node: &'a ListNode<T> = unsafe { node_ptr.as_ref() };

        self.next = node.next;

        Some(&node.value)
    }
}

impl<'a, T, A> IntoIterator for &'a NodeList<T, A>
where
    A: NodeAllocator<ListNode<T>>,
{
    type Item = &'a T;
    type IntoIter = NodeListIter<'a, T>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
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

    use new_zealand::nz;
    use static_assertions::assert_impl_all;

    use super::*;
    use crate::FixedAllocator;

    assert_impl_all!(NodeList<u32>: Send, std::fmt::Debug, Default);

    #[test]
    fn fresh_list_is_empty() {
        let list = NodeList::<u32>::new();

        assert_eq!(list.len(), 0);
        assert!(list.is_empty());
        assert!(list.iter().next().is_none());
    }

    #[test]
    fn push_and_pop_are_front_ordered() {
        let mut list = NodeList::new();

        list.push_front(1_u32).unwrap();
        list.push_front(2).unwrap();
        list.push_front(3).unwrap();

        assert_eq!(list.len(), 3);
        assert_eq!(list.pop_front(), Some(3));
        assert_eq!(list.pop_front(), Some(2));
        assert_eq!(list.pop_front(), Some(1));
        assert_eq!(list.pop_front(), None);
    }

    #[test]
    fn iteration_visits_front_to_back() {
        let mut list = NodeList::new();

        for value in 0..5_u32 {
            list.push_front(value).unwrap();
        }

        let collected = list.iter().copied().collect::<Vec<_>>();
        assert_eq!(collected, [4, 3, 2, 1, 0]);

        // The for-loop form works too.
        let mut count = 0;
        for _value in &list {
            count += 1;
        }
        assert_eq!(count, 5);
    }

    #[test]
    fn pool_backed_list_respects_the_fixed_capacity() {
        let allocator = FixedAllocator::new(nz!(3));
        let mut list = NodeList::with_allocator(&allocator);

        for value in 0..3_u32 {
            list.push_front(value).unwrap();
        }

        assert_eq!(list.push_front(3), Err(InsufficientCapacity));
        assert_eq!(list.len(), 3);

        // Popping frees the most recently allocated node, so the slot is reusable.
        assert_eq!(list.pop_front(), Some(2));
        list.push_front(9).unwrap();
        assert_eq!(list.iter().copied().collect::<Vec<_>>(), [9, 1, 0]);
    }

    #[test]
    fn pool_backed_list_can_cycle_through_full_capacity_repeatedly() {
        let allocator = FixedAllocator::new(nz!(4));
        let mut list = NodeList::with_allocator(&allocator);

        for _round in 0..3 {
            for value in 0..4_u32 {
                list.push_front(value).unwrap();
            }

            assert!(list.push_front(99).is_err());

            while list.pop_front().is_some() {}
            assert!(list.is_empty());
        }
    }

    #[test]
    fn dropping_the_list_drops_the_values() {
        struct DropCounter {
            drops: Rc<Cell<usize>>,
        }

        impl Drop for DropCounter {
            fn drop(&mut self) {
                self.drops.set(self.drops.get() + 1);
            }
        }

        let drops = Rc::new(Cell::new(0));

        {
            let mut list = NodeList::new();
            for _ in 0..3 {
                list.push_front(DropCounter {
                    drops: Rc::clone(&drops),
                })
                .unwrap();
            }
            assert_eq!(drops.get(), 0);
        }

        assert_eq!(drops.get(), 3);
    }

    #[test]
    fn pop_front_does_not_double_drop() {
        let mut list = NodeList::new();
        list.push_front("only".to_string()).unwrap();

        let value = list.pop_front().unwrap();
        assert_eq!(value, "only");

        // Dropping the now-empty list must not touch the popped value's storage.
        drop(list);
        assert_eq!(value, "only");
    }

    #[test]
    fn string_values_survive_pooling() {
        let allocator = FixedAllocator::<String>::new(nz!(2));
        let mut list = NodeList::with_allocator(&allocator);

        list.push_front("alpha".to_string()).unwrap();
        list.push_front("beta".to_string()).unwrap();

        assert_eq!(
            list.iter().map(String::as_str).collect::<Vec<_>>(),
            ["beta", "alpha"]
        );
    }
}
