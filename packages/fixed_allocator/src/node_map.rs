use std::cmp::Ordering;
use std::marker::PhantomData;
use std::mem;
use std::ptr::NonNull;

use crate::{HeapAllocator, InsufficientCapacity, NodeAllocator};

/// One node of a [`NodeMap`]: the forward link plus a key-value pair.
///
/// Public solely so that allocator type parameters can name it; the fields belong
/// to the containing map.
#[derive(Debug)]
pub struct MapNode<K, V> {
    next: Option<NonNull<MapNode<K, V>>>,
    key: K,
    value: V,
}

/// An ordered key-value map over allocator-provided nodes.
///
/// Entries are kept as a singly-linked chain sorted by key, one node per entry. The
/// interesting part is not the lookup performance (it is linear) but the allocator
/// interaction: the caller configures an allocator for the *pair* type and the map
/// retargets it to its internal node type, preserving the configured capacity -
/// exactly the rebind dance a standard map performs with its allocator.
///
/// Inserting a new key costs one `allocate(1)` + `construct`; inserting over an
/// existing key replaces the value in place and needs no node at all. When a
/// pool-backed allocator runs out of slots, [`insert()`](Self::insert) fails with
/// [`InsufficientCapacity`] and the map is left unchanged.
///
/// # Pool reclamation caveat
///
/// Map nodes are released in key order at drop, not in reverse allocation order, so
/// a pool-backed allocator will typically reclaim only a suffix of them early and
/// leave the rest issued. That is harmless: the slots are never corrupted and the
/// pool buffer is released wholesale when the map (and with it the allocator) is
/// dropped. It does mean a long-lived map should not be drained and refilled while
/// expecting every slot back; the fixed capacity binds the map's lifetime total
/// only loosely once entries leave out of order.
///
/// # Example
///
/// ```rust
/// use std::num::NonZero;
///
/// use fixed_allocator::{FixedAllocator, NodeMap};
///
/// let allocator = FixedAllocator::<(u32, &str)>::new(NonZero::new(4).unwrap());
/// let mut map = NodeMap::with_allocator(&allocator);
///
/// map.insert(2, "two").unwrap();
/// map.insert(1, "one").unwrap();
/// map.insert(3, "three").unwrap();
///
/// // Iteration is in key order regardless of insertion order.
/// let keys = map.iter().map(|(key, _)| *key).collect::<Vec<_>>();
/// assert_eq!(keys, [1, 2, 3]);
///
/// // Replacing a value reuses the existing node.
/// let previous = map.insert(2, "TWO").unwrap();
/// assert_eq!(previous, Some("two"));
/// assert_eq!(map.get(&2), Some(&"TWO"));
/// ```
pub struct NodeMap<K, V, A = HeapAllocator<MapNode<K, V>>>
where
    K: Ord,
    A: NodeAllocator<MapNode<K, V>>,
{
    head: Option<NonNull<MapNode<K, V>>>,
    length: usize,
    allocator: A,
}

impl<K, V> NodeMap<K, V>
where
    K: Ord,
{
    /// Creates an empty map backed by the global heap.
    #[must_use]
    pub fn new() -> Self {
        Self {
            head: None,
            length: 0,
            allocator: HeapAllocator::new(),
        }
    }
}

impl<K, V> Default for NodeMap<K, V>
where
    K: Ord,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<K, V, A> NodeMap<K, V, A>
where
    K: Ord,
    A: NodeAllocator<MapNode<K, V>>,
{
    /// Creates an empty map whose nodes come from the given allocator's
    /// configuration, retargeted to the map's node type.
    ///
    /// # Example
    ///
    /// ```rust
    /// use std::num::NonZero;
    ///
    /// use fixed_allocator::{FixedAllocator, NodeMap};
    ///
    /// let allocator = FixedAllocator::<(u32, u64)>::new(NonZero::new(10).unwrap());
    /// let mut map = NodeMap::with_allocator(&allocator);
    ///
    /// map.insert(1_u32, 100_u64).unwrap();
    /// ```
    #[must_use]
    pub fn with_allocator<P>(pair_allocator: &P) -> Self
    where
        P: NodeAllocator<(K, V), Retargeted<MapNode<K, V>> = A>,
    {
        Self {
            head: None,
            length: 0,
            allocator: pair_allocator.retarget::<MapNode<K, V>>(),
        }
    }

    /// The number of entries in the map.
    #[must_use]
    #[cfg_attr(test, mutants::skip)] // Can be mutated to infinitely growing memory use and/or infinite loop.
    pub fn len(&self) -> usize {
        self.length
    }

    /// Whether the map holds no entries.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.length == 0
    }

    /// Inserts a key-value pair, returning the previous value for the key if any.
    ///
    /// A new key needs a node from the allocator; when that fails the map is left
    /// unchanged and the error carries the exhaustion to the caller. Overwriting an
    /// existing key replaces the value in place and cannot fail.
    pub fn insert(&mut self, key: K, value: V) -> Result<Option<V>, InsufficientCapacity> {
        // Walk to the first entry with a key not less than the new one, tracking
        // the link that will have to point at the new node.
        let mut link: *mut Option<NonNull<MapNode<K, V>>> = &raw mut self.head;

        loop {
            // SAFETY: The link points either at self.head or at the next field of
            // a live node; both are valid while we hold &mut self.
            let Some(node_ptr) = (unsafe { *link }) else {
                break;
            };

            // SAFETY: Nodes reachable from the head are constructed and ours alone.
            let node = unsafe { &mut *node_ptr.as_ptr() };

            match node.key.cmp(&key) {
                Ordering::Less => {
                    link = &raw mut node.next;
                }
                Ordering::Equal => {
                    return Ok(Some(mem::replace(&mut node.value, value)));
                }
                Ordering::Greater => break,
            }
        }

        let node_ptr = self.allocator.allocate(1).ok_or(InsufficientCapacity)?;

        // SAFETY: The link is still valid; nothing mutated the chain since the walk.
        let next = unsafe { *link };

        // SAFETY: The storage is freshly allocated for exactly one node and is
        // initialized here before anything reads it.
        unsafe {
            self.allocator.construct(node_ptr, MapNode { next, key, value });
        }

        // SAFETY: Writing the link splices the node into the chain; the location
        // is valid per the walk above.
        unsafe {
            *link = Some(node_ptr);
        }

        // Cannot overflow: every entry occupies memory, bounding the count far
        // below usize::MAX.
        self.length = self.length.wrapping_add(1);

        Ok(None)
    }

    /// Returns a reference to the value for the given key, if present.
    #[must_use]
    pub fn get(&self, key: &K) -> Option<&V> {
        let mut current = self.head;

        while let Some(node_ptr) = current {
            // SAFETY: Nodes reachable from the head are constructed, and the shared
            // borrow of the map keeps them alive and un-mutated.
            let node = unsafe { node_ptr.as_ref() };

            match node.key.cmp(key) {
                Ordering::Less => current = node.next,
                Ordering::Equal => return Some(&node.value),
                // The chain is sorted; anything further is greater too.
                Ordering::Greater => return None,
            }
        }

        None
    }

    /// Iterates over the entries in ascending key order.
    pub fn iter(&self) -> NodeMapIter<'_, K, V> {
        NodeMapIter {
            next: self.head,
            _lifetime: PhantomData,
        }
    }
}

impl<K, V, A> Drop for NodeMap<K, V, A>
where
    K: Ord,
    A: NodeAllocator<MapNode<K, V>>,
{
    fn drop(&mut self) {
        let mut current = self.head;

        while let Some(node_ptr) = current {
            // SAFETY: Nodes reachable from the head are constructed and ours alone.
            current = unsafe { node_ptr.as_ref() }.next;

            // SAFETY: The node's pair is initialized and destroyed exactly once.
            unsafe { self.allocator.destroy(node_ptr) };

            // SAFETY: The node came from allocate(1) on this same allocator.
            unsafe { self.allocator.deallocate(node_ptr, 1) };
        }
    }
}

impl<K, V, A> std::fmt::Debug for NodeMap<K, V, A>
where
    K: Ord,
    A: NodeAllocator<MapNode<K, V>>,
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NodeMap")
            .field("length", &self.length)
            .finish_non_exhaustive()
    }
}

// SAFETY: The map exclusively owns its nodes and allocator; moving it to another
// thread moves the stored entries and the allocator with it.
unsafe impl<K, V, A> Send for NodeMap<K, V, A>
where
    K: Ord + Send,
    V: Send,
    A: NodeAllocator<MapNode<K, V>> + Send,
{
}

/// Iterator over the entries of a [`NodeMap`] in ascending key order.
#[derive(Debug)]
pub struct NodeMapIter<'a, K, V> {
    next: Option<NonNull<MapNode<K, V>>>,
    _lifetime: PhantomData<&'a MapNode<K, V>>,
}

impl<'a, K, V> Iterator for NodeMapIter<'a, K, V> {
    type Item = (&'a K, &'a V);

    fn next(&mut self) -> Option<Self::Item> {
        let node_ptr = self.next?;

        // SAFETY: The node outlives the map borrow 'a and no exclusive reference
        // can exist while we hold that borrow.
        let node: &'a MapNode<K, V> = unsafe { node_ptr.as_ref() };

        self.next = node.next;

        Some((&node.key, &node.value))
    }
}

impl<'a, K, V, A> IntoIterator for &'a NodeMap<K, V, A>
where
    K: Ord,
    A: NodeAllocator<MapNode<K, V>>,
{
    type Item = (&'a K, &'a V);
    type IntoIter = NodeMapIter<'a, K, V>;

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
    use new_zealand::nz;
    use static_assertions::assert_impl_all;

    use super::*;
    use crate::FixedAllocator;

    assert_impl_all!(NodeMap<u32, String>: Send, std::fmt::Debug, Default);

    #[test]
    fn fresh_map_is_empty() {
        let map = NodeMap::<u32, u32>::new();

        assert_eq!(map.len(), 0);
        assert!(map.is_empty());
        assert!(map.get(&1).is_none());
    }

    #[test]
    fn entries_iterate_in_key_order() {
        let mut map = NodeMap::new();

        for key in [5_u32, 1, 4, 2, 3] {
            map.insert(key, key * 10).unwrap();
        }

        let keys = map.iter().map(|(key, _)| *key).collect::<Vec<_>>();
        assert_eq!(keys, [1, 2, 3, 4, 5]);

        let values = map.iter().map(|(_, value)| *value).collect::<Vec<_>>();
        assert_eq!(values, [10, 20, 30, 40, 50]);
    }

    #[test]
    fn insert_over_existing_key_replaces_in_place() {
        let mut map = NodeMap::new();

        assert_eq!(map.insert(7_u32, "old"), Ok(None));
        assert_eq!(map.insert(7, "new"), Ok(Some("old")));

        assert_eq!(map.len(), 1);
        assert_eq!(map.get(&7), Some(&"new"));
    }

    #[test]
    fn get_finds_present_and_misses_absent_keys() {
        let mut map = NodeMap::new();

        map.insert(2_u32, "two").unwrap();
        map.insert(4, "four").unwrap();

        assert_eq!(map.get(&2), Some(&"two"));
        assert_eq!(map.get(&4), Some(&"four"));
        assert!(map.get(&1).is_none());
        assert!(map.get(&3).is_none());
        assert!(map.get(&5).is_none());
    }

    #[test]
    fn pool_backed_map_holds_exactly_capacity_entries() {
        let allocator = FixedAllocator::<(u32, u64)>::new(nz!(10));
        let mut map = NodeMap::with_allocator(&allocator);

        // All ten entries come out of the pre-allocated pool buffer.
        for key in 0..10_u32 {
            map.insert(key, u64::from(key)).unwrap();
        }
        assert_eq!(map.len(), 10);

        // The eleventh distinct key needs an eleventh node; the pool has none and
        // the failure surfaces instead of spilling to the heap.
        assert_eq!(map.insert(10, 10), Err(InsufficientCapacity));
        assert_eq!(map.len(), 10);

        // Existing keys can still be updated: no new node is needed.
        assert_eq!(map.insert(3, 333), Ok(Some(3)));
        assert_eq!(map.get(&3), Some(&333));
    }

    #[test]
    fn retargeting_preserves_capacity_for_the_node_type() {
        // The caller configures capacity for the pair type; the map's nodes are a
        // different, larger type, yet the capacity carries over.
        let allocator = FixedAllocator::<(u8, u8)>::new(nz!(3));
        let mut map = NodeMap::with_allocator(&allocator);

        for key in 0..3_u8 {
            map.insert(key, key).unwrap();
        }

        assert_eq!(map.insert(3, 3), Err(InsufficientCapacity));
    }

    #[test]
    fn dropping_the_map_drops_all_entries() {
        use std::cell::Cell;
        use std::rc::Rc;

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
            let mut map = NodeMap::new();
            for key in 0..4_u32 {
                map.insert(
                    key,
                    DropCounter {
                        drops: Rc::clone(&drops),
                    },
                )
                .unwrap();
            }
        }

        assert_eq!(drops.get(), 4);
    }

    #[test]
    fn string_keys_and_values_work() {
        let mut map = NodeMap::new();

        map.insert("banana".to_string(), 2_u32).unwrap();
        map.insert("apple".to_string(), 1).unwrap();
        map.insert("cherry".to_string(), 3).unwrap();

        let keys = map.iter().map(|(key, _)| key.as_str()).collect::<Vec<_>>();
        assert_eq!(keys, ["apple", "banana", "cherry"]);
    }
}
