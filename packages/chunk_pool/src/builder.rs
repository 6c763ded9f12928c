use std::marker::PhantomData;
use std::num::NonZero;

use crate::ChunkPool;

/// Builder for creating an instance of [`ChunkPool`].
///
/// The pool capacity is fixed for the lifetime of the pool, so it must be specified
/// here before calling `.build()`. There is no default capacity.
///
/// # Examples
///
/// ```
/// use std::num::NonZero;
///
/// use chunk_pool::ChunkPool;
///
/// let pool = ChunkPool::<u32>::builder()
///     .capacity(NonZero::new(16).unwrap())
///     .build();
///
/// assert_eq!(pool.capacity().get(), 16);
/// ```
#[must_use]
pub struct ChunkPoolBuilder<T> {
    capacity: Option<NonZero<usize>>,

    _item: PhantomData<T>,
}

impl<T> std::fmt::Debug for ChunkPoolBuilder<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChunkPoolBuilder")
            .field(
                "item_type",
                &std::format_args!("{}", std::any::type_name::<T>()),
            )
            .field("capacity", &self.capacity)
            .finish()
    }
}

impl<T> ChunkPoolBuilder<T> {
    pub(crate) fn new() -> Self {
        Self {
            capacity: None,
            _item: PhantomData,
        }
    }

    /// Sets the number of slots the pool will hold.
    ///
    /// The whole buffer is allocated up front by `.build()` and never grows afterward.
    ///
    /// # Examples
    ///
    /// ```
    /// use std::num::NonZero;
    ///
    /// use chunk_pool::ChunkPool;
    ///
    /// let pool = ChunkPool::<String>::builder()
    ///     .capacity(NonZero::new(8).unwrap())
    ///     .build();
    /// ```
    pub fn capacity(mut self, capacity: NonZero<usize>) -> Self {
        self.capacity = Some(capacity);
        self
    }

    /// Builds the chunk pool with the specified configuration.
    ///
    /// # Panics
    ///
    /// Panics if no capacity has been set via [`capacity()`](Self::capacity)
    /// or if `T` is zero-sized.
    ///
    /// # Examples
    ///
    /// ```
    /// use std::num::NonZero;
    ///
    /// use chunk_pool::ChunkPool;
    ///
    /// let pool = ChunkPool::<u32>::builder()
    ///     .capacity(NonZero::new(4).unwrap())
    ///     .build();
    /// ```
    #[must_use]
    pub fn build(self) -> ChunkPool<T> {
        let capacity = self
            .capacity
            .expect("capacity must be set using .capacity() before calling .build()");

        ChunkPool::new_inner(capacity)
    }
}

#[cfg(test)]
mod tests {
    use static_assertions::{assert_impl_all, assert_not_impl_any};

    use super::*;

    assert_impl_all!(ChunkPoolBuilder<u32>: Send, std::fmt::Debug);
    assert_not_impl_any!(ChunkPoolBuilder<*const u32>: Send);

    #[test]
    fn builder_new_creates_default_state() {
        let builder = ChunkPoolBuilder::<u32>::new();
        assert!(builder.capacity.is_none());
    }

    #[test]
    fn capacity_sets_capacity_correctly() {
        let builder = ChunkPoolBuilder::<u32>::new().capacity(NonZero::new(7).unwrap());
        assert_eq!(builder.capacity, NonZero::new(7));
    }

    #[test]
    fn capacity_can_be_overridden() {
        let builder = ChunkPoolBuilder::<u32>::new()
            .capacity(NonZero::new(7).unwrap())
            .capacity(NonZero::new(9).unwrap());
        assert_eq!(builder.capacity, NonZero::new(9));
    }

    #[test]
    fn build_with_capacity_succeeds() {
        let pool = ChunkPoolBuilder::<u64>::new()
            .capacity(NonZero::new(3).unwrap())
            .build();

        assert_eq!(pool.capacity().get(), 3);
        assert_eq!(pool.len(), 0);
    }

    #[test]
    #[should_panic]
    fn build_without_capacity_panics() {
        let _pool = ChunkPoolBuilder::<u64>::new().build();
    }

    #[test]
    #[should_panic]
    fn build_with_zero_sized_item_panics() {
        let _pool = ChunkPoolBuilder::<()>::new()
            .capacity(NonZero::new(3).unwrap())
            .build();
    }

    #[test]
    fn builder_is_debug() {
        let builder = ChunkPoolBuilder::<u32>::new().capacity(NonZero::new(2).unwrap());
        let debug_output = format!("{builder:?}");
        assert!(debug_output.contains("ChunkPoolBuilder"));
        assert!(debug_output.contains("u32"));
    }
}
