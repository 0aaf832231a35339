use crate::{Id, Idx};
use alloc::vec::Vec;
use core::{
    fmt,
    marker::PhantomData,
    ops::{Index, IndexMut},
};

/// Append-only storage addressed by strongly typed [`Idx`] handles.
///
/// Values are never removed, so a handle stays valid for as long as the
/// arena lives. This is what lets the linker refer to symbols and
/// declarations by index instead of by reference.
pub struct Arena<K: Id, V> {
    data: Vec<V>,
    phantom: PhantomData<K>,
}

impl<K: Id, V> Arena<K, V> {
    /// Creates a new empty arena.
    ///
    /// ```
    /// # use arena::Arena;
    /// let arena: Arena<u32, i32> = Arena::new();
    /// assert!(arena.is_empty());
    /// ```
    #[inline]
    pub const fn new() -> Self {
        Self {
            data: Vec::new(),
            phantom: PhantomData,
        }
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.data.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Allocates a value and returns its handle.
    ///
    /// # Panics
    ///
    /// Panics when the key type cannot address another value.
    ///
    /// ```
    /// # use arena::Arena;
    /// let mut arena = Arena::<u32, _>::new();
    /// let first = arena.alloc("foo");
    /// let second = arena.alloc("bar");
    /// assert_eq!(arena[first], "foo");
    /// assert_eq!(arena[second], "bar");
    /// assert_eq!(arena.len(), 2);
    /// ```
    #[inline]
    pub fn alloc(&mut self, value: V) -> Idx<K, V> {
        self.try_alloc(value).expect("arena is full")
    }

    /// Fallible version of [`Arena::alloc`].
    #[inline]
    pub fn try_alloc(&mut self, value: V) -> Option<Idx<K, V>> {
        if self.data.len() < K::MAX {
            let raw = K::from_usize(self.data.len());
            self.data.push(value);
            Some(Idx::from_raw(raw))
        } else {
            None
        }
    }

    /// Handle that the next call to [`Arena::alloc`] will return.
    #[inline]
    pub fn next_idx(&self) -> Idx<K, V> {
        Idx::from_raw(K::from_usize(self.data.len()))
    }

    #[inline]
    pub fn get(&self, idx: Idx<K, V>) -> Option<&V> {
        self.data.get(idx.raw.into_usize())
    }

    #[inline]
    pub fn get_mut(&mut self, idx: Idx<K, V>) -> Option<&mut V> {
        self.data.get_mut(idx.raw.into_usize())
    }

    /// Iterates over handles and values in allocation order.
    ///
    /// ```
    /// # use arena::Arena;
    /// let mut arena = Arena::<u32, _>::new();
    /// let a = arena.alloc(20);
    /// let b = arena.alloc(40);
    ///
    /// let mut iter = arena.iter();
    /// assert_eq!(iter.next(), Some((a, &20)));
    /// assert_eq!(iter.next(), Some((b, &40)));
    /// assert_eq!(iter.next(), None);
    /// ```
    #[inline]
    pub fn iter(&self) -> impl DoubleEndedIterator<Item = (Idx<K, V>, &V)> {
        self.data
            .iter()
            .enumerate()
            .map(|(index, value)| (Idx::from_raw(K::from_usize(index)), value))
    }

    #[inline]
    pub fn iter_mut(&mut self) -> impl DoubleEndedIterator<Item = (Idx<K, V>, &mut V)> {
        self.data
            .iter_mut()
            .enumerate()
            .map(|(index, value)| (Idx::from_raw(K::from_usize(index)), value))
    }

    #[inline]
    pub fn keys(&self) -> impl DoubleEndedIterator<Item = Idx<K, V>> + use<K, V> {
        (0..self.data.len()).map(|index| Idx::from_raw(K::from_usize(index)))
    }

    #[inline]
    pub fn values(&self) -> impl DoubleEndedIterator<Item = &V> {
        self.data.iter()
    }
}

impl<K: Id, V: Default> Arena<K, V> {
    /// Allocates default values until `raw` is addressable.
    #[inline]
    pub fn grow_to_fit(&mut self, raw: K) -> Idx<K, V> {
        let index = raw.into_usize();

        while self.data.len() <= index {
            self.data.push(V::default());
        }

        Idx::from_raw(raw)
    }
}

impl<K: Id, V> Default for Arena<K, V> {
    #[inline]
    fn default() -> Self {
        Self::new()
    }
}

impl<K: Id, V> Index<Idx<K, V>> for Arena<K, V> {
    type Output = V;

    #[inline]
    fn index(&self, idx: Idx<K, V>) -> &Self::Output {
        &self.data[idx.raw.into_usize()]
    }
}

impl<K: Id, V> IndexMut<Idx<K, V>> for Arena<K, V> {
    #[inline]
    fn index_mut(&mut self, idx: Idx<K, V>) -> &mut Self::Output {
        &mut self.data[idx.raw.into_usize()]
    }
}

impl<K: Id, V: Clone> Clone for Arena<K, V> {
    #[inline]
    fn clone(&self) -> Self {
        Self {
            data: self.data.clone(),
            phantom: PhantomData,
        }
    }
}

impl<K: Id, V: fmt::Debug> fmt::Debug for Arena<K, V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Arena")
            .field("len", &self.len())
            .field("data", &self.data)
            .finish()
    }
}
