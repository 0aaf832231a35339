use crate::Id;
use core::{
    cmp::Ordering,
    fmt,
    hash::{Hash, Hasher},
    marker::PhantomData,
};

/// Handle to a value of type `V` living in an arena keyed by `K`.
///
/// ```
/// use arena::{Arena, Idx};
///
/// let mut arena: Arena<u32, &str> = Arena::new();
/// let idx: Idx<u32, &str> = arena.alloc("hello");
/// assert_eq!(Idx::<u32, &str>::from_raw(idx.into_raw()), idx);
/// ```
pub struct Idx<K: Id, V> {
    pub(crate) raw: K,
    pub(crate) phantom: PhantomData<fn() -> V>,
}

impl<K: Id, V> Idx<K, V> {
    /// Recreates a handle from its raw key.
    ///
    /// Used when two arenas are allocated in lockstep and share keys.
    #[inline]
    pub const fn from_raw(raw: K) -> Self {
        Self {
            raw,
            phantom: PhantomData,
        }
    }

    #[inline]
    pub fn into_raw(self) -> K {
        self.raw
    }
}

impl<K: Id, V> Clone for Idx<K, V> {
    #[inline]
    fn clone(&self) -> Self {
        *self
    }
}

impl<K: Id, V> Copy for Idx<K, V> {}

impl<K: Id, V> PartialEq for Idx<K, V> {
    #[inline]
    fn eq(&self, other: &Self) -> bool {
        self.raw == other.raw
    }
}

impl<K: Id, V> Eq for Idx<K, V> {}

impl<K: Id, V> PartialOrd for Idx<K, V> {
    #[inline]
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl<K: Id, V> Ord for Idx<K, V> {
    #[inline]
    fn cmp(&self, other: &Self) -> Ordering {
        self.raw.cmp(&other.raw)
    }
}

impl<K: Id + Hash, V> Hash for Idx<K, V> {
    #[inline]
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.raw.hash(state)
    }
}

impl<K: Id, V> fmt::Debug for Idx<K, V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut value_name = core::any::type_name::<V>();
        if let Some(idx) = value_name.rfind(':') {
            value_name = &value_name[idx + 1..];
        }
        write!(f, "Idx::<{}>({})", value_name, self.raw.into_usize())
    }
}
