use crate::{Arena, Id, Idx};

/// Sparse side table keyed by the handles of another arena.
///
/// ```
/// use arena::{Arena, ArenaMap};
///
/// let mut names = Arena::<u32, &str>::new();
/// let a = names.alloc("a");
/// let b = names.alloc("b");
///
/// let mut lengths = ArenaMap::<u32, usize>::new();
/// lengths.insert(b, 1);
/// assert_eq!(lengths.get(a), None);
/// assert_eq!(lengths.get(b), Some(&1));
/// ```
#[derive(Clone, Debug)]
pub struct ArenaMap<K: Id, V> {
    arena: Arena<K, Option<V>>,
}

impl<K: Id, V> Default for ArenaMap<K, V> {
    fn default() -> Self {
        Self {
            arena: Default::default(),
        }
    }
}

impl<K: Id, V> ArenaMap<K, V> {
    #[inline]
    pub fn new() -> Self {
        Self {
            arena: Arena::new(),
        }
    }

    #[inline]
    pub fn contains_key(&self, key: impl IntoRaw<K>) -> bool {
        self.get(key).is_some()
    }

    #[inline]
    pub fn insert(&mut self, key: impl IntoRaw<K>, value: V) -> Option<V> {
        let idx = self.arena.grow_to_fit(key.into_raw());
        core::mem::replace(&mut self.arena[idx], Some(value))
    }

    #[inline]
    pub fn get(&self, key: impl IntoRaw<K>) -> Option<&V> {
        self.arena
            .get(Idx::from_raw(key.into_raw()))
            .and_then(Option::as_ref)
    }

    #[inline]
    pub fn get_mut(&mut self, key: impl IntoRaw<K>) -> Option<&mut V> {
        self.arena
            .get_mut(Idx::from_raw(key.into_raw()))
            .and_then(Option::as_mut)
    }

    #[inline]
    pub fn iter(&self) -> impl Iterator<Item = (K, &V)> {
        self.arena
            .iter()
            .filter_map(|(idx, value)| value.as_ref().map(|value| (idx.into_raw(), value)))
    }

    #[inline]
    pub fn values_mut(&mut self) -> impl Iterator<Item = &mut V> {
        self.arena
            .iter_mut()
            .filter_map(|(_, value)| value.as_mut())
    }
}

/// Anything that can name a slot of an [`ArenaMap`].
pub trait IntoRaw<K: Id> {
    fn into_raw(self) -> K;
}

impl<K: Id> IntoRaw<K> for K {
    fn into_raw(self) -> K {
        self
    }
}

impl<K: Id, V> IntoRaw<K> for Idx<K, V> {
    fn into_raw(self) -> K {
        Idx::into_raw(self)
    }
}
