use core::fmt::Debug;

/// Raw key type of an arena.
///
/// Different key types keep handles into unrelated arenas from being mixed
/// up, even when they share the same numeric representation.
pub trait Id: Copy + Ord + Debug {
    /// Number of distinct keys this type can address.
    const MAX: usize;

    /// Creates a key from a position, which must be below `Self::MAX`.
    fn from_usize(idx: usize) -> Self;

    /// Position that this key addresses.
    fn into_usize(self) -> usize;
}
