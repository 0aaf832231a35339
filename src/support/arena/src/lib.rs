#![no_std]

/*
    =======================  support/arena/src/lib.rs  ========================
    Index-based arenas used to store linker state without reference cycles
    ---------------------------------------------------------------------------
*/

mod arena;
mod id;
mod idx;
mod impl_id;
mod map;
mod new_id;

extern crate alloc;

pub use arena::Arena;
pub use id::Id;
pub use idx::Idx;
pub use map::{ArenaMap, IntoRaw};
pub use new_id::NewId;
