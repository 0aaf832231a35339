/*
    ===================  representations/klib/src/lib.rs  ====================
    Packaged IR libraries: the accessor trait, the on-disk container, record
    formats, and a builder for producing libraries
    ---------------------------------------------------------------------------
*/

mod builder;
mod error;
mod in_memory;
mod library;
mod records;

pub use builder::{FileBuilder, LibraryBuilder};
pub use error::{LibraryError, Section};
pub use in_memory::{FORMAT_VERSION, InMemoryLibrary, MAGIC, ReadStats};
pub use library::{IrLibrary, LibraryFile};
pub use records::*;
