/*
    =================  representations/ir_tree/src/lib.rs  ====================
    In-memory declaration trees reconstructed from serialized libraries
    ---------------------------------------------------------------------------
*/

mod declaration;
mod file;
mod signature;
mod symbol;

use arena::{Idx, new_id_with_niche};
pub use declaration::*;
pub use file::*;
pub use signature::*;
pub use symbol::*;

new_id_with_niche!(SymbolId, u64);
new_id_with_niche!(ModuleId, u32);
new_id_with_niche!(FileId, u32);
new_id_with_niche!(DeclId, u64);

pub type SymbolRef = Idx<SymbolId, Symbol>;
pub type FileRef = Idx<FileId, IrFile>;
pub type DeclRef = Idx<DeclId, Declaration>;

/// Location of a declaration: the module arena it lives in, and its slot.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct DeclHandle {
    pub module: ModuleId,
    pub decl: DeclRef,
}

impl DeclHandle {
    pub fn new(module: ModuleId, decl: DeclRef) -> Self {
        Self { module, decl }
    }
}
