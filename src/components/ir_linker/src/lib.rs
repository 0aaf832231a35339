/*
    ===================  components/ir_linker/src/lib.rs  =====================
    Lazily links declarations across serialized IR libraries
    ---------------------------------------------------------------------------
*/

mod builtins;
mod decode;
mod error;
mod expect_actual;
mod extension;
mod fake_override;
mod file_state;
mod linker;
mod module_deserializer;
mod modules;
mod options;
mod signature_decoder;
mod state;
mod symbol_table;

pub use builtins::{BUILTINS_PACKAGE, BuiltIns};
pub use decode::{DecodeContext, DeclarationDecoder, RecordDecoder};
pub use error::LinkError;
pub use expect_actual::ExpectActualTable;
pub use extension::{ExtensionContext, LinkerExtension};
pub use fake_override::{
    FakeOverrideBuilder, FakeOverrideContext, InheritedMembers, member_signature,
};
pub use file_state::FileState;
pub use linker::{CurrentModule, Linker};
pub use module_deserializer::{ActualPairs, ModuleDeserializer};
pub use modules::Modules;
pub use options::{AmbiguityPolicy, DeserializationStrategy, LinkOptions};
pub use signature_decoder::SignatureDecoder;
pub use state::{LinkState, SESSION_SCOPE};
pub use symbol_table::{Access, SymbolTable};
