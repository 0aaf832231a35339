use ir_tree::{IdSignature, SymbolError, SymbolKind};
use klib::LibraryError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum LinkError {
    #[error(
        "Signature '{signature}' is not declared by module '{module}' or its dependencies (searched {})",
        .searched.join(", ")
    )]
    SignatureNotFound {
        signature: IdSignature,
        module: String,
        searched: Vec<String>,
    },
    #[error("Symbol '{signature}' is a {found}, but a {expected} was expected")]
    SymbolKindMismatch {
        signature: IdSignature,
        expected: SymbolKind,
        found: SymbolKind,
    },
    #[error(
        "Signature '{signature}' is declared by more than one module visible from '{module}': {}",
        .candidates.join(", ")
    )]
    AmbiguousSignature {
        signature: IdSignature,
        module: String,
        candidates: Vec<String>,
    },
    #[error("Body of expect '{signature}' was requested before it was linked to an actual")]
    UnretargetedExpect { signature: IdSignature },
    #[error(transparent)]
    Symbol(#[from] SymbolError),
    #[error("No module named '{name}'")]
    NoModuleNamed { name: String },
    #[error("Module '{name}' is already registered")]
    DuplicateModule { name: String },
    #[error("No signature '{signature}' in module '{module}'")]
    SignatureNotInModule {
        signature: IdSignature,
        module: String,
    },
    #[error("Signature '{signature}' has to be top level")]
    NotTopLevel { signature: IdSignature },
    #[error("Module '{module}' has no declaration index for '{signature}'")]
    MissingDeclarationIndex {
        signature: IdSignature,
        module: String,
    },
    #[error("Unexpected declaration for '{signature}': {reason}")]
    UnexpectedDeclaration {
        signature: IdSignature,
        reason: String,
    },
    #[error("Module '{module}' has no library to read from")]
    NoLibrary { module: String },
    #[error(transparent)]
    Library(#[from] LibraryError),
}
