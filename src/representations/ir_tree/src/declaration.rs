use crate::{DeclRef, FileRef, SymbolKind, SymbolRef};
use derive_more::IsVariant;

#[derive(Clone, Debug)]
pub struct Declaration {
    pub symbol: SymbolRef,
    pub name: String,
    pub kind: DeclKind,
    pub origin: DeclOrigin,
    pub is_expect: bool,
    pub file: FileRef,
    pub parent: DeclParent,
    pub members: Vec<DeclRef>,
    pub debug_info: Option<String>,
}

impl Declaration {
    pub fn symbol_kind(&self) -> SymbolKind {
        self.kind.symbol_kind()
    }

    pub fn body(&self) -> Option<&Body> {
        match &self.kind {
            DeclKind::Function(callable) | DeclKind::Constructor(callable) => {
                callable.body.as_ref()
            }
            DeclKind::Property { initializer, .. } => initializer.as_ref(),
            DeclKind::Class { .. } | DeclKind::TypeAlias { .. } | DeclKind::EnumEntry => None,
        }
    }

    pub fn is_fake_override(&self) -> bool {
        self.origin.is_fake_override()
    }
}

#[derive(Clone, Debug, IsVariant)]
pub enum DeclKind {
    Class { supertypes: Vec<IrType> },
    Constructor(Callable),
    Function(Callable),
    Property {
        ty: IrType,
        initializer: Option<Body>,
    },
    TypeAlias { expanded: IrType },
    EnumEntry,
}

impl DeclKind {
    pub fn symbol_kind(&self) -> SymbolKind {
        match self {
            Self::Class { .. } => SymbolKind::Class,
            Self::Constructor(_) => SymbolKind::Constructor,
            Self::Function(_) => SymbolKind::Function,
            Self::Property { .. } => SymbolKind::Property,
            Self::TypeAlias { .. } => SymbolKind::TypeAlias,
            Self::EnumEntry => SymbolKind::EnumEntry,
        }
    }

    pub fn supertypes(&self) -> &[IrType] {
        match self {
            Self::Class { supertypes } => supertypes,
            _ => &[],
        }
    }
}

#[derive(Clone, Debug)]
pub struct Callable {
    pub params: Vec<IrType>,
    pub return_type: IrType,
    pub is_inline: bool,
    pub body: Option<Body>,
}

#[derive(Clone, Debug, PartialEq, Eq, IsVariant)]
pub enum DeclOrigin {
    Defined,
    FakeOverride { overridden: Vec<SymbolRef> },
    BuiltIn,
    Extension,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, IsVariant)]
pub enum DeclParent {
    File(FileRef),
    Declaration(DeclRef),
}

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct IrType {
    pub classifier: SymbolRef,
    pub arguments: Vec<IrType>,
    pub nullable: bool,
}

impl IrType {
    pub fn simple(classifier: SymbolRef) -> Self {
        Self {
            classifier,
            arguments: vec![],
            nullable: false,
        }
    }
}

/// Executable part of a function or property initializer.
///
/// Only the symbols it refers to are kept.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Body {
    pub references: Vec<SymbolRef>,
}
