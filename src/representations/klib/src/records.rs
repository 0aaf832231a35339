use crate::{LibraryError, Section};
use derive_more::IsVariant;
use ir_tree::SymbolKind;
use serde::{Deserialize, Serialize, de::DeserializeOwned};

/// Per-file index written ahead of the sections.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileHeader {
    pub path: String,
    pub line_starts: Vec<u32>,
    /// Package name as string indices, one per dot-separated segment.
    pub package: Vec<u32>,
    /// Top-level declarations as `(signature index, declaration index)`.
    pub declarations: Vec<(u32, u32)>,
    /// Signature indices that are always materialized.
    pub exported: Vec<u32>,
    /// `(expect signature index, actual signature index)` pairs.
    pub actuals: Vec<(u32, u32)>,
    /// Type indices of file annotations.
    pub annotations: Vec<u32>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommonSignatureRecord {
    pub package: Vec<u32>,
    pub declaration: Vec<u32>,
    pub id: Option<u64>,
    pub is_expect: bool,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, IsVariant)]
pub enum SignatureRecord {
    Public(CommonSignatureRecord),
    Accessor {
        /// Signature index of the property.
        property: u32,
        accessor: CommonSignatureRecord,
    },
    FileLocal {
        /// Signature index of the enclosing declaration.
        container: Option<u32>,
        id: u64,
    },
    Scoped {
        id: u32,
    },
}

/// Reference to a symbol from inside a record.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SymbolData {
    pub kind: SymbolKind,
    pub signature: u32,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TypeRecord {
    pub classifier: SymbolData,
    pub arguments: Vec<u32>,
    pub nullable: bool,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BodyRecord {
    pub references: Vec<SymbolData>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeclarationRecord {
    pub symbol: SymbolData,
    pub name: u32,
    pub is_expect: bool,
    pub kind: DeclarationKindRecord,
    pub members: Vec<DeclarationRecord>,
}

impl DeclarationRecord {
    pub fn new(symbol: SymbolData, name: u32, kind: DeclarationKindRecord) -> Self {
        Self {
            symbol,
            name,
            is_expect: false,
            kind,
            members: vec![],
        }
    }

    pub fn with_member(mut self, member: DeclarationRecord) -> Self {
        self.members.push(member);
        self
    }

    pub fn expect(self) -> Self {
        Self {
            is_expect: true,
            ..self
        }
    }

    pub fn inline(mut self) -> Self {
        if let DeclarationKindRecord::Function(callable) = &mut self.kind {
            callable.is_inline = true;
        }
        self
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, IsVariant)]
pub enum DeclarationKindRecord {
    Class {
        supertypes: Vec<u32>,
    },
    Constructor(CallableRecord),
    Function(CallableRecord),
    Property {
        ty: u32,
        initializer: Option<u32>,
    },
    TypeAlias {
        expanded: u32,
    },
    EnumEntry,
}

impl DeclarationKindRecord {
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
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CallableRecord {
    pub params: Vec<u32>,
    pub return_type: u32,
    pub is_inline: bool,
    /// Body index.
    pub body: Option<u32>,
}

pub fn encode_record<T: Serialize>(value: &T) -> Result<Vec<u8>, LibraryError> {
    bincode::serde::encode_to_vec(value, bincode::config::standard()).map_err(|error| {
        LibraryError::Container {
            reason: error.to_string(),
        }
    })
}

pub fn decode_record<T: DeserializeOwned>(
    bytes: &[u8],
    section: Section,
    file: u32,
    index: u32,
) -> Result<T, LibraryError> {
    bincode::serde::decode_from_slice(bytes, bincode::config::standard())
        .map(|(value, _)| value)
        .map_err(|error| LibraryError::Malformed {
            section,
            index,
            file,
            reason: error.to_string(),
        })
}
