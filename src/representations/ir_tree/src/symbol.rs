use crate::{DeclHandle, IdSignature, ModuleId, SymbolRef};
use derive_more::IsVariant;
use serde::{Deserialize, Serialize};
use std::fmt::Display;
use thiserror::Error;

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize, IsVariant)]
pub enum SymbolKind {
    Class,
    Constructor,
    EnumEntry,
    Function,
    Property,
    TypeAlias,
}

impl Display for SymbolKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Self::Class => "class",
            Self::Constructor => "constructor",
            Self::EnumEntry => "enum entry",
            Self::Function => "function",
            Self::Property => "property",
            Self::TypeAlias => "type alias",
        })
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum SymbolError {
    #[error("Symbol '{signature}' is already bound")]
    AlreadyBound { signature: IdSignature },
    #[error("Expect symbol '{signature}' was already retargeted")]
    AlreadyRetargeted { signature: IdSignature },
    #[error("Symbol '{signature}' does not delegate")]
    NotDelegating { signature: IdSignature },
}

/// Slot standing in for a declaration, before and after it exists.
#[derive(Clone, Debug)]
pub struct Symbol {
    pub signature: IdSignature,
    pub kind: SymbolKind,
    /// Module that a non-public key belongs to.
    pub home: Option<ModuleId>,
    pub state: SymbolState,
}

#[derive(Clone, Debug, PartialEq, Eq, IsVariant)]
pub enum SymbolState {
    Unbound,
    Bound(DeclHandle),
    Delegating(Delegation),
}

/// State of an expect symbol.
///
/// `origin` is bound to the expect declaration itself, `target` is the
/// symbol of the matching actual once it is known.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Delegation {
    pub origin: SymbolRef,
    pub target: Option<SymbolRef>,
}

impl Symbol {
    pub fn new(signature: IdSignature, kind: SymbolKind, home: Option<ModuleId>) -> Self {
        Self {
            signature,
            kind,
            home,
            state: SymbolState::Unbound,
        }
    }

    pub fn is_bound(&self) -> bool {
        self.state.is_bound()
    }

    pub fn owner(&self) -> Option<DeclHandle> {
        match &self.state {
            SymbolState::Bound(handle) => Some(*handle),
            _ => None,
        }
    }

    pub fn delegation(&self) -> Option<&Delegation> {
        match &self.state {
            SymbolState::Delegating(delegation) => Some(delegation),
            _ => None,
        }
    }

    pub fn bind(&mut self, handle: DeclHandle) -> Result<(), SymbolError> {
        match self.state {
            SymbolState::Unbound => {
                self.state = SymbolState::Bound(handle);
                Ok(())
            }
            _ => Err(SymbolError::AlreadyBound {
                signature: self.signature.clone(),
            }),
        }
    }

    pub fn retarget(&mut self, target: SymbolRef) -> Result<(), SymbolError> {
        match &mut self.state {
            SymbolState::Delegating(Delegation {
                target: slot @ None,
                ..
            }) => {
                *slot = Some(target);
                Ok(())
            }
            SymbolState::Delegating(_) => Err(SymbolError::AlreadyRetargeted {
                signature: self.signature.clone(),
            }),
            _ => Err(SymbolError::NotDelegating {
                signature: self.signature.clone(),
            }),
        }
    }
}
