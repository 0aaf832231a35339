use crate::LinkError;
use arena::Arena;
use derive_more::IsVariant;
use ir_tree::{
    DeclHandle, Delegation, IdSignature, ModuleId, Symbol, SymbolError, SymbolId, SymbolKind,
    SymbolRef, SymbolState,
};
use std::collections::HashMap;

/// Purpose of a lookup through a possibly delegating symbol.
#[derive(Copy, Clone, Debug, PartialEq, Eq, IsVariant)]
pub enum Access {
    /// Shape only. An expect that has no actual yet answers with itself.
    Structural,
    /// Needs the executable body, which only the actual has.
    Body,
}

/// Every symbol cell of a session. Public keys map to exactly one cell.
#[derive(Debug, Default)]
pub struct SymbolTable {
    symbols: Arena<SymbolId, Symbol>,
    public: HashMap<IdSignature, SymbolRef>,
}

impl SymbolTable {
    pub fn len(&self) -> usize {
        self.symbols.len()
    }

    pub fn is_empty(&self) -> bool {
        self.symbols.is_empty()
    }

    pub fn get(&self, symbol: SymbolRef) -> &Symbol {
        &self.symbols[symbol]
    }

    pub fn public(&self, signature: &IdSignature) -> Option<SymbolRef> {
        self.public.get(signature).copied()
    }

    pub fn iter(&self) -> impl Iterator<Item = (SymbolRef, &Symbol)> {
        self.symbols.iter()
    }

    /// Creates an unbound cell. Public keys are registered for lookup.
    pub fn create(
        &mut self,
        signature: IdSignature,
        kind: SymbolKind,
        home: Option<ModuleId>,
    ) -> SymbolRef {
        let is_public = signature.is_public();
        let symbol = self.symbols.alloc(Symbol::new(signature.clone(), kind, home));

        if is_public {
            self.public.insert(signature, symbol);
        }

        symbol
    }

    pub fn check_kind(&self, symbol: SymbolRef, expected: SymbolKind) -> Result<(), LinkError> {
        let found = self.symbols[symbol].kind;

        if found == expected {
            Ok(())
        } else {
            Err(LinkError::SymbolKindMismatch {
                signature: self.symbols[symbol].signature.clone(),
                expected,
                found,
            })
        }
    }

    /// Whether the declaration behind this cell exists.
    ///
    /// For an expect this is the expect declaration itself.
    pub fn is_materialized(&self, symbol: SymbolRef) -> bool {
        match &self.symbols[symbol].state {
            SymbolState::Unbound => false,
            SymbolState::Bound(_) => true,
            SymbolState::Delegating(delegation) => self.symbols[delegation.origin].is_bound(),
        }
    }

    /// Cell a declaration for `symbol` is bound to: the origin of an expect,
    /// otherwise the symbol itself.
    pub fn binding_cell(&self, symbol: SymbolRef) -> SymbolRef {
        match &self.symbols[symbol].state {
            SymbolState::Delegating(delegation) => delegation.origin,
            _ => symbol,
        }
    }

    /// Binds a cell. Binding an expect binds its origin.
    pub fn bind(&mut self, symbol: SymbolRef, handle: DeclHandle) -> Result<(), SymbolError> {
        let symbol = self.binding_cell(symbol);
        self.symbols[symbol].bind(handle)
    }

    pub fn retarget(&mut self, symbol: SymbolRef, target: SymbolRef) -> Result<(), SymbolError> {
        self.symbols[symbol].retarget(target)
    }

    /// Turns `symbol` into a delegating cell in place.
    ///
    /// Its previous state moves to a fresh origin cell, so references taken
    /// earlier see the delegation. Returns the origin and whatever the cell was
    /// bound to, or `None` when it already delegates.
    pub fn wrap_in_delegating(
        &mut self,
        symbol: SymbolRef,
    ) -> Option<(SymbolRef, Option<DeclHandle>)> {
        if self.symbols[symbol].state.is_delegating() {
            return None;
        }

        let moved = self.symbols[symbol].clone();
        let previous = moved.owner();
        let origin = self.symbols.alloc(moved);

        self.symbols[symbol].state = SymbolState::Delegating(Delegation {
            origin,
            target: None,
        });

        Some((origin, previous))
    }

    /// Declaration behind `symbol`, following an expect to its actual.
    pub fn owner(&self, symbol: SymbolRef, access: Access) -> Result<Option<DeclHandle>, LinkError> {
        let mut current = symbol;

        // Bounded in case corrupt input links two expects to each other
        for _ in 0..=self.symbols.len() {
            match &self.symbols[current].state {
                SymbolState::Unbound => return Ok(None),
                SymbolState::Bound(handle) => return Ok(Some(*handle)),
                SymbolState::Delegating(Delegation {
                    target: Some(target),
                    ..
                }) => current = *target,
                SymbolState::Delegating(Delegation {
                    origin,
                    target: None,
                }) => match access {
                    Access::Structural => current = *origin,
                    Access::Body => {
                        return Err(LinkError::UnretargetedExpect {
                            signature: self.symbols[current].signature.clone(),
                        });
                    }
                },
            }
        }

        Ok(None)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use arena::{Id, Idx};

    fn handle(raw: usize) -> DeclHandle {
        DeclHandle::new(ModuleId::from_usize(0), Idx::from_raw(Id::from_usize(raw)))
    }

    #[test]
    fn public_keys_are_registered() {
        let mut table = SymbolTable::default();
        let sig = IdSignature::public("p", "f");
        let symbol = table.create(sig.clone(), SymbolKind::Function, None);

        assert_eq!(table.public(&sig), Some(symbol));
        assert!(table.check_kind(symbol, SymbolKind::Function).is_ok());
        assert!(matches!(
            table.check_kind(symbol, SymbolKind::Class),
            Err(LinkError::SymbolKindMismatch {
                expected: SymbolKind::Class,
                found: SymbolKind::Function,
                ..
            })
        ));

        let local = table.create(
            IdSignature::FileLocal {
                container: None,
                id: 4,
            },
            SymbolKind::Function,
            Some(ModuleId::from_usize(0)),
        );
        assert_ne!(local, symbol);
        assert_eq!(table.len(), 2);
    }

    #[test]
    fn wrapping_keeps_earlier_references_valid() {
        let mut table = SymbolTable::default();
        let expect = table.create(IdSignature::public("p", "E"), SymbolKind::Class, None);
        table.bind(expect, handle(3)).unwrap();

        let (origin, previous) = table.wrap_in_delegating(expect).unwrap();
        assert_eq!(previous, Some(handle(3)));
        assert_eq!(table.get(origin).owner(), Some(handle(3)));
        assert!(table.is_materialized(expect));
        assert!(table.wrap_in_delegating(expect).is_none());

        assert_eq!(table.owner(expect, Access::Structural).unwrap(), Some(handle(3)));
        assert!(matches!(
            table.owner(expect, Access::Body),
            Err(LinkError::UnretargetedExpect { .. })
        ));

        let actual = table.create(IdSignature::public("p", "A"), SymbolKind::Class, None);
        table.bind(actual, handle(9)).unwrap();
        table.retarget(expect, actual).unwrap();

        assert_eq!(table.owner(expect, Access::Body).unwrap(), Some(handle(9)));
        assert!(table.retarget(expect, actual).is_err());
    }

    #[test]
    fn binding_an_expect_binds_its_origin() {
        let mut table = SymbolTable::default();
        let expect = table.create(IdSignature::public("p", "E"), SymbolKind::Function, None);
        let (origin, previous) = table.wrap_in_delegating(expect).unwrap();
        assert_eq!(previous, None);
        assert!(!table.is_materialized(expect));

        table.bind(expect, handle(1)).unwrap();
        assert!(table.get(origin).is_bound());
        assert!(table.is_materialized(expect));
        assert!(table.bind(expect, handle(2)).is_err());
    }
}
