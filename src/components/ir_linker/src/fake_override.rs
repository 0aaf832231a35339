use crate::{Access, LinkError, LinkState};
use indexmap::IndexMap;
use ir_tree::{
    CommonSignature, DeclHandle, DeclKind, DeclOrigin, DeclParent, Declaration, IdSignature,
    ModuleId, SymbolKind, SymbolRef,
};
use std::collections::HashSet;

/// Synthesizes the members a class inherits without declaring them.
pub trait FakeOverrideBuilder: Send {
    fn provide_fake_overrides(
        &mut self,
        cx: &mut FakeOverrideContext<'_, '_>,
        class: DeclHandle,
    ) -> Result<(), LinkError>;
}

pub struct FakeOverrideContext<'s, 'a> {
    state: &'s mut LinkState<'a>,
}

impl<'s, 'a> FakeOverrideContext<'s, 'a> {
    pub(crate) fn new(state: &'s mut LinkState<'a>) -> Self {
        Self { state }
    }

    pub fn declaration(&self, handle: DeclHandle) -> &Declaration {
        self.state.declaration(handle)
    }

    pub fn signature(&self, handle: DeclHandle) -> &IdSignature {
        let symbol = self.state.declaration(handle).symbol;
        &self.state.symbols.get(symbol).signature
    }

    /// Materialized classes named by the supertypes of `class`.
    pub fn supertypes(&self, class: DeclHandle) -> Result<Vec<DeclHandle>, LinkError> {
        let mut supertypes = Vec::new();

        for supertype in self.state.declaration(class).kind.supertypes() {
            if let Some(owner) = self
                .state
                .symbols
                .owner(supertype.classifier, Access::Structural)?
            {
                if self.state.declaration(owner).kind.is_class() {
                    supertypes.push(owner);
                }
            }
        }

        Ok(supertypes)
    }

    pub fn members(&self, class: DeclHandle) -> Vec<DeclHandle> {
        self.state
            .declaration(class)
            .members
            .iter()
            .map(|member| DeclHandle::new(class.module, *member))
            .collect()
    }

    /// Schedules a declaration of `module`. It is read once the builder is
    /// done with the classes it was handed, and gets fake overrides of its
    /// own if it is a class.
    pub fn request_declaration(
        &mut self,
        module: ModuleId,
        signature: &IdSignature,
        kind: SymbolKind,
    ) -> Result<SymbolRef, LinkError> {
        self.state.deserialize(module, signature, kind)
    }

    /// Adds a body-less copy of the first overridden member to `class`.
    ///
    /// Returns `None` when the class already has a declaration under the
    /// member's key.
    pub fn add_fake_override(
        &mut self,
        class: DeclHandle,
        overridden: &[DeclHandle],
    ) -> Result<Option<DeclHandle>, LinkError> {
        let Some(first) = overridden.first().copied() else {
            return Ok(None);
        };

        let Some(signature) = member_signature(self.signature(class), self.signature(first))
        else {
            return Ok(None);
        };

        let template = self.state.declaration(first);
        let name = template.name.clone();
        let kind = without_body(template.kind.clone());
        let file = self.state.declaration(class).file;

        let symbol = self.state.public_symbol(&signature, kind.symbol_kind())?;

        if self.state.symbols.is_materialized(symbol) {
            return Ok(None);
        }

        let overridden = overridden
            .iter()
            .map(|member| self.state.declaration(*member).symbol)
            .collect();

        let decl = self.state.alloc_declaration(
            class.module,
            Declaration {
                symbol,
                name,
                kind,
                origin: DeclOrigin::FakeOverride { overridden },
                is_expect: false,
                file,
                parent: DeclParent::Declaration(class.decl),
                members: vec![],
                debug_info: None,
            },
        )?;

        self.state.declaration_mut(class).members.push(decl);
        Ok(Some(DeclHandle::new(class.module, decl)))
    }
}

/// Key that a member inherited from another class has inside `class`.
pub fn member_signature(class: &IdSignature, member: &IdSignature) -> Option<IdSignature> {
    let (IdSignature::Public(class), IdSignature::Public(member)) = (class, member) else {
        return None;
    };

    Some(IdSignature::Public(CommonSignature {
        id: member.id,
        ..class.member(member.short_name())
    }))
}

fn without_body(kind: DeclKind) -> DeclKind {
    match kind {
        DeclKind::Function(callable) => DeclKind::Function(ir_tree::Callable {
            body: None,
            ..callable
        }),
        DeclKind::Property { ty, .. } => DeclKind::Property {
            ty,
            initializer: None,
        },
        kind => kind,
    }
}

/// Fake overrides for every function and property a public class inherits.
///
/// Supertypes are visited level by level, so a member found closer to the
/// class wins over one with the same key further up.
#[derive(Copy, Clone, Debug, Default)]
pub struct InheritedMembers;

impl FakeOverrideBuilder for InheritedMembers {
    fn provide_fake_overrides(
        &mut self,
        cx: &mut FakeOverrideContext<'_, '_>,
        class: DeclHandle,
    ) -> Result<(), LinkError> {
        let class_signature = cx.signature(class).clone();

        if !class_signature.is_public() {
            return Ok(());
        }

        let declared = cx
            .members(class)
            .into_iter()
            .map(|member| cx.signature(member).clone())
            .collect::<HashSet<_>>();

        let mut visited = HashSet::from([class]);
        let mut inherited = IndexMap::<IdSignature, Vec<DeclHandle>>::new();
        let mut level = cx.supertypes(class)?;

        while !level.is_empty() {
            let mut found = IndexMap::<IdSignature, Vec<DeclHandle>>::new();
            let mut next = Vec::new();

            for supertype in level {
                if !visited.insert(supertype) {
                    continue;
                }

                for member in cx.members(supertype) {
                    let decl = cx.declaration(member);

                    if !decl.kind.is_function() && !decl.kind.is_property() {
                        continue;
                    }

                    let Some(signature) = member_signature(&class_signature, cx.signature(member))
                    else {
                        continue;
                    };

                    if declared.contains(&signature) || inherited.contains_key(&signature) {
                        continue;
                    }

                    found.entry(signature).or_default().push(member);
                }

                next.extend(cx.supertypes(supertype)?);
            }

            inherited.extend(found);
            level = next;
        }

        for overridden in inherited.values() {
            cx.add_fake_override(class, overridden)?;
        }

        Ok(())
    }
}
