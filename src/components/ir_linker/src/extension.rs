use crate::{LinkError, LinkState, ModuleDeserializer};
use ir_tree::{
    DeclHandle, DeclKind, DeclOrigin, DeclParent, Declaration, IdSignature, ModuleId, Symbol,
    SymbolKind, SymbolRef,
};

/// Last resort for symbols that no library declares.
pub trait LinkerExtension: Send {
    /// Returns the declaration now bound to `symbol`, or `None` to let the
    /// next extension try.
    fn resolve_symbol(
        &mut self,
        cx: &mut ExtensionContext<'_, '_>,
        symbol: SymbolRef,
    ) -> Result<Option<DeclHandle>, LinkError>;
}

pub struct ExtensionContext<'s, 'a> {
    state: &'s mut LinkState<'a>,
}

impl<'s, 'a> ExtensionContext<'s, 'a> {
    pub(crate) fn new(state: &'s mut LinkState<'a>) -> Self {
        Self { state }
    }

    pub fn symbol(&self, symbol: SymbolRef) -> &Symbol {
        self.state.symbols.get(symbol)
    }

    pub fn module_by_name(&self, name: &str) -> Option<ModuleId> {
        self.state.module_by_name(name)
    }

    pub fn module(&self, module: ModuleId) -> &ModuleDeserializer {
        self.state.module(module)
    }

    pub fn public_symbol(
        &mut self,
        signature: &IdSignature,
        kind: SymbolKind,
    ) -> Result<SymbolRef, LinkError> {
        self.state.public_symbol(signature, kind)
    }

    /// Declares `symbol` in `module` and binds it.
    pub fn synthesize(
        &mut self,
        module: ModuleId,
        symbol: SymbolRef,
        kind: DeclKind,
    ) -> Result<DeclHandle, LinkError> {
        let file = self.state.synthetic_file(module);

        let name = match &self.state.symbols.get(symbol).signature {
            IdSignature::Public(common) => common.short_name().to_string(),
            signature => signature.to_string(),
        };

        let decl = self.state.alloc_declaration(
            module,
            Declaration {
                symbol,
                name,
                kind,
                origin: DeclOrigin::Extension,
                is_expect: false,
                file,
                parent: DeclParent::File(file),
                members: vec![],
                debug_info: None,
            },
        )?;

        self.state.modules[module].fragment.files[file]
            .declarations
            .push(decl);

        Ok(DeclHandle::new(module, decl))
    }
}
