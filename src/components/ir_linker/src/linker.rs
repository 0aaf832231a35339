use crate::{
    Access, DeclarationDecoder, DecodeContext, DeserializationStrategy, ExtensionContext,
    FakeOverrideBuilder, FakeOverrideContext, InheritedMembers, LinkError, LinkOptions, LinkState,
    LinkerExtension, ModuleDeserializer, RecordDecoder, SymbolTable,
};
use diagnostics::{Diagnostics, ErrorDiagnostic};
use ir_tree::{
    Body, DeclHandle, Declaration, FileRef, IdSignature, IrType, ModuleFragment, ModuleId, Symbol,
    SymbolKind, SymbolRef,
};
use itertools::Itertools;
use klib::IrLibrary;
use std::collections::HashSet;

/// Module being compiled right now. It has no library, only dependencies.
#[derive(Clone, Debug)]
pub struct CurrentModule {
    pub name: String,
    pub dependencies: Vec<String>,
}

impl CurrentModule {
    pub fn new(name: impl Into<String>, dependencies: &[&str]) -> Self {
        Self {
            name: name.into(),
            dependencies: dependencies.iter().map(|name| name.to_string()).collect(),
        }
    }
}

/// A linking session over a set of libraries.
///
/// Declarations are only read when something asks for them. Every request
/// drains all pending work before it returns, so whatever it hands out is
/// complete.
pub struct Linker<'a> {
    options: LinkOptions,
    diagnostics: &'a Diagnostics,
    state: LinkState<'a>,
    decoder: Box<dyn DeclarationDecoder>,
    fake_override_builder: Box<dyn FakeOverrideBuilder>,
    extensions: Vec<Box<dyn LinkerExtension>>,
    /// Symbols already offered to the extensions.
    tried: HashSet<SymbolRef>,
    /// Symbols already looked up in the libraries.
    deserialized: HashSet<SymbolRef>,
    current_module: Option<ModuleId>,
}

impl<'a> Linker<'a> {
    pub fn new(options: LinkOptions, diagnostics: &'a Diagnostics) -> Self {
        Self {
            state: LinkState::new(options.ambiguity, diagnostics),
            options,
            diagnostics,
            decoder: Box::new(RecordDecoder),
            fake_override_builder: Box::new(InheritedMembers),
            extensions: vec![],
            tried: HashSet::new(),
            deserialized: HashSet::new(),
            current_module: None,
        }
    }

    pub fn with_decoder(self, decoder: impl DeclarationDecoder + 'static) -> Self {
        Self {
            decoder: Box::new(decoder),
            ..self
        }
    }

    pub fn with_fake_override_builder(self, builder: impl FakeOverrideBuilder + 'static) -> Self {
        Self {
            fake_override_builder: Box::new(builder),
            ..self
        }
    }

    pub fn with_extension(mut self, extension: impl LinkerExtension + 'static) -> Self {
        self.extensions.push(Box::new(extension));
        self
    }

    pub fn options(&self) -> &LinkOptions {
        &self.options
    }

    pub fn state(&self) -> &LinkState<'a> {
        &self.state
    }

    pub fn symbols(&self) -> &SymbolTable {
        self.state.symbols()
    }

    fn report<T>(&self, result: Result<T, LinkError>) -> Result<T, LinkError> {
        result.inspect_err(|error| {
            log::error!("{}", error);
            self.diagnostics.push(ErrorDiagnostic::plain(error));
        })
    }

    /// Reads the headers of a library and materializes what its strategy
    /// asks for up front.
    pub fn register_library(
        &mut self,
        name: &str,
        library: Box<dyn IrLibrary>,
        strategy: DeserializationStrategy,
        dependencies: &[&str],
    ) -> Result<ModuleId, LinkError> {
        let result = self.register(name, library, strategy, dependencies);
        self.report(result)
    }

    fn register(
        &mut self,
        name: &str,
        library: Box<dyn IrLibrary>,
        strategy: DeserializationStrategy,
        dependencies: &[&str],
    ) -> Result<ModuleId, LinkError> {
        let dependencies = dependencies
            .iter()
            .map(|dependency| self.state.module_named(dependency))
            .collect::<Result<Vec<_>, _>>()?;

        let (deserializer, actuals) =
            ModuleDeserializer::read(name, library, strategy, dependencies)?;
        let module = self.state.add_module(deserializer, actuals)?;

        if self.options.builtins_module.as_deref() == Some(name) {
            self.state.install_builtins(module);
        }

        self.state.drain(self.decoder.as_ref())?;
        Ok(module)
    }

    pub fn deserialize_full_module(
        &mut self,
        name: &str,
        library: Box<dyn IrLibrary>,
        dependencies: &[&str],
    ) -> Result<ModuleId, LinkError> {
        self.register_library(name, library, DeserializationStrategy::Everything, dependencies)
    }

    pub fn deserialize_only_header_module(
        &mut self,
        name: &str,
        library: Box<dyn IrLibrary>,
        dependencies: &[&str],
    ) -> Result<ModuleId, LinkError> {
        self.register_library(name, library, DeserializationStrategy::HeadersOnly, dependencies)
    }

    pub fn deserialize_headers_with_inline_bodies(
        &mut self,
        name: &str,
        library: Box<dyn IrLibrary>,
        dependencies: &[&str],
    ) -> Result<ModuleId, LinkError> {
        self.register_library(
            name,
            library,
            DeserializationStrategy::HeadersWithInlineBodies,
            dependencies,
        )
    }

    /// Reads a dependency in full when it is listed as exported, otherwise
    /// only what it exports.
    pub fn deserialize_module_header(
        &mut self,
        name: &str,
        library: Box<dyn IrLibrary>,
        dependencies: &[&str],
    ) -> Result<ModuleId, LinkError> {
        let strategy = if self
            .options
            .exported_dependencies
            .iter()
            .any(|exported| exported == name)
        {
            DeserializationStrategy::Everything
        } else {
            DeserializationStrategy::OnlyExported
        };

        self.register_library(name, library, strategy, dependencies)
    }

    /// Registers the module being compiled, if any, once every library is in.
    pub fn init(&mut self, current: Option<CurrentModule>) -> Result<Option<ModuleId>, LinkError> {
        let result = self.init_current(current);
        self.report(result)
    }

    fn init_current(
        &mut self,
        current: Option<CurrentModule>,
    ) -> Result<Option<ModuleId>, LinkError> {
        let Some(current) = current else {
            self.state.drain(self.decoder.as_ref())?;
            return Ok(None);
        };

        let dependencies = current
            .dependencies
            .iter()
            .map(|dependency| self.state.module_named(dependency))
            .collect::<Result<Vec<_>, _>>()?;

        log::debug!(
            "Current module '{}' depends on {}",
            current.name,
            current.dependencies.iter().join(", ")
        );

        let module = self.state.add_module(
            ModuleDeserializer::current(&current.name, dependencies),
            vec![],
        )?;

        self.current_module = Some(module);
        self.state.drain(self.decoder.as_ref())?;
        Ok(Some(module))
    }

    pub fn current_module(&self) -> Option<ModuleId> {
        self.current_module
    }

    /// Symbol of a public key as seen from `module`: the module itself
    /// first, then its dependencies.
    pub fn resolve_from(
        &mut self,
        module: ModuleId,
        signature: &IdSignature,
        kind: SymbolKind,
    ) -> Result<SymbolRef, LinkError> {
        let result = self.resolve_from_module(module, signature, kind);
        self.report(result)
    }

    fn resolve_from_module(
        &mut self,
        module: ModuleId,
        signature: &IdSignature,
        kind: SymbolKind,
    ) -> Result<SymbolRef, LinkError> {
        if !signature.is_public() {
            return Err(LinkError::SignatureNotInModule {
                signature: signature.clone(),
                module: self.state.module(module).name().into(),
            });
        }

        let owner = self.state.find_owner(module, &signature.top_level())?;
        let symbol = self.state.deserialize(owner, signature, kind)?;
        self.state.drain(self.decoder.as_ref())?;
        Ok(symbol)
    }

    /// Symbol of a top-level key declared by the module named `module`.
    pub fn resolve_by_signature_in_module(
        &mut self,
        signature: &IdSignature,
        kind: SymbolKind,
        module: &str,
    ) -> Result<SymbolRef, LinkError> {
        let result = self.resolve_in_named_module(signature, kind, module);
        self.report(result)
    }

    fn resolve_in_named_module(
        &mut self,
        signature: &IdSignature,
        kind: SymbolKind,
        module: &str,
    ) -> Result<SymbolRef, LinkError> {
        let module = self.state.module_named(module)?;

        if !signature.is_top_level() {
            return Err(LinkError::NotTopLevel {
                signature: signature.clone(),
            });
        }

        let symbol = self.state.deserialize(module, signature, kind)?;
        self.state.drain(self.decoder.as_ref())?;
        Ok(symbol)
    }

    /// Symbol of a key that `module` itself declares.
    pub fn deserialize_in_module(
        &mut self,
        module: ModuleId,
        signature: &IdSignature,
        kind: SymbolKind,
    ) -> Result<SymbolRef, LinkError> {
        let result = self
            .state
            .deserialize(module, signature, kind)
            .and_then(|symbol| {
                self.state.drain(self.decoder.as_ref())?;
                Ok(symbol)
            });

        self.report(result)
    }

    /// Symbol of a key as seen from the file that holds `parent`. This is
    /// the only way to reach keys that are not public.
    pub fn reference_by_local_signature(
        &mut self,
        parent: DeclHandle,
        signature: IdSignature,
        kind: SymbolKind,
    ) -> Result<SymbolRef, LinkError> {
        let file = self.state.declaration(parent).file;

        let result = self
            .state
            .reference_from_file(parent.module, file, signature, kind)
            .and_then(|symbol| {
                self.state.drain(self.decoder.as_ref())?;
                Ok(symbol)
            });

        self.report(result)
    }

    /// Declaration bound to `symbol`, reading it from a library or asking the
    /// extensions if it is not materialized yet.
    pub fn get_declaration(&mut self, symbol: SymbolRef) -> Result<Option<DeclHandle>, LinkError> {
        let result = self.find_declaration(symbol);
        self.report(result)
    }

    fn find_declaration(&mut self, symbol: SymbolRef) -> Result<Option<DeclHandle>, LinkError> {
        let cell = self.state.symbols.get(symbol);
        let signature = cell.signature.clone();

        if signature.is_local() {
            if let (Some(current), home) = (self.current_module, cell.home) {
                if home != Some(current) {
                    return Ok(None);
                }
            }
        }

        if let Some(owner) = self.state.symbols.owner(symbol, Access::Structural)? {
            return Ok(Some(owner));
        }

        if signature.is_public() && self.deserialized.insert(symbol) {
            let top_level = signature.top_level();

            if let Some(owner) = self.state.find_declaring_module(&top_level)? {
                self.state.declare_symbol(owner, symbol)?;
                self.state.drain(self.decoder.as_ref())?;

                if let Some(owner) = self.state.symbols.owner(symbol, Access::Structural)? {
                    return Ok(Some(owner));
                }
            }
        }

        if self.is_fake_override_candidate(&signature) || !self.tried.insert(symbol) {
            return Ok(None);
        }

        for extension in self.extensions.iter_mut() {
            let mut cx = ExtensionContext::new(&mut self.state);

            if let Some(handle) = extension.resolve_symbol(&mut cx, symbol)? {
                log::debug!("Extension provided '{}'", signature);
                self.state.drain(self.decoder.as_ref())?;
                return Ok(Some(handle));
            }
        }

        Ok(None)
    }

    /// Whether `signature` names a member of a materialized class that does
    /// not declare it, which only fake-override synthesis may provide.
    fn is_fake_override_candidate(&self, signature: &IdSignature) -> bool {
        let IdSignature::Public(common) = signature else {
            return false;
        };

        let Some((container, _)) = common.declaration.rsplit_once('.') else {
            return false;
        };

        let container = IdSignature::public(common.package.clone(), container);

        self.state
            .symbols
            .public(&container)
            .and_then(|class| {
                self.state
                    .symbols
                    .owner(class, Access::Structural)
                    .ok()
                    .flatten()
            })
            .is_some_and(|class| self.state.declaration(class).kind.is_class())
    }

    /// Finishes the session: drains, points expects at their actuals,
    /// synthesizes fake overrides and clears transient bookkeeping.
    pub fn post_process(&mut self) -> Result<(), LinkError> {
        let result = self.finish();
        self.report(result)
    }

    fn finish(&mut self) -> Result<(), LinkError> {
        self.state.drain(self.decoder.as_ref())?;
        let retargeted = self.state.finalize_expect_actual()?;

        let mut checked = 0;

        // Synthesis may pull in classes of its own.
        while !self.state.pending_classes.is_empty() {
            let classes = std::mem::take(&mut self.state.pending_classes);
            checked += classes.len();

            let mut cx = FakeOverrideContext::new(&mut self.state);

            for class in classes {
                self.fake_override_builder
                    .provide_fake_overrides(&mut cx, class)?;
            }

            self.state.drain(self.decoder.as_ref())?;
        }

        self.tried.clear();
        self.deserialized.clear();

        log::info!(
            "Linked {} modules: {} classes checked for fake overrides, {} expects retargeted",
            self.state.modules().count(),
            checked,
            retargeted
        );

        Ok(())
    }

    pub fn symbol(&self, symbol: SymbolRef) -> &Symbol {
        self.state.symbols.get(symbol)
    }

    pub fn public_symbol(&self, signature: &IdSignature) -> Option<SymbolRef> {
        self.state.symbols.public(signature)
    }

    /// Cell of a public key, without scheduling its declaration. Use
    /// [`Linker::get_declaration`] to materialize it later.
    pub fn reference_symbol(
        &mut self,
        signature: &IdSignature,
        kind: SymbolKind,
    ) -> Result<SymbolRef, LinkError> {
        let result = self.state.public_symbol(signature, kind);
        self.report(result)
    }

    pub fn declaration(&self, handle: DeclHandle) -> &Declaration {
        self.state.declaration(handle)
    }

    /// Declaration that `symbol` stands for in declaration structure, where
    /// an expect that was never linked still counts as its own declaration.
    pub fn owner(&self, symbol: SymbolRef) -> Result<Option<DeclHandle>, LinkError> {
        self.state.symbols.owner(symbol, Access::Structural)
    }

    /// Body behind `symbol`. Asking through an expect that never got its
    /// actual is an error.
    pub fn body(&self, symbol: SymbolRef) -> Result<Option<&Body>, LinkError> {
        let owner = self.report(self.state.symbols.owner(symbol, Access::Body))?;
        Ok(owner.and_then(|owner| self.state.declaration(owner).body()))
    }

    pub fn module_fragment(&self, module: ModuleId) -> &ModuleFragment {
        self.state.module(module).fragment()
    }

    pub fn module_by_name(&self, name: &str) -> Option<ModuleId> {
        self.state.module_by_name(name)
    }

    /// Annotations of a file, read on first request.
    pub fn file_annotations(
        &mut self,
        module: ModuleId,
        file: FileRef,
    ) -> Result<&[IrType], LinkError> {
        let result = self.read_annotations(module, file);
        self.report(result)?;

        Ok(self
            .state
            .module(module)
            .fragment()
            .files
            .get(file)
            .and_then(|file| file.annotations.as_deref())
            .unwrap_or_default())
    }

    fn read_annotations(&mut self, module: ModuleId, file: FileRef) -> Result<(), LinkError> {
        let deserializer = &mut self.state.modules[module];

        let Some(ir_file) = deserializer.fragment.files.get(file) else {
            return Ok(());
        };

        if ir_file.annotations.is_some() {
            return Ok(());
        }

        let pending = deserializer
            .files
            .get(file)
            .and_then(|state| state.pending_annotations.clone())
            .unwrap_or_default();

        let mut cx = DecodeContext::new(&mut self.state, module, file);

        let annotations = pending
            .iter()
            .map(|ty| cx.ty(*ty))
            .collect::<Result<Vec<_>, _>>()?;

        self.state.drain(self.decoder.as_ref())?;

        let deserializer = &mut self.state.modules[module];

        if let Some(state) = deserializer.files.get_mut(file) {
            state.pending_annotations = None;
        }

        if let Some(ir_file) = deserializer.fragment.files.get_mut(file) {
            ir_file.annotations = Some(annotations);
        }

        Ok(())
    }
}
