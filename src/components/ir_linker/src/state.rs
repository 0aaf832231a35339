use crate::{
    ActualPairs, AmbiguityPolicy, BuiltIns, DeclarationDecoder, DecodeContext, ExpectActualTable,
    FileState, LinkError, ModuleDeserializer, Modules, SymbolTable,
};
use diagnostics::{Diagnostics, WarningDiagnostic};
use indexmap::IndexSet;
use ir_tree::{
    DeclHandle, DeclRef, Declaration, FileRef, IdSignature, IrFile, ModuleId, SymbolKind,
    SymbolRef,
};
use std::collections::{HashMap, HashSet};

/// Scope named in diagnostics for lookups that are not made from a module.
pub const SESSION_SCOPE: &str = "<session>";

/// Registries shared by every module of a linking session.
pub struct LinkState<'a> {
    pub(crate) symbols: SymbolTable,
    pub(crate) modules: Modules,
    names: HashMap<String, ModuleId>,
    pub(crate) expect_actual: ExpectActualTable,
    modules_with_reachable: IndexSet<ModuleId>,
    /// Classes materialized since fake overrides were last provided.
    pub(crate) pending_classes: IndexSet<DeclHandle>,
    reported_ambiguities: HashSet<IdSignature>,
    ambiguity: AmbiguityPolicy,
    diagnostics: &'a Diagnostics,
}

impl<'a> LinkState<'a> {
    pub fn new(ambiguity: AmbiguityPolicy, diagnostics: &'a Diagnostics) -> Self {
        Self {
            symbols: SymbolTable::default(),
            modules: Modules::default(),
            names: HashMap::new(),
            expect_actual: ExpectActualTable::default(),
            modules_with_reachable: IndexSet::new(),
            pending_classes: IndexSet::new(),
            reported_ambiguities: HashSet::new(),
            ambiguity,
            diagnostics,
        }
    }

    pub fn symbols(&self) -> &SymbolTable {
        &self.symbols
    }

    pub fn module(&self, module: ModuleId) -> &ModuleDeserializer {
        &self.modules[module]
    }

    pub fn module_by_name(&self, name: &str) -> Option<ModuleId> {
        self.names.get(name).copied()
    }

    pub fn module_named(&self, name: &str) -> Result<ModuleId, LinkError> {
        self.module_by_name(name)
            .ok_or_else(|| LinkError::NoModuleNamed { name: name.into() })
    }

    pub fn modules(&self) -> impl Iterator<Item = (ModuleId, &ModuleDeserializer)> {
        self.modules.iter()
    }

    pub fn declaration(&self, handle: DeclHandle) -> &Declaration {
        &self.modules[handle.module].fragment.decls[handle.decl]
    }

    pub(crate) fn declaration_mut(&mut self, handle: DeclHandle) -> &mut Declaration {
        &mut self.modules[handle.module].fragment.decls[handle.decl]
    }

    pub fn add_module(
        &mut self,
        deserializer: ModuleDeserializer,
        actuals: ActualPairs,
    ) -> Result<ModuleId, LinkError> {
        let name = deserializer.name().to_string();

        if self.names.contains_key(&name) {
            return Err(LinkError::DuplicateModule { name });
        }

        let has_reachable = deserializer.has_reachable();
        let module = self.modules.alloc(deserializer);
        self.names.insert(name, module);

        if has_reachable {
            self.modules_with_reachable.insert(module);
        }

        for (expect, actual) in actuals {
            self.register_actual(expect, actual, module)?;
        }

        Ok(module)
    }

    pub fn install_builtins(&mut self, module: ModuleId) {
        let deserializer = &mut self.modules[module];
        let builtins = BuiltIns::install(module, &mut deserializer.fragment, &mut self.symbols);
        deserializer.builtins = Some(builtins);
    }

    fn register_actual(
        &mut self,
        expect: IdSignature,
        actual: IdSignature,
        module: ModuleId,
    ) -> Result<(), LinkError> {
        if !self
            .expect_actual
            .register(expect.clone(), actual.clone(), module)
        {
            return Ok(());
        }

        if let Some(symbol) = self.symbols.public(&actual) {
            self.expect_actual.actual_symbols.insert(actual, symbol);
        }

        if let Some(symbol) = self.symbols.public(&expect) {
            self.delegate_expect(symbol)?;
        }

        Ok(())
    }

    /// Makes an expect cell delegating and schedules its actual.
    fn delegate_expect(&mut self, symbol: SymbolRef) -> Result<(), LinkError> {
        let signature = self.symbols.get(symbol).signature.clone();

        if let Some((origin, Some(previous))) = self.symbols.wrap_in_delegating(symbol) {
            self.declaration_mut(previous).symbol = origin;
        }

        self.expect_actual
            .expect_symbols
            .insert(signature.clone(), symbol);

        let Some(actual) = self.expect_actual.actual_of(&signature).cloned() else {
            return Ok(());
        };

        let Some(module) = self.expect_actual.module_of_actual(&actual) else {
            return Ok(());
        };

        let materialized = self
            .symbols
            .public(&actual)
            .is_some_and(|symbol| self.symbols.is_materialized(symbol));

        if !materialized {
            log::trace!("Expect '{}' pulls in actual '{}'", signature, actual);
            self.enqueue_top_level(module, actual.top_level())?;
        }

        Ok(())
    }

    /// Cell of a public key, created unbound on first touch.
    pub fn public_symbol(
        &mut self,
        signature: &IdSignature,
        kind: SymbolKind,
    ) -> Result<SymbolRef, LinkError> {
        if let Some(symbol) = self.symbols.public(signature) {
            self.symbols.check_kind(symbol, kind)?;
            return Ok(symbol);
        }

        let symbol = self.symbols.create(signature.clone(), kind, None);

        if self.expect_actual.is_actual(signature) {
            self.expect_actual
                .actual_symbols
                .insert(signature.clone(), symbol);
        }

        if self.expect_actual.actual_of(signature).is_some() {
            self.delegate_expect(symbol)?;
        }

        Ok(symbol)
    }

    pub(crate) fn file_state(&self, module: ModuleId, file: FileRef) -> Option<&FileState> {
        self.modules[module].files.get(file)
    }

    fn file_state_mut(
        &mut self,
        module: ModuleId,
        file: FileRef,
        signature: &IdSignature,
    ) -> Result<&mut FileState, LinkError> {
        let deserializer = &mut self.modules[module];

        deserializer
            .files
            .get_mut(file)
            .ok_or_else(|| LinkError::MissingDeclarationIndex {
                signature: signature.clone(),
                module: deserializer.fragment.name.clone(),
            })
    }

    /// Cell of a key as seen from inside `file`. Local keys get a cell of
    /// their own per file.
    pub fn file_symbol(
        &mut self,
        module: ModuleId,
        file: FileRef,
        signature: &IdSignature,
        kind: SymbolKind,
    ) -> Result<SymbolRef, LinkError> {
        if signature.is_public() {
            return self.public_symbol(signature, kind);
        }

        let existing = self
            .file_state_mut(module, file, signature)?
            .local_symbols
            .get(signature)
            .copied();

        if let Some(symbol) = existing {
            self.symbols.check_kind(symbol, kind)?;
            return Ok(symbol);
        }

        let symbol = self.symbols.create(signature.clone(), kind, Some(module));

        self.file_state_mut(module, file, signature)?
            .local_symbols
            .insert(signature.clone(), symbol);

        Ok(symbol)
    }

    /// Cell of a key referenced while decoding `file`, with the declaration
    /// that will bind it scheduled wherever it lives.
    pub fn reference_from_file(
        &mut self,
        module: ModuleId,
        file: FileRef,
        signature: IdSignature,
        kind: SymbolKind,
    ) -> Result<SymbolRef, LinkError> {
        let symbol = self.file_symbol(module, file, &signature, kind)?;

        if signature.is_scoped() || self.symbols.is_materialized(symbol) {
            return Ok(symbol);
        }

        let top_level = signature.top_level();

        if top_level.is_public() {
            let owner = self.find_owner(module, &top_level)?;
            self.enqueue_top_level(owner, top_level)?;
        } else {
            self.enqueue_in_file(module, file, top_level);
        }

        Ok(symbol)
    }

    /// Module that declares a top-level key, looking at `from` itself and
    /// then at its dependencies in declared order.
    pub fn find_owner(
        &mut self,
        from: ModuleId,
        top_level: &IdSignature,
    ) -> Result<ModuleId, LinkError> {
        let module = &self.modules[from];

        if module.contains(top_level) {
            return Ok(from);
        }

        let candidates = module
            .dependencies
            .iter()
            .copied()
            .filter(|dependency| self.modules[*dependency].contains(top_level))
            .collect::<Vec<_>>();

        match candidates.as_slice() {
            [] => Err(LinkError::SignatureNotFound {
                signature: top_level.clone(),
                module: module.name().into(),
                searched: std::iter::once(from)
                    .chain(module.dependencies.iter().copied())
                    .map(|searched| self.modules[searched].name().to_string())
                    .collect(),
            }),
            [only] => Ok(*only),
            [first, ..] => {
                let scope = module.name().to_string();
                self.report_ambiguity(scope, top_level, &candidates)?;
                Ok(*first)
            }
        }
    }

    /// Module that declares a top-level key, looking at every registered
    /// module in registration order.
    pub fn find_declaring_module(
        &mut self,
        top_level: &IdSignature,
    ) -> Result<Option<ModuleId>, LinkError> {
        let candidates = self
            .modules()
            .filter(|(_, module)| module.contains(top_level))
            .map(|(module, _)| module)
            .collect::<Vec<_>>();

        match candidates.as_slice() {
            [] => Ok(None),
            [only] => Ok(Some(*only)),
            [first, ..] => {
                self.report_ambiguity(SESSION_SCOPE.into(), top_level, &candidates)?;
                Ok(Some(*first))
            }
        }
    }

    fn report_ambiguity(
        &mut self,
        module: String,
        top_level: &IdSignature,
        candidates: &[ModuleId],
    ) -> Result<(), LinkError> {
        let error = LinkError::AmbiguousSignature {
            signature: top_level.clone(),
            module: module.clone(),
            candidates: candidates
                .iter()
                .map(|candidate| self.modules[*candidate].name().to_string())
                .collect(),
        };

        match self.ambiguity {
            AmbiguityPolicy::Error => Err(error),
            AmbiguityPolicy::Warn => {
                if self.reported_ambiguities.insert(top_level.clone()) {
                    log::warn!("{}", error);
                    self.diagnostics
                        .push(WarningDiagnostic::new(format!("{}, using the first", error), module));
                }
                Ok(())
            }
        }
    }

    pub fn enqueue_top_level(
        &mut self,
        module: ModuleId,
        top_level: IdSignature,
    ) -> Result<(), LinkError> {
        let deserializer = &self.modules[module];

        if deserializer
            .builtins
            .as_ref()
            .is_some_and(|builtins| builtins.contains(&top_level))
        {
            return Ok(());
        }

        let Some(file) = deserializer.owning_file(&top_level) else {
            return Err(LinkError::SignatureNotInModule {
                signature: top_level,
                module: deserializer.name().into(),
            });
        };

        self.enqueue_in_file(module, file, top_level);
        Ok(())
    }

    fn enqueue_in_file(&mut self, module: ModuleId, file: FileRef, top_level: IdSignature) {
        if self.is_key_materialized(module, file, &top_level) {
            return;
        }

        let Some(state) = self.modules[module].files.get_mut(file) else {
            return;
        };

        if state.enqueue(top_level) {
            self.modules_with_reachable.insert(module);
        }
    }

    pub fn is_key_materialized(&self, module: ModuleId, file: FileRef, key: &IdSignature) -> bool {
        let symbol = if key.is_public() {
            self.symbols.public(key)
        } else {
            self.file_state(module, file)
                .and_then(|state| state.local_symbols.get(key).copied())
        };

        symbol.is_some_and(|symbol| self.symbols.is_materialized(symbol))
    }

    /// Cell of a key declared by `module`, with its declaration scheduled.
    pub fn deserialize(
        &mut self,
        module: ModuleId,
        signature: &IdSignature,
        kind: SymbolKind,
    ) -> Result<SymbolRef, LinkError> {
        let deserializer = &self.modules[module];

        if let Some(symbol) = deserializer
            .builtins
            .as_ref()
            .and_then(|builtins| builtins.get(signature))
        {
            self.symbols.check_kind(symbol, kind)?;
            return Ok(symbol);
        }

        let top_level = signature.top_level();

        if !signature.is_public() || !deserializer.contains(&top_level) {
            return Err(LinkError::SignatureNotInModule {
                signature: signature.clone(),
                module: deserializer.name().into(),
            });
        }

        let symbol = self.public_symbol(signature, kind)?;

        if !self.symbols.is_materialized(symbol) {
            self.enqueue_top_level(module, top_level)?;
        }

        Ok(symbol)
    }

    /// Schedules the declaration of an existing public symbol in `module`.
    pub fn declare_symbol(&mut self, module: ModuleId, symbol: SymbolRef) -> Result<(), LinkError> {
        if self.symbols.is_materialized(symbol) {
            return Ok(());
        }

        let top_level = self.symbols.get(symbol).signature.top_level();

        if top_level.is_public() {
            self.enqueue_top_level(module, top_level)
        } else {
            Ok(())
        }
    }

    /// Materializes everything reachable in every module.
    pub fn drain(&mut self, decoder: &dyn DeclarationDecoder) -> Result<(), LinkError> {
        while let Some(module) = self.modules_with_reachable.shift_remove_index(0) {
            self.drain_module(module, decoder)?;
        }

        Ok(())
    }

    fn drain_module(
        &mut self,
        module: ModuleId,
        decoder: &dyn DeclarationDecoder,
    ) -> Result<(), LinkError> {
        log::debug!("Draining module '{}'", self.modules[module].name());

        while let Some((file, key)) = self.modules[module].next_reachable() {
            if !self.is_key_materialized(module, file, &key) {
                self.materialize(module, file, key, decoder)?;
            }
        }

        Ok(())
    }

    fn materialize(
        &mut self,
        module: ModuleId,
        file: FileRef,
        key: IdSignature,
        decoder: &dyn DeclarationDecoder,
    ) -> Result<(), LinkError> {
        let deserializer = &mut self.modules[module];

        let Some(library) = deserializer.library.as_deref() else {
            return Err(LinkError::NoLibrary {
                module: deserializer.fragment.name.clone(),
            });
        };

        let Some(index) = deserializer
            .files
            .get(file)
            .and_then(|state| state.declaration_index(&key))
        else {
            return Err(LinkError::MissingDeclarationIndex {
                signature: key,
                module: deserializer.fragment.name.clone(),
            });
        };

        let library_index = deserializer
            .files
            .get(file)
            .map_or(0, |state| state.library_index);
        let bytes = library.declaration(library_index, index)?.to_vec();

        log::trace!(
            "Materializing '{}' from module '{}'",
            key,
            deserializer.fragment.name
        );

        if let Some(state) = deserializer.files.get_mut(file) {
            state.begin(key.clone());
        }

        let result = decoder.decode(&mut DecodeContext::new(self, module, file), index, &bytes);

        if let Some(state) = self.modules[module].files.get_mut(file) {
            state.finish();
        }

        let decl = result?;
        self.modules[module].fragment.files[file]
            .declarations
            .push(decl);

        if !self.is_key_materialized(module, file, &key) {
            return Err(LinkError::UnexpectedDeclaration {
                signature: key,
                reason: format!("declaration #{} is indexed under it but binds another symbol", index),
            });
        }

        Ok(())
    }

    /// Adds a declaration to `module` and binds its symbol.
    pub fn alloc_declaration(
        &mut self,
        module: ModuleId,
        mut declaration: Declaration,
    ) -> Result<DeclRef, LinkError> {
        let expected = self.symbols.get(declaration.symbol).kind;
        let found = declaration.symbol_kind();

        if expected != found {
            return Err(LinkError::SymbolKindMismatch {
                signature: self.symbols.get(declaration.symbol).signature.clone(),
                expected,
                found,
            });
        }

        let symbol = self.symbols.binding_cell(declaration.symbol);
        let is_class = declaration.kind.is_class();
        declaration.symbol = symbol;

        let decl = self.modules[module].fragment.decls.alloc(declaration);
        let handle = DeclHandle::new(module, decl);
        self.symbols.bind(symbol, handle)?;

        if is_class {
            self.pending_classes.insert(handle);
        }

        Ok(decl)
    }

    /// File of `module` that holds declarations nobody read from a library.
    pub(crate) fn synthetic_file(&mut self, module: ModuleId) -> FileRef {
        let deserializer = &mut self.modules[module];

        match deserializer.synthetic_file {
            Some(file) => file,
            None => {
                let file = deserializer
                    .fragment
                    .files
                    .alloc(IrFile::new("<synthetic>", "", vec![]));
                deserializer.synthetic_file = Some(file);
                file
            }
        }
    }

    /// Points every materialized expect at its materialized actual.
    pub fn finalize_expect_actual(&mut self) -> Result<usize, LinkError> {
        let pairs = self
            .expect_actual
            .pairs()
            .map(|(expect, actual)| (expect.clone(), actual.clone()))
            .collect::<Vec<_>>();

        let mut retargeted = 0;

        for (expect, actual) in pairs {
            let (Some(expect_symbol), Some(actual_symbol)) = (
                self.expect_actual.expect_symbols.get(&expect).copied(),
                self.expect_actual.actual_symbols.get(&actual).copied(),
            ) else {
                continue;
            };

            let Some(delegation) = self.symbols.get(expect_symbol).delegation() else {
                continue;
            };

            if delegation.target.is_some() {
                continue;
            }

            if !self.symbols.is_materialized(expect_symbol)
                || !self.symbols.is_materialized(actual_symbol)
            {
                log::debug!("Expect '{}' stays without its actual '{}'", expect, actual);
                continue;
            }

            self.symbols
                .check_kind(actual_symbol, self.symbols.get(expect_symbol).kind)?;
            self.symbols.retarget(expect_symbol, actual_symbol)?;
            retargeted += 1;
        }

        Ok(retargeted)
    }
}
