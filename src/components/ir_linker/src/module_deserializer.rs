use crate::{BuiltIns, DeserializationStrategy, FileState, LinkError, SignatureDecoder};
use arena::ArenaMap;
use indexmap::IndexMap;
use ir_tree::{FileId, FileRef, IdSignature, IrFile, ModuleFragment, ModuleId};
use klib::{IrLibrary, LibraryFile};
use std::collections::HashMap;

/// One compiled unit: its files, what has been materialized from them, and
/// the modules it depends on.
pub struct ModuleDeserializer {
    /// `None` for the module being compiled, which has no library.
    pub(crate) library: Option<Box<dyn IrLibrary>>,
    pub(crate) strategy: DeserializationStrategy,
    pub(crate) fragment: ModuleFragment,
    pub(crate) files: ArenaMap<FileId, FileState>,
    top_level_index: HashMap<IdSignature, FileRef>,
    pub(crate) dependencies: Vec<ModuleId>,
    pub(crate) builtins: Option<BuiltIns>,
    /// File that holds declarations made up by linker extensions.
    pub(crate) synthetic_file: Option<FileRef>,
}

impl std::fmt::Debug for ModuleDeserializer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ModuleDeserializer")
            .field("name", &self.fragment.name)
            .field("strategy", &self.strategy)
            .field("dependencies", &self.dependencies)
            .finish_non_exhaustive()
    }
}

/// Expect/actual pairs announced by a module's file headers.
pub type ActualPairs = Vec<(IdSignature, IdSignature)>;

impl ModuleDeserializer {
    /// Reads every file header of `library` and seeds the work-lists the
    /// strategy asks for.
    pub fn read(
        name: &str,
        library: Box<dyn IrLibrary>,
        strategy: DeserializationStrategy,
        dependencies: Vec<ModuleId>,
    ) -> Result<(Self, ActualPairs), LinkError> {
        let mut fragment = ModuleFragment::new(name);
        let mut files = ArenaMap::new();
        let mut top_level_index = HashMap::new();
        let mut actuals = Vec::new();

        for library_index in 0..library.file_count() {
            let reader = LibraryFile::new(library.as_ref(), library_index);
            let header = reader.header()?;
            let mut signatures = SignatureDecoder::default();

            let file = fragment.files.alloc(IrFile::new(
                header.path.clone(),
                reader.fq_name(&header.package)?,
                header.line_starts.clone(),
            ));

            let mut signature_index = IndexMap::with_capacity(header.declarations.len());

            for (signature, declaration) in header.declarations.iter().copied() {
                let signature = signatures.decode(reader, signature)?;
                top_level_index.entry(signature.clone()).or_insert(file);
                signature_index.insert(signature, declaration);
            }

            for (expect, actual) in header.actuals.iter().copied() {
                actuals.push((
                    signatures.decode(reader, expect)?,
                    signatures.decode(reader, actual)?,
                ));
            }

            let mut state = FileState::new(
                file,
                library_index,
                signature_index,
                signatures,
                header.annotations.clone(),
            );

            if strategy.whole_world() {
                state.enqueue_all();
            } else if strategy.explicitly_exported() {
                for exported in header.exported.iter().copied() {
                    let signature = state.signatures.decode(reader, exported)?;

                    if !signature.is_package() {
                        state.enqueue(signature.top_level());
                    }
                }
            }

            files.insert(file, state);
        }

        log::debug!(
            "Read module '{}': {} files, {} top-level declarations, strategy {:?}",
            name,
            fragment.files.len(),
            top_level_index.len(),
            strategy
        );

        Ok((
            Self {
                library: Some(library),
                strategy,
                fragment,
                files,
                top_level_index,
                dependencies,
                builtins: None,
                synthetic_file: None,
            },
            actuals,
        ))
    }

    /// Module being compiled right now. It owns no library declarations and
    /// only contributes dependency edges.
    pub fn current(name: &str, dependencies: Vec<ModuleId>) -> Self {
        Self {
            library: None,
            strategy: DeserializationStrategy::OnlyReferenced,
            fragment: ModuleFragment::new(name),
            files: ArenaMap::new(),
            top_level_index: HashMap::new(),
            dependencies,
            builtins: None,
            synthetic_file: None,
        }
    }

    pub fn name(&self) -> &str {
        &self.fragment.name
    }

    pub fn fragment(&self) -> &ModuleFragment {
        &self.fragment
    }

    pub fn strategy(&self) -> DeserializationStrategy {
        self.strategy
    }

    pub fn dependencies(&self) -> &[ModuleId] {
        &self.dependencies
    }

    /// Whether this module itself declares the top-level key.
    pub fn contains(&self, signature: &IdSignature) -> bool {
        self.builtins
            .as_ref()
            .is_some_and(|builtins| builtins.contains(signature))
            || self.top_level_index.contains_key(signature)
    }

    pub fn owning_file(&self, signature: &IdSignature) -> Option<FileRef> {
        self.top_level_index.get(signature).copied()
    }

    pub fn has_reachable(&self) -> bool {
        self.files.iter().any(|(_, state)| state.has_reachable())
    }

    /// Takes the oldest pending key of the first file that has one.
    pub(crate) fn next_reachable(&mut self) -> Option<(FileRef, IdSignature)> {
        self.files
            .values_mut()
            .find(|state| state.has_reachable())
            .and_then(|state| state.pop_reachable().map(|key| (state.file, key)))
    }
}
