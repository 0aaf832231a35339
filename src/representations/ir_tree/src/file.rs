use crate::{DeclId, DeclRef, Declaration, FileId, FileRef, IrType};
use arena::Arena;

#[derive(Clone, Debug, Default)]
pub struct IrFile {
    pub path: String,
    pub package: String,
    /// Byte offsets at which each line starts.
    pub line_starts: Vec<u32>,
    /// Top-level declarations in the order they were materialized.
    pub declarations: Vec<DeclRef>,
    /// Filled in on first request.
    pub annotations: Option<Vec<IrType>>,
}

impl IrFile {
    pub fn new(path: impl Into<String>, package: impl Into<String>, line_starts: Vec<u32>) -> Self {
        Self {
            path: path.into(),
            package: package.into(),
            line_starts,
            declarations: vec![],
            annotations: None,
        }
    }

    /// Zero-based line and column of a byte offset.
    pub fn line_column(&self, offset: u32) -> (usize, u32) {
        let line = match self.line_starts.binary_search(&offset) {
            Ok(line) => line,
            Err(0) => return (0, offset),
            Err(next) => next - 1,
        };

        (line, offset - self.line_starts[line])
    }
}

/// Everything materialized so far for one module.
#[derive(Clone, Debug)]
pub struct ModuleFragment {
    pub name: String,
    pub files: Arena<FileId, IrFile>,
    pub decls: Arena<DeclId, Declaration>,
}

impl ModuleFragment {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            files: Arena::new(),
            decls: Arena::new(),
        }
    }

    pub fn top_level(&self) -> impl Iterator<Item = (FileRef, DeclRef)> + '_ {
        self.files
            .iter()
            .flat_map(|(file_ref, file)| file.declarations.iter().map(move |decl| (file_ref, *decl)))
    }

    pub fn find_top_level(&self, name: &str) -> Option<&Declaration> {
        self.top_level()
            .map(|(_, decl)| &self.decls[decl])
            .find(|decl| decl.name == name)
    }
}
