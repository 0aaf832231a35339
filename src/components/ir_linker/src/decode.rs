use crate::{DeserializationStrategy, LinkError, LinkState};
use ir_tree::{
    Body, Callable, DeclKind, DeclOrigin, DeclParent, DeclRef, Declaration, FileRef, IdSignature,
    IrType, ModuleId, SymbolRef,
};
use klib::{
    CallableRecord, DeclarationKindRecord, DeclarationRecord, LibraryError, LibraryFile, Section,
    SymbolData, decode_record,
};
use std::collections::VecDeque;

const MAX_TYPE_NESTING: usize = 64;

/// Turns the bytes of one top-level declaration into a declaration tree.
///
/// The decoder allocates the top-level declaration and all of its members
/// through the context, and returns the top-level one.
pub trait DeclarationDecoder: Send {
    fn decode(
        &self,
        cx: &mut DecodeContext<'_, '_>,
        index: u32,
        bytes: &[u8],
    ) -> Result<DeclRef, LinkError>;
}

/// Everything a [`DeclarationDecoder`] may touch while materializing one
/// declaration of one file.
pub struct DecodeContext<'s, 'a> {
    state: &'s mut LinkState<'a>,
    module: ModuleId,
    file: FileRef,
}

impl<'s, 'a> DecodeContext<'s, 'a> {
    pub(crate) fn new(state: &'s mut LinkState<'a>, module: ModuleId, file: FileRef) -> Self {
        Self {
            state,
            module,
            file,
        }
    }

    pub fn module(&self) -> ModuleId {
        self.module
    }

    pub fn file(&self) -> FileRef {
        self.file
    }

    pub fn strategy(&self) -> DeserializationStrategy {
        self.state.modules[self.module].strategy
    }

    pub fn library_file_index(&self) -> u32 {
        self.state
            .file_state(self.module, self.file)
            .map_or(0, |state| state.library_index)
    }

    fn reader(&self) -> Result<LibraryFile<'_>, LinkError> {
        let deserializer = &self.state.modules[self.module];

        let library = deserializer
            .library
            .as_deref()
            .ok_or_else(|| LinkError::NoLibrary {
                module: deserializer.fragment.name.clone(),
            })?;

        Ok(LibraryFile::new(library, self.library_file_index()))
    }

    pub fn string(&self, index: u32) -> Result<String, LinkError> {
        Ok(self.reader()?.string(index)?)
    }

    pub fn debug_info(&self, index: u32) -> Result<Option<String>, LinkError> {
        Ok(self.reader()?.debug_info(index)?)
    }

    pub fn signature(&mut self, index: u32) -> Result<IdSignature, LinkError> {
        let deserializer = &mut self.state.modules[self.module];

        let (Some(library), Some(state)) = (
            deserializer.library.as_deref(),
            deserializer.files.get_mut(self.file),
        ) else {
            return Err(LinkError::NoLibrary {
                module: deserializer.fragment.name.clone(),
            });
        };

        let reader = LibraryFile::new(library, state.library_index);
        Ok(state.signatures.decode(reader, index)?)
    }

    /// Symbol referenced by a record, with its declaration scheduled.
    pub fn reference(&mut self, data: SymbolData) -> Result<SymbolRef, LinkError> {
        let signature = self.signature(data.signature)?;
        self.state
            .reference_from_file(self.module, self.file, signature, data.kind)
    }

    /// Symbol a record declares. Nothing gets scheduled.
    pub fn declare(&mut self, data: SymbolData) -> Result<SymbolRef, LinkError> {
        let signature = self.signature(data.signature)?;
        self.state
            .file_symbol(self.module, self.file, &signature, data.kind)
    }

    pub fn ty(&mut self, index: u32) -> Result<IrType, LinkError> {
        self.ty_nested(index, 0)
    }

    fn ty_nested(&mut self, index: u32, depth: usize) -> Result<IrType, LinkError> {
        if depth > MAX_TYPE_NESTING {
            return Err(LibraryError::Malformed {
                section: Section::Types,
                index,
                file: self.library_file_index(),
                reason: "type nests too deeply".into(),
            }
            .into());
        }

        let record = self.reader()?.ty(index)?;
        let classifier = self.reference(record.classifier)?;

        let arguments = record
            .arguments
            .iter()
            .map(|argument| self.ty_nested(*argument, depth + 1))
            .collect::<Result<Vec<_>, _>>()?;

        Ok(IrType {
            classifier,
            arguments,
            nullable: record.nullable,
        })
    }

    pub fn body(&mut self, index: u32) -> Result<Body, LinkError> {
        let record = self.reader()?.body(index)?;

        let references = record
            .references
            .iter()
            .map(|data| self.reference(*data))
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Body { references })
    }

    pub fn alloc(&mut self, declaration: Declaration) -> Result<DeclRef, LinkError> {
        self.state.alloc_declaration(self.module, declaration)
    }

    pub fn declaration_mut(&mut self, decl: DeclRef) -> &mut Declaration {
        &mut self.state.modules[self.module].fragment.decls[decl]
    }
}

/// Decoder for the record format written by [`klib::LibraryBuilder`].
#[derive(Copy, Clone, Debug, Default)]
pub struct RecordDecoder;

impl DeclarationDecoder for RecordDecoder {
    fn decode(
        &self,
        cx: &mut DecodeContext<'_, '_>,
        index: u32,
        bytes: &[u8],
    ) -> Result<DeclRef, LinkError> {
        let record: DeclarationRecord = decode_record(
            bytes,
            Section::Declarations,
            cx.library_file_index(),
            index,
        )?;

        let debug_info = cx.debug_info(index)?;
        let file = cx.file();
        let top_level = declaration(cx, &record, DeclParent::File(file), debug_info)?;

        let mut members = record
            .members
            .iter()
            .map(|member| (top_level, member))
            .collect::<VecDeque<_>>();

        while let Some((parent, member)) = members.pop_front() {
            let decl = declaration(cx, member, DeclParent::Declaration(parent), None)?;
            cx.declaration_mut(parent).members.push(decl);
            members.extend(member.members.iter().map(|nested| (decl, nested)));
        }

        Ok(top_level)
    }
}

fn declaration(
    cx: &mut DecodeContext<'_, '_>,
    record: &DeclarationRecord,
    parent: DeclParent,
    debug_info: Option<String>,
) -> Result<DeclRef, LinkError> {
    let symbol = cx.declare(record.symbol)?;
    let name = cx.string(record.name)?;
    let strategy = cx.strategy();
    let file = cx.file();

    let kind = match &record.kind {
        DeclarationKindRecord::Class { supertypes } => DeclKind::Class {
            supertypes: supertypes
                .iter()
                .map(|supertype| cx.ty(*supertype))
                .collect::<Result<Vec<_>, _>>()?,
        },
        DeclarationKindRecord::Constructor(callable) => {
            DeclKind::Constructor(self::callable(cx, callable, strategy)?)
        }
        DeclarationKindRecord::Function(callable) => {
            DeclKind::Function(self::callable(cx, callable, strategy)?)
        }
        DeclarationKindRecord::Property { ty, initializer } => DeclKind::Property {
            ty: cx.ty(*ty)?,
            initializer: match initializer {
                Some(body) if strategy.need_bodies() => Some(cx.body(*body)?),
                _ => None,
            },
        },
        DeclarationKindRecord::TypeAlias { expanded } => DeclKind::TypeAlias {
            expanded: cx.ty(*expanded)?,
        },
        DeclarationKindRecord::EnumEntry => DeclKind::EnumEntry,
    };

    cx.alloc(Declaration {
        symbol,
        name,
        kind,
        origin: DeclOrigin::Defined,
        is_expect: record.is_expect,
        file,
        parent,
        members: vec![],
        debug_info,
    })
}

fn callable(
    cx: &mut DecodeContext<'_, '_>,
    record: &CallableRecord,
    strategy: DeserializationStrategy,
) -> Result<Callable, LinkError> {
    let params = record
        .params
        .iter()
        .map(|param| cx.ty(*param))
        .collect::<Result<Vec<_>, _>>()?;

    let return_type = cx.ty(record.return_type)?;

    let wants_body =
        strategy.need_bodies() || (strategy.inline_bodies() && record.is_inline);

    let body = match record.body {
        Some(body) if wants_body => Some(cx.body(body)?),
        _ => None,
    };

    Ok(Callable {
        params,
        return_type,
        is_inline: record.is_inline,
        body,
    })
}
