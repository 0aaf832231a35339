use crate::{
    BodyRecord, CallableRecord, CommonSignatureRecord, DeclarationKindRecord, DeclarationRecord,
    FileHeader, InMemoryLibrary, LibraryError, SignatureRecord, SymbolData, TypeRecord,
    in_memory::FileSections, records::encode_record,
};
use ir_tree::{CommonSignature, IdSignature, SymbolKind};
use std::collections::HashMap;

/// Produces libraries in the container format.
#[derive(Debug, Default)]
pub struct LibraryBuilder {
    files: Vec<FileBuilder>,
}

impl LibraryBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Starts a new file. Files are numbered in the order they are added.
    pub fn file(&mut self, path: &str, package: &str) -> &mut FileBuilder {
        let mut file = FileBuilder {
            path: path.into(),
            ..Default::default()
        };

        file.header.package = file.fq_name(package);
        self.files.push(file);

        let last = self.files.len() - 1;
        &mut self.files[last]
    }

    pub fn finish(self) -> Result<InMemoryLibrary, LibraryError> {
        let files = self
            .files
            .into_iter()
            .map(FileBuilder::finish)
            .collect::<Result<Vec<_>, _>>()?;

        Ok(InMemoryLibrary::from_files(files))
    }
}

#[derive(Debug, Default)]
pub struct FileBuilder {
    path: String,
    header: FileHeader,
    strings: Vec<Vec<u8>>,
    interned: HashMap<String, u32>,
    signatures: Vec<SignatureRecord>,
    signature_indices: HashMap<IdSignature, u32>,
    types: Vec<TypeRecord>,
    bodies: Vec<BodyRecord>,
    declarations: Vec<DeclarationRecord>,
    raw_declarations: Vec<(u32, Vec<u8>)>,
    debug: Vec<Option<Vec<u8>>>,
}

impl FileBuilder {
    pub fn line_starts(&mut self, line_starts: Vec<u32>) -> &mut Self {
        self.header.line_starts = line_starts;
        self
    }

    pub fn string(&mut self, text: &str) -> u32 {
        if let Some(index) = self.interned.get(text) {
            return *index;
        }

        let index = self.raw_string(text.as_bytes());
        self.interned.insert(text.into(), index);
        index
    }

    /// Adds a string entry verbatim, without interning or validation.
    pub fn raw_string(&mut self, bytes: &[u8]) -> u32 {
        self.strings.push(bytes.to_vec());
        (self.strings.len() - 1) as u32
    }

    fn fq_name(&mut self, name: &str) -> Vec<u32> {
        if name.is_empty() {
            return vec![];
        }

        name.split('.').map(|segment| self.string(segment)).collect()
    }

    fn common(&mut self, common: &CommonSignature) -> CommonSignatureRecord {
        CommonSignatureRecord {
            package: self.fq_name(&common.package),
            declaration: self.fq_name(&common.declaration),
            id: common.id,
            is_expect: common.is_expect,
        }
    }

    pub fn signature(&mut self, signature: &IdSignature) -> u32 {
        if let Some(index) = self.signature_indices.get(signature) {
            return *index;
        }

        let record = match signature {
            IdSignature::Public(common) => SignatureRecord::Public(self.common(common)),
            IdSignature::Accessor { property, accessor } => SignatureRecord::Accessor {
                property: self.signature(property),
                accessor: self.common(accessor),
            },
            IdSignature::FileLocal { container, id } => SignatureRecord::FileLocal {
                container: container
                    .as_deref()
                    .map(|container| self.signature(container)),
                id: *id,
            },
            IdSignature::Scoped { id } => SignatureRecord::Scoped { id: *id },
        };

        self.signatures.push(record);
        let index = (self.signatures.len() - 1) as u32;
        self.signature_indices.insert(signature.clone(), index);
        index
    }

    /// Adds a signature entry with arbitrary content.
    pub fn raw_signature(&mut self, record: SignatureRecord) -> u32 {
        self.signatures.push(record);
        (self.signatures.len() - 1) as u32
    }

    pub fn symbol(&mut self, kind: SymbolKind, signature: &IdSignature) -> SymbolData {
        SymbolData {
            kind,
            signature: self.signature(signature),
        }
    }

    pub fn ty(
        &mut self,
        kind: SymbolKind,
        classifier: &IdSignature,
        arguments: &[u32],
        nullable: bool,
    ) -> u32 {
        let classifier = self.symbol(kind, classifier);

        self.types.push(TypeRecord {
            classifier,
            arguments: arguments.to_vec(),
            nullable,
        });
        (self.types.len() - 1) as u32
    }

    /// Non-null, non-generic type of a class.
    pub fn class_type(&mut self, classifier: &IdSignature) -> u32 {
        self.ty(SymbolKind::Class, classifier, &[], false)
    }

    pub fn body(&mut self, references: &[(SymbolKind, IdSignature)]) -> u32 {
        let references = references
            .iter()
            .map(|(kind, signature)| self.symbol(*kind, signature))
            .collect();

        self.bodies.push(BodyRecord { references });
        (self.bodies.len() - 1) as u32
    }

    fn name_of(&mut self, signature: &IdSignature) -> u32 {
        match signature {
            IdSignature::Public(common) => self.string(common.short_name()),
            IdSignature::Accessor { accessor, .. } => self.string(accessor.short_name()),
            IdSignature::FileLocal { id, .. } => self.string(&format!("local{}", id)),
            IdSignature::Scoped { id } => self.string(&format!("scoped{}", id)),
        }
    }

    pub fn record(
        &mut self,
        signature: &IdSignature,
        kind: DeclarationKindRecord,
    ) -> DeclarationRecord {
        let symbol = self.symbol(kind.symbol_kind(), signature);
        let name = self.name_of(signature);
        DeclarationRecord::new(symbol, name, kind)
    }

    pub fn class_record(&mut self, signature: &IdSignature, supertypes: &[u32]) -> DeclarationRecord {
        self.record(
            signature,
            DeclarationKindRecord::Class {
                supertypes: supertypes.to_vec(),
            },
        )
    }

    pub fn function_record(
        &mut self,
        signature: &IdSignature,
        params: &[u32],
        return_type: u32,
        body: Option<u32>,
    ) -> DeclarationRecord {
        self.record(
            signature,
            DeclarationKindRecord::Function(CallableRecord {
                params: params.to_vec(),
                return_type,
                is_inline: false,
                body,
            }),
        )
    }

    pub fn property_record(
        &mut self,
        signature: &IdSignature,
        ty: u32,
        initializer: Option<u32>,
    ) -> DeclarationRecord {
        self.record(signature, DeclarationKindRecord::Property { ty, initializer })
    }

    /// Adds a top-level declaration and indexes it under `signature`.
    pub fn declare(&mut self, signature: &IdSignature, record: DeclarationRecord) -> u32 {
        let signature = self.signature(signature);
        self.declarations.push(record);
        self.debug.push(None);

        let index = (self.declarations.len() - 1) as u32;
        self.header.declarations.push((signature, index));
        index
    }

    /// Adds raw bytes as a declaration entry, for corrupt-input fixtures.
    pub fn raw_declaration(&mut self, signature: &IdSignature, bytes: Vec<u8>) -> u32 {
        let placeholder = self.record(signature, DeclarationKindRecord::EnumEntry);
        let index = self.declare(signature, placeholder);
        self.raw_declarations.push((index, bytes));
        index
    }

    pub fn debug(&mut self, declaration: u32, text: &[u8]) -> &mut Self {
        if let Some(entry) = self.debug.get_mut(declaration as usize) {
            *entry = Some(text.to_vec());
        }
        self
    }

    pub fn export(&mut self, signature: &IdSignature) -> &mut Self {
        let signature = self.signature(signature);
        self.header.exported.push(signature);
        self
    }

    pub fn actual(&mut self, expect: &IdSignature, actual: &IdSignature) -> &mut Self {
        let pair = (self.signature(expect), self.signature(actual));
        self.header.actuals.push(pair);
        self
    }

    pub fn annotation(&mut self, ty: u32) -> &mut Self {
        self.header.annotations.push(ty);
        self
    }

    fn finish(self) -> Result<FileSections, LibraryError> {
        let header = FileHeader {
            path: self.path,
            ..self.header
        };

        let mut declarations = self
            .declarations
            .iter()
            .map(encode_record)
            .collect::<Result<Vec<_>, _>>()?;

        for (index, bytes) in self.raw_declarations {
            declarations[index as usize] = bytes;
        }

        Ok(FileSections {
            header: encode_record(&header)?,
            declarations,
            types: self.types.iter().map(encode_record).collect::<Result<_, _>>()?,
            signatures: self.signatures.iter().map(encode_record).collect::<Result<_, _>>()?,
            strings: self.strings,
            bodies: self.bodies.iter().map(encode_record).collect::<Result<_, _>>()?,
            debug: self.debug,
        })
    }
}
