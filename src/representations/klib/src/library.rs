use crate::{
    BodyRecord, DeclarationRecord, FileHeader, LibraryError, Section, SignatureRecord, TypeRecord,
    records::decode_record,
};

/// Read access to the raw byte ranges of a packaged library.
///
/// Implementations hand out bytes and never interpret them.
pub trait IrLibrary: Send {
    fn file_count(&self) -> u32;
    fn file_header(&self, file: u32) -> Result<&[u8], LibraryError>;
    fn declaration(&self, file: u32, index: u32) -> Result<&[u8], LibraryError>;
    fn ty(&self, file: u32, index: u32) -> Result<&[u8], LibraryError>;
    fn signature(&self, file: u32, index: u32) -> Result<&[u8], LibraryError>;
    fn string(&self, file: u32, index: u32) -> Result<&[u8], LibraryError>;
    fn body(&self, file: u32, index: u32) -> Result<&[u8], LibraryError>;

    /// Debug entry of a declaration, if the producer wrote one.
    fn debug_info(&self, file: u32, index: u32) -> Result<Option<&[u8]>, LibraryError>;
}

/// One file of a library, with its records decoded on request.
#[derive(Copy, Clone)]
pub struct LibraryFile<'l> {
    library: &'l dyn IrLibrary,
    file: u32,
}

impl<'l> LibraryFile<'l> {
    pub fn new(library: &'l dyn IrLibrary, file: u32) -> Self {
        Self { library, file }
    }

    pub fn index(&self) -> u32 {
        self.file
    }

    pub fn header(&self) -> Result<FileHeader, LibraryError> {
        decode_record(
            self.library.file_header(self.file)?,
            Section::Header,
            self.file,
            0,
        )
    }

    /// Text of a string entry. Malformed text is repaired, never rejected.
    pub fn string(&self, index: u32) -> Result<String, LibraryError> {
        let bytes = self.library.string(self.file, index)?;
        Ok(wobbly_text::decode(bytes).into_owned())
    }

    /// Dot-joined qualified name built from string entries.
    pub fn fq_name(&self, segments: &[u32]) -> Result<String, LibraryError> {
        let segments = segments
            .iter()
            .map(|index| self.string(*index))
            .collect::<Result<Vec<_>, _>>()?;

        Ok(segments.join("."))
    }

    pub fn signature(&self, index: u32) -> Result<SignatureRecord, LibraryError> {
        let bytes = self.library.signature(self.file, index)?;
        decode_record(bytes, Section::Signatures, self.file, index)
    }

    pub fn ty(&self, index: u32) -> Result<TypeRecord, LibraryError> {
        let bytes = self.library.ty(self.file, index)?;
        decode_record(bytes, Section::Types, self.file, index)
    }

    pub fn body(&self, index: u32) -> Result<BodyRecord, LibraryError> {
        let bytes = self.library.body(self.file, index)?;
        decode_record(bytes, Section::Bodies, self.file, index)
    }

    pub fn declaration(&self, index: u32) -> Result<DeclarationRecord, LibraryError> {
        let bytes = self.library.declaration(self.file, index)?;
        decode_record(bytes, Section::Declarations, self.file, index)
    }

    pub fn debug_info(&self, index: u32) -> Result<Option<String>, LibraryError> {
        Ok(self
            .library
            .debug_info(self.file, index)?
            .map(|bytes| wobbly_text::decode(bytes).into_owned()))
    }
}
