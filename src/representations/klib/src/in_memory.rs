use crate::{IrLibrary, LibraryError, Section, records::encode_record};
use serde::{Deserialize, Serialize};
use std::{
    path::Path,
    sync::{
        Arc,
        atomic::{AtomicUsize, Ordering},
    },
};

pub const MAGIC: [u8; 4] = *b"KLIB";
pub const FORMAT_VERSION: u16 = 1;

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub(crate) struct FileSections {
    pub header: Vec<u8>,
    pub declarations: Vec<Vec<u8>>,
    pub types: Vec<Vec<u8>>,
    pub signatures: Vec<Vec<u8>>,
    pub strings: Vec<Vec<u8>>,
    pub bodies: Vec<Vec<u8>>,
    /// Indexed by declaration index.
    pub debug: Vec<Option<Vec<u8>>>,
}

/// Number of reads served per section.
#[derive(Debug, Default)]
pub struct ReadStats {
    counts: [AtomicUsize; Section::COUNT],
}

impl ReadStats {
    fn record(&self, section: Section) {
        self.counts[section as usize].fetch_add(1, Ordering::Relaxed);
    }

    pub fn get(&self, section: Section) -> usize {
        self.counts[section as usize].load(Ordering::Relaxed)
    }

    pub fn total(&self) -> usize {
        Section::ALL.iter().map(|section| self.get(*section)).sum()
    }
}

/// Library held fully in memory, loadable from and writable to a container.
#[derive(Debug, Default)]
pub struct InMemoryLibrary {
    files: Vec<FileSections>,
    stats: Arc<ReadStats>,
}

impl InMemoryLibrary {
    pub(crate) fn from_files(files: Vec<FileSections>) -> Self {
        Self {
            files,
            stats: Default::default(),
        }
    }

    pub fn stats(&self) -> Arc<ReadStats> {
        self.stats.clone()
    }

    pub fn to_bytes(&self) -> Result<Vec<u8>, LibraryError> {
        let mut bytes = Vec::from(MAGIC);
        bytes.extend_from_slice(&FORMAT_VERSION.to_le_bytes());
        bytes.extend(encode_record(&self.files)?);
        Ok(bytes)
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self, LibraryError> {
        let Some((magic, rest)) = bytes.split_first_chunk::<4>() else {
            return Err(LibraryError::BadMagic);
        };

        if *magic != MAGIC {
            return Err(LibraryError::BadMagic);
        }

        let Some((version, image)) = rest.split_first_chunk::<2>() else {
            return Err(LibraryError::Container {
                reason: "missing format version".into(),
            });
        };

        let version = u16::from_le_bytes(*version);

        if version != FORMAT_VERSION {
            return Err(LibraryError::UnsupportedVersion { version });
        }

        let (files, _) = bincode::serde::decode_from_slice(image, bincode::config::standard())
            .map_err(|error| LibraryError::Container {
                reason: error.to_string(),
            })?;

        Ok(Self::from_files(files))
    }

    pub fn open(path: impl AsRef<Path>) -> Result<Self, LibraryError> {
        let path = path.as_ref();

        let bytes = std::fs::read(path).map_err(|source| LibraryError::Io {
            path: path.display().to_string(),
            source,
        })?;

        Self::from_bytes(&bytes)
    }

    fn file(&self, file: u32) -> Result<&FileSections, LibraryError> {
        self.files
            .get(file as usize)
            .ok_or(LibraryError::MissingFile { file })
    }

    fn entry<'a>(
        &'a self,
        file: u32,
        index: u32,
        section: Section,
        pick: impl FnOnce(&'a FileSections) -> &'a [Vec<u8>],
    ) -> Result<&'a [u8], LibraryError> {
        self.stats.record(section);

        pick(self.file(file)?)
            .get(index as usize)
            .map(Vec::as_slice)
            .ok_or(LibraryError::IndexOutOfRange {
                section,
                index,
                file,
            })
    }
}

impl IrLibrary for InMemoryLibrary {
    fn file_count(&self) -> u32 {
        self.files.len() as u32
    }

    fn file_header(&self, file: u32) -> Result<&[u8], LibraryError> {
        self.stats.record(Section::Header);
        Ok(&self.file(file)?.header)
    }

    fn declaration(&self, file: u32, index: u32) -> Result<&[u8], LibraryError> {
        self.entry(file, index, Section::Declarations, |f| f.declarations.as_slice())
    }

    fn ty(&self, file: u32, index: u32) -> Result<&[u8], LibraryError> {
        self.entry(file, index, Section::Types, |f| f.types.as_slice())
    }

    fn signature(&self, file: u32, index: u32) -> Result<&[u8], LibraryError> {
        self.entry(file, index, Section::Signatures, |f| f.signatures.as_slice())
    }

    fn string(&self, file: u32, index: u32) -> Result<&[u8], LibraryError> {
        self.entry(file, index, Section::Strings, |f| f.strings.as_slice())
    }

    fn body(&self, file: u32, index: u32) -> Result<&[u8], LibraryError> {
        self.entry(file, index, Section::Bodies, |f| f.bodies.as_slice())
    }

    fn debug_info(&self, file: u32, index: u32) -> Result<Option<&[u8]>, LibraryError> {
        self.stats.record(Section::Debug);

        Ok(self
            .file(file)?
            .debug
            .get(index as usize)
            .and_then(|entry| entry.as_deref()))
    }
}
