use derive_more::IsVariant;
use std::fmt::Display;
use thiserror::Error;

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, IsVariant)]
pub enum Section {
    Header,
    Declarations,
    Types,
    Signatures,
    Strings,
    Bodies,
    Debug,
}

impl Section {
    pub const COUNT: usize = 7;

    pub const ALL: [Section; Self::COUNT] = [
        Self::Header,
        Self::Declarations,
        Self::Types,
        Self::Signatures,
        Self::Strings,
        Self::Bodies,
        Self::Debug,
    ];
}

impl Display for Section {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Self::Header => "header",
            Self::Declarations => "declaration",
            Self::Types => "type",
            Self::Signatures => "signature",
            Self::Strings => "string",
            Self::Bodies => "body",
            Self::Debug => "debug info",
        })
    }
}

#[derive(Debug, Error)]
pub enum LibraryError {
    #[error("No {section} #{index} in file #{file}")]
    IndexOutOfRange {
        section: Section,
        index: u32,
        file: u32,
    },
    #[error("No file #{file} in library")]
    MissingFile { file: u32 },
    #[error("Malformed {section} #{index} in file #{file}: {reason}")]
    Malformed {
        section: Section,
        index: u32,
        file: u32,
        reason: String,
    },
    #[error("Not a library, magic bytes do not match")]
    BadMagic,
    #[error("Unsupported library format version {version}")]
    UnsupportedVersion { version: u16 },
    #[error("Corrupt library container: {reason}")]
    Container { reason: String },
    #[error("Failed to read library '{path}'")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
}
