use ir_tree::{CommonSignature, IdSignature};
use klib::{CommonSignatureRecord, LibraryError, LibraryFile, Section, SignatureRecord};
use std::collections::HashMap;

/// Nesting beyond this is treated as a malformed signature table.
const MAX_NESTING: usize = 64;

/// Turns signature entries of one file into identity keys, remembering each.
#[derive(Debug, Default)]
pub struct SignatureDecoder {
    cache: HashMap<u32, IdSignature>,
}

impl SignatureDecoder {
    pub fn decode(&mut self, file: LibraryFile, index: u32) -> Result<IdSignature, LibraryError> {
        self.decode_nested(file, index, 0)
    }

    fn decode_nested(
        &mut self,
        file: LibraryFile,
        index: u32,
        depth: usize,
    ) -> Result<IdSignature, LibraryError> {
        if let Some(signature) = self.cache.get(&index) {
            return Ok(signature.clone());
        }

        if depth > MAX_NESTING {
            return Err(LibraryError::Malformed {
                section: Section::Signatures,
                index,
                file: file.index(),
                reason: "signature nests too deeply".into(),
            });
        }

        let signature = match file.signature(index)? {
            SignatureRecord::Public(common) => IdSignature::Public(Self::common(file, &common)?),
            SignatureRecord::Accessor { property, accessor } => IdSignature::Accessor {
                property: Box::new(self.decode_nested(file, property, depth + 1)?),
                accessor: Self::common(file, &accessor)?,
            },
            SignatureRecord::FileLocal { container, id } => IdSignature::FileLocal {
                container: container
                    .map(|container| self.decode_nested(file, container, depth + 1))
                    .transpose()?
                    .map(Box::new),
                id,
            },
            SignatureRecord::Scoped { id } => IdSignature::Scoped { id },
        };

        self.cache.insert(index, signature.clone());
        Ok(signature)
    }

    fn common(
        file: LibraryFile,
        record: &CommonSignatureRecord,
    ) -> Result<CommonSignature, LibraryError> {
        Ok(CommonSignature {
            package: file.fq_name(&record.package)?,
            declaration: file.fq_name(&record.declaration)?,
            id: record.id,
            is_expect: record.is_expect,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use klib::LibraryBuilder;

    #[test]
    fn decodes_and_caches() {
        let getter = IdSignature::Accessor {
            property: Box::new(IdSignature::public("geo", "Box.size")),
            accessor: CommonSignature::new("geo", "Box.size.<get-size>"),
        };
        let private = IdSignature::FileLocal {
            container: Some(Box::new(IdSignature::public("geo", "Box"))),
            id: 2,
        };

        let mut builder = LibraryBuilder::new();
        let file = builder.file("box.kt", "geo");
        let getter_index = file.signature(&getter);
        let private_index = file.signature(&private);
        let library = builder.finish().unwrap();
        let stats = library.stats();

        let mut decoder = SignatureDecoder::default();
        let file = LibraryFile::new(&library, 0);
        assert_eq!(decoder.decode(file, getter_index).unwrap(), getter);
        assert_eq!(decoder.decode(file, private_index).unwrap(), private);

        let reads = stats.get(Section::Signatures);
        assert_eq!(decoder.decode(file, getter_index).unwrap(), getter);
        assert_eq!(stats.get(Section::Signatures), reads);
    }

    #[test]
    fn self_referencing_entries_are_malformed() {
        let mut builder = LibraryBuilder::new();
        let file = builder.file("loop.kt", "");
        let index = file.raw_signature(SignatureRecord::FileLocal {
            container: Some(0),
            id: 1,
        });
        assert_eq!(index, 0);
        let library = builder.finish().unwrap();

        let mut decoder = SignatureDecoder::default();
        assert!(matches!(
            decoder.decode(LibraryFile::new(&library, 0), 0),
            Err(LibraryError::Malformed { .. })
        ));
    }
}
