#![allow(dead_code)]

use diagnostics::Diagnostics;
use ir_linker::{DeserializationStrategy, LinkOptions, Linker};
use ir_tree::{DeclHandle, IdSignature, ModuleId, SymbolRef};
use klib::{InMemoryLibrary, LibraryBuilder, ReadStats, Section};

pub fn sig(package: &str, declaration: &str) -> IdSignature {
    IdSignature::public(package, declaration)
}

pub fn any() -> IdSignature {
    sig("kotlin", "Any")
}

pub fn int() -> IdSignature {
    sig("kotlin", "Int")
}

pub fn unit() -> IdSignature {
    sig("kotlin", "Unit")
}

/// `Any`, and `Int` and `Unit` deriving from it.
pub fn stdlib() -> InMemoryLibrary {
    let mut builder = LibraryBuilder::new();
    let file = builder.file("kotlin/Primitives.kt", "kotlin");

    let record = file.class_record(&any(), &[]);
    file.declare(&any(), record);

    let any_type = file.class_type(&any());

    for class in [int(), unit()] {
        let record = file.class_record(&class, &[any_type]);
        file.declare(&class, record);
    }

    builder.finish().unwrap()
}

pub fn linker(diagnostics: &Diagnostics) -> Linker<'_> {
    linker_with(LinkOptions::default(), diagnostics)
}

pub fn linker_with(options: LinkOptions, diagnostics: &Diagnostics) -> Linker<'_> {
    let mut linker = Linker::new(options, diagnostics);
    linker
        .register_library(
            "stdlib",
            Box::new(stdlib()),
            DeserializationStrategy::OnlyReferenced,
            &[],
        )
        .unwrap();
    linker
}

pub fn declaration_reads(stats: &ReadStats) -> usize {
    stats.get(Section::Declarations)
}

pub fn owner(linker: &Linker, symbol: SymbolRef) -> DeclHandle {
    linker.owner(symbol).unwrap().unwrap()
}

pub fn top_level_names(linker: &Linker, module: ModuleId) -> Vec<String> {
    let fragment = linker.module_fragment(module);

    fragment
        .top_level()
        .map(|(_, decl)| fragment.decls[decl].name.clone())
        .collect()
}
