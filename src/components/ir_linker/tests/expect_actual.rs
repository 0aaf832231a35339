mod common;

use common::*;
use diagnostics::Diagnostics;
use ir_linker::{DeserializationStrategy, LinkError};
use ir_tree::{CommonSignature, IdSignature, SymbolKind};
use klib::{InMemoryLibrary, LibraryBuilder};

fn expect_sig(declaration: &str) -> IdSignature {
    CommonSignature::new("mpp", declaration).expect().into()
}

/// Declares `expect class Platform` and `expect fun greet()`.
fn common_library() -> InMemoryLibrary {
    let mut builder = LibraryBuilder::new();
    let file = builder.file("mpp/Common.kt", "mpp");

    let record = file.class_record(&expect_sig("Platform"), &[]).expect();
    file.declare(&expect_sig("Platform"), record);

    let unit_type = file.class_type(&unit());
    let record = file
        .function_record(&expect_sig("greet"), &[], unit_type, None)
        .expect();
    file.declare(&expect_sig("greet"), record);

    builder.finish().unwrap()
}

/// Implements both expects of [`common_library`].
fn platform_library() -> InMemoryLibrary {
    let mut builder = LibraryBuilder::new();
    let file = builder.file("mpp/Jvm.kt", "mpp");

    let record = file.class_record(&sig("mpp", "Platform"), &[]);
    file.declare(&sig("mpp", "Platform"), record);

    let unit_type = file.class_type(&unit());
    let body = file.body(&[(SymbolKind::Class, sig("mpp", "Platform"))]);
    let record = file.function_record(&sig("mpp", "greet"), &[], unit_type, Some(body));
    file.declare(&sig("mpp", "greet"), record);

    file.actual(&expect_sig("Platform"), &sig("mpp", "Platform"));
    file.actual(&expect_sig("greet"), &sig("mpp", "greet"));
    builder.finish().unwrap()
}

#[test]
fn test_expect_is_retargeted_to_its_actual() {
    let diagnostics = Diagnostics::collecting();
    let mut linker = linker(&diagnostics);
    let strategy = DeserializationStrategy::OnlyReferenced;

    linker
        .register_library("common", Box::new(common_library()), strategy, &["stdlib"])
        .unwrap();
    let platform = linker
        .register_library(
            "jvm",
            Box::new(platform_library()),
            strategy,
            &["common", "stdlib"],
        )
        .unwrap();

    let greet = linker
        .resolve_from(platform, &expect_sig("greet"), SymbolKind::Function)
        .unwrap();

    // Both sides are read, but the expect still stands for itself.
    let actual = linker.public_symbol(&sig("mpp", "greet")).unwrap();
    assert!(linker.symbols().is_materialized(actual));
    assert!(linker.symbols().is_materialized(greet));

    let structural = owner(&linker, greet);
    assert!(linker.declaration(structural).is_expect);
    let origin = linker.symbols().get(greet).delegation().unwrap().origin;
    assert_eq!(linker.declaration(structural).symbol, origin);

    assert!(matches!(
        linker.body(greet),
        Err(LinkError::UnretargetedExpect { .. })
    ));
    assert_eq!(diagnostics.error_count(), 1);

    linker.post_process().unwrap();

    assert_eq!(linker.owner(greet).unwrap(), linker.owner(actual).unwrap());
    assert_eq!(owner(&linker, greet).module, platform);

    let body = linker.body(greet).unwrap().unwrap();
    let platform_class = linker.public_symbol(&sig("mpp", "Platform")).unwrap();
    assert_eq!(body.references, [platform_class]);
}

#[test]
fn test_expect_read_before_its_actual_is_registered() {
    let diagnostics = Diagnostics::collecting();
    let mut linker = linker(&diagnostics);
    let strategy = DeserializationStrategy::Everything;

    linker
        .register_library("common", Box::new(common_library()), strategy, &["stdlib"])
        .unwrap();

    let platform_expect = linker.public_symbol(&expect_sig("Platform")).unwrap();
    let declaration = owner(&linker, platform_expect);
    assert_eq!(linker.declaration(declaration).symbol, platform_expect);

    linker
        .register_library(
            "jvm",
            Box::new(platform_library()),
            DeserializationStrategy::OnlyReferenced,
            &["common", "stdlib"],
        )
        .unwrap();

    // The cell turned into a delegating one without breaking the tree.
    let origin = linker
        .symbols()
        .get(platform_expect)
        .delegation()
        .unwrap()
        .origin;
    assert_eq!(linker.declaration(declaration).symbol, origin);
    assert_eq!(owner(&linker, platform_expect), declaration);

    linker.post_process().unwrap();

    let actual = linker.public_symbol(&sig("mpp", "Platform")).unwrap();
    assert_eq!(owner(&linker, platform_expect), owner(&linker, actual));
    assert!(!diagnostics.has_errors());
}

#[test]
fn test_expect_without_actual_stays_put() {
    let diagnostics = Diagnostics::collecting();
    let mut linker = linker(&diagnostics);

    linker
        .register_library(
            "common",
            Box::new(common_library()),
            DeserializationStrategy::Everything,
            &["stdlib"],
        )
        .unwrap();
    linker.post_process().unwrap();

    let greet = linker.public_symbol(&expect_sig("greet")).unwrap();
    assert!(linker.symbols().get(greet).delegation().is_none());
    assert!(linker.body(greet).unwrap().is_none());
    assert!(linker.declaration(owner(&linker, greet)).is_expect);
}
