mod common;

use common::*;
use diagnostics::Diagnostics;
use ir_linker::{ExtensionContext, LinkError, LinkerExtension};
use ir_tree::{DeclHandle, DeclKind, DeclOrigin, IdSignature, SymbolKind, SymbolRef};
use klib::LibraryBuilder;
use std::sync::{
    Arc,
    atomic::{AtomicUsize, Ordering},
};

/// Declares every `stub/...` class it is asked about inside `stdlib`.
struct Stubs {
    calls: Arc<AtomicUsize>,
}

impl LinkerExtension for Stubs {
    fn resolve_symbol(
        &mut self,
        cx: &mut ExtensionContext<'_, '_>,
        symbol: SymbolRef,
    ) -> Result<Option<DeclHandle>, LinkError> {
        self.calls.fetch_add(1, Ordering::SeqCst);

        let IdSignature::Public(common) = &cx.symbol(symbol).signature else {
            return Ok(None);
        };

        if common.package != "stub" || cx.symbol(symbol).kind != SymbolKind::Class {
            return Ok(None);
        }

        let Some(stdlib) = cx.module_by_name("stdlib") else {
            return Ok(None);
        };

        let kind = DeclKind::Class { supertypes: vec![] };
        cx.synthesize(stdlib, symbol, kind).map(Some)
    }
}

fn stubbed(diagnostics: &Diagnostics) -> (ir_linker::Linker<'_>, Arc<AtomicUsize>) {
    let calls = Arc::new(AtomicUsize::new(0));
    let stubs = Stubs {
        calls: calls.clone(),
    };
    (linker(diagnostics).with_extension(stubs), calls)
}

#[test]
fn test_extension_declares_unknown_symbols() {
    let diagnostics = Diagnostics::collecting();
    let (mut linker, calls) = stubbed(&diagnostics);

    let symbol = linker
        .reference_symbol(&sig("stub", "Missing"), SymbolKind::Class)
        .unwrap();
    assert!(!linker.symbols().is_materialized(symbol));

    let handle = linker.get_declaration(symbol).unwrap().unwrap();
    assert_eq!(calls.load(Ordering::SeqCst), 1);
    assert_eq!(Some(handle.module), linker.module_by_name("stdlib"));

    let declaration = linker.declaration(handle);
    assert_eq!(declaration.origin, DeclOrigin::Extension);
    assert_eq!(declaration.name, "Missing");
    assert!(linker.symbols().is_materialized(symbol));

    // Bound now, so the extension is not asked again.
    assert_eq!(linker.get_declaration(symbol).unwrap(), Some(handle));
    assert_eq!(calls.load(Ordering::SeqCst), 1);
    assert!(!diagnostics.has_errors());
}

#[test]
fn test_declined_symbols_are_offered_once_per_session() {
    let diagnostics = Diagnostics::collecting();
    let (mut linker, calls) = stubbed(&diagnostics);

    let symbol = linker
        .reference_symbol(&sig("elsewhere", "Thing"), SymbolKind::Class)
        .unwrap();

    assert_eq!(linker.get_declaration(symbol).unwrap(), None);
    assert_eq!(linker.get_declaration(symbol).unwrap(), None);
    assert_eq!(calls.load(Ordering::SeqCst), 1);

    linker.post_process().unwrap();

    assert_eq!(linker.get_declaration(symbol).unwrap(), None);
    assert_eq!(calls.load(Ordering::SeqCst), 2);
}

#[test]
fn test_missing_class_members_are_left_to_fake_overrides() {
    let diagnostics = Diagnostics::collecting();
    let (mut linker, calls) = stubbed(&diagnostics);

    let mut builder = LibraryBuilder::new();
    let file = builder.file("shapes/Ring.kt", "shapes");
    let any_type = file.class_type(&any());
    let record = file.class_record(&sig("shapes", "Ring"), &[any_type]);
    file.declare(&sig("shapes", "Ring"), record);

    linker
        .deserialize_full_module("shapes", Box::new(builder.finish().unwrap()), &["stdlib"])
        .unwrap();

    let perimeter = linker
        .reference_symbol(&sig("shapes", "Ring.perimeter"), SymbolKind::Function)
        .unwrap();

    assert_eq!(linker.get_declaration(perimeter).unwrap(), None);
    assert_eq!(calls.load(Ordering::SeqCst), 0);
    assert!(!diagnostics.has_errors());
}
