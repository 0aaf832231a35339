mod common;

use common::*;
use diagnostics::Diagnostics;
use ir_linker::{
    BuiltIns, CurrentModule, DeserializationStrategy, FakeOverrideBuilder, FakeOverrideContext,
    InheritedMembers, LinkError, LinkOptions,
};
use ir_tree::{DeclHandle, DeclOrigin, IdSignature, SymbolKind};
use klib::{InMemoryLibrary, LibraryBuilder, LibraryError, Section};

/// Exported `fun plain()` and `inline fun fast()`, both with bodies that
/// mention `Unit`.
fn functions(package: &str) -> InMemoryLibrary {
    let mut builder = LibraryBuilder::new();
    let file = builder.file("Functions.kt", package);
    let unit_type = file.class_type(&unit());

    let body = file.body(&[(SymbolKind::Class, unit())]);
    let record = file.function_record(&sig(package, "plain"), &[], unit_type, Some(body));
    file.declare(&sig(package, "plain"), record);

    let body = file.body(&[(SymbolKind::Class, unit())]);
    let record = file
        .function_record(&sig(package, "fast"), &[], unit_type, Some(body))
        .inline();
    file.declare(&sig(package, "fast"), record);

    file.export(&sig(package, "plain"));
    file.export(&sig(package, "fast"));
    builder.finish().unwrap()
}

fn has_body(linker: &ir_linker::Linker, signature: &IdSignature) -> bool {
    let symbol = linker.public_symbol(signature).unwrap();
    linker.body(symbol).unwrap().is_some()
}

#[test]
fn test_body_strategies() {
    let diagnostics = Diagnostics::collecting();
    let mut linker = linker(&diagnostics);

    let headers = functions("headers");
    let headers_stats = headers.stats();
    let module = linker
        .deserialize_only_header_module("headers", Box::new(headers), &["stdlib"])
        .unwrap();
    assert_eq!(declaration_reads(&headers_stats), 0);

    for name in ["plain", "fast"] {
        linker
            .deserialize_in_module(module, &sig("headers", name), SymbolKind::Function)
            .unwrap();
        assert!(!has_body(&linker, &sig("headers", name)));
    }
    assert_eq!(headers_stats.get(Section::Bodies), 0);

    let inline = functions("inline");
    let inline_stats = inline.stats();
    let module = linker
        .deserialize_headers_with_inline_bodies("inline", Box::new(inline), &["stdlib"])
        .unwrap();

    for name in ["plain", "fast"] {
        linker
            .deserialize_in_module(module, &sig("inline", name), SymbolKind::Function)
            .unwrap();
    }
    assert!(!has_body(&linker, &sig("inline", "plain")));
    assert!(has_body(&linker, &sig("inline", "fast")));
    assert_eq!(inline_stats.get(Section::Bodies), 1);

    let full = functions("full");
    let full_stats = full.stats();
    linker
        .register_library(
            "full",
            Box::new(full),
            DeserializationStrategy::OnlyReferenced,
            &["stdlib"],
        )
        .unwrap();
    assert_eq!(declaration_reads(&full_stats), 2);
    assert!(has_body(&linker, &sig("full", "plain")));
    assert!(has_body(&linker, &sig("full", "fast")));
    assert_eq!(full_stats.get(Section::Bodies), 2);
}

#[test]
fn test_builtins_are_bound_without_reads() {
    let diagnostics = Diagnostics::collecting();
    let mut linker = linker_with(
        LinkOptions {
            builtins_module: Some("stdlib".into()),
            ..Default::default()
        },
        &diagnostics,
    );
    let stdlib = linker.module_by_name("stdlib").unwrap();

    let mut builder = LibraryBuilder::new();
    let file = builder.file("ops/Compare.kt", "ops");
    let int_type = file.class_type(&int());
    let body = file.body(&[(SymbolKind::Function, BuiltIns::signature("EQEQ"))]);
    let record = file.property_record(&sig("ops", "same"), int_type, Some(body));
    file.declare(&sig("ops", "same"), record);
    file.export(&sig("ops", "same"));

    linker
        .register_library(
            "ops",
            Box::new(builder.finish().unwrap()),
            DeserializationStrategy::OnlyReferenced,
            &["stdlib"],
        )
        .unwrap();

    let eqeq = linker.public_symbol(&BuiltIns::signature("EQEQ")).unwrap();
    let builtin = owner(&linker, eqeq);
    assert_eq!(builtin.module, stdlib);
    assert_eq!(linker.declaration(builtin).origin, DeclOrigin::BuiltIn);
    assert_eq!(linker.declaration(builtin).name, "EQEQ");

    let less = linker
        .resolve_from(stdlib, &BuiltIns::signature("less"), SymbolKind::Function)
        .unwrap();
    assert!(linker.symbols().is_materialized(less));
    assert!(
        linker
            .module_fragment(stdlib)
            .find_top_level("ieee754equals")
            .is_some()
    );
}

fn member_names(linker: &ir_linker::Linker, class: DeclHandle) -> Vec<(String, bool)> {
    let mut names = linker
        .declaration(class)
        .members
        .iter()
        .map(|member| {
            let member = linker.declaration(DeclHandle::new(class.module, *member));
            (member.name.clone(), member.is_fake_override())
        })
        .collect::<Vec<_>>();
    names.sort();
    names
}

#[test]
fn test_fake_overrides_for_inherited_members() {
    let diagnostics = Diagnostics::collecting();
    let mut linker = linker(&diagnostics);

    let mut builder = LibraryBuilder::new();
    let file = builder.file("shapes/Shapes.kt", "shapes");
    let any_type = file.class_type(&any());
    let unit_type = file.class_type(&unit());
    let shape_type = file.class_type(&sig("shapes", "Shape"));
    let circle_type = file.class_type(&sig("shapes", "Circle"));

    let body = file.body(&[(SymbolKind::Class, unit())]);
    let area = file.function_record(&sig("shapes", "Shape.area"), &[], unit_type, Some(body));
    let name = file.property_record(&sig("shapes", "Shape.name"), any_type, None);
    let shape = file
        .class_record(&sig("shapes", "Shape"), &[any_type])
        .with_member(area)
        .with_member(name);
    file.declare(&sig("shapes", "Shape"), shape);

    let area = file.function_record(&sig("shapes", "Circle.area"), &[], unit_type, None);
    let circle = file
        .class_record(&sig("shapes", "Circle"), &[shape_type])
        .with_member(area);
    file.declare(&sig("shapes", "Circle"), circle);

    let ring = file.class_record(&sig("shapes", "Ring"), &[circle_type]);
    file.declare(&sig("shapes", "Ring"), ring);

    let module = linker
        .deserialize_full_module("shapes", Box::new(builder.finish().unwrap()), &["stdlib"])
        .unwrap();
    linker.post_process().unwrap();

    let class = |name: &str| owner(&linker, linker.public_symbol(&sig("shapes", name)).unwrap());

    assert_eq!(
        member_names(&linker, class("Shape")),
        [("area".to_string(), false), ("name".to_string(), false)]
    );
    assert_eq!(
        member_names(&linker, class("Circle")),
        [("area".to_string(), false), ("name".to_string(), true)]
    );
    assert_eq!(
        member_names(&linker, class("Ring")),
        [("area".to_string(), true), ("name".to_string(), true)]
    );

    let ring_area = linker.public_symbol(&sig("shapes", "Ring.area")).unwrap();
    let ring_area = linker.declaration(owner(&linker, ring_area));
    let circle_area = linker.public_symbol(&sig("shapes", "Circle.area")).unwrap();
    assert_eq!(
        ring_area.origin,
        DeclOrigin::FakeOverride {
            overridden: vec![circle_area]
        }
    );
    assert!(ring_area.body().is_none());
    assert_eq!(owner(&linker, circle_area).module, module);
}

#[test]
fn test_file_annotations_are_read_on_request() {
    let diagnostics = Diagnostics::collecting();
    let mut linker = linker(&diagnostics);

    let mut builder = LibraryBuilder::new();
    let file = builder.file("ann/Marked.kt", "ann");
    let record = file.class_record(&sig("ann", "Marker"), &[]);
    file.declare(&sig("ann", "Marker"), record);
    let marker = file.class_type(&sig("ann", "Marker"));
    file.annotation(marker);
    let library = builder.finish().unwrap();
    let stats = library.stats();

    let module = linker
        .register_library("ann", Box::new(library), DeserializationStrategy::OnlyReferenced, &[])
        .unwrap();
    assert_eq!(stats.get(Section::Types), 0);
    assert_eq!(declaration_reads(&stats), 0);

    let (file, _) = linker.module_fragment(module).files.iter().next().unwrap();

    let annotations = linker.file_annotations(module, file).unwrap().to_vec();
    let marker = linker.public_symbol(&sig("ann", "Marker")).unwrap();
    assert_eq!(annotations.len(), 1);
    assert_eq!(annotations[0].classifier, marker);
    assert!(linker.symbols().is_materialized(marker));
    assert_eq!(declaration_reads(&stats), 1);

    let types = stats.get(Section::Types);
    assert_eq!(linker.file_annotations(module, file).unwrap().len(), 1);
    assert_eq!(stats.get(Section::Types), types);
}

#[test]
fn test_malformed_text_is_replaced() {
    let diagnostics = Diagnostics::collecting();
    let mut linker = linker(&diagnostics);

    let mut builder = LibraryBuilder::new();
    let file = builder.file("odd/Odd.kt", "odd");
    let mut record = file.class_record(&sig("odd", "Odd"), &[]);
    record.name = file.raw_string(b"Caf\xC3 \xED\xA0\x80!");
    let index = file.declare(&sig("odd", "Odd"), record);
    file.debug(index, b"line\xFF 3");

    linker
        .deserialize_full_module("odd", Box::new(builder.finish().unwrap()), &[])
        .unwrap();

    let odd = linker.public_symbol(&sig("odd", "Odd")).unwrap();
    let declaration = linker.declaration(owner(&linker, odd));
    assert_eq!(declaration.name, "Caf\u{FFFD} \u{FFFD}!");
    assert_eq!(declaration.debug_info.as_deref(), Some("line\u{FFFD} 3"));
    assert!(!diagnostics.has_errors());
}

#[test]
fn test_library_survives_a_trip_through_bytes() {
    let diagnostics = Diagnostics::collecting();
    let mut linker = linker(&diagnostics);

    let bytes = functions("bytes").to_bytes().unwrap();
    let library = InMemoryLibrary::from_bytes(&bytes).unwrap();

    let module = linker
        .register_library(
            "bytes",
            Box::new(library),
            DeserializationStrategy::OnlyReferenced,
            &["stdlib"],
        )
        .unwrap();
    assert_eq!(top_level_names(&linker, module), ["plain", "fast"]);

    assert!(matches!(
        InMemoryLibrary::from_bytes(b"nope"),
        Err(LibraryError::BadMagic)
    ));
}

#[test]
fn test_corrupt_declaration_is_fatal() {
    let diagnostics = Diagnostics::collecting();
    let mut linker = linker(&diagnostics);

    let mut builder = LibraryBuilder::new();
    let file = builder.file("bad/Bad.kt", "bad");
    file.raw_declaration(&sig("bad", "Broken"), vec![0xFF, 0xFF, 0xFF]);

    let error = linker
        .deserialize_full_module("bad", Box::new(builder.finish().unwrap()), &[])
        .unwrap_err();

    assert!(matches!(
        error,
        LinkError::Library(LibraryError::Malformed {
            section: Section::Declarations,
            index: 0,
            ..
        })
    ));
    assert_eq!(diagnostics.error_count(), 1);
}

#[test]
fn test_private_declarations_resolve_through_their_file() {
    let diagnostics = Diagnostics::collecting();
    let mut linker = linker(&diagnostics);

    let helper = IdSignature::FileLocal {
        container: None,
        id: 7,
    };

    let mut builder = LibraryBuilder::new();
    let file = builder.file("lib/Api.kt", "lib");
    let unit_type = file.class_type(&unit());
    let record = file.function_record(&helper, &[], unit_type, None);
    file.declare(&helper, record);
    let body = file.body(&[(SymbolKind::Function, helper.clone())]);
    let record = file.function_record(&sig("lib", "api"), &[], unit_type, Some(body));
    file.declare(&sig("lib", "api"), record);
    file.export(&sig("lib", "api"));

    let module = linker
        .register_library(
            "lib",
            Box::new(builder.finish().unwrap()),
            DeserializationStrategy::OnlyReferenced,
            &["stdlib"],
        )
        .unwrap();
    assert_eq!(top_level_names(&linker, module), ["api", "local7"]);

    let api = linker.public_symbol(&sig("lib", "api")).unwrap();
    let api = owner(&linker, api);
    let private = linker
        .reference_by_local_signature(api, helper.clone(), SymbolKind::Function)
        .unwrap();
    let body = linker.body(linker.declaration(api).symbol).unwrap().unwrap();
    assert_eq!(body.references, [private]);

    let declaration = linker.get_declaration(private).unwrap();
    assert_eq!(declaration.map(|decl| decl.module), Some(module));
    assert!(linker.public_symbol(&helper).is_none());

    linker
        .init(Some(CurrentModule::new("app", &["lib", "stdlib"])))
        .unwrap();
    assert_eq!(linker.get_declaration(private).unwrap(), None);
}

/// Inherited members, plus a request for `grow/Late` while handling
/// `grow/Base`.
struct RequestsLate {
    inherited: InheritedMembers,
}

impl FakeOverrideBuilder for RequestsLate {
    fn provide_fake_overrides(
        &mut self,
        cx: &mut FakeOverrideContext<'_, '_>,
        class: DeclHandle,
    ) -> Result<(), LinkError> {
        if cx.signature(class) == &sig("grow", "Base") {
            cx.request_declaration(class.module, &sig("grow", "Late"), SymbolKind::Class)?;
        }

        self.inherited.provide_fake_overrides(cx, class)
    }
}

#[test]
fn test_classes_read_during_synthesis_get_fake_overrides() {
    let diagnostics = Diagnostics::collecting();
    let mut linker = linker(&diagnostics).with_fake_override_builder(RequestsLate {
        inherited: InheritedMembers,
    });

    let mut builder = LibraryBuilder::new();
    let file = builder.file("grow/Grow.kt", "grow");
    let unit_type = file.class_type(&unit());
    let base_type = file.class_type(&sig("grow", "Base"));

    let describe = file.function_record(&sig("grow", "Base.describe"), &[], unit_type, None);
    let base = file
        .class_record(&sig("grow", "Base"), &[])
        .with_member(describe);
    file.declare(&sig("grow", "Base"), base);

    let late = file.class_record(&sig("grow", "Late"), &[base_type]);
    file.declare(&sig("grow", "Late"), late);
    file.export(&sig("grow", "Base"));

    linker
        .register_library(
            "grow",
            Box::new(builder.finish().unwrap()),
            DeserializationStrategy::OnlyReferenced,
            &["stdlib"],
        )
        .unwrap();
    assert!(linker.public_symbol(&sig("grow", "Late")).is_none());

    linker.post_process().unwrap();

    let late = linker.public_symbol(&sig("grow", "Late")).unwrap();
    assert_eq!(
        member_names(&linker, owner(&linker, late)),
        [("describe".to_string(), true)]
    );
    assert!(!diagnostics.has_errors());
}

#[test]
fn test_failed_annotations_are_read_again() {
    let diagnostics = Diagnostics::collecting();
    let mut linker = linker(&diagnostics);

    let mut builder = LibraryBuilder::new();
    let file = builder.file("ann/Broken.kt", "ann");
    let ghost = file.class_type(&sig("nowhere", "Ghost"));
    file.annotation(ghost);

    let module = linker
        .register_library(
            "ann",
            Box::new(builder.finish().unwrap()),
            DeserializationStrategy::OnlyReferenced,
            &["stdlib"],
        )
        .unwrap();
    let (file, _) = linker.module_fragment(module).files.iter().next().unwrap();

    for attempt in 1..=2 {
        assert!(matches!(
            linker.file_annotations(module, file),
            Err(LinkError::SignatureNotFound { .. })
        ));
        assert_eq!(diagnostics.error_count(), attempt);
    }
}
