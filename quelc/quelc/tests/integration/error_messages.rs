//! Error taxonomy and message rendering.

use std::collections::HashMap;

use quelc::{quel_to_ast, resolve_ast, ErrorSource, Reason};

use crate::stores::{product_store, user_store};

fn compile_err(source: &str) -> quelc::ErrorMessages {
    let store = product_store();
    quelc::compile(source, &HashMap::new(), &store, None).unwrap_err()
}

#[test]
fn unknown_entity() {
    let err = compile_err("retrieve (Ghost.name)");
    assert_eq!(err.inner[0].reason, "entity `Ghost` not found");
}

#[test]
fn unknown_property() {
    let err = compile_err("retrieve (Product.nme)");
    assert_eq!(err.inner[0].reason, "property `Product.nme` not found");
}

#[test]
fn duplicate_range() {
    let err = compile_err(
        "range of p is Product range of p is Category retrieve (p)",
    );
    assert_eq!(err.inner[0].reason, "duplicate range `p`");
}

#[test]
fn missing_from_root() {
    let err = compile_err(
        "range of p is Product via p.catId = c.id \
         range of c is Category via c.id = p.catId \
         retrieve (p)",
    );
    assert_eq!(
        err.inner[0].reason,
        "at least one range must not have a join condition"
    );
}

#[test]
fn entity_arithmetic_is_rejected() {
    let store = product_store();
    let err = resolve_ast(
        quel_to_ast("retrieve (Product.name) where Product + 1 = 2").unwrap(),
        &store,
    )
    .unwrap_err();

    assert!(matches!(err.reason, Reason::EntityExpression { .. }));
    assert_eq!(err.source, ErrorSource::Semantic);
}

#[test]
fn via_with_free_identifier() {
    let store = product_store();
    let err = resolve_ast(
        quel_to_ast(
            "range of p is Product via p.catId = zz.id \
             range of c is Category \
             retrieve (p)",
        )
        .unwrap(),
        &store,
    )
    .unwrap_err();

    assert!(matches!(
        err.reason,
        Reason::RangeReferencesNonRange { .. }
    ));
}

#[test]
fn via_with_unknown_relation() {
    let store = product_store();
    let err = resolve_ast(
        quel_to_ast(
            "range of p is Product via p.ghost = c.id \
             range of c is Category \
             retrieve (p)",
        )
        .unwrap(),
        &store,
    )
    .unwrap_err();

    match err.reason {
        Reason::InvalidRelation { property, entity } => {
            assert_eq!(property, "ghost");
            assert_eq!(entity, "Product");
        }
        other => panic!("expected an invalid relation, got {other:?}"),
    }
}

#[test]
fn missing_parameter() {
    let err = compile_err("retrieve (Product.name) where Product.price > :min");
    assert_eq!(err.inner[0].reason, "parameter `min` not found");
}

#[test]
fn parse_errors_carry_location() {
    let store = user_store();
    let err = quelc::compile("retrieve x", &HashMap::new(), &store, None).unwrap_err();
    let message = &err.inner[0];

    assert!(message.reason.contains("expected"));
    let location = message.location.as_ref().expect("location is resolved");
    assert_eq!(location.start.0, 0);
    assert_eq!(location.start.1, 9);

    let display = message.display.as_ref().expect("display is rendered");
    assert!(display.contains("retrieve x"));
}

#[test]
fn lex_errors_surface_through_compile() {
    let err = compile_err("retrieve (Product.name) where Product.name = \"bad\\q\"");
    assert!(err.inner[0].reason.contains("invalid escape sequence"));
}
