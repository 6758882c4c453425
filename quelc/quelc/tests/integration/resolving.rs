//! Semantic-pipeline behavior: implicit ranges, macro substitution,
//! required-range analysis and pipeline idempotence.

use similar_asserts::assert_eq;

use quelc::pr::{ExprKind, RangeKind};
use quelc::{quel_to_ast, resolve_ast};

use crate::stores::{order_store, product_store, user_store};

#[test]
fn implicit_range_synthesis() {
    let store = user_store();
    let retrieve = resolve_ast(quel_to_ast("retrieve (User.name)").unwrap(), &store).unwrap();

    assert_eq!(retrieve.ranges.len(), 1);
    let range = &retrieve.ranges[0];
    assert_eq!(range.name, "U001");
    assert_eq!(range.entity(), Some("User"));
    assert!(range.join_condition().is_none());

    // the identifier is bound to the synthesized range
    match &retrieve.values[0].expr.kind {
        ExprKind::Ident(ident) => {
            assert_eq!(ident.range.as_deref(), Some("U001"));
            assert_eq!(ident.property(), Some("name"));
        }
        other => panic!("expected an identifier, got {other:?}"),
    }
}

#[test]
fn implicit_range_uses_canonical_entity_case() {
    // the store resolves entity names case-insensitively
    let store = user_store();
    let retrieve = resolve_ast(quel_to_ast("retrieve (user.name)").unwrap(), &store).unwrap();
    assert_eq!(retrieve.ranges[0].name, "U001");
    assert_eq!(retrieve.ranges[0].entity(), Some("User"));
}

#[test]
fn one_synthesized_range_per_entity() {
    let store = product_store();
    let retrieve = resolve_ast(
        quel_to_ast("retrieve (Product.name, Product.price) where Product.id = 1").unwrap(),
        &store,
    )
    .unwrap();
    assert_eq!(retrieve.ranges.len(), 1);
}

#[test]
fn macros_substitute_into_conditions() {
    let store = product_store();
    let retrieve = resolve_ast(
        quel_to_ast("retrieve (total = Product.price) where total > 5").unwrap(),
        &store,
    )
    .unwrap();

    let ExprKind::Binary(binary) = &retrieve.conditions.as_ref().unwrap().kind else {
        panic!("expected a comparison");
    };
    match &binary.left.kind {
        ExprKind::Ident(ident) => {
            assert_eq!(ident.range.as_deref(), Some("P001"));
            assert_eq!(ident.property(), Some("price"));
        }
        other => panic!("expected the macro body, got {other:?}"),
    }
}

#[test]
fn exists_is_erased_and_range_required() {
    let store = order_store();
    let retrieve = resolve_ast(
        quel_to_ast(
            "range of a is Order \
             range of b is Customer via b.id = a.custId \
             retrieve (a) where exists(b)",
        )
        .unwrap(),
        &store,
    )
    .unwrap();

    assert!(retrieve.conditions.is_none());
    assert!(retrieve.range("b").unwrap().required);
}

#[test]
fn exists_inside_and_keeps_the_rest() {
    let store = order_store();
    let retrieve = resolve_ast(
        quel_to_ast(
            "range of a is Order \
             range of b is Customer via b.id = a.custId \
             retrieve (a) where exists(b) and a.id > 3",
        )
        .unwrap(),
        &store,
    )
    .unwrap();

    let conditions = retrieve.conditions.as_ref().unwrap();
    assert!(matches!(&conditions.kind, ExprKind::Binary(b) if !b.op.is_logical()));
    assert!(retrieve.range("b").unwrap().required);
}

#[test]
fn ranges_used_in_where_become_required() {
    let store = product_store();
    let retrieve = resolve_ast(
        quel_to_ast(
            "range of p is Product \
             range of c is Category via c.id = p.catId \
             retrieve (p) where c.name = 'x'",
        )
        .unwrap(),
        &store,
    )
    .unwrap();
    assert!(retrieve.range("c").unwrap().required);
}

#[test]
fn entity_alias_gets_a_pattern() {
    let store = product_store();
    let retrieve = resolve_ast(quel_to_ast("retrieve (Product)").unwrap(), &store).unwrap();
    let alias = &retrieve.values[0];
    assert_eq!(alias.alias_pattern.as_deref(), Some("P001."));
    assert_eq!(alias.name, "P001");
}

#[test]
fn json_range_sort_is_application_side() {
    let store = user_store();
    let retrieve = resolve_ast(
        quel_to_ast(
            "range of j is json_source('users.json') \
             range of u is User \
             retrieve (u) sort by j.score",
        )
        .unwrap(),
        &store,
    )
    .unwrap();

    assert!(retrieve.sort_in_application_logic);
    assert!(matches!(
        retrieve.range("j").unwrap().kind,
        RangeKind::Json { .. }
    ));
}

#[test]
fn pipeline_is_idempotent() {
    let store = product_store();
    let source = "range of p is Product via p.category = c \
                  range of c is Category \
                  retrieve (p, total = p.price) \
                  where total > 5 and c.id is null \
                  sort by p.price desc";

    let once = resolve_ast(quel_to_ast(source).unwrap(), &store).unwrap();
    let twice = resolve_ast(once.clone(), &store).unwrap();
    assert_eq!(once, twice);
}

#[test]
fn types_are_annotated() {
    let store = product_store();
    let retrieve = resolve_ast(
        quel_to_ast("retrieve (Product) where Product.price > 5").unwrap(),
        &store,
    )
    .unwrap();

    use quelc::pr::Ty;
    let conditions = retrieve.conditions.as_ref().unwrap();
    assert_eq!(conditions.ty, Some(Ty::Bool));
    assert_eq!(retrieve.values[0].expr.ty, Some(Ty::Entity));
}
