use std::collections::HashMap;

use insta::assert_snapshot;
use rstest::rstest;
use serde_json::json;
use similar_asserts::assert_eq;

use crate::stores::{order_store, product_store, user_store};

fn compile(source: &str) -> quelc::CompiledQuery {
    compile_with_params(source, HashMap::new())
}

fn compile_with_params(
    source: &str,
    params: HashMap<String, serde_json::Value>,
) -> quelc::CompiledQuery {
    let store = product_store();
    quelc::compile(source, &params, &store, None).unwrap()
}

#[test]
fn trivial_projection() {
    let store = user_store();
    let params = HashMap::new();
    let compiled = quelc::compile(
        "retrieve (User.name) where User.id = 42",
        &params,
        &store,
        None,
    )
    .unwrap();

    assert_snapshot!(
        compiled.sql,
        @"SELECT `U001`.name_col as `U001_name` FROM `users` as `U001` WHERE `U001`.id_col = ?"
    );
    assert_eq!(compiled.bound_params, vec![json!(42)]);
}

#[test]
fn join_with_required_relation() {
    let compiled = compile(
        "range of p is Product via p.catId = c.id \
         range of c is Category \
         retrieve (p.name, c.name)",
    );

    assert_snapshot!(
        compiled.sql,
        @"SELECT `p`.name as `p_name`, `c`.name_col as `c_name` FROM `categories` as `c` INNER JOIN `products` as `p` ON `p`.cat_id = `c`.id_col"
    );
}

#[test]
fn join_without_required_relation_is_left() {
    let store = order_store();
    let compiled = quelc::compile(
        "range of a is Order \
         range of b is Customer via b.id = a.custId \
         retrieve (a, b.name)",
        &HashMap::new(),
        &store,
        None,
    )
    .unwrap();

    assert_snapshot!(
        compiled.sql,
        @"SELECT `a`.id as `a_id`, `a`.cust_id as `a_custId`, `b`.name as `b_name` FROM `orders` as `a` LEFT JOIN `customers` as `b` ON `b`.id = `a`.cust_id"
    );
}

#[test]
fn exists_rewrites_to_required_join() {
    let store = order_store();
    let compiled = quelc::compile(
        "range of a is Order \
         range of b is Customer via b.id = a.custId \
         retrieve (a) where exists(b)",
        &HashMap::new(),
        &store,
        None,
    )
    .unwrap();

    // WHERE is erased entirely and the join becomes INNER
    assert_snapshot!(
        compiled.sql,
        @"SELECT `a`.id as `a_id`, `a`.cust_id as `a_custId` FROM `orders` as `a` INNER JOIN `customers` as `b` ON `b`.id = `a`.cust_id"
    );
    assert!(compiled.bound_params.is_empty());
}

#[test]
fn is_null_keeps_range_left_and_adds_hidden_alias() {
    let compiled = compile(
        "range of p is Product \
         range of c is Category via c.id = p.catId \
         retrieve (p) where c.id is null",
    );

    assert_snapshot!(
        compiled.sql,
        @"SELECT `p`.id as `p_id`, `p`.name as `p_name`, `p`.price as `p_price`, `p`.cat_id as `p_catId`, `c`.id_col as `c_id` FROM `products` as `p` LEFT JOIN `categories` as `c` ON `c`.id_col = `p`.cat_id WHERE `c`.id_col IS NULL"
    );

    let hidden = compiled.ast.values.last().unwrap();
    assert!(!hidden.visible_in_result);
    assert_eq!(hidden.name, "c_id");
}

#[test]
fn via_relation_property_is_rewritten_to_join_columns() {
    let compiled = compile(
        "range of p is Product via p.category = c \
         range of c is Category \
         retrieve (p.name)",
    );

    assert_snapshot!(
        compiled.sql,
        @"SELECT `p`.name as `p_name` FROM `categories` as `c` INNER JOIN `products` as `p` ON `p`.cat_id = `c`.id_col"
    );
}

#[test]
fn parameters_bind_in_placeholder_order() {
    let params = HashMap::from([
        ("delta".to_string(), json!(5)),
        ("cmin".to_string(), json!(10)),
        ("min".to_string(), json!(100)),
    ]);
    let compiled = compile_with_params(
        "range of c is Category \
         range of p is Product via p.catId = c.id and c.id > :cmin \
         retrieve (total = p.price + :delta) \
         where p.price > :min",
        params,
    );

    assert_snapshot!(
        compiled.sql,
        @"SELECT `p`.price + ? as `total` FROM `categories` as `c` INNER JOIN `products` as `p` ON `p`.cat_id = `c`.id_col AND `c`.id_col > ? WHERE `p`.price > ?"
    );
    // strict left-to-right order of the placeholders in the text
    assert_eq!(compiled.bound_params, vec![json!(5), json!(10), json!(100)]);
}

#[test]
fn unique_emits_distinct() {
    let compiled = compile("retrieve unique (Product.name)");
    assert_snapshot!(
        compiled.sql,
        @"SELECT DISTINCT `P001`.name as `P001_name` FROM `products` as `P001`"
    );
}

#[test]
fn duplicate_fields_are_dropped() {
    let compiled = compile("retrieve (Product.name, Product.name)");
    assert_snapshot!(
        compiled.sql,
        @"SELECT `P001`.name as `P001_name` FROM `products` as `P001`"
    );
}

#[test]
fn sort_lowers_to_order_by() {
    let compiled = compile("retrieve (Product.name) sort by Product.price desc, Product.name");
    assert_snapshot!(
        compiled.sql,
        @"SELECT `P001`.name as `P001_name` FROM `products` as `P001` ORDER BY `P001`.price DESC, `P001`.name ASC"
    );
}

#[test]
fn method_call_sort_is_application_side() {
    let store = user_store();
    let compiled = quelc::compile(
        "retrieve (User) sort by User.displayName() window 1 using window_size 5",
        &HashMap::new(),
        &store,
        None,
    )
    .unwrap();

    // no ORDER BY in the SQL; the sort and the window go to the caller
    assert_snapshot!(
        compiled.sql,
        @"SELECT `U001`.id_col as `U001_id`, `U001`.name_col as `U001_name` FROM `users` as `U001`"
    );
    assert!(compiled.sort_in_application_logic);
    assert_eq!(compiled.window, Some(1));
    assert_eq!(compiled.window_size, Some(5));
}

#[test]
fn regex_comparison_lowers_to_regexp() {
    let compiled = compile("retrieve (Product.name) where Product.name = /^ab+/i");
    assert_snapshot!(
        compiled.sql,
        @"SELECT `P001`.name as `P001_name` FROM `products` as `P001` WHERE `P001`.name REGEXP ?"
    );
    assert_eq!(compiled.bound_params, vec![json!("^ab+")]);
}

#[test]
fn logical_precedence_is_parenthesized() {
    let compiled =
        compile("retrieve (Product.name) where (Product.price > 1 or Product.price < 5) and Product.id = 3");
    assert_snapshot!(
        compiled.sql,
        @"SELECT `P001`.name as `P001_name` FROM `products` as `P001` WHERE (`P001`.price > ? OR `P001`.price < ?) AND `P001`.id = ?"
    );
    assert_eq!(
        compiled.bound_params,
        vec![json!(1), json!(5), json!(3)]
    );
}

#[rstest]
#[case::eq("=", "=")]
#[case::double_eq("==", "=")]
#[case::ne("!=", "!=")]
#[case::ne_angle("<>", "!=")]
#[case::lt("<", "<")]
#[case::lte("<=", "<=")]
#[case::gt(">", ">")]
#[case::gte(">=", ">=")]
#[case::add("+", "+")]
#[case::modulo("%", "%")]
#[case::shift_left("<<", "<<")]
fn operators_map_one_to_one(#[case] source_op: &str, #[case] sql_op: &str) {
    let compiled = compile(&format!(
        "retrieve (Product.name) where Product.id {source_op} 3"
    ));
    assert!(
        compiled.sql.contains(&format!("`P001`.id {sql_op} ?")),
        "operator {source_op} missing from {}",
        compiled.sql
    );
}

#[test]
fn lowering_is_idempotent() {
    let store = product_store();
    let params = HashMap::new();
    let retrieve = quelc::quel_to_ast("retrieve (Product.name) where Product.price > 3").unwrap();
    let retrieve = quelc::resolve_ast(retrieve, &store).unwrap();

    let (sql_a, params_a) = quelc::ast_to_sql(&retrieve, &store, &params).unwrap();
    let (sql_b, params_b) = quelc::ast_to_sql(&retrieve, &store, &params).unwrap();
    assert_eq!(sql_a, sql_b);
    assert_eq!(params_a, params_b);
}

#[test]
fn method_call_in_values_is_rejected() {
    let store = user_store();
    let err = quelc::compile(
        "retrieve (trim(User.name))",
        &HashMap::new(),
        &store,
        None,
    )
    .unwrap_err();
    assert!(err.inner[0].reason.contains("cannot express"));
}

#[test]
fn formatted_sql_is_multiline() {
    let compiled = compile("retrieve (Product.name)");
    let formatted = compiled.formatted_sql();
    assert!(formatted.contains('\n'));
    assert!(formatted.contains("`P001`.name"));
}
