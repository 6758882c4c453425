//! Pagination scenarios: the auxiliary primary-key query and the
//! `InValuesAreFinal` slicing path.

use std::cell::RefCell;
use std::collections::HashMap;

use insta::assert_snapshot;
use serde_json::{json, Value};
use similar_asserts::assert_eq;

use quelc::metadata::{AdapterError, QueryExecutor};

use crate::stores::product_store;

/// Records every statement it is asked to run and returns a fixed key
/// column.
struct MockExecutor {
    keys: Vec<Value>,
    calls: RefCell<Vec<(String, Vec<Value>)>>,
}

impl MockExecutor {
    fn new(keys: Vec<Value>) -> Self {
        MockExecutor {
            keys,
            calls: RefCell::new(Vec::new()),
        }
    }
}

impl QueryExecutor for MockExecutor {
    fn fetch_column(&self, sql: &str, params: &[Value]) -> Result<Vec<Value>, AdapterError> {
        self.calls
            .borrow_mut()
            .push((sql.to_string(), params.to_vec()));
        Ok(self.keys.clone())
    }
}

struct FailingExecutor;

impl QueryExecutor for FailingExecutor {
    fn fetch_column(&self, _sql: &str, _params: &[Value]) -> Result<Vec<Value>, AdapterError> {
        Err(AdapterError::new("connection lost"))
    }
}

#[test]
fn window_runs_primary_key_query() {
    let store = product_store();
    let executor = MockExecutor::new(vec![json!(1), json!(2), json!(3)]);
    let compiled = quelc::compile(
        "retrieve (Product) sort by Product.price window 1 using window_size 2",
        &HashMap::new(),
        &store,
        Some(&executor),
    )
    .unwrap();

    let calls = executor.calls.borrow();
    assert_eq!(calls.len(), 1);
    assert_snapshot!(
        calls[0].0,
        @"SELECT DISTINCT `P001`.id FROM `products` as `P001` ORDER BY `P001`.price ASC"
    );
    assert!(calls[0].1.is_empty());

    assert_snapshot!(
        compiled.sql,
        @"SELECT `P001`.id as `P001_id`, `P001`.name as `P001_name`, `P001`.price as `P001_price`, `P001`.cat_id as `P001_catId` FROM `products` as `P001` WHERE `P001`.id IN (?) ORDER BY `P001`.price ASC"
    );
    assert_eq!(compiled.bound_params, vec![json!(3)]);
    assert_eq!(compiled.full_query_result_count, Some(3));
    assert_eq!(compiled.window, Some(1));
    assert_eq!(compiled.window_size, Some(2));
}

#[test]
fn window_zero_takes_the_first_page() {
    let store = product_store();
    let executor = MockExecutor::new(vec![json!(10), json!(20), json!(30)]);
    let compiled = quelc::compile(
        "retrieve (Product) sort by Product.price window 0 using window_size 10",
        &HashMap::new(),
        &store,
        Some(&executor),
    )
    .unwrap();

    // the key fetch still runs; the slice is [0, 10)
    assert_eq!(executor.calls.borrow().len(), 1);
    assert_eq!(
        compiled.bound_params,
        vec![json!(10), json!(20), json!(30)]
    );
    assert_eq!(compiled.full_query_result_count, Some(3));
}

#[test]
fn window_past_the_end_matches_nothing() {
    let store = product_store();
    let executor = MockExecutor::new(vec![json!(1), json!(2), json!(3)]);
    let compiled = quelc::compile(
        "retrieve (Product) sort by Product.price window 5 using window_size 2",
        &HashMap::new(),
        &store,
        Some(&executor),
    )
    .unwrap();

    assert_snapshot!(
        compiled.sql,
        @"SELECT `P001`.id as `P001_id`, `P001`.name as `P001_name`, `P001`.price as `P001_price`, `P001`.cat_id as `P001_catId` FROM `products` as `P001` WHERE `P001`.id IN (NULL) ORDER BY `P001`.price ASC"
    );
    assert!(compiled.bound_params.is_empty());
    assert_eq!(compiled.full_query_result_count, Some(3));
}

#[test]
fn in_values_are_final_slices_without_a_query() {
    let store = product_store();
    let params = HashMap::from([("ids".to_string(), json!([7, 9, 11]))]);
    // no executor: the directive path must not need one
    let compiled = quelc::compile(
        "@InValuesAreFinal = true \
         retrieve (Product) where Product.id in (:ids) window 0 using window_size 1",
        &params,
        &store,
        None,
    )
    .unwrap();

    assert_snapshot!(
        compiled.sql,
        @"SELECT `P001`.id as `P001_id`, `P001`.name as `P001_name`, `P001`.price as `P001_price`, `P001`.cat_id as `P001_catId` FROM `products` as `P001` WHERE `P001`.id IN (?) ORDER BY FIELD(`P001`.id, 7)"
    );
    assert_eq!(compiled.bound_params, vec![json!(7)]);
    assert_eq!(compiled.full_query_result_count, Some(3));
}

#[test]
fn in_values_are_final_preserves_caller_order() {
    let store = product_store();
    let params = HashMap::from([("ids".to_string(), json!([11, 7, 9, 7]))]);
    let compiled = quelc::compile(
        "@InValuesAreFinal = true \
         retrieve (Product.name) where Product.id in (:ids) window 0 using window_size 4",
        &params,
        &store,
        None,
    )
    .unwrap();

    // FIELD values are deduped but keep the caller's order
    assert_snapshot!(
        compiled.sql,
        @"SELECT `P001`.name as `P001_name` FROM `products` as `P001` WHERE `P001`.id IN (?, ?, ?, ?) ORDER BY FIELD(`P001`.id, 11, 7, 9)"
    );
    assert_eq!(
        compiled.bound_params,
        vec![json!(11), json!(7), json!(9), json!(7)]
    );
}

#[test]
fn window_without_executor_passes_through() {
    let store = product_store();
    let compiled = quelc::compile(
        "retrieve (Product.name) sort by Product.price window 1 using window_size 2",
        &HashMap::new(),
        &store,
        None,
    )
    .unwrap();

    assert_snapshot!(
        compiled.sql,
        @"SELECT `P001`.name as `P001_name` FROM `products` as `P001` ORDER BY `P001`.price ASC"
    );
    assert_eq!(compiled.full_query_result_count, None);
    assert_eq!(compiled.window, Some(1));
}

#[test]
fn adapter_failures_pass_through() {
    let store = product_store();
    let err = quelc::compile(
        "retrieve (Product) sort by Product.price window 0 using window_size 2",
        &HashMap::new(),
        &store,
        Some(&FailingExecutor),
    )
    .unwrap_err();

    assert!(err.inner[0].reason.contains("connection lost"));
}

#[test]
fn application_sort_skips_pagination() {
    let store = crate::stores::user_store();
    let executor = MockExecutor::new(vec![json!(1)]);
    let compiled = quelc::compile(
        "retrieve (User) sort by User.displayName() window 0 using window_size 2",
        &HashMap::new(),
        &store,
        Some(&executor),
    )
    .unwrap();

    assert!(executor.calls.borrow().is_empty());
    assert!(compiled.sort_in_application_logic);
    assert_eq!(compiled.full_query_result_count, None);
}
