//! Converts `window` / `window_size` into a deterministic primary-key IN
//! filter, running an auxiliary key query through the caller's executor
//! when the query does not already carry a final IN. This is the only part
//! of the compiler that executes SQL.

use std::collections::HashMap;

use serde_json::Value;

use crate::lr::{Literal, StringLit};
use crate::metadata::{EntityStore, MainRangeKey, QueryExecutor};
use crate::pr::{Alias, BinOp, BinaryExpr, Expr, ExprKind, Ident, InExpr, Retrieve};
use crate::sql;
use crate::{Error, ErrorSource, Reason, Result, WithErrorInfo};

/// Apply the window to the query, returning the rewritten tree and the
/// pre-slice result count when pagination ran.
pub fn paginate(
    mut retrieve: Retrieve,
    store: &dyn EntityStore,
    executor: Option<&dyn QueryExecutor>,
    params: &HashMap<String, Value>,
) -> Result<(Retrieve, Option<u64>)> {
    let (Some(window), Some(window_size)) = (retrieve.window, retrieve.window_size) else {
        return Ok((retrieve, None));
    };
    if retrieve.sort_in_application_logic {
        // the caller sorts and windows in application logic
        return Ok((retrieve, None));
    }
    let Some(key) = store.primary_key_of_main_range(&retrieve) else {
        return Ok((retrieve, None));
    };

    if retrieve.directive_enabled("InValuesAreFinal") {
        if let Some(count) = slice_existing_in(&mut retrieve, &key, window, window_size, params)? {
            return Ok((retrieve, Some(count)));
        }
    }

    let Some(executor) = executor else {
        // without an adapter the window is left to the caller
        return Ok((retrieve, None));
    };

    let keys = fetch_primary_keys(&retrieve, &key, store, executor, params)?;
    let full_count = keys.len() as u64;
    let page = slice_window(keys, window, window_size);
    log::debug!(
        "pagination sliced window {window} to {} of {full_count} keys",
        page.len()
    );
    let list: Vec<Expr> = page.into_iter().map(value_to_literal_expr).collect();

    // two steps: a conditional mutable descent into the tree trips up the
    // borrow checker
    let has_existing = find_key_in(retrieve.conditions.as_ref(), &key).is_some();
    if has_existing {
        if let Some(existing) = find_key_in_mut(retrieve.conditions.as_mut(), &key) {
            existing.list = list;
        }
    } else {
        let in_expr = Expr {
            kind: ExprKind::In(InExpr {
                ident: Ident::bound(key.range.as_str(), key.primary_key.as_str()),
                list,
            }),
            span: None,
            ty: None,
        };
        retrieve.conditions = Some(match retrieve.conditions.take() {
            Some(conditions) => Expr {
                kind: ExprKind::Binary(BinaryExpr {
                    left: Box::new(conditions),
                    op: BinOp::And,
                    right: Box::new(in_expr),
                }),
                span: None,
                ty: None,
            },
            None => in_expr,
        });
    }
    Ok((retrieve, Some(full_count)))
}

/// The `InValuesAreFinal` path: slice an IN the caller already supplied on
/// the main primary key, without touching the database.
fn slice_existing_in(
    retrieve: &mut Retrieve,
    key: &MainRangeKey,
    window: u64,
    window_size: u64,
    params: &HashMap<String, Value>,
) -> Result<Option<u64>> {
    let Some(in_expr) = find_key_in_mut(retrieve.conditions.as_mut(), key) else {
        return Ok(None);
    };

    let mut values: Vec<Value> = Vec::new();
    for entry in &in_expr.list {
        match &entry.kind {
            ExprKind::Literal(lit) => values.push(sql::literal_value(lit)),
            ExprKind::Param(name) => match params.get(name) {
                Some(Value::Array(items)) => values.extend(items.iter().cloned()),
                Some(value) => values.push(value.clone()),
                None => {
                    return Err(Error::new(Reason::NotFound {
                        name: name.clone(),
                        namespace: "parameter".to_string(),
                    })
                    .with_span(entry.span)
                    .with_source(ErrorSource::Lowering))
                }
            },
            other => {
                return Err(Error::new(Reason::Unrepresentable {
                    found: format!("{} inside IN", other.as_ref()),
                })
                .with_span(entry.span)
                .with_source(ErrorSource::Lowering))
            }
        }
    }

    let full_count = values.len() as u64;
    let page = slice_window(values, window, window_size);
    in_expr.list = page.into_iter().map(value_to_literal_expr).collect();
    Ok(Some(full_count))
}

/// Lower a clone of the query down to its primary keys and execute it.
fn fetch_primary_keys(
    retrieve: &Retrieve,
    key: &MainRangeKey,
    store: &dyn EntityStore,
    executor: &dyn QueryExecutor,
    params: &HashMap<String, Value>,
) -> Result<Vec<Value>> {
    let mut probe = retrieve.clone();
    probe.unique = true;
    probe.window = None;
    probe.window_size = None;
    probe.values = vec![Alias {
        name: format!("{}_{}", key.range, key.primary_key),
        expr: Expr {
            kind: ExprKind::Ident(Ident::bound(key.range.as_str(), key.primary_key.as_str())),
            span: None,
            ty: None,
        },
        alias_pattern: None,
        visible_in_result: true,
        explicit_name: false,
    }];

    let (sql_text, bound) = sql::compile_with(
        &probe,
        store,
        params,
        sql::GenOptions {
            alias_fields: false,
        },
    )?;
    log::debug!("pagination key query: {sql_text}");

    executor.fetch_column(&sql_text, &bound).map_err(|e| {
        Error::new(Reason::Adapter {
            message: e.to_string(),
        })
        .with_source(ErrorSource::Adapter)
    })
}

fn slice_window(values: Vec<Value>, window: u64, window_size: u64) -> Vec<Value> {
    values
        .into_iter()
        .skip((window * window_size) as usize)
        .take(window_size as usize)
        .collect()
}

fn value_to_literal_expr(value: Value) -> Expr {
    let lit = match value {
        Value::Null => Literal::Null,
        Value::Bool(b) => Literal::Boolean(b),
        Value::Number(n) => match n.as_i64() {
            Some(i) => Literal::Integer(i),
            None => Literal::Float(n.as_f64().unwrap_or(0.0)),
        },
        Value::String(s) => Literal::String(StringLit {
            value: s,
            quote: '\'',
        }),
        other => Literal::String(StringLit {
            value: other.to_string(),
            quote: '\'',
        }),
    };
    Expr {
        kind: ExprKind::Literal(lit),
        span: None,
        ty: None,
    }
}

fn matches_key(in_expr: &InExpr, key: &MainRangeKey) -> bool {
    in_expr.ident.range.as_deref() == Some(key.range.as_str())
        && in_expr.ident.property() == Some(key.primary_key.as_str())
}

/// Find an IN constraint on the main range's primary key.
pub(crate) fn find_key_in<'a>(
    conditions: Option<&'a Expr>,
    key: &MainRangeKey,
) -> Option<&'a InExpr> {
    conditions.and_then(|expr| find_in(expr, key))
}

fn find_in<'a>(expr: &'a Expr, key: &MainRangeKey) -> Option<&'a InExpr> {
    match &expr.kind {
        ExprKind::In(in_expr) if matches_key(in_expr, key) => Some(in_expr),
        ExprKind::Binary(binary) => {
            find_in(&binary.left, key).or_else(|| find_in(&binary.right, key))
        }
        ExprKind::Unary(unary) => find_in(&unary.expr, key),
        _ => None,
    }
}

pub(crate) fn find_key_in_mut<'a>(
    conditions: Option<&'a mut Expr>,
    key: &MainRangeKey,
) -> Option<&'a mut InExpr> {
    conditions.and_then(|expr| find_in_mut(expr, key))
}

fn find_in_mut<'a>(expr: &'a mut Expr, key: &MainRangeKey) -> Option<&'a mut InExpr> {
    match &mut expr.kind {
        ExprKind::In(in_expr) if matches_key(in_expr, key) => Some(in_expr),
        ExprKind::Binary(binary) => {
            // pick the side immutably first; two mutable descents would
            // overlap borrows
            if find_in(&binary.left, key).is_some() {
                find_in_mut(&mut binary.left, key)
            } else {
                find_in_mut(&mut binary.right, key)
            }
        }
        ExprKind::Unary(unary) => find_in_mut(&mut unary.expr, key),
        _ => None,
    }
}
