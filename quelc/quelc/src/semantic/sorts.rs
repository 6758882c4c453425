//! Sort-mode detection. A sort expression containing a method call or a
//! JSON-range reference cannot be pushed into SQL; the caller sorts.

use std::collections::HashSet;

use crate::ir::walk_idents;
use crate::pr::{Expr, ExprKind, Retrieve};
use crate::Result;

pub(super) fn detect_application_sort(mut retrieve: Retrieve) -> Result<Retrieve> {
    let json_ranges: HashSet<&str> = retrieve
        .ranges
        .iter()
        .filter(|r| r.kind.is_json())
        .map(|r| r.name.as_str())
        .collect();

    let mut in_application = false;
    for sort in &retrieve.sorts {
        if contains_method_call(&sort.column) {
            in_application = true;
        }
        walk_idents(&sort.column, &mut |ident| {
            if let Some(range) = &ident.range {
                if json_ranges.contains(range.as_str()) {
                    in_application = true;
                }
            }
        });
    }
    retrieve.sort_in_application_logic = in_application;
    Ok(retrieve)
}

fn contains_method_call(expr: &Expr) -> bool {
    match &expr.kind {
        ExprKind::MethodCall(_) => true,
        ExprKind::Binary(binary) => {
            contains_method_call(&binary.left) || contains_method_call(&binary.right)
        }
        ExprKind::Unary(unary) => contains_method_call(&unary.expr),
        ExprKind::In(in_expr) => in_expr.list.iter().any(contains_method_call),
        _ => false,
    }
}
