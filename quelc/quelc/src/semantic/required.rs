//! Required-range analysis: annotation-driven requirements, WHERE usage,
//! nullability relaxation and `exists()` erasure. A required range lowers
//! to INNER JOIN, everything else stays LEFT.

use std::collections::{HashMap, HashSet};

use crate::ir::walk_idents;
use crate::lr::Literal;
use crate::metadata::EntityStore;
use crate::pr::{BinOp, BinaryExpr, Expr, ExprKind, Retrieve};
use crate::Result;

/// A two-identifier join matching an owning-side `RequiredRelation`
/// annotation forces the joined range required.
pub(super) fn apply_required_annotations(
    mut retrieve: Retrieve,
    store: &dyn EntityStore,
) -> Result<Retrieve> {
    let range_entities: HashMap<String, String> = retrieve
        .ranges
        .iter()
        .filter_map(|r| r.entity().map(|e| (r.name.clone(), e.to_string())))
        .collect();

    let mut required: HashSet<String> = HashSet::new();
    for range in &retrieve.ranges {
        let Some(condition) = range.join_condition() else {
            continue;
        };
        let ExprKind::Binary(binary) = &condition.kind else {
            continue;
        };
        if binary.op != BinOp::Eq {
            continue;
        }
        let (ExprKind::Ident(left), ExprKind::Ident(right)) =
            (&binary.left.kind, &binary.right.kind)
        else {
            continue;
        };

        for ident in [left, right] {
            let Some(range_name) = &ident.range else {
                continue;
            };
            let Some(entity) = range_entities.get(range_name) else {
                continue;
            };
            let Some(property) = ident.property() else {
                continue;
            };
            for group in store.annotations(entity) {
                if !group.has_required_relation() || !group.is_owning_to_one() {
                    continue;
                }
                if group.property == property || group.relation_property() == Some(property) {
                    required.insert(range.name.clone());
                }
            }
        }
    }

    for range in &mut retrieve.ranges {
        if required.contains(&range.name) {
            range.required = true;
        }
    }
    Ok(retrieve)
}

/// Any range referenced in the conditions must contribute a row.
pub(super) fn require_ranges_in_conditions(mut retrieve: Retrieve) -> Result<Retrieve> {
    let mut used: HashSet<String> = HashSet::new();
    if let Some(conditions) = &retrieve.conditions {
        walk_idents(conditions, &mut |ident| {
            if let Some(range) = &ident.range {
                used.insert(range.clone());
            }
        });
    }
    for range in &mut retrieve.ranges {
        if used.contains(&range.name) {
            range.required = true;
        }
    }
    Ok(retrieve)
}

/// An `is null` test on a range's column means the caller expects missing
/// rows; such a range stays LEFT-joinable even when used in WHERE.
pub(super) fn relax_nullable_ranges(mut retrieve: Retrieve) -> Result<Retrieve> {
    let mut relaxed: HashSet<String> = HashSet::new();
    if let Some(conditions) = &retrieve.conditions {
        collect_null_tests(conditions, &mut relaxed);
    }
    for range in &mut retrieve.ranges {
        if relaxed.contains(&range.name) {
            range.required = false;
        }
    }
    Ok(retrieve)
}

fn collect_null_tests(expr: &Expr, relaxed: &mut HashSet<String>) {
    match &expr.kind {
        ExprKind::Binary(binary) => {
            if binary.op == BinOp::Eq {
                let tested = match (&binary.left.kind, &binary.right.kind) {
                    (ExprKind::Ident(ident), ExprKind::Literal(Literal::Null)) => Some(ident),
                    (ExprKind::Literal(Literal::Null), ExprKind::Ident(ident)) => Some(ident),
                    _ => None,
                };
                if let Some(ident) = tested {
                    if let Some(range) = &ident.range {
                        relaxed.insert(range.clone());
                    }
                }
            }
            collect_null_tests(&binary.left, relaxed);
            collect_null_tests(&binary.right, relaxed);
        }
        ExprKind::Unary(unary) => collect_null_tests(&unary.expr, relaxed),
        _ => {}
    }
}

/// Replace each `exists(entity)` by forcing its range required and erasing
/// the node; a condition tree that collapses to nothing clears WHERE.
pub(super) fn erase_exists(mut retrieve: Retrieve) -> Result<Retrieve> {
    let mut required: HashSet<String> = HashSet::new();
    retrieve.conditions = retrieve
        .conditions
        .and_then(|c| prune_exists(c, &mut required));
    for range in &mut retrieve.ranges {
        if required.contains(&range.name) {
            range.required = true;
        }
    }
    Ok(retrieve)
}

fn prune_exists(expr: Expr, required: &mut HashSet<String>) -> Option<Expr> {
    let Expr { kind, span, ty } = expr;
    match kind {
        ExprKind::Exists(ident) => {
            if let Some(range) = ident.range {
                required.insert(range);
            }
            None
        }
        ExprKind::Binary(binary) if binary.op.is_logical() => {
            let op = binary.op;
            let left = prune_exists(*binary.left, required);
            let right = prune_exists(*binary.right, required);
            match (left, right) {
                (Some(left), Some(right)) => Some(Expr {
                    kind: ExprKind::Binary(BinaryExpr {
                        left: Box::new(left),
                        op,
                        right: Box::new(right),
                    }),
                    span,
                    ty,
                }),
                (Some(side), None) | (None, Some(side)) => Some(side),
                (None, None) => None,
            }
        }
        kind => Some(Expr { kind, span, ty }),
    }
}
