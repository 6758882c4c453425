//! Macro handling: substitution of named value expressions, and rejection
//! of operator expressions over whole-entity macros.

use std::collections::HashMap;

use crate::ir::fold::QuelFold;
use crate::pr::{Expr, ExprKind, Ident, Retrieve};
use crate::{Error, Reason, Result, WithErrorInfo};

/// Substitute macro bodies for bare identifiers matching a macro key, in
/// conditions and sorts.
pub(super) fn plug_macros(mut retrieve: Retrieve) -> Result<Retrieve> {
    if retrieve.macros.is_empty() {
        return Ok(retrieve);
    }
    let mut plugger = MacroPlugger {
        macros: retrieve.macros.clone(),
    };
    retrieve.conditions = retrieve
        .conditions
        .map(|c| plugger.fold_expr(c))
        .transpose()?;
    retrieve.sorts = plugger.fold_column_sorts(retrieve.sorts)?;
    Ok(retrieve)
}

struct MacroPlugger {
    macros: HashMap<String, Expr>,
}

impl QuelFold for MacroPlugger {
    fn fold_expr(&mut self, mut expr: Expr) -> Result<Expr> {
        if let ExprKind::Ident(ident) = &expr.kind {
            if ident.range.is_none() && ident.parts.len() == 1 {
                if let Some(body) = self.macros.get(&ident.parts[0]) {
                    return Ok(body.clone());
                }
            }
        }
        expr.kind = self.fold_expr_kind(expr.kind)?;
        Ok(expr)
    }
}

/// Macros bound to a whole entity can only stand in for the entity itself;
/// using one inside an operator expression is rejected.
pub(super) fn reject_entity_macros(retrieve: &Retrieve) -> Result<()> {
    let entity_macros: Vec<&Ident> = retrieve
        .macros
        .values()
        .filter_map(|m| m.kind.as_ident())
        .filter(|i| i.is_entity_ref())
        .collect();
    if entity_macros.is_empty() {
        return Ok(());
    }
    if let Some(conditions) = &retrieve.conditions {
        check_expr(conditions, &entity_macros)?;
    }
    for sort in &retrieve.sorts {
        check_expr(&sort.column, &entity_macros)?;
    }
    Ok(())
}

fn check_expr(expr: &Expr, entity_macros: &[&Ident]) -> Result<()> {
    match &expr.kind {
        ExprKind::Binary(binary) => {
            for side in [binary.left.as_ref(), binary.right.as_ref()] {
                if let ExprKind::Ident(ident) = &side.kind {
                    if entity_macros.iter().any(|m| *m == ident) {
                        return Err(Error::new(Reason::EntityExpression {
                            found: ident.to_string(),
                        })
                        .with_span(side.span));
                    }
                }
                check_expr(side, entity_macros)?;
            }
            Ok(())
        }
        ExprKind::Unary(unary) => check_expr(&unary.expr, entity_macros),
        ExprKind::In(in_expr) => {
            for entry in &in_expr.list {
                check_expr(entry, entity_macros)?;
            }
            Ok(())
        }
        ExprKind::MethodCall(call) => {
            for arg in &call.args {
                check_expr(arg, entity_macros)?;
            }
            Ok(())
        }
        _ => Ok(()),
    }
}
