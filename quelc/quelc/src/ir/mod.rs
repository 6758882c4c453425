//! Tree-rewriting infrastructure over the query AST.

pub mod fold;

pub use fold::QuelFold;

use crate::pr::{Expr, ExprKind, Ident};

/// Visit every identifier in an expression tree, in source order.
pub fn walk_idents<'a>(expr: &'a Expr, f: &mut impl FnMut(&'a Ident)) {
    match &expr.kind {
        ExprKind::Ident(ident) => f(ident),
        ExprKind::Binary(binary) => {
            walk_idents(&binary.left, f);
            walk_idents(&binary.right, f);
        }
        ExprKind::Unary(unary) => walk_idents(&unary.expr, f),
        ExprKind::In(in_expr) => {
            f(&in_expr.ident);
            for entry in &in_expr.list {
                walk_idents(entry, f);
            }
        }
        ExprKind::Exists(ident) => f(ident),
        ExprKind::MethodCall(call) => {
            if let Some(receiver) = &call.receiver {
                f(receiver);
            }
            for arg in &call.args {
                walk_idents(arg, f);
            }
        }
        ExprKind::Literal(_) | ExprKind::Param(_) | ExprKind::Regex(_) => {}
    }
}

/// As [walk_idents], with mutable access.
pub fn walk_idents_mut(expr: &mut Expr, f: &mut impl FnMut(&mut Ident)) {
    match &mut expr.kind {
        ExprKind::Ident(ident) => f(ident),
        ExprKind::Binary(binary) => {
            walk_idents_mut(&mut binary.left, f);
            walk_idents_mut(&mut binary.right, f);
        }
        ExprKind::Unary(unary) => walk_idents_mut(&mut unary.expr, f),
        ExprKind::In(in_expr) => {
            f(&mut in_expr.ident);
            for entry in &mut in_expr.list {
                walk_idents_mut(entry, f);
            }
        }
        ExprKind::Exists(ident) => f(ident),
        ExprKind::MethodCall(call) => {
            if let Some(receiver) = &mut call.receiver {
                f(receiver);
            }
            for arg in &mut call.args {
                walk_idents_mut(arg, f);
            }
        }
        ExprKind::Literal(_) | ExprKind::Param(_) | ExprKind::Regex(_) => {}
    }
}
