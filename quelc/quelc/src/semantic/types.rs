//! Coarse type annotation, used to reject operators over whole entities.

use crate::ir::fold::QuelFold;
use crate::lr::Literal;
use crate::pr::{Expr, ExprKind, Retrieve, Ty, UnOp};
use crate::{Error, Reason, Result, WithErrorInfo};

pub(super) fn annotate_and_check(retrieve: Retrieve) -> Result<Retrieve> {
    Typer.fold_retrieve(retrieve)
}

struct Typer;

impl QuelFold for Typer {
    fn fold_expr(&mut self, mut expr: Expr) -> Result<Expr> {
        // children first, so operand types are available
        expr.kind = self.fold_expr_kind(expr.kind)?;
        expr.ty = Some(type_of(&expr.kind));

        match &expr.kind {
            ExprKind::Binary(binary) => {
                check_operand(&binary.left)?;
                check_operand(&binary.right)?;
            }
            ExprKind::Unary(unary) => check_operand(&unary.expr)?,
            _ => {}
        }
        Ok(expr)
    }
}

fn check_operand(operand: &Expr) -> Result<()> {
    if operand.ty == Some(Ty::Entity) {
        let found = operand
            .kind
            .as_ident()
            .map(|i| i.to_string())
            .unwrap_or_else(|| operand.kind.as_ref().to_string());
        return Err(Error::new(Reason::EntityExpression { found }).with_span(operand.span));
    }
    Ok(())
}

fn type_of(kind: &ExprKind) -> Ty {
    match kind {
        ExprKind::Literal(Literal::String(_)) => Ty::String,
        ExprKind::Literal(Literal::Integer(_)) | ExprKind::Literal(Literal::Float(_)) => Ty::Number,
        ExprKind::Literal(Literal::Boolean(_)) => Ty::Bool,
        ExprKind::Literal(Literal::Null) => Ty::Unknown,
        ExprKind::Regex(_) => Ty::String,
        ExprKind::Param(_) => Ty::Unknown,
        ExprKind::Ident(ident) => {
            if ident.is_entity_ref() {
                Ty::Entity
            } else {
                Ty::Unknown
            }
        }
        ExprKind::Binary(binary) => {
            if binary.op.is_logical() || binary.op.is_comparison() {
                Ty::Bool
            } else {
                Ty::Number
            }
        }
        ExprKind::Unary(unary) => match unary.op {
            UnOp::Not => Ty::Bool,
            UnOp::Neg => Ty::Number,
        },
        ExprKind::In(_) | ExprKind::Exists(_) => Ty::Bool,
        ExprKind::MethodCall(_) => Ty::Unknown,
    }
}
