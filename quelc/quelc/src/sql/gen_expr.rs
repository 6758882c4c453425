//! Lowers expressions to SQL fragments, pushing bound parameters in
//! emission order.

use itertools::Itertools;
use serde_json::Value;

use super::{literal_value, Context};
use crate::lr::Literal;
use crate::pr::{BinOp, BinaryExpr, Expr, ExprKind, Ident, InExpr, UnOp};
use crate::utils::valid_ident;
use crate::{Error, Reason, Result, WithErrorInfo};

pub(super) fn translate_expr(expr: &Expr, ctx: &mut Context) -> Result<String> {
    Ok(match &expr.kind {
        ExprKind::Ident(ident) => translate_ident(ident, ctx)?,
        ExprKind::Literal(Literal::Null) => "NULL".to_string(),
        ExprKind::Literal(lit) => {
            ctx.bound.push(literal_value(lit));
            "?".to_string()
        }
        ExprKind::Param(name) => {
            let value = lookup_param(name, ctx).with_span(expr.span)?;
            if value.is_array() {
                return Err(Error::new(Reason::Unrepresentable {
                    found: format!("array parameter `:{name}` outside IN"),
                })
                .with_span(expr.span));
            }
            ctx.bound.push(value);
            "?".to_string()
        }
        ExprKind::Binary(binary) => translate_binary(binary, ctx).with_span(expr.span)?,
        ExprKind::Unary(unary) => {
            let operand = translate_operand(&unary.expr, ctx)?;
            match unary.op {
                UnOp::Neg => format!("-{operand}"),
                UnOp::Not => format!("NOT {operand}"),
            }
        }
        ExprKind::In(in_expr) => translate_in(in_expr, ctx).with_span(expr.span)?,
        ExprKind::Exists(ident) => {
            return Err(Error::new(Reason::Unrepresentable {
                found: format!("exists({ident})"),
            })
            .with_span(expr.span))
        }
        ExprKind::MethodCall(call) => {
            return Err(Error::new(Reason::Unrepresentable {
                found: format!("method call `{}()`", call.name),
            })
            .with_span(expr.span))
        }
        ExprKind::Regex(_) => {
            return Err(Error::new(Reason::Unrepresentable {
                found: "a bare regular expression".to_string(),
            })
            .with_span(expr.span))
        }
    })
}

/// `` `range`.column `` for a bound property reference.
pub(super) fn translate_ident(ident: &Ident, ctx: &Context) -> Result<String> {
    let Some(range_name) = &ident.range else {
        return Err(Error::new_assert(format!("unresolved identifier `{ident}`")));
    };
    let Some(property) = ident.property() else {
        return Err(Error::new(Reason::Unrepresentable {
            found: format!("whole-entity reference `{ident}`"),
        }));
    };
    let column = ctx.column_of(range_name, property)?;
    quoted_column(range_name, column)
}

pub(super) fn quoted_column(range: &str, column: &str) -> Result<String> {
    if !valid_ident(range) || !valid_ident(column) {
        return Err(Error::new(Reason::Unrepresentable {
            found: format!("identifier `{range}.{column}`"),
        }));
    }
    Ok(format!("`{range}`.{column}"))
}

fn translate_binary(binary: &BinaryExpr, ctx: &mut Context) -> Result<String> {
    if matches!(binary.op, BinOp::Eq | BinOp::Ne) {
        // null comparisons emit IS [NOT] NULL
        let operand = match (&binary.left.kind, &binary.right.kind) {
            (ExprKind::Literal(Literal::Null), _) => Some(&binary.right),
            (_, ExprKind::Literal(Literal::Null)) => Some(&binary.left),
            _ => None,
        };
        if let Some(operand) = operand {
            let operand = translate_operand(operand, ctx)?;
            return Ok(match binary.op {
                BinOp::Eq => format!("{operand} IS NULL"),
                _ => format!("{operand} IS NOT NULL"),
            });
        }

        // regex comparisons lower to REGEXP with the pattern bound
        if let ExprKind::Regex(regex) = &binary.right.kind {
            let left = translate_operand(&binary.left, ctx)?;
            ctx.bound.push(Value::from(regex.pattern.clone()));
            return Ok(match binary.op {
                BinOp::Eq => format!("{left} REGEXP ?"),
                _ => format!("{left} NOT REGEXP ?"),
            });
        }
    }

    let parent = precedence(binary.op);
    let left = translate_side(&binary.left, parent, false, ctx)?;
    let right = translate_side(&binary.right, parent, true, ctx)?;
    Ok(format!("{left} {} {right}", op_sql(binary.op)))
}

fn translate_side(expr: &Expr, parent: u8, is_right: bool, ctx: &mut Context) -> Result<String> {
    let text = translate_expr(expr, ctx)?;
    let wrap = match &expr.kind {
        ExprKind::Binary(child) => {
            let child_prec = precedence(child.op);
            child_prec < parent || (is_right && child_prec == parent)
        }
        _ => false,
    };
    Ok(if wrap { format!("({text})") } else { text })
}

fn translate_operand(expr: &Expr, ctx: &mut Context) -> Result<String> {
    let text = translate_expr(expr, ctx)?;
    Ok(if matches!(expr.kind, ExprKind::Binary(_)) {
        format!("({text})")
    } else {
        text
    })
}

fn translate_in(in_expr: &InExpr, ctx: &mut Context) -> Result<String> {
    let column = translate_ident(&in_expr.ident, ctx)?;
    let mut placeholders: Vec<&str> = Vec::new();
    for entry in &in_expr.list {
        match &entry.kind {
            ExprKind::Literal(lit) => {
                ctx.bound.push(literal_value(lit));
                placeholders.push("?");
            }
            ExprKind::Param(name) => match lookup_param(name, ctx)? {
                Value::Array(items) => {
                    for item in items {
                        ctx.bound.push(item);
                        placeholders.push("?");
                    }
                }
                value => {
                    ctx.bound.push(value);
                    placeholders.push("?");
                }
            },
            other => {
                return Err(Error::new(Reason::Unrepresentable {
                    found: format!("{} inside IN", other.as_ref()),
                })
                .with_span(entry.span))
            }
        }
    }
    if placeholders.is_empty() {
        // an empty page matches no rows
        return Ok(format!("{column} IN (NULL)"));
    }
    Ok(format!("{column} IN ({})", placeholders.iter().join(", ")))
}

fn lookup_param(name: &str, ctx: &Context) -> Result<Value> {
    ctx.params.get(name).cloned().ok_or_else(|| {
        Error::new(Reason::NotFound {
            name: name.to_string(),
            namespace: "parameter".to_string(),
        })
    })
}

fn op_sql(op: BinOp) -> &'static str {
    match op {
        BinOp::Or => "OR",
        BinOp::And => "AND",
        BinOp::Eq => "=",
        BinOp::Ne => "!=",
        BinOp::Lt => "<",
        BinOp::Lte => "<=",
        BinOp::Gt => ">",
        BinOp::Gte => ">=",
        BinOp::Add => "+",
        BinOp::Sub => "-",
        BinOp::Mul => "*",
        BinOp::Div => "/",
        BinOp::Mod => "%",
        BinOp::ShiftLeft => "<<",
        BinOp::ShiftRight => ">>",
    }
}

fn precedence(op: BinOp) -> u8 {
    match op {
        BinOp::Or => 1,
        BinOp::And => 2,
        BinOp::Eq | BinOp::Ne | BinOp::Lt | BinOp::Lte | BinOp::Gt | BinOp::Gte => 3,
        BinOp::ShiftLeft | BinOp::ShiftRight => 4,
        BinOp::Add | BinOp::Sub => 5,
        BinOp::Mul | BinOp::Div | BinOp::Mod => 6,
    }
}
