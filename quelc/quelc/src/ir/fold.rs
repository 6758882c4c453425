/// A trait to "fold" the query AST (similar to a visitor), so we can
/// transitively apply some logic to a whole tree by just defining how we
/// want to handle each type.
use itertools::Itertools;

use crate::generic::ColumnSort;
use crate::pr::{
    Alias, BinaryExpr, Expr, ExprKind, Ident, InExpr, MethodCall, Range, RangeKind, Retrieve,
    UnaryExpr,
};
use crate::Result;

// For some functions, we want to call a default impl, because copying &
// pasting everything apart from a specific match is lots of repetition. So
// we define a function outside the trait, by default call it, and let
// implementors override the default while calling the function directly for
// some cases. Ref https://stackoverflow.com/a/66077767/3064736
pub trait QuelFold {
    fn fold_retrieve(&mut self, retrieve: Retrieve) -> Result<Retrieve> {
        fold_retrieve(self, retrieve)
    }
    fn fold_range(&mut self, range: Range) -> Result<Range> {
        fold_range(self, range)
    }
    fn fold_alias(&mut self, alias: Alias) -> Result<Alias> {
        fold_alias(self, alias)
    }
    fn fold_column_sorts(
        &mut self,
        sorts: Vec<ColumnSort<Expr>>,
    ) -> Result<Vec<ColumnSort<Expr>>> {
        sorts
            .into_iter()
            .map(|s| s.try_map(|column| self.fold_expr(column)))
            .try_collect()
    }
    fn fold_exprs(&mut self, exprs: Vec<Expr>) -> Result<Vec<Expr>> {
        exprs.into_iter().map(|e| self.fold_expr(e)).try_collect()
    }
    fn fold_expr(&mut self, mut expr: Expr) -> Result<Expr> {
        expr.kind = self.fold_expr_kind(expr.kind)?;
        Ok(expr)
    }
    fn fold_expr_kind(&mut self, kind: ExprKind) -> Result<ExprKind> {
        fold_expr_kind(self, kind)
    }
    fn fold_ident(&mut self, ident: Ident) -> Result<Ident> {
        Ok(ident)
    }
}

pub fn fold_retrieve<F: ?Sized + QuelFold>(fold: &mut F, retrieve: Retrieve) -> Result<Retrieve> {
    Ok(Retrieve {
        directives: retrieve.directives,
        ranges: retrieve
            .ranges
            .into_iter()
            .map(|r| fold.fold_range(r))
            .try_collect()?,
        macros: retrieve
            .macros
            .into_iter()
            .map(|(name, expr)| -> Result<_> { Ok((name, fold.fold_expr(expr)?)) })
            .try_collect()?,
        values: retrieve
            .values
            .into_iter()
            .map(|a| fold.fold_alias(a))
            .try_collect()?,
        conditions: retrieve
            .conditions
            .map(|c| fold.fold_expr(c))
            .transpose()?,
        sorts: fold.fold_column_sorts(retrieve.sorts)?,
        window: retrieve.window,
        window_size: retrieve.window_size,
        unique: retrieve.unique,
        sort_in_application_logic: retrieve.sort_in_application_logic,
    })
}

pub fn fold_range<F: ?Sized + QuelFold>(fold: &mut F, range: Range) -> Result<Range> {
    Ok(Range {
        name: range.name,
        kind: match range.kind {
            RangeKind::Database {
                entity,
                join_condition,
            } => RangeKind::Database {
                entity,
                join_condition: join_condition
                    .map(|c| fold.fold_expr(*c))
                    .transpose()?
                    .map(Box::new),
            },
            RangeKind::Json { sources } => RangeKind::Json {
                sources: fold.fold_exprs(sources)?,
            },
        },
        required: range.required,
        span: range.span,
    })
}

pub fn fold_alias<F: ?Sized + QuelFold>(fold: &mut F, alias: Alias) -> Result<Alias> {
    Ok(Alias {
        name: alias.name,
        expr: fold.fold_expr(alias.expr)?,
        alias_pattern: alias.alias_pattern,
        visible_in_result: alias.visible_in_result,
        explicit_name: alias.explicit_name,
    })
}

pub fn fold_expr_kind<F: ?Sized + QuelFold>(fold: &mut F, kind: ExprKind) -> Result<ExprKind> {
    Ok(match kind {
        ExprKind::Ident(ident) => ExprKind::Ident(fold.fold_ident(ident)?),
        ExprKind::Literal(lit) => ExprKind::Literal(lit),
        ExprKind::Param(name) => ExprKind::Param(name),
        ExprKind::Regex(regex) => ExprKind::Regex(regex),
        ExprKind::Binary(BinaryExpr { left, op, right }) => ExprKind::Binary(BinaryExpr {
            left: Box::new(fold.fold_expr(*left)?),
            op,
            right: Box::new(fold.fold_expr(*right)?),
        }),
        ExprKind::Unary(UnaryExpr { op, expr }) => ExprKind::Unary(UnaryExpr {
            op,
            expr: Box::new(fold.fold_expr(*expr)?),
        }),
        ExprKind::In(InExpr { ident, list }) => ExprKind::In(InExpr {
            ident: fold.fold_ident(ident)?,
            list: fold.fold_exprs(list)?,
        }),
        ExprKind::Exists(ident) => ExprKind::Exists(fold.fold_ident(ident)?),
        ExprKind::MethodCall(MethodCall {
            receiver,
            name,
            args,
        }) => ExprKind::MethodCall(MethodCall {
            receiver: receiver.map(|r| fold.fold_ident(r)).transpose()?,
            name,
            args: fold.fold_exprs(args)?,
        }),
    })
}
