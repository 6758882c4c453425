use enum_as_inner::EnumAsInner;
use serde::{Deserialize, Serialize};

use crate::lexer::lr::Literal;
use crate::parser::pr::ops::{BinOp, UnOp};
use crate::parser::pr::{Ident, Ty};
use crate::span::Span;

/// Expr is anything that has a value and thus a type.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Expr {
    #[serde(flatten)]
    pub kind: ExprKind,

    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub span: Option<Span>,

    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub ty: Option<Ty>,
}

impl Expr {
    pub fn new<K: Into<ExprKind>>(kind: K) -> Self {
        Expr {
            kind: kind.into(),
            span: None,
            ty: None,
        }
    }
}

#[derive(Debug, EnumAsInner, PartialEq, Clone, Serialize, Deserialize, strum::AsRefStr)]
pub enum ExprKind {
    Ident(Ident),
    Literal(Literal),

    /// placeholder for values provided when the query is executed
    Param(String),

    /// A `/pattern/flags` literal.
    Regex(RegexLit),

    Binary(BinaryExpr),
    Unary(UnaryExpr),

    In(InExpr),

    /// Never present after semantic analysis: each occurrence forces its
    /// range required and is erased.
    Exists(Ident),

    MethodCall(MethodCall),
}

impl ExprKind {
    pub fn into_expr(self, span: Span) -> Expr {
        Expr {
            span: Some(span),
            kind: self,
            ty: None,
        }
    }
}

/// Expression with two operands and an operator, such as `1 + 2`.
#[derive(Debug, PartialEq, Clone, Serialize, Deserialize)]
pub struct BinaryExpr {
    pub left: Box<Expr>,
    pub op: BinOp,
    pub right: Box<Expr>,
}

/// Expression with one operand and an operator, such as `-1`.
#[derive(Debug, PartialEq, Clone, Serialize, Deserialize)]
pub struct UnaryExpr {
    pub op: UnOp,
    pub expr: Box<Expr>,
}

/// `identifier in (entries)`. Entries are literals or a single named
/// parameter that is expanded when values are bound.
#[derive(Debug, PartialEq, Clone, Serialize, Deserialize)]
pub struct InExpr {
    pub ident: Ident,
    pub list: Vec<Expr>,
}

/// A call such as `u.displayName()`. Method calls cannot be expressed in the
/// emitted SQL; a sort containing one switches the query to
/// application-side sorting.
#[derive(Debug, PartialEq, Clone, Serialize, Deserialize)]
pub struct MethodCall {
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub receiver: Option<Ident>,
    pub name: String,
    pub args: Vec<Expr>,
}

#[derive(Debug, PartialEq, Eq, Clone, Serialize, Deserialize)]
pub struct RegexLit {
    pub pattern: String,
    pub flags: String,
}

impl From<Literal> for ExprKind {
    fn from(value: Literal) -> Self {
        ExprKind::Literal(value)
    }
}

impl From<Ident> for ExprKind {
    fn from(value: Ident) -> Self {
        ExprKind::Ident(value)
    }
}
