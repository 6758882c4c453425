//! Expression productions, from `or` down to primaries.

use super::{pr, Parser};
use crate::error::{Error, ErrorSource, Reason, WithErrorInfo};
use crate::lexer::lr::TokenKind;
use crate::parser::pr::{BinOp, ExprKind, UnOp};
use crate::span::Span;
use crate::Result;

fn binary(left: pr::Expr, op: BinOp, right: pr::Expr) -> pr::Expr {
    let span = Span::merge_opt(left.span, right.span);
    pr::Expr {
        kind: ExprKind::Binary(pr::BinaryExpr {
            left: Box::new(left),
            op,
            right: Box::new(right),
        }),
        span,
        ty: None,
    }
}

impl Parser {
    pub(crate) fn parse_expr(&mut self) -> Result<pr::Expr> {
        self.parse_or()
    }

    fn parse_or(&mut self) -> Result<pr::Expr> {
        let mut left = self.parse_and()?;
        while self.accept_keyword("or")? {
            let right = self.parse_and()?;
            left = binary(left, BinOp::Or, right);
        }
        Ok(left)
    }

    fn parse_and(&mut self) -> Result<pr::Expr> {
        let mut left = self.parse_not()?;
        while self.accept_keyword("and")? {
            let right = self.parse_not()?;
            left = binary(left, BinOp::And, right);
        }
        Ok(left)
    }

    fn parse_not(&mut self) -> Result<pr::Expr> {
        let span = self.lexer.current_span();
        if self.accept_keyword("not")? {
            let expr = self.parse_not()?;
            let span = Span::merge_opt(Some(span), expr.span);
            return Ok(pr::Expr {
                kind: ExprKind::Unary(pr::UnaryExpr {
                    op: UnOp::Not,
                    expr: Box::new(expr),
                }),
                span,
                ty: None,
            });
        }
        self.parse_cmp()
    }

    /// A single (non-associative) comparison, `is [not] null`, or an `in`
    /// membership test.
    fn parse_cmp(&mut self) -> Result<pr::Expr> {
        let left = self.parse_shift()?;

        let op = match self.peek_kind() {
            TokenKind::Control('=') | TokenKind::Eq => Some(BinOp::Eq),
            TokenKind::Ne => Some(BinOp::Ne),
            TokenKind::Control('<') => Some(BinOp::Lt),
            TokenKind::Lte => Some(BinOp::Lte),
            TokenKind::Control('>') => Some(BinOp::Gt),
            TokenKind::Gte => Some(BinOp::Gte),
            _ => None,
        };
        if let Some(op) = op {
            self.lexer.advance()?;
            let right = self.parse_shift()?;
            return Ok(binary(left, op, right));
        }

        if self.at_keyword("is") {
            self.lexer.advance()?;
            let negated = self.accept_keyword("not")?;
            let span = self.lexer.current_span();
            if !matches!(
                self.peek_kind(),
                TokenKind::Literal(crate::lexer::lr::Literal::Null)
            ) {
                return Err(self.expected("null"));
            }
            self.lexer.advance()?;
            let op = if negated { BinOp::Ne } else { BinOp::Eq };
            let null = ExprKind::Literal(crate::lexer::lr::Literal::Null).into_expr(span);
            return Ok(binary(left, op, null));
        }

        if self.at_keyword("in") {
            self.lexer.advance()?;
            let span = left.span;
            let ident = match left.kind {
                ExprKind::Ident(ident) => ident,
                other => {
                    return Err(Error::new(Reason::Expected {
                        who: None,
                        expected: "an identifier before `in`".to_string(),
                        found: other.as_ref().to_string(),
                    })
                    .with_span(span)
                    .with_source(ErrorSource::Parser))
                }
            };
            self.expect_ctrl('(')?;
            let mut list = vec![self.parse_in_entry()?];
            while self.accept_ctrl(',')? {
                list.push(self.parse_in_entry()?);
            }
            let close = self.expect_ctrl(')')?;
            return Ok(pr::Expr {
                kind: ExprKind::In(pr::InExpr { ident, list }),
                span: Span::merge_opt(span, Some(close)),
                ty: None,
            });
        }

        Ok(left)
    }

    /// `in (...)` accepts literals and named parameters only.
    fn parse_in_entry(&mut self) -> Result<pr::Expr> {
        let span = self.lexer.current_span();
        match self.peek_kind().clone() {
            TokenKind::Literal(lit) => {
                self.lexer.advance()?;
                Ok(ExprKind::Literal(lit).into_expr(span))
            }
            TokenKind::Param(name) => {
                self.lexer.advance()?;
                Ok(ExprKind::Param(name).into_expr(span))
            }
            _ => Err(self.expected("a literal or a parameter")),
        }
    }

    fn parse_shift(&mut self) -> Result<pr::Expr> {
        let mut left = self.parse_add()?;
        loop {
            let op = match self.peek_kind() {
                TokenKind::ShiftLeft => BinOp::ShiftLeft,
                TokenKind::ShiftRight => BinOp::ShiftRight,
                _ => break,
            };
            self.lexer.advance()?;
            let right = self.parse_add()?;
            left = binary(left, op, right);
        }
        Ok(left)
    }

    fn parse_add(&mut self) -> Result<pr::Expr> {
        let mut left = self.parse_mul()?;
        loop {
            let op = match self.peek_kind() {
                TokenKind::Control('+') => BinOp::Add,
                TokenKind::Control('-') => BinOp::Sub,
                _ => break,
            };
            self.lexer.advance()?;
            let right = self.parse_mul()?;
            left = binary(left, op, right);
        }
        Ok(left)
    }

    fn parse_mul(&mut self) -> Result<pr::Expr> {
        let mut left = self.parse_unary()?;
        loop {
            let op = match self.peek_kind() {
                TokenKind::Control('*') => BinOp::Mul,
                TokenKind::Control('/') => BinOp::Div,
                TokenKind::Control('%') => BinOp::Mod,
                _ => break,
            };
            self.lexer.advance()?;
            let right = self.parse_unary()?;
            left = binary(left, op, right);
        }
        Ok(left)
    }

    fn parse_unary(&mut self) -> Result<pr::Expr> {
        if matches!(self.peek_kind(), TokenKind::Control('-')) {
            let span = self.lexer.current_span();
            self.lexer.advance()?;
            let expr = self.parse_unary()?;
            let span = Span::merge_opt(Some(span), expr.span);
            return Ok(pr::Expr {
                kind: ExprKind::Unary(pr::UnaryExpr {
                    op: UnOp::Neg,
                    expr: Box::new(expr),
                }),
                span,
                ty: None,
            });
        }
        self.parse_primary()
    }

    fn parse_primary(&mut self) -> Result<pr::Expr> {
        let span = self.lexer.current_span();
        match self.peek_kind().clone() {
            TokenKind::Literal(lit) => {
                self.lexer.advance()?;
                Ok(ExprKind::Literal(lit).into_expr(span))
            }
            TokenKind::Param(name) => {
                self.lexer.advance()?;
                Ok(ExprKind::Param(name).into_expr(span))
            }
            TokenKind::Control('(') => {
                self.lexer.advance()?;
                let expr = self.parse_expr()?;
                self.expect_ctrl(')')?;
                Ok(expr)
            }
            // a `/` in value position starts a regex literal
            TokenKind::Control('/') => {
                let token = self.lexer.fetch_regex()?;
                let span = Span::from(token.span.clone());
                match token.kind {
                    TokenKind::Regex { pattern, flags } => {
                        Ok(ExprKind::Regex(pr::RegexLit { pattern, flags }).into_expr(span))
                    }
                    _ => Err(Error::new_assert("fetch_regex returned a non-regex token")
                        .with_span(Some(span))),
                }
            }
            TokenKind::Ident(_) => self.parse_identifier_or_call(),
            _ => Err(self.unexpected()),
        }
    }

    /// identifier := IDENT ('.' IDENT)*, optionally followed by an argument
    /// list, which makes it a method call (or the `exists` construct).
    fn parse_identifier_or_call(&mut self) -> Result<pr::Expr> {
        let (first, start_span) = self.expect_ident()?;
        let mut parts = vec![first];
        let mut span = start_span;

        while self.accept_ctrl('.')? {
            let token = self.lexer.advance()?;
            span = Span::merge(span, Span::from(token.span.clone()));
            match token.kind {
                // properties may collide with keywords, e.g. `order.of`
                TokenKind::Ident(part) | TokenKind::Keyword(part) => parts.push(part),
                _ => {
                    return Err(Error::new(Reason::Expected {
                        who: None,
                        expected: "an identifier".to_string(),
                        found: token.kind.to_string(),
                    })
                    .with_span(Some(span))
                    .with_source(ErrorSource::Parser))
                }
            }
        }

        if matches!(self.peek_kind(), TokenKind::Control('(')) {
            self.lexer.advance()?;
            let mut args = Vec::new();
            if !matches!(self.peek_kind(), TokenKind::Control(')')) {
                args.push(self.parse_expr()?);
                while self.accept_ctrl(',')? {
                    args.push(self.parse_expr()?);
                }
            }
            let close = self.expect_ctrl(')')?;
            let span = Span::merge(span, close);

            let name = parts
                .pop()
                .ok_or_else(|| Error::new_assert("empty identifier chain"))?;

            // `exists(entity)` is a language construct, not a method
            if parts.is_empty() && name.eq_ignore_ascii_case("exists") && args.len() == 1 {
                return match args.remove(0).kind {
                    ExprKind::Ident(ident) => Ok(ExprKind::Exists(ident).into_expr(span)),
                    other => Err(Error::new(Reason::Expected {
                        who: Some("exists".to_string()),
                        expected: "an entity identifier".to_string(),
                        found: other.as_ref().to_string(),
                    })
                    .with_span(Some(span))
                    .with_source(ErrorSource::Parser)),
                };
            }

            let receiver = if parts.is_empty() {
                None
            } else {
                Some(pr::Ident::from_parts(parts))
            };
            return Ok(ExprKind::MethodCall(pr::MethodCall {
                receiver,
                name,
                args,
            })
            .into_expr(span));
        }

        Ok(ExprKind::Ident(pr::Ident::from_parts(parts)).into_expr(span))
    }
}
