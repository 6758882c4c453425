//! Productions for the top-level query: directives, ranges and the
//! `retrieve` clause itself.

use std::collections::HashMap;

use super::{pr, Parser};
use crate::error::{Error, Reason, WithErrorInfo};
use crate::generic::{ColumnSort, SortDirection};
use crate::lexer::lr::{Literal, TokenKind};
use crate::Result;

impl Parser {
    /// program := directive* range* retrieve EOF
    pub(crate) fn parse_program(&mut self) -> Result<pr::Retrieve> {
        let directives = self.parse_directives()?;

        let mut ranges = Vec::new();
        while self.at_keyword("range") {
            self.check_cancelled()?;
            ranges.push(self.parse_range()?);
        }

        let mut retrieve = self.parse_retrieve()?;
        retrieve.directives = directives;
        retrieve.ranges = ranges;

        match self.peek_kind() {
            TokenKind::Eof => {
                log::debug!(
                    "parsed retrieve query with {} ranges and {} values",
                    retrieve.ranges.len(),
                    retrieve.values.len()
                );
                Ok(retrieve)
            }
            TokenKind::Keyword(k) if k == "retrieve" || k == "range" => {
                Err(Error::new(Reason::MultipleQueries)
                    .with_span(Some(self.lexer.current_span()))
                    .with_source(crate::error::ErrorSource::Parser))
            }
            TokenKind::Directive(_) => Err(Error::new(Reason::MultipleQueries)
                .with_span(Some(self.lexer.current_span()))
                .with_source(crate::error::ErrorSource::Parser)),
            _ => Err(self.unexpected()),
        }
    }

    /// directive := '@' IDENT '='? (TRUE | FALSE | NUMBER | IDENT)
    fn parse_directives(&mut self) -> Result<HashMap<String, pr::DirectiveValue>> {
        let mut directives = HashMap::new();
        loop {
            let TokenKind::Directive(name) = self.peek_kind() else {
                break;
            };
            let name = name.clone();
            self.check_cancelled()?;
            self.lexer.advance()?;

            // both `@name value` and `@name = value` are accepted
            self.accept_ctrl('=')?;
            let value = self.parse_directive_value()?;
            directives.insert(name, value);
        }
        Ok(directives)
    }

    fn parse_directive_value(&mut self) -> Result<pr::DirectiveValue> {
        let value = match self.peek_kind() {
            TokenKind::Literal(Literal::Boolean(b)) => pr::DirectiveValue::Boolean(*b),
            TokenKind::Literal(Literal::Integer(i)) => pr::DirectiveValue::Integer(*i),
            TokenKind::Literal(Literal::Float(v)) => pr::DirectiveValue::Float(*v),
            TokenKind::Ident(flag) => pr::DirectiveValue::Flag(flag.clone()),
            _ => return Err(self.expected("a directive value")),
        };
        self.lexer.advance()?;
        Ok(value)
    }

    /// range := 'range' 'of' IDENT 'is' rangeSource ('via' expr)?
    fn parse_range(&mut self) -> Result<pr::Range> {
        let span = self.lexer.current_span();
        self.expect_keyword("range")?;
        self.expect_keyword("of")?;
        let (name, _) = self.expect_ident()?;
        self.expect_keyword("is")?;

        let kind = if self.at_keyword("json_source") {
            self.lexer.advance()?;
            self.expect_ctrl('(')?;
            let mut sources = vec![self.parse_expr()?];
            while self.accept_ctrl(',')? {
                sources.push(self.parse_expr()?);
            }
            self.expect_ctrl(')')?;
            pr::RangeKind::Json { sources }
        } else {
            let (entity, _) = self.expect_ident()?;
            let join_condition = if self.accept_keyword("via")? {
                Some(Box::new(self.parse_expr()?))
            } else {
                None
            };
            pr::RangeKind::Database {
                entity,
                join_condition,
            }
        };

        Ok(pr::Range {
            name,
            kind,
            required: false,
            span: Some(span),
        })
    }

    /// retrieve := 'retrieve' 'unique'? '(' valueList ')'
    ///             ('where' expr)? ('sort' 'by' sortList)?
    ///             ('window' NUMBER 'using' 'window_size' NUMBER)?
    fn parse_retrieve(&mut self) -> Result<pr::Retrieve> {
        self.check_cancelled()?;
        self.expect_keyword("retrieve")?;
        let unique = self.accept_keyword("unique")?;

        self.expect_ctrl('(')?;
        let mut values = Vec::new();
        let mut macros = HashMap::new();
        if !matches!(self.peek_kind(), TokenKind::Control(')')) {
            loop {
                let alias = self.parse_alias(values.len())?;
                if alias.explicit_name {
                    macros.insert(alias.name.clone(), alias.expr.clone());
                }
                values.push(alias);
                if !self.accept_ctrl(',')? {
                    break;
                }
            }
        }
        self.expect_ctrl(')')?;

        let conditions = if self.accept_keyword("where")? {
            self.check_cancelled()?;
            Some(self.parse_expr()?)
        } else {
            None
        };

        let mut sorts = Vec::new();
        if self.accept_keyword("sort")? {
            self.expect_keyword("by")?;
            loop {
                let column = self.parse_expr()?;
                let direction = if self.accept_keyword("desc")? {
                    SortDirection::Desc
                } else {
                    self.accept_keyword("asc")?;
                    SortDirection::Asc
                };
                sorts.push(ColumnSort { direction, column });
                if !self.accept_ctrl(',')? {
                    break;
                }
            }
        }

        let (window, window_size) = if self.accept_keyword("window")? {
            let window = self.expect_window_number()?;
            self.expect_keyword("using")?;
            self.expect_keyword("window_size")?;
            let window_size = self.expect_window_number()?;
            (Some(window), Some(window_size))
        } else {
            (None, None)
        };

        Ok(pr::Retrieve {
            directives: HashMap::new(),
            ranges: Vec::new(),
            macros,
            values,
            conditions,
            sorts,
            window,
            window_size,
            unique,
            sort_in_application_logic: false,
        })
    }

    /// alias := (IDENT '=')? expr
    fn parse_alias(&mut self, index: usize) -> Result<pr::Alias> {
        if matches!(self.peek_kind(), TokenKind::Ident(_)) {
            let state = self.lexer.save();
            let (name, _) = self.expect_ident()?;
            // `==` lexes as a single token, so a lone `=` here really is an
            // alias binding
            if self.accept_ctrl('=')? {
                let expr = self.parse_expr()?;
                return Ok(pr::Alias {
                    name,
                    expr,
                    alias_pattern: None,
                    visible_in_result: true,
                    explicit_name: true,
                });
            }
            self.lexer.restore(state);
        }

        let expr = self.parse_expr()?;
        let name = match &expr.kind {
            pr::ExprKind::Ident(ident) => ident.to_string(),
            _ => format!("value_{index}"),
        };
        Ok(pr::Alias {
            name,
            expr,
            alias_pattern: None,
            visible_in_result: true,
            explicit_name: false,
        })
    }

    fn expect_window_number(&mut self) -> Result<u64> {
        let span = self.lexer.current_span();
        let found = self.peek_kind().to_string();
        if let TokenKind::Literal(Literal::Integer(i)) = self.peek_kind() {
            if *i >= 0 {
                let value = *i as u64;
                self.lexer.advance()?;
                return Ok(value);
            }
        }
        Err(Error::new(Reason::Expected {
            who: None,
            expected: "a non-negative integer".to_string(),
            found,
        })
        .with_span(Some(span))
        .with_source(crate::error::ErrorSource::Parser))
    }
}
