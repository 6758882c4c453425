mod expr;
pub mod pr;
mod query;

use crate::error::{Error, ErrorSource, Reason, WithErrorInfo};
use crate::lexer::lr::TokenKind;
use crate::lexer::{CancellationToken, Lexer};
use crate::span::Span;
use crate::Result;

/// Build an ObjectQuel AST from a query string.
pub fn parse_source(source: &str) -> Result<pr::Retrieve> {
    let lexer = Lexer::new(source)?;
    Parser::new(lexer, None).parse_program()
}

/// As [parse_source], checking the cancellation token between tokens and
/// between top-level productions.
pub fn parse_source_with_cancellation(
    source: &str,
    token: CancellationToken,
) -> Result<pr::Retrieve> {
    let lexer = Lexer::with_cancellation(source, token.clone())?;
    Parser::new(lexer, Some(token)).parse_program()
}

/// Recursive-descent parser over [Lexer], producing exactly one
/// [pr::Retrieve].
pub(crate) struct Parser {
    lexer: Lexer,
    cancel: Option<CancellationToken>,
}

impl Parser {
    fn new(lexer: Lexer, cancel: Option<CancellationToken>) -> Self {
        Parser { lexer, cancel }
    }

    fn check_cancelled(&self) -> Result<()> {
        if let Some(cancel) = &self.cancel {
            if cancel.is_cancelled() {
                return Err(Error::new(Reason::Cancelled).with_source(ErrorSource::Parser));
            }
        }
        Ok(())
    }

    fn peek_kind(&self) -> &TokenKind {
        &self.lexer.peek().kind
    }

    fn at_keyword(&self, keyword: &str) -> bool {
        matches!(self.peek_kind(), TokenKind::Keyword(k) if k == keyword)
    }

    fn expect_keyword(&mut self, keyword: &str) -> Result<()> {
        self.lexer
            .expect(&TokenKind::Keyword(keyword.to_string()))?;
        Ok(())
    }

    fn accept_keyword(&mut self, keyword: &str) -> Result<bool> {
        Ok(self
            .lexer
            .accept(&TokenKind::Keyword(keyword.to_string()))?
            .is_some())
    }

    fn expect_ctrl(&mut self, c: char) -> Result<Span> {
        let token = self.lexer.expect(&TokenKind::Control(c))?;
        Ok(Span::from(token.span))
    }

    fn accept_ctrl(&mut self, c: char) -> Result<bool> {
        Ok(self.lexer.accept(&TokenKind::Control(c))?.is_some())
    }

    fn expect_ident(&mut self) -> Result<(String, Span)> {
        let token = self.lexer.expect(&TokenKind::Ident(String::new()))?;
        let span = Span::from(token.span);
        match token.kind {
            TokenKind::Ident(name) => Ok((name, span)),
            _ => Err(Error::new_assert("expect returned a mismatched token").with_span(Some(span))),
        }
    }

    fn unexpected(&self) -> Error {
        Error::new(Reason::Unexpected {
            found: self.peek_kind().to_string(),
        })
        .with_span(Some(self.lexer.current_span()))
        .with_source(ErrorSource::Parser)
    }

    fn expected(&self, expected: &str) -> Error {
        Error::new(Reason::Expected {
            who: None,
            expected: expected.to_string(),
            found: self.peek_kind().to_string(),
        })
        .with_span(Some(self.lexer.current_span()))
        .with_source(ErrorSource::Parser)
    }
}
