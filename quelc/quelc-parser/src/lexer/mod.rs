pub mod lr;
#[cfg(test)]
mod test;

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::error::{Error, ErrorSource, Reason, WithErrorInfo};
use crate::span::Span;
use crate::Result;
use lr::{Literal, StringLit, Token, TokenKind, Tokens, KEYWORDS};

/// Characters that form single-character control tokens.
const CONTROL_CHARS: &str = ".,()=><+-*/%#&^!?:;\\";

/// Cooperative cancellation handle, checked between tokens and between
/// top-level productions. Cloning shares the underlying flag.
#[derive(Debug, Clone, Default)]
pub struct CancellationToken(Arc<AtomicBool>);

impl CancellationToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }
}

/// A saved lexer cursor; restoring one rewinds the token window for
/// backtracking in the parser.
#[derive(Debug, Clone)]
pub struct LexerState {
    pos: usize,
    prev_pos: usize,
    prev_prev_pos: usize,
    line: u32,
    current: Token,
    lookahead: Token,
}

/// Turns source text into a stream of tokens with one-token lookahead.
///
/// Positions are char offsets. The lexer keeps the start offsets of the
/// current and lookahead tokens (a two-step look-back) so that
/// [Lexer::fetch_regex] can rewind and re-read a `/pattern/flags` literal
/// that was initially tokenized as punctuation.
#[derive(Debug)]
pub struct Lexer {
    chars: Vec<char>,
    pos: usize,
    /// Start of the lookahead token.
    prev_pos: usize,
    /// Start of the current token.
    prev_prev_pos: usize,
    line: u32,
    current: Token,
    lookahead: Token,
    cancel: Option<CancellationToken>,
}

impl Lexer {
    pub fn new(source: &str) -> Result<Self> {
        Self::build(source, None)
    }

    pub fn with_cancellation(source: &str, token: CancellationToken) -> Result<Self> {
        Self::build(source, Some(token))
    }

    fn build(source: &str, cancel: Option<CancellationToken>) -> Result<Self> {
        let eof = Token {
            kind: TokenKind::Eof,
            span: 0..0,
            line: 1,
        };
        let mut lexer = Lexer {
            chars: source.chars().collect(),
            pos: 0,
            prev_pos: 0,
            prev_prev_pos: 0,
            line: 1,
            current: eof.clone(),
            lookahead: eof,
            cancel,
        };
        lexer.current = lexer.scan_token()?;
        lexer.lookahead = lexer.scan_token()?;
        Ok(lexer)
    }

    /// The next token, without consuming it.
    pub fn peek(&self) -> &Token {
        &self.current
    }

    /// The token after the next one, without consuming anything.
    pub fn peek_next(&self) -> &Token {
        &self.lookahead
    }

    pub fn save(&self) -> LexerState {
        LexerState {
            pos: self.pos,
            prev_pos: self.prev_pos,
            prev_prev_pos: self.prev_prev_pos,
            line: self.line,
            current: self.current.clone(),
            lookahead: self.lookahead.clone(),
        }
    }

    pub fn restore(&mut self, state: LexerState) {
        self.pos = state.pos;
        self.prev_pos = state.prev_pos;
        self.prev_prev_pos = state.prev_prev_pos;
        self.line = state.line;
        self.current = state.current;
        self.lookahead = state.lookahead;
    }

    /// Consume and return the current token.
    pub fn advance(&mut self) -> Result<Token> {
        let next = self.scan_token()?;
        let promoted = std::mem::replace(&mut self.lookahead, next);
        Ok(std::mem::replace(&mut self.current, promoted))
    }

    /// Consume the current token, failing unless it matches `kind`.
    pub fn expect(&mut self, kind: &TokenKind) -> Result<Token> {
        if kind.matches(&self.current.kind) {
            self.advance()
        } else {
            Err(Error::new(Reason::Expected {
                who: None,
                expected: kind.to_string(),
                found: self.current.kind.to_string(),
            })
            .with_span(Some(Span::from(self.current.span.clone())))
            .with_source(ErrorSource::Parser))
        }
    }

    /// Consume and return the current token if it matches `kind`.
    pub fn accept(&mut self, kind: &TokenKind) -> Result<Option<Token>> {
        if kind.matches(&self.current.kind) {
            self.advance().map(Some)
        } else {
            Ok(None)
        }
    }

    /// Span of the current token, for error reporting.
    pub fn current_span(&self) -> Span {
        Span::from(self.current.span.clone())
    }

    /// Re-read the current token position as a `/pattern/flags` literal.
    ///
    /// The ordinary tokenizer has already consumed the opening `/` as a
    /// control token, so this rewinds the input to the start of the current
    /// token, switches modes, and re-primes the lookahead window from after
    /// the literal.
    pub fn fetch_regex(&mut self) -> Result<Token> {
        self.pos = self.prev_prev_pos;
        self.line = self.current.line;
        let start = self.pos;
        let line = self.line;

        match self.peek_char() {
            Some('/') => self.bump(),
            _ => {
                return Err(Error::new(Reason::Bug {
                    details: Some("fetch_regex called outside a regex position".to_string()),
                })
                .with_span(Some(Span {
                    start,
                    end: self.pos,
                })))
            }
        }

        let mut pattern = String::new();
        loop {
            match self.peek_char() {
                None => return Err(self.err_at(Reason::UnexpectedEof, start)),
                Some('\n') => {
                    return Err(self.err_at(
                        Reason::Unterminated {
                            what: "regular expression",
                        },
                        start,
                    ))
                }
                Some('\\') => {
                    pattern.push('\\');
                    self.bump();
                    match self.peek_char() {
                        Some(c) => {
                            pattern.push(c);
                            self.bump();
                        }
                        None => return Err(self.err_at(Reason::UnexpectedEof, start)),
                    }
                }
                Some('/') => {
                    self.bump();
                    break;
                }
                Some(c) => {
                    pattern.push(c);
                    self.bump();
                }
            }
        }

        let mut flags = String::new();
        while let Some(c) = self.peek_char() {
            if c.is_ascii_alphabetic() {
                flags.push(c);
                self.bump();
            } else {
                break;
            }
        }

        let token = Token {
            kind: TokenKind::Regex { pattern, flags },
            span: start..self.pos,
            line,
        };

        self.current = self.scan_token()?;
        self.lookahead = self.scan_token()?;
        Ok(token)
    }

    fn scan_token(&mut self) -> Result<Token> {
        if let Some(cancel) = &self.cancel {
            if cancel.is_cancelled() {
                return Err(Error::new(Reason::Cancelled).with_source(ErrorSource::Lexer));
            }
        }

        self.skip_whitespace();
        let start = self.pos;
        self.prev_prev_pos = self.prev_pos;
        self.prev_pos = start;
        let line = self.line;

        let Some(c) = self.peek_char() else {
            return Ok(Token {
                kind: TokenKind::Eof,
                span: start..start,
                line,
            });
        };

        let kind = match c {
            '0'..='9' => self.scan_number(start)?,
            '-' if matches!(self.peek_char_at(1), Some('0'..='9')) => {
                self.bump();
                self.scan_number(start)?
            }
            '"' | '\'' => self.scan_string(c, start)?,
            '@' => {
                self.bump();
                let name = self.scan_word_chars();
                if name.is_empty() {
                    TokenKind::Unknown('@')
                } else {
                    TokenKind::Directive(name)
                }
            }
            ':' if matches!(self.peek_char_at(1), Some(n) if n.is_ascii_alphanumeric() || n == '_') =>
            {
                self.bump();
                TokenKind::Param(self.scan_word_chars())
            }
            c if c.is_ascii_alphabetic() || c == '_' => self.scan_word(),
            _ => self.scan_operator(),
        };

        Ok(Token {
            kind,
            span: start..self.pos,
            line,
        })
    }

    fn scan_number(&mut self, start: usize) -> Result<TokenKind> {
        while matches!(self.peek_char(), Some('0'..='9')) {
            self.bump();
        }

        let mut is_float = false;
        if self.peek_char() == Some('.') && matches!(self.peek_char_at(1), Some('0'..='9')) {
            is_float = true;
            self.bump();
            while matches!(self.peek_char(), Some('0'..='9')) {
                self.bump();
            }
            // a second decimal point is malformed
            if self.peek_char() == Some('.') && matches!(self.peek_char_at(1), Some('0'..='9')) {
                self.bump();
                while matches!(self.peek_char(), Some('0'..='9')) {
                    self.bump();
                }
                let found: String = self.chars[start..self.pos].iter().collect();
                return Err(self.err_at(Reason::MalformedNumber { found }, start));
            }
        }

        let text: String = self.chars[start..self.pos].iter().collect();
        if is_float {
            match text.parse::<f64>() {
                Ok(v) => Ok(TokenKind::Literal(Literal::Float(v))),
                Err(_) => Err(self.err_at(Reason::MalformedNumber { found: text }, start)),
            }
        } else {
            match text.parse::<i64>() {
                Ok(v) => Ok(TokenKind::Literal(Literal::Integer(v))),
                Err(_) => Err(self.err_at(Reason::MalformedNumber { found: text }, start)),
            }
        }
    }

    fn scan_string(&mut self, quote: char, start: usize) -> Result<TokenKind> {
        self.bump();
        let mut value = String::new();
        loop {
            match self.peek_char() {
                None => return Err(self.err_at(Reason::UnexpectedEof, start)),
                Some('\n') => {
                    return Err(self.err_at(Reason::Unterminated { what: "string" }, start))
                }
                Some('\\') => {
                    self.bump();
                    let Some(escaped) = self.peek_char() else {
                        return Err(self.err_at(Reason::UnexpectedEof, start));
                    };
                    self.bump();
                    if quote == '"' {
                        match escaped {
                            'a' => value.push('\x07'),
                            'b' => value.push('\x08'),
                            'f' => value.push('\x0C'),
                            'n' => value.push('\n'),
                            'r' => value.push('\r'),
                            't' => value.push('\t'),
                            'v' => value.push('\x0B'),
                            '"' => value.push('"'),
                            '\'' => value.push('\''),
                            '\\' => value.push('\\'),
                            other => {
                                return Err(
                                    self.err_at(Reason::InvalidEscape { found: other }, start)
                                )
                            }
                        }
                    } else {
                        // single-quoted strings only unescape \\ and \';
                        // everything else passes through verbatim
                        match escaped {
                            '\\' => value.push('\\'),
                            '\'' => value.push('\''),
                            other => {
                                value.push('\\');
                                value.push(other);
                            }
                        }
                    }
                }
                Some(c) if c == quote => {
                    self.bump();
                    break;
                }
                Some(c) => {
                    value.push(c);
                    self.bump();
                }
            }
        }
        Ok(TokenKind::Literal(Literal::String(StringLit {
            value,
            quote,
        })))
    }

    fn scan_word(&mut self) -> TokenKind {
        let word = self.scan_word_chars();
        let lower = word.to_ascii_lowercase();
        match lower.as_str() {
            "true" => TokenKind::Literal(Literal::Boolean(true)),
            "false" => TokenKind::Literal(Literal::Boolean(false)),
            "null" => TokenKind::Literal(Literal::Null),
            _ if KEYWORDS.contains(&lower.as_str()) => TokenKind::Keyword(lower),
            _ => TokenKind::Ident(word),
        }
    }

    fn scan_word_chars(&mut self) -> String {
        let start = self.pos;
        while matches!(self.peek_char(), Some(c) if c.is_ascii_alphanumeric() || c == '_') {
            self.bump();
        }
        self.chars[start..self.pos].iter().collect()
    }

    fn scan_operator(&mut self) -> TokenKind {
        let c = self.chars[self.pos];
        let two = (c, self.peek_char_at(1));
        let kind = match two {
            ('=', Some('=')) => Some(TokenKind::Eq),
            ('!', Some('=')) => Some(TokenKind::Ne),
            ('<', Some('>')) => Some(TokenKind::Ne),
            ('>', Some('=')) => Some(TokenKind::Gte),
            ('<', Some('=')) => Some(TokenKind::Lte),
            ('<', Some('<')) => Some(TokenKind::ShiftLeft),
            ('>', Some('>')) => Some(TokenKind::ShiftRight),
            ('-', Some('>')) => Some(TokenKind::ArrowThin),
            _ => None,
        };
        if let Some(kind) = kind {
            self.bump();
            self.bump();
            return kind;
        }

        self.bump();
        if CONTROL_CHARS.contains(c) {
            TokenKind::Control(c)
        } else {
            TokenKind::Unknown(c)
        }
    }

    fn skip_whitespace(&mut self) {
        while let Some(c) = self.peek_char() {
            match c {
                ' ' | '\t' | '\r' => self.bump(),
                '\n' => {
                    self.bump();
                    self.line += 1;
                }
                _ => break,
            }
        }
    }

    fn peek_char(&self) -> Option<char> {
        self.chars.get(self.pos).copied()
    }

    fn peek_char_at(&self, offset: usize) -> Option<char> {
        self.chars.get(self.pos + offset).copied()
    }

    fn bump(&mut self) {
        self.pos += 1;
    }

    fn err_at(&self, reason: Reason, start: usize) -> Error {
        Error::new(reason)
            .with_span(Some(Span {
                start,
                end: self.pos,
            }))
            .with_source(ErrorSource::Lexer)
    }
}

/// Tokenize a whole source string, for debugging and tests.
pub fn lex_source(source: &str) -> Result<Tokens> {
    let mut lexer = Lexer::new(source)?;
    let mut tokens = Vec::new();
    while !matches!(lexer.peek().kind, TokenKind::Eof) {
        tokens.push(lexer.advance()?);
    }
    Ok(Tokens(tokens))
}
