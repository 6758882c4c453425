use std::fmt::Debug;

use serde::Serialize;

use crate::span::Span;

/// A quelc error. Used internally, exposed as quelc::ErrorMessage.
#[derive(Debug, Clone)]
pub struct Error {
    /// Message kind. Currently only Error is implemented.
    pub kind: MessageKind,
    pub span: Option<Span>,
    pub reason: Reason,
    pub hints: Vec<String>,
    /// Machine readable identifier error code eg, "E0001"
    pub code: Option<&'static str>,
    /// The compilation stage the error originated from.
    pub source: ErrorSource,
}

/// The compilation stage an [Error] originated from.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
pub enum ErrorSource {
    Lexer,
    Parser,
    Semantic,
    Lowering,
    Adapter,
    #[default]
    Unknown,
}

/// Compile message kind. Currently only Error is implemented.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub enum MessageKind {
    Error,
    Warning,
    Lint,
}

#[derive(Debug, Clone)]
pub enum Reason {
    Simple(String),
    Expected {
        who: Option<String>,
        expected: String,
        found: String,
    },
    Unexpected {
        found: String,
    },
    UnexpectedEof,
    Unterminated {
        what: &'static str,
    },
    InvalidEscape {
        found: char,
    },
    MalformedNumber {
        found: String,
    },
    MultipleQueries,
    NotFound {
        name: String,
        namespace: String,
    },
    Duplicate {
        name: String,
        namespace: String,
    },
    MissingFromRoot,
    RangeReferencesNonRange {
        range: String,
        referenced: String,
    },
    InvalidRelation {
        property: String,
        entity: String,
    },
    EntityExpression {
        found: String,
    },
    Unrepresentable {
        found: String,
    },
    Adapter {
        message: String,
    },
    Cancelled,
    Bug {
        details: Option<String>,
    },
}

impl Error {
    pub fn new(reason: Reason) -> Self {
        Error {
            kind: MessageKind::Error,
            span: None,
            reason,
            hints: Vec::new(),
            code: None,
            source: ErrorSource::default(),
        }
    }

    pub fn new_simple<S: ToString>(reason: S) -> Self {
        Error::new(Reason::Simple(reason.to_string()))
    }

    /// Used for things that you *think* should never happen, but are not sure.
    pub fn new_assert<S: ToString>(details: S) -> Self {
        Error::new(Reason::Bug {
            details: Some(details.to_string()),
        })
    }
}

impl std::fmt::Display for Reason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Reason::Simple(text) => f.write_str(text),
            Reason::Expected {
                who,
                expected,
                found,
            } => {
                if let Some(who) = who {
                    write!(f, "{who} ")?;
                }
                write!(f, "expected {expected}, but found {found}")
            }
            Reason::Unexpected { found } => write!(f, "unexpected {found}"),
            Reason::UnexpectedEof => write!(f, "unexpected end of input"),
            Reason::Unterminated { what } => write!(f, "unterminated {what}"),
            Reason::InvalidEscape { found } => write!(f, "invalid escape sequence `\\{found}`"),
            Reason::MalformedNumber { found } => write!(f, "malformed number `{found}`"),
            Reason::MultipleQueries => {
                write!(f, "a source may contain only one retrieve query")
            }
            Reason::NotFound { name, namespace } => write!(f, "{namespace} `{name}` not found"),
            Reason::Duplicate { name, namespace } => {
                write!(f, "duplicate {namespace} `{name}`")
            }
            Reason::MissingFromRoot => {
                write!(f, "at least one range must not have a join condition")
            }
            Reason::RangeReferencesNonRange { range, referenced } => write!(
                f,
                "join condition of range `{range}` references `{referenced}`, which is not a range"
            ),
            Reason::InvalidRelation { property, entity } => {
                write!(f, "`{property}` is not a relation of entity `{entity}`")
            }
            Reason::EntityExpression { found } => {
                write!(f, "cannot build an expression on whole entity `{found}`")
            }
            Reason::Unrepresentable { found } => {
                write!(f, "cannot express {found} in SQL")
            }
            Reason::Adapter { message } => write!(f, "database adapter failed: {message}"),
            Reason::Cancelled => write!(f, "compilation cancelled"),
            Reason::Bug { details } => {
                write!(f, "internal compiler error")?;
                if let Some(details) = details {
                    write!(f, "; {details}")?;
                }
                Ok(())
            }
        }
    }
}

// Needed for anyhow
impl std::error::Error for Error {}

// Needed for StdError
impl std::fmt::Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        Debug::fmt(&self, f)
    }
}

pub trait WithErrorInfo: Sized {
    fn push_hint<S: Into<String>>(self, hint: S) -> Self;

    fn with_hints<S: Into<String>, I: IntoIterator<Item = S>>(self, hints: I) -> Self;

    fn with_span(self, span: Option<Span>) -> Self;

    fn with_span_fallback(self, span: Option<Span>) -> Self;

    fn with_code(self, code: &'static str) -> Self;

    fn with_source(self, source: ErrorSource) -> Self;
}

impl WithErrorInfo for Error {
    fn push_hint<S: Into<String>>(mut self, hint: S) -> Self {
        self.hints.push(hint.into());
        self
    }

    fn with_hints<S: Into<String>, I: IntoIterator<Item = S>>(mut self, hints: I) -> Self {
        self.hints = hints.into_iter().map(|x| x.into()).collect();
        self
    }

    fn with_span(mut self, span: Option<Span>) -> Self {
        self.span = span;
        self
    }

    fn with_span_fallback(mut self, span: Option<Span>) -> Self {
        self.span = self.span.or(span);
        self
    }

    fn with_code(mut self, code: &'static str) -> Self {
        self.code = Some(code);
        self
    }

    fn with_source(mut self, source: ErrorSource) -> Self {
        self.source = source;
        self
    }
}

impl<T, E: WithErrorInfo> WithErrorInfo for Result<T, E> {
    fn push_hint<S: Into<String>>(self, hint: S) -> Self {
        self.map_err(|e| e.push_hint(hint))
    }

    fn with_hints<S: Into<String>, I: IntoIterator<Item = S>>(self, hints: I) -> Self {
        self.map_err(|e| e.with_hints(hints))
    }

    fn with_span(self, span: Option<Span>) -> Self {
        self.map_err(|e| e.with_span(span))
    }

    fn with_span_fallback(self, span: Option<Span>) -> Self {
        self.map_err(|e| e.with_span_fallback(span))
    }

    fn with_code(self, code: &'static str) -> Self {
        self.map_err(|e| e.with_code(code))
    }

    fn with_source(self, source: ErrorSource) -> Self {
        self.map_err(|e| e.with_source(source))
    }
}
