use enum_as_inner::EnumAsInner;
use serde::{Deserialize, Serialize};

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Tokens(pub Vec<Token>);

#[derive(Clone, PartialEq, Serialize, Deserialize)]
pub struct Token {
    pub kind: TokenKind,
    pub span: std::ops::Range<usize>,
    /// 1-based line on which the token began.
    pub line: u32,
}

/// Keywords of the language, in their canonical lower-case form. Keyword
/// recognition is case-insensitive.
pub const KEYWORDS: &[&str] = &[
    "retrieve",
    "where",
    "and",
    "or",
    "range",
    "of",
    "is",
    "in",
    "via",
    "unique",
    "sort",
    "by",
    "not",
    "asc",
    "desc",
    "window",
    "using",
    "window_size",
    "json_source",
];

#[derive(Clone, PartialEq, Debug, Serialize, Deserialize, EnumAsInner)]
pub enum TokenKind {
    Ident(String),
    /// Canonical lower-case form of a keyword.
    Keyword(String),
    Literal(Literal),
    /// A named parameter such as `:customer_id`.
    Param(String),
    /// A compiler directive such as `@InValuesAreFinal`.
    Directive(String),

    /// single-char control tokens
    Control(char),

    Eq,         // ==
    Ne,         // != and <>
    Gte,        // >=
    Lte,        // <=
    ShiftLeft,  // <<
    ShiftRight, // >>
    ArrowThin,  // ->

    /// A regular expression literal; only produced by `Lexer::fetch_regex`.
    Regex { pattern: String, flags: String },

    /// A character the lexer does not recognize. Not fatal on its own; the
    /// parser rejects it when it reaches one.
    Unknown(char),

    Eof,
}

#[derive(Debug, EnumAsInner, PartialEq, Clone, Serialize, Deserialize, strum::AsRefStr)]
pub enum Literal {
    Null,
    Integer(i64),
    Float(f64),
    Boolean(bool),
    String(StringLit),
}

/// A string literal together with the quote style it was written in. The
/// quote character drives escape handling and is kept for result hydration.
#[derive(Debug, PartialEq, Eq, Clone, Serialize, Deserialize)]
pub struct StringLit {
    pub value: String,
    pub quote: char,
}

impl Literal {
    pub fn single_quoted<S: ToString>(value: S) -> Self {
        Literal::String(StringLit {
            value: value.to_string(),
            quote: '\'',
        })
    }

    pub fn double_quoted<S: ToString>(value: S) -> Self {
        Literal::String(StringLit {
            value: value.to_string(),
            quote: '"',
        })
    }
}

impl TokenKind {
    /// Whether `other` would satisfy an expectation of `self`. Kinds with a
    /// payload (identifiers, literals, parameters, directives) match on the
    /// variant alone; keywords and control characters match exactly.
    pub fn matches(&self, other: &TokenKind) -> bool {
        match (self, other) {
            (TokenKind::Ident(_), TokenKind::Ident(_)) => true,
            (TokenKind::Literal(_), TokenKind::Literal(_)) => true,
            (TokenKind::Param(_), TokenKind::Param(_)) => true,
            (TokenKind::Directive(_), TokenKind::Directive(_)) => true,
            (TokenKind::Unknown(_), TokenKind::Unknown(_)) => true,
            (TokenKind::Regex { .. }, TokenKind::Regex { .. }) => true,
            _ => self == other,
        }
    }
}

impl std::fmt::Display for Literal {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Literal::Null => write!(f, "null"),
            Literal::Integer(i) => write!(f, "{i}"),
            Literal::Float(v) => write!(f, "{v}"),
            Literal::Boolean(b) => f.write_str(if *b { "true" } else { "false" }),
            Literal::String(s) => {
                let quote = s.quote;
                write!(f, "{quote}{}{quote}", s.value)
            }
        }
    }
}

impl std::fmt::Display for TokenKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TokenKind::Ident(s) => {
                if s.is_empty() {
                    // FYI this shows up in errors
                    write!(f, "an identifier")
                } else {
                    write!(f, "{s}")
                }
            }
            TokenKind::Keyword(s) => write!(f, "keyword {s}"),
            TokenKind::Literal(lit) => write!(f, "{lit}"),
            TokenKind::Param(name) => write!(f, ":{name}"),
            TokenKind::Directive(name) => write!(f, "@{name}"),
            TokenKind::Control(c) => write!(f, "{c}"),

            TokenKind::Eq => f.write_str("=="),
            TokenKind::Ne => f.write_str("!="),
            TokenKind::Gte => f.write_str(">="),
            TokenKind::Lte => f.write_str("<="),
            TokenKind::ShiftLeft => f.write_str("<<"),
            TokenKind::ShiftRight => f.write_str(">>"),
            TokenKind::ArrowThin => f.write_str("->"),

            TokenKind::Regex { pattern, flags } => write!(f, "/{pattern}/{flags}"),
            TokenKind::Unknown(c) => write!(f, "{c}"),
            TokenKind::Eof => write!(f, "end of input"),
        }
    }
}

impl std::fmt::Debug for Token {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(f, "{}..{}: {:?}", self.span.start, self.span.end, self.kind)
    }
}
