//! Lexer and parser for the ObjectQuel query language.
//!
//! The crate exposes two representations: `lexer::lr` (tokens) and
//! `parser::pr` (the query AST consumed by the `quelc` compiler). Semantic
//! analysis and SQL generation live in the `quelc` crate.

pub mod error;
pub mod generic;
pub mod lexer;
pub mod parser;
pub mod span;

pub use lexer::{lex_source, CancellationToken, Lexer, LexerState};
pub use parser::{parse_source, parse_source_with_cancellation};

pub type Result<T, E = error::Error> = core::result::Result<T, E>;
