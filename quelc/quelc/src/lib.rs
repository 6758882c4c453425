//! # quelc
//!
//! Compiler for the ObjectQuel query language. Translates `retrieve`
//! queries into SQL and exposes the query AST.
//!
//! You probably want to start with the [compile] wrapper function.
//!
//! For more granular access, refer to this diagram:
//! ```ascii
//!            ObjectQuel
//!
//!    (parse) │                  json::from_ast
//! quel_to_ast│                 ────────►
//!            ▼                           AST JSON
//!            AST                ◄────────
//!            │                   json::to_ast
//!  (analyze) │
//! resolve_ast│
//!            │
//!            ▼
//!      validated AST ──► (pagination::paginate, optional)
//!            │
//! ast_to_sql │
//!            ▼
//!
//!      SQL + parameters
//! ```
//!
//! ## Common use-cases
//!
//! - Compile a query to SQL at run time:
//!
//!   ```
//!   # use std::collections::HashMap;
//!   use quelc::metadata::MemoryEntityStore;
//!
//!   let mut store = MemoryEntityStore::new();
//!   store
//!       .add_entity("User", "users")
//!       .key("id")
//!       .column("id", "id_col")
//!       .column("name", "name_col");
//!
//!   let compiled = quelc::compile(
//!       "retrieve (User.name)",
//!       &HashMap::new(),
//!       &store,
//!       None,
//!   )
//!   .unwrap();
//!   assert_eq!(
//!       compiled.sql,
//!       "SELECT `U001`.name_col as `U001_name` FROM `users` as `U001`"
//!   );
//!   ```

#![forbid(unsafe_code)]
// Our error type is over 128 bytes because it carries several strings; we
// are not performance sensitive enough for that to matter.
#![allow(clippy::result_large_err)]

use std::collections::HashMap;

use serde::Serialize;
use serde_json::Value;

pub use quelc_parser::error::{Error, ErrorSource, MessageKind, Reason, WithErrorInfo};
pub use quelc_parser::generic;
pub use quelc_parser::lexer::{lr, CancellationToken};
pub use quelc_parser::parser::pr;
pub use quelc_parser::span::Span;

mod error_message;
pub mod ir;
pub mod metadata;
pub mod pagination;
pub mod semantic;
pub mod sql;
pub(crate) mod utils;

pub use error_message::{ErrorMessage, ErrorMessages, SourceLocation};

use metadata::{EntityStore, QueryExecutor};

pub type Result<T, E = Error> = core::result::Result<T, E>;

/// The outcome of compiling one ObjectQuel query.
#[derive(Debug, Clone, Serialize)]
pub struct CompiledQuery {
    pub sql: String,
    /// Values for the `?` placeholders, in placeholder order.
    pub bound_params: Vec<Value>,
    /// The validated, post-pagination AST. Hydration consumers read range,
    /// alias and sort metadata from it alongside the result rows.
    pub ast: pr::Retrieve,
    pub window: Option<u64>,
    pub window_size: Option<u64>,
    pub sort_in_application_logic: bool,
    /// Number of primary keys matched before the window slice, when
    /// pagination ran.
    pub full_query_result_count: Option<u64>,
}

impl CompiledQuery {
    /// The emitted SQL split over multiple lines with normalized
    /// indentation.
    pub fn formatted_sql(&self) -> String {
        sqlformat::format(
            &self.sql,
            &sqlformat::QueryParams::default(),
            &sqlformat::FormatOptions::default(),
        )
    }
}

/// Compile an ObjectQuel query into SQL plus its ordered parameter list.
///
/// This is a wrapper for:
/// - [quel_to_ast] — parse the source into an AST
/// - [resolve_ast] — validate and elaborate the AST
/// - [pagination::paginate] — rewrite `window` into a primary-key IN filter
/// - [ast_to_sql] — emit SQL and bind parameters
///
/// `executor` is consulted only when the query carries a window clause that
/// requires the auxiliary primary-key query; with `None` the window is
/// passed through to the caller untouched.
pub fn compile(
    source: &str,
    params: &HashMap<String, Value>,
    store: &dyn EntityStore,
    executor: Option<&dyn QueryExecutor>,
) -> Result<CompiledQuery, ErrorMessages> {
    compile_inner(source, params, store, executor)
        .map_err(|e| ErrorMessages::from(e).composed(source))
}

fn compile_inner(
    source: &str,
    params: &HashMap<String, Value>,
    store: &dyn EntityStore,
    executor: Option<&dyn QueryExecutor>,
) -> Result<CompiledQuery> {
    let retrieve = quelc_parser::parse_source(source)?;
    let retrieve = semantic::resolve(retrieve, store)?;
    let (retrieve, full_query_result_count) =
        pagination::paginate(retrieve, store, executor, params)?;
    let (sql, bound_params) = sql::compile(&retrieve, store, params)?;
    Ok(CompiledQuery {
        sql,
        bound_params,
        window: retrieve.window,
        window_size: retrieve.window_size,
        sort_in_application_logic: retrieve.sort_in_application_logic,
        full_query_result_count,
        ast: retrieve,
    })
}

/// Lex a query into tokens.
pub fn quel_to_tokens(source: &str) -> Result<lr::Tokens, ErrorMessages> {
    quelc_parser::lex_source(source).map_err(|e| ErrorMessages::from(e).composed(source))
}

/// Parse a query into its AST, without semantic analysis.
pub fn quel_to_ast(source: &str) -> Result<pr::Retrieve, ErrorMessages> {
    quelc_parser::parse_source(source).map_err(|e| ErrorMessages::from(e).composed(source))
}

/// Run the semantic pipeline on a parsed query.
pub fn resolve_ast(retrieve: pr::Retrieve, store: &dyn EntityStore) -> Result<pr::Retrieve> {
    semantic::resolve(retrieve, store)
}

/// Lower a validated query to SQL. Pagination, if wanted, must have been
/// applied by the caller.
pub fn ast_to_sql(
    retrieve: &pr::Retrieve,
    store: &dyn EntityStore,
    params: &HashMap<String, Value>,
) -> Result<(String, Vec<Value>)> {
    sql::compile(retrieve, store, params)
}

/// JSON serialization and deserialization functions
pub mod json {
    use super::*;

    /// JSON serialization
    pub fn from_ast(ast: &pr::Retrieve) -> Result<String, ErrorMessages> {
        serde_json::to_string(ast).map_err(convert_json_err)
    }

    /// JSON deserialization
    pub fn to_ast(json: &str) -> Result<pr::Retrieve, ErrorMessages> {
        serde_json::from_str(json).map_err(convert_json_err)
    }

    fn convert_json_err(err: serde_json::Error) -> ErrorMessages {
        ErrorMessages::from(Error::new_simple(err.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use crate::metadata::MemoryEntityStore;

    fn user_store() -> MemoryEntityStore {
        let mut store = MemoryEntityStore::new();
        store
            .add_entity("User", "users")
            .key("id")
            .column("id", "id_col")
            .column("name", "name_col");
        store
    }

    #[test]
    fn test_compile_trivial_projection() {
        let store = user_store();
        let params = HashMap::from([("min".to_string(), serde_json::json!(42))]);
        let compiled = super::compile(
            "retrieve (User.name) where User.id = 42",
            &params,
            &store,
            None,
        )
        .unwrap();

        assert_eq!(
            compiled.sql,
            "SELECT `U001`.name_col as `U001_name` FROM `users` as `U001` WHERE `U001`.id_col = ?"
        );
        assert_eq!(compiled.bound_params, vec![serde_json::json!(42)]);
        assert!(!compiled.sort_in_application_logic);
        assert_eq!(compiled.full_query_result_count, None);
    }

    #[test]
    fn test_json_round_trip() {
        let store = user_store();
        let compiled =
            super::compile("retrieve (User.name)", &HashMap::new(), &store, None).unwrap();
        let json = super::json::from_ast(&compiled.ast).unwrap();
        let ast = super::json::to_ast(&json).unwrap();
        assert_eq!(ast, compiled.ast);
    }

    #[test]
    fn test_error_message_location() {
        let store = user_store();
        let err = super::compile("retrieve (User.nme)", &HashMap::new(), &store, None)
            .unwrap_err();
        let message = &err.inner[0];
        assert!(message.reason.contains("nme"));
    }
}
