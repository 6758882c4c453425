//! Backend for translating a validated [Retrieve](crate::pr::Retrieve)
//! into a SQL string plus its ordered parameter vector.
//!
//! The lowerer is read-only over the tree: repeated calls on the same AST
//! produce byte-identical output.

mod gen_expr;
mod gen_query;

use std::collections::HashMap;

use serde_json::Value;

use crate::lr::Literal;
use crate::metadata::EntityStore;
use crate::pr::{Range, Retrieve};
use crate::{Error, ErrorSource, Reason, Result, WithErrorInfo};

/// Translate a validated query into SQL. Parameters are bound in strict
/// left-to-right order of the placeholders in the emitted text.
pub fn compile(
    retrieve: &Retrieve,
    store: &dyn EntityStore,
    params: &HashMap<String, Value>,
) -> Result<(String, Vec<Value>)> {
    compile_with(retrieve, store, params, GenOptions::default())
}

pub(crate) fn compile_with(
    retrieve: &Retrieve,
    store: &dyn EntityStore,
    params: &HashMap<String, Value>,
    opts: GenOptions,
) -> Result<(String, Vec<Value>)> {
    let mut ctx = Context {
        retrieve,
        store,
        params,
        opts,
        bound: Vec::new(),
    };
    let sql =
        gen_query::translate_query(&mut ctx).map_err(|e| e.with_source(ErrorSource::Lowering))?;
    log::debug!("lowered query to SQL: {sql}");
    Ok((sql, ctx.bound))
}

#[derive(Debug, Clone, Copy)]
pub(crate) struct GenOptions {
    /// When false, value expressions are emitted without `as` aliases; the
    /// pagination key query uses this.
    pub alias_fields: bool,
}

impl Default for GenOptions {
    fn default() -> Self {
        GenOptions { alias_fields: true }
    }
}

pub(crate) struct Context<'a> {
    pub retrieve: &'a Retrieve,
    pub store: &'a dyn EntityStore,
    pub params: &'a HashMap<String, Value>,
    pub opts: GenOptions,
    /// Parameters accumulated in emission order.
    pub bound: Vec<Value>,
}

impl Context<'_> {
    pub fn range(&self, name: &str) -> Result<&Range> {
        self.retrieve
            .range(name)
            .ok_or_else(|| Error::new_assert(format!("unknown range `{name}`")))
    }

    pub fn entity_of_range(&self, name: &str) -> Result<&str> {
        self.range(name)?.entity().ok_or_else(|| {
            Error::new(Reason::Unrepresentable {
                found: format!("a reference to JSON range `{name}`"),
            })
        })
    }

    pub fn column_of(&self, range_name: &str, property: &str) -> Result<&str> {
        let entity = self.entity_of_range(range_name)?;
        self.store
            .column_map(entity)
            .and_then(|m| m.get(property))
            .map(|c| c.as_str())
            .ok_or_else(|| {
                Error::new(Reason::NotFound {
                    name: format!("{entity}.{property}"),
                    namespace: "property".to_string(),
                })
            })
    }
}

/// The execution-time value of a source literal.
pub(crate) fn literal_value(lit: &Literal) -> Value {
    match lit {
        Literal::Null => Value::Null,
        Literal::Integer(i) => Value::from(*i),
        Literal::Float(v) => Value::from(*v),
        Literal::Boolean(b) => Value::from(*b),
        Literal::String(s) => Value::from(s.value.clone()),
    }
}
