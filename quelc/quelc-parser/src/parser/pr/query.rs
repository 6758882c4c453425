use std::collections::HashMap;

use enum_as_inner::EnumAsInner;
use serde::{Deserialize, Serialize};

use crate::generic::ColumnSort;
use crate::parser::pr::Expr;
use crate::span::Span;

/// A parsed `retrieve` query together with its auxiliary range declarations
/// and compiler directives.
///
/// The tree is created by the parser, rewritten in place by the semantic
/// pipeline, and then read by the SQL lowerer. It is a deep structure;
/// `clone()` yields the structurally independent copy the pagination
/// rewriter works on.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct Retrieve {
    pub directives: HashMap<String, DirectiveValue>,
    pub ranges: Vec<Range>,
    /// Named value expressions, reusable by name in the rest of the query.
    pub macros: HashMap<String, Expr>,
    pub values: Vec<Alias>,
    pub conditions: Option<Expr>,
    pub sorts: Vec<ColumnSort<Expr>>,
    pub window: Option<u64>,
    pub window_size: Option<u64>,
    pub unique: bool,
    /// Set when the sort cannot be expressed in SQL; the caller sorts
    /// post-hoc and the emitted SQL omits ORDER BY and the window.
    pub sort_in_application_logic: bool,
}

impl Retrieve {
    pub fn range(&self, name: &str) -> Option<&Range> {
        self.ranges.iter().find(|r| r.name == name)
    }

    /// The FROM root: the first database range without a join condition.
    pub fn main_range(&self) -> Option<&Range> {
        self.ranges.iter().find(|r| {
            matches!(
                &r.kind,
                RangeKind::Database {
                    join_condition: None,
                    ..
                }
            )
        })
    }

    /// Whether a boolean directive such as `@InValuesAreFinal` is set.
    pub fn directive_enabled(&self, name: &str) -> bool {
        matches!(
            self.directives.get(name),
            Some(DirectiveValue::Boolean(true))
        )
    }
}

/// A named binding of an entity (or JSON source) to a local alias.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Range {
    pub name: String,
    pub kind: RangeKind,
    /// Required ranges must contribute a row and lower to INNER JOIN.
    pub required: bool,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub span: Option<Span>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, EnumAsInner)]
pub enum RangeKind {
    Database {
        entity: String,
        /// The `via` predicate; `None` makes this range a FROM root.
        join_condition: Option<Box<Expr>>,
    },
    Json {
        sources: Vec<Expr>,
    },
}

impl Range {
    pub fn database<S: ToString>(name: S, entity: S) -> Self {
        Range {
            name: name.to_string(),
            kind: RangeKind::Database {
                entity: entity.to_string(),
                join_condition: None,
            },
            required: false,
            span: None,
        }
    }

    pub fn entity(&self) -> Option<&str> {
        match &self.kind {
            RangeKind::Database { entity, .. } => Some(entity),
            RangeKind::Json { .. } => None,
        }
    }

    pub fn join_condition(&self) -> Option<&Expr> {
        match &self.kind {
            RangeKind::Database { join_condition, .. } => join_condition.as_deref(),
            RangeKind::Json { .. } => None,
        }
    }
}

/// One entry of the `retrieve (...)` value list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Alias {
    pub name: String,
    pub expr: Expr,
    /// `"<range>."` on whole-entity aliases; drives result demultiplexing.
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub alias_pattern: Option<String>,
    /// Hidden aliases are emitted in the SQL for the hydrator but are not
    /// part of the caller-visible result shape.
    pub visible_in_result: bool,
    /// Whether the alias was written as `name = expr` (which also registers
    /// a macro) rather than derived from the expression.
    pub explicit_name: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum DirectiveValue {
    Boolean(bool),
    Integer(i64),
    Float(f64),
    Flag(String),
}
