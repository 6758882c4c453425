//! Read-only contracts to the entity metadata store and the database
//! adapter. The compiler consumes these; it never writes through them.

pub mod memory;

pub use memory::MemoryEntityStore;

use std::collections::HashMap;

use enum_as_inner::EnumAsInner;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::pr::Retrieve;

/// An owning-side one-to-one relation. `relation_column` names the property
/// holding the join column; it is `None` on the inverse side.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OneToOne {
    pub target_entity: String,
    pub relation_column: Option<String>,
    pub mapped_by: Option<String>,
}

/// A many-to-one relation. `relation_column` names the property holding the
/// join column on the owning side.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ManyToOne {
    pub target_entity: String,
    pub relation_column: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OneToMany {
    pub target_entity: String,
    pub mapped_by: String,
}

/// The annotations attached to one property of an entity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnnotationGroup {
    pub property: String,
    pub annotations: Vec<Annotation>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, EnumAsInner)]
pub enum Annotation {
    /// The relation must be satisfied; joins over it become INNER.
    RequiredRelation,
    ManyToOne(ManyToOne),
    OneToOne(OneToOne),
    OneToMany(OneToMany),
    Other(String),
}

impl AnnotationGroup {
    pub fn has_required_relation(&self) -> bool {
        self.annotations
            .iter()
            .any(|a| matches!(a, Annotation::RequiredRelation))
    }

    /// The join-column property of an owning-side relation in this group.
    pub fn relation_property(&self) -> Option<&str> {
        self.annotations.iter().find_map(|a| {
            a.as_many_to_one()
                .map(|r| r.relation_column.as_str())
                .or_else(|| a.as_one_to_one().and_then(|r| r.relation_column.as_deref()))
        })
    }

    /// Whether this group describes the owning side of a to-one relation.
    pub fn is_owning_to_one(&self) -> bool {
        self.annotations.iter().any(|a| {
            matches!(a, Annotation::ManyToOne(_))
                || matches!(a, Annotation::OneToOne(o) if o.relation_column.is_some())
        })
    }
}

/// Primary key of the query's FROM root, as resolved by
/// [EntityStore::primary_key_of_main_range].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MainRangeKey {
    pub entity: String,
    pub primary_key: String,
    pub range: String,
}

/// Entity metadata resolved by the embedder: table names, column maps,
/// identifier keys and relationship annotations.
pub trait EntityStore {
    fn exists(&self, entity: &str) -> bool;

    /// Canonicalize an entity name (namespace, case). Must be idempotent.
    fn add_namespace(&self, name: &str) -> String;

    fn owning_table(&self, entity: &str) -> Option<&str>;

    /// Property → column map, in schema declaration order.
    fn column_map(&self, entity: &str) -> Option<&IndexMap<String, String>>;

    fn identifier_keys(&self, entity: &str) -> &[String];

    fn annotations(&self, entity: &str) -> &[AnnotationGroup];

    fn one_to_one(&self, entity: &str) -> &HashMap<String, OneToOne>;

    fn many_to_one(&self, entity: &str) -> &HashMap<String, ManyToOne>;

    fn one_to_many(&self, entity: &str) -> &HashMap<String, OneToMany>;

    /// Primary key of the first database range without a join condition.
    fn primary_key_of_main_range(&self, retrieve: &Retrieve) -> Option<MainRangeKey> {
        let range = retrieve.main_range()?;
        let entity = range.entity()?;
        let primary_key = self.identifier_keys(entity).first()?.clone();
        Some(MainRangeKey {
            entity: entity.to_string(),
            primary_key,
            range: range.name.clone(),
        })
    }
}

/// Error from the caller's database adapter; passed through without retry.
#[derive(Debug, Clone)]
pub struct AdapterError {
    pub message: String,
}

impl AdapterError {
    pub fn new<S: ToString>(message: S) -> Self {
        AdapterError {
            message: message.to_string(),
        }
    }
}

impl std::fmt::Display for AdapterError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.message)
    }
}

impl std::error::Error for AdapterError {}

/// Executes SQL on behalf of the pagination rewriter. This is the only I/O
/// in the compiler core.
pub trait QueryExecutor {
    /// Execute `sql` and return the first column of every row, in order.
    fn fetch_column(&self, sql: &str, params: &[Value]) -> Result<Vec<Value>, AdapterError>;
}
