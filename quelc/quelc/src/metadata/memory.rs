//! An in-memory [EntityStore], for tests and light embedding.

use std::collections::HashMap;
use std::sync::OnceLock;

use indexmap::IndexMap;

use super::{
    Annotation, AnnotationGroup, EntityStore, ManyToOne, OneToMany, OneToOne,
};

/// Builder-style entity store backed by plain maps. Entity names resolve
/// case-insensitively to their canonical registered form, which is what
/// `add_namespace` returns.
///
/// ```
/// use quelc::metadata::MemoryEntityStore;
///
/// let mut store = MemoryEntityStore::new();
/// store
///     .add_entity("User", "users")
///     .key("id")
///     .column("id", "id_col")
///     .column("name", "name_col");
/// ```
#[derive(Debug, Default)]
pub struct MemoryEntityStore {
    entities: Vec<EntityMeta>,
}

#[derive(Debug, Default)]
pub struct EntityMeta {
    name: String,
    table: String,
    columns: IndexMap<String, String>,
    keys: Vec<String>,
    annotations: Vec<AnnotationGroup>,
    one_to_one: HashMap<String, OneToOne>,
    many_to_one: HashMap<String, ManyToOne>,
    one_to_many: HashMap<String, OneToMany>,
}

impl MemoryEntityStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_entity(&mut self, name: &str, table: &str) -> &mut EntityMeta {
        self.entities.push(EntityMeta {
            name: name.to_string(),
            table: table.to_string(),
            ..EntityMeta::default()
        });
        self.entities
            .last_mut()
            .expect("entity was just pushed")
    }

    fn resolve(&self, name: &str) -> Option<&EntityMeta> {
        self.entities
            .iter()
            .find(|e| e.name == name)
            .or_else(|| {
                self.entities
                    .iter()
                    .find(|e| e.name.eq_ignore_ascii_case(name))
            })
    }

    /// Lookups on unknown entities borrow from a shared empty metadata
    /// record, so the accessors can hand out references.
    fn resolve_or_empty(&self, name: &str) -> &EntityMeta {
        static EMPTY: OnceLock<EntityMeta> = OnceLock::new();
        self.resolve(name)
            .unwrap_or_else(|| EMPTY.get_or_init(EntityMeta::default))
    }
}

impl EntityMeta {
    pub fn column(&mut self, property: &str, column: &str) -> &mut Self {
        self.columns.insert(property.to_string(), column.to_string());
        self
    }

    pub fn key(&mut self, property: &str) -> &mut Self {
        self.keys.push(property.to_string());
        self
    }

    pub fn many_to_one(&mut self, property: &str, target: &str, relation_column: &str) -> &mut Self {
        let relation = ManyToOne {
            target_entity: target.to_string(),
            relation_column: relation_column.to_string(),
        };
        self.many_to_one.insert(property.to_string(), relation.clone());
        self.group_mut(property)
            .annotations
            .push(Annotation::ManyToOne(relation));
        self
    }

    pub fn one_to_one(
        &mut self,
        property: &str,
        target: &str,
        relation_column: Option<&str>,
    ) -> &mut Self {
        let relation = OneToOne {
            target_entity: target.to_string(),
            relation_column: relation_column.map(str::to_string),
            mapped_by: None,
        };
        self.one_to_one.insert(property.to_string(), relation.clone());
        self.group_mut(property)
            .annotations
            .push(Annotation::OneToOne(relation));
        self
    }

    pub fn one_to_many(&mut self, property: &str, target: &str, mapped_by: &str) -> &mut Self {
        let relation = OneToMany {
            target_entity: target.to_string(),
            mapped_by: mapped_by.to_string(),
        };
        self.one_to_many.insert(property.to_string(), relation.clone());
        self.group_mut(property)
            .annotations
            .push(Annotation::OneToMany(relation));
        self
    }

    pub fn required_relation(&mut self, property: &str) -> &mut Self {
        self.group_mut(property)
            .annotations
            .push(Annotation::RequiredRelation);
        self
    }

    fn group_mut(&mut self, property: &str) -> &mut AnnotationGroup {
        if let Some(index) = self.annotations.iter().position(|g| g.property == property) {
            return &mut self.annotations[index];
        }
        self.annotations.push(AnnotationGroup {
            property: property.to_string(),
            annotations: Vec::new(),
        });
        self.annotations
            .last_mut()
            .expect("group was just pushed")
    }
}

impl EntityStore for MemoryEntityStore {
    fn exists(&self, entity: &str) -> bool {
        self.resolve(entity).is_some()
    }

    fn add_namespace(&self, name: &str) -> String {
        match self.resolve(name) {
            Some(meta) => meta.name.clone(),
            None => name.to_string(),
        }
    }

    fn owning_table(&self, entity: &str) -> Option<&str> {
        self.resolve(entity).map(|e| e.table.as_str())
    }

    fn column_map(&self, entity: &str) -> Option<&IndexMap<String, String>> {
        self.resolve(entity).map(|e| &e.columns)
    }

    fn identifier_keys(&self, entity: &str) -> &[String] {
        &self.resolve_or_empty(entity).keys
    }

    fn annotations(&self, entity: &str) -> &[AnnotationGroup] {
        &self.resolve_or_empty(entity).annotations
    }

    fn one_to_one(&self, entity: &str) -> &HashMap<String, OneToOne> {
        &self.resolve_or_empty(entity).one_to_one
    }

    fn many_to_one(&self, entity: &str) -> &HashMap<String, ManyToOne> {
        &self.resolve_or_empty(entity).many_to_one
    }

    fn one_to_many(&self, entity: &str) -> &HashMap<String, OneToMany> {
        &self.resolve_or_empty(entity).one_to_many
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_case_insensitive_resolution() {
        let mut store = MemoryEntityStore::new();
        store.add_entity("User", "users").column("name", "name_col");

        assert!(store.exists("User"));
        assert!(store.exists("user"));
        assert!(!store.exists("customer"));
        assert_eq!(store.add_namespace("user"), "User");
        assert_eq!(store.add_namespace("Unknown"), "Unknown");
        assert_eq!(store.owning_table("USER"), Some("users"));
    }
}
