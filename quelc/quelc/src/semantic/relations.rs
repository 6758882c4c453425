//! Relation handling in `via` clauses: validation against the entity
//! metadata and rewriting of relation properties into join-column lookups.

use std::collections::HashMap;

use crate::ir::{walk_idents, walk_idents_mut};
use crate::metadata::EntityStore;
use crate::pr::{Ident, RangeKind, Retrieve};
use crate::{Error, Reason, Result, WithErrorInfo};

/// A `via` condition may reference columns, owning-side to-one relations,
/// or whole ranges; anything else is an invalid relation.
pub(super) fn check_via_relations(retrieve: &Retrieve, store: &dyn EntityStore) -> Result<()> {
    for range in &retrieve.ranges {
        let Some(condition) = range.join_condition() else {
            continue;
        };
        let mut idents: Vec<&Ident> = Vec::new();
        walk_idents(condition, &mut |i| idents.push(i));
        for ident in idents {
            let Some(range_name) = &ident.range else {
                continue;
            };
            let Some(target) = retrieve.range(range_name) else {
                continue;
            };
            let Some(entity) = target.entity() else {
                continue;
            };
            if ident.parts.is_empty() {
                // whole range; rewritten to its primary key below
                continue;
            }
            if ident.parts.len() != 1 {
                return Err(Error::new(Reason::InvalidRelation {
                    property: ident.parts.join("."),
                    entity: entity.to_string(),
                })
                .with_span(range.span));
            }
            let property = &ident.parts[0];
            let is_column = store
                .column_map(entity)
                .is_some_and(|m| m.contains_key(property));
            let is_owning_relation = store.many_to_one(entity).contains_key(property)
                || store
                    .one_to_one(entity)
                    .get(property)
                    .is_some_and(|r| r.relation_column.is_some());
            if !is_column && !is_owning_relation {
                return Err(Error::new(Reason::InvalidRelation {
                    property: property.clone(),
                    entity: entity.to_string(),
                })
                .with_span(range.span));
            }
        }
    }
    Ok(())
}

/// Rewrite `via` conditions so that only plain column properties remain:
/// relation properties become their owning-side join column, and bare range
/// references become the range's primary key.
pub(super) fn rewrite_via_relations(
    mut retrieve: Retrieve,
    store: &dyn EntityStore,
) -> Result<Retrieve> {
    let range_entities: HashMap<String, String> = retrieve
        .ranges
        .iter()
        .filter_map(|r| r.entity().map(|e| (r.name.clone(), e.to_string())))
        .collect();

    for range in &mut retrieve.ranges {
        let RangeKind::Database {
            join_condition: Some(condition),
            ..
        } = &mut range.kind
        else {
            continue;
        };
        walk_idents_mut(condition, &mut |ident| {
            rewrite_ident(ident, &range_entities, store)
        });
    }
    Ok(retrieve)
}

fn rewrite_ident(ident: &mut Ident, entities: &HashMap<String, String>, store: &dyn EntityStore) {
    let Some(range_name) = &ident.range else {
        return;
    };
    let Some(entity) = entities.get(range_name) else {
        return;
    };
    if ident.parts.is_empty() {
        // a bare range in a join comparison stands for its primary key
        if let Some(key) = store.identifier_keys(entity).first() {
            ident.parts.push(key.clone());
        }
        return;
    }
    let property = ident.parts[0].clone();
    if store
        .column_map(entity)
        .is_some_and(|m| m.contains_key(&property))
    {
        return;
    }
    if let Some(relation) = store.many_to_one(entity).get(&property) {
        ident.parts[0] = relation.relation_column.clone();
    } else if let Some(relation) = store.one_to_one(entity).get(&property) {
        if let Some(column) = &relation.relation_column {
            ident.parts[0] = column.clone();
        }
    }
}
