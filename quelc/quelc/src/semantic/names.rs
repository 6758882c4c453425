//! Name elaboration: entity namespacing and existence checks for entities
//! and properties.

use crate::ir::walk_idents;
use crate::metadata::EntityStore;
use crate::pr::{Ident, RangeKind, Retrieve};
use crate::{Error, Reason, Result, WithErrorInfo};

pub(super) fn add_namespaces(retrieve: &mut Retrieve, store: &dyn EntityStore) {
    for range in &mut retrieve.ranges {
        if let RangeKind::Database { entity, .. } = &mut range.kind {
            *entity = store.add_namespace(entity);
        }
    }
}

pub(super) fn check_entities_exist(retrieve: &Retrieve, store: &dyn EntityStore) -> Result<()> {
    for range in &retrieve.ranges {
        if let Some(entity) = range.entity() {
            if !store.exists(entity) {
                return Err(Error::new(Reason::NotFound {
                    name: entity.to_string(),
                    namespace: "entity".to_string(),
                })
                .with_span(range.span));
            }
        }
    }
    Ok(())
}

/// Every identifier's tail property must resolve through the entity's
/// column map. JSON ranges have no schema; their properties are resolved by
/// the hydrator.
pub(super) fn check_properties_exist(retrieve: &Retrieve, store: &dyn EntityStore) -> Result<()> {
    let mut idents: Vec<&Ident> = Vec::new();
    for alias in &retrieve.values {
        walk_idents(&alias.expr, &mut |i| idents.push(i));
    }
    if let Some(conditions) = &retrieve.conditions {
        walk_idents(conditions, &mut |i| idents.push(i));
    }
    for sort in &retrieve.sorts {
        walk_idents(&sort.column, &mut |i| idents.push(i));
    }
    for range in &retrieve.ranges {
        if let Some(condition) = range.join_condition() {
            walk_idents(condition, &mut |i| idents.push(i));
        }
    }

    for ident in idents {
        let Some(range_name) = &ident.range else {
            return Err(Error::new_assert(format!("unresolved identifier `{ident}`")));
        };
        let Some(range) = retrieve.range(range_name) else {
            return Err(Error::new_assert(format!(
                "identifier bound to unknown range `{range_name}`"
            )));
        };
        let Some(entity) = range.entity() else {
            continue;
        };
        if ident.parts.is_empty() {
            continue;
        }
        let known = ident.parts.len() == 1
            && store
                .column_map(entity)
                .is_some_and(|m| m.contains_key(&ident.parts[0]));
        if !known {
            return Err(Error::new(Reason::NotFound {
                name: format!("{entity}.{}", ident.parts.join(".")),
                namespace: "property".to_string(),
            })
            .with_span(range.span));
        }
    }
    Ok(())
}
