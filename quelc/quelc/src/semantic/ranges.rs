//! Range resolution: uniqueness, explicit and implicit binding, and the
//! structural rules on join conditions.

use std::collections::{HashMap, HashSet};

use itertools::Itertools;

use crate::ir::fold::QuelFold;
use crate::ir::walk_idents;
use crate::metadata::EntityStore;
use crate::pr::{Ident, Range, RangeKind, Retrieve};
use crate::utils::NameGenerator;
use crate::{Error, Reason, Result, WithErrorInfo};

pub(super) fn check_duplicate_names(retrieve: &Retrieve) -> Result<()> {
    let mut seen = HashSet::new();
    for range in &retrieve.ranges {
        if !seen.insert(range.name.as_str()) {
            return Err(Error::new(Reason::Duplicate {
                name: range.name.clone(),
                namespace: "range".to_string(),
            })
            .with_span(range.span));
        }
    }
    Ok(())
}

/// Bind identifiers whose head names a declared range, popping the head.
pub(super) fn bind_explicit_ranges(retrieve: Retrieve) -> Result<Retrieve> {
    let names: HashSet<String> = retrieve.ranges.iter().map(|r| r.name.clone()).collect();
    let mut binder = RangeBinder { names };
    binder.fold_retrieve(retrieve)
}

struct RangeBinder {
    names: HashSet<String>,
}

impl QuelFold for RangeBinder {
    fn fold_ident(&mut self, mut ident: Ident) -> Result<Ident> {
        if ident.range.is_none() {
            if let Some(head) = ident.head().map(str::to_string) {
                if self.names.contains(&head) {
                    ident.bind(head);
                }
            }
        }
        Ok(ident)
    }
}

/// Synthesize a range for every identifier head that names an entity
/// without a declared range, reusing one synthesized range per entity.
/// Heads the store does not recognize are unknown entities.
pub(super) fn plug_implicit_ranges(
    mut retrieve: Retrieve,
    store: &dyn EntityStore,
) -> Result<Retrieve> {
    let mut plugger = ImplicitRanges {
        store,
        new_ranges: Vec::new(),
        by_entity: HashMap::new(),
        name_gen: NameGenerator::new(),
    };
    // join conditions may only reference declared ranges, so they are left
    // for the reference check that follows
    retrieve.values = retrieve
        .values
        .into_iter()
        .map(|a| plugger.fold_alias(a))
        .try_collect()?;
    retrieve.conditions = retrieve
        .conditions
        .map(|c| plugger.fold_expr(c))
        .transpose()?;
    retrieve.sorts = plugger.fold_column_sorts(retrieve.sorts)?;
    retrieve.macros = retrieve
        .macros
        .into_iter()
        .map(|(name, expr)| -> Result<_> { Ok((name, plugger.fold_expr(expr)?)) })
        .try_collect()?;
    retrieve.ranges.extend(plugger.new_ranges);
    Ok(retrieve)
}

struct ImplicitRanges<'a> {
    store: &'a dyn EntityStore,
    new_ranges: Vec<Range>,
    by_entity: HashMap<String, String>,
    name_gen: NameGenerator,
}

impl QuelFold for ImplicitRanges<'_> {
    fn fold_ident(&mut self, mut ident: Ident) -> Result<Ident> {
        if ident.range.is_some() {
            return Ok(ident);
        }
        let Some(head) = ident.head().map(str::to_string) else {
            return Ok(ident);
        };
        if !self.store.exists(&head) {
            return Err(Error::new(Reason::NotFound {
                name: head,
                namespace: "entity".to_string(),
            }));
        }
        let canonical = self.store.add_namespace(&head);
        let range_name = match self.by_entity.get(&canonical) {
            Some(name) => name.clone(),
            None => {
                let name = self.name_gen.name_for(&head);
                self.new_ranges.push(Range {
                    name: name.clone(),
                    kind: RangeKind::Database {
                        entity: head.clone(),
                        join_condition: None,
                    },
                    required: false,
                    span: None,
                });
                self.by_entity.insert(canonical, name.clone());
                name
            }
        };
        ident.bind(range_name);
        Ok(ident)
    }
}

pub(super) fn check_from_root(retrieve: &Retrieve) -> Result<()> {
    if retrieve.main_range().is_none() {
        return Err(Error::new(Reason::MissingFromRoot));
    }
    Ok(())
}

/// Join conditions may only reference ranges of the same query; a free
/// identifier in a `via` clause is an error.
pub(super) fn check_join_references(retrieve: &Retrieve) -> Result<()> {
    for range in &retrieve.ranges {
        let Some(condition) = range.join_condition() else {
            continue;
        };
        let mut unbound: Option<String> = None;
        walk_idents(condition, &mut |ident| {
            if unbound.is_none() && ident.range.is_none() {
                unbound = Some(ident.to_string());
            }
        });
        if let Some(referenced) = unbound {
            return Err(Error::new(Reason::RangeReferencesNonRange {
                range: range.name.clone(),
                referenced,
            })
            .with_span(range.span));
        }
    }
    Ok(())
}
