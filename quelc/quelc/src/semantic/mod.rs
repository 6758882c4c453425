//! Semantic analysis: an ordered pipeline of tree-rewriting passes that
//! validates and elaborates a parsed [Retrieve](crate::pr::Retrieve).
//!
//! Each pass either rewrites the tree or checks an invariant; the first
//! failing pass aborts the pipeline. The annotation passes (alias patterns,
//! required ranges, exists erasure, reference joins, sort-mode detection)
//! are idempotent: re-running the pipeline on its own output is a no-op.

mod aliases;
mod macros;
mod names;
mod ranges;
mod relations;
mod required;
mod sorts;
mod types;

use crate::metadata::EntityStore;
use crate::pr::Retrieve;
use crate::{ErrorSource, Result, WithErrorInfo};

pub fn resolve(retrieve: Retrieve, store: &dyn EntityStore) -> Result<Retrieve> {
    log::debug!("semantic pipeline started");
    let retrieve =
        resolve_inner(retrieve, store).map_err(|e| e.with_source(ErrorSource::Semantic))?;
    log::debug!("semantic pipeline finished");
    Ok(retrieve)
}

fn resolve_inner(retrieve: Retrieve, store: &dyn EntityStore) -> Result<Retrieve> {
    let retrieve = macros::plug_macros(retrieve)?;
    ranges::check_duplicate_names(&retrieve)?;
    let retrieve = ranges::bind_explicit_ranges(retrieve)?;
    macros::reject_entity_macros(&retrieve)?;
    let retrieve = ranges::plug_implicit_ranges(retrieve, store)?;
    ranges::check_from_root(&retrieve)?;
    ranges::check_join_references(&retrieve)?;
    let mut retrieve = retrieve;
    names::add_namespaces(&mut retrieve, store);
    names::check_entities_exist(&retrieve, store)?;
    relations::check_via_relations(&retrieve, store)?;
    let retrieve = relations::rewrite_via_relations(retrieve, store)?;
    names::check_properties_exist(&retrieve, store)?;
    let retrieve = types::annotate_and_check(retrieve)?;
    let retrieve = aliases::plug_alias_patterns(retrieve)?;
    let retrieve = required::apply_required_annotations(retrieve, store)?;
    let retrieve = required::require_ranges_in_conditions(retrieve)?;
    let retrieve = required::relax_nullable_ranges(retrieve)?;
    let retrieve = required::erase_exists(retrieve)?;
    let retrieve = aliases::gather_reference_joins(retrieve)?;
    let retrieve = sorts::detect_application_sort(retrieve)?;
    Ok(retrieve)
}
