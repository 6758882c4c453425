//! Value-alias elaboration: demultiplexing patterns for entity aliases,
//! canonical names for derived aliases, and hidden aliases for ranges the
//! hydrator needs but the caller did not select.

use std::collections::HashSet;

use crate::ir::walk_idents;
use crate::pr::{Alias, Expr, ExprKind, Ident, Retrieve, Ty};
use crate::Result;

/// Attach `alias_pattern = "<range>."` to whole-entity aliases and
/// canonicalize derived alias names to `<range>_<property>`.
pub(super) fn plug_alias_patterns(mut retrieve: Retrieve) -> Result<Retrieve> {
    for alias in &mut retrieve.values {
        let ExprKind::Ident(ident) = &alias.expr.kind else {
            continue;
        };
        let Some(range) = ident.range.clone() else {
            continue;
        };
        if ident.is_entity_ref() {
            alias.alias_pattern = Some(format!("{range}."));
            if !alias.explicit_name {
                alias.name = range;
            }
        } else if !alias.explicit_name {
            if let Some(property) = ident.property() {
                alias.name = format!("{range}_{property}");
            }
        }
    }
    Ok(retrieve)
}

/// Identifiers used in conditions that belong to non-selected ranges get a
/// hidden alias, so the emitted SQL returns the columns the hydrator needs
/// to resolve references. Re-running the pass adds nothing.
pub(super) fn gather_reference_joins(mut retrieve: Retrieve) -> Result<Retrieve> {
    let mut selected: HashSet<String> = HashSet::new();
    for alias in &retrieve.values {
        walk_idents(&alias.expr, &mut |ident| {
            if let Some(range) = &ident.range {
                selected.insert(range.clone());
            }
        });
    }

    let mut referenced: Vec<Ident> = Vec::new();
    if let Some(conditions) = &retrieve.conditions {
        walk_idents(conditions, &mut |ident| referenced.push(ident.clone()));
    }

    let mut names: HashSet<String> = retrieve.values.iter().map(|a| a.name.clone()).collect();
    for ident in referenced {
        let Some(range) = &ident.range else { continue };
        if selected.contains(range) {
            continue;
        }
        let Some(property) = ident.property() else {
            continue;
        };
        let name = format!("{range}_{property}");
        if !names.insert(name.clone()) {
            continue;
        }
        retrieve.values.push(Alias {
            name,
            expr: Expr {
                kind: ExprKind::Ident(ident),
                span: None,
                // the annotation the typing pass would assign, so a re-run
                // of the pipeline leaves the alias untouched
                ty: Some(Ty::Unknown),
            },
            alias_pattern: None,
            visible_in_result: false,
            explicit_name: false,
        });
    }
    Ok(retrieve)
}
