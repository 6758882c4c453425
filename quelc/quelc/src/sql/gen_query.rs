//! Assembles the final `SELECT ... FROM ... JOIN ... WHERE ... ORDER BY`.

use std::collections::HashSet;

use itertools::Itertools;
use serde_json::Value;

use super::gen_expr::{quoted_column, translate_expr, translate_ident};
use super::{literal_value, Context};
use crate::generic::SortDirection;
use crate::pagination::find_key_in;
use crate::pr::{Alias, ExprKind, RangeKind};
use crate::utils::valid_ident;
use crate::{Error, Reason, Result};

pub(super) fn translate_query(ctx: &mut Context) -> Result<String> {
    let retrieve = ctx.retrieve;

    let mut sql = String::from("SELECT ");
    if retrieve.unique {
        sql.push_str("DISTINCT ");
    }
    sql.push_str(&translate_fields(ctx)?);

    sql.push_str(" FROM ");
    sql.push_str(&translate_roots(ctx)?);

    for join in translate_joins(ctx)? {
        sql.push(' ');
        sql.push_str(&join);
    }

    if let Some(conditions) = &retrieve.conditions {
        sql.push_str(" WHERE ");
        sql.push_str(&translate_expr(conditions, ctx)?);
    }

    if let Some(order_by) = translate_order_by(ctx)? {
        sql.push_str(" ORDER BY ");
        sql.push_str(&order_by);
    }

    Ok(sql)
}

/// Emit the value list. Duplicate field strings are dropped together with
/// their pending parameters, keeping the binding in sync with the text.
fn translate_fields(ctx: &mut Context) -> Result<String> {
    let retrieve = ctx.retrieve;
    let mut seen: HashSet<String> = HashSet::new();
    let mut fields: Vec<String> = Vec::new();
    let mut bound: Vec<Value> = Vec::new();

    for alias in &retrieve.values {
        for (field, params) in translate_field(alias, ctx)? {
            if seen.insert(field.clone()) {
                fields.push(field);
                bound.extend(params);
            }
        }
    }

    if fields.is_empty() {
        return Err(Error::new(Reason::Unrepresentable {
            found: "a query with no selectable values".to_string(),
        }));
    }
    ctx.bound.extend(bound);
    Ok(fields.iter().join(", "))
}

fn translate_field(alias: &Alias, ctx: &mut Context) -> Result<Vec<(String, Vec<Value>)>> {
    if let ExprKind::Ident(ident) = &alias.expr.kind {
        // whole-entity aliases expand to every column of the entity
        if ident.is_entity_ref() {
            let Some(range_name) = ident.range.as_deref() else {
                return Err(Error::new_assert(format!(
                    "unresolved entity alias `{}`",
                    alias.name
                )));
            };
            let range = ctx.range(range_name)?;
            if range.kind.is_json() {
                return Ok(Vec::new());
            }
            let entity = ctx.entity_of_range(range_name)?;
            let Some(columns) = ctx.store.column_map(entity) else {
                return Err(Error::new_assert(format!(
                    "entity `{entity}` has no column map"
                )));
            };
            let mut fields = Vec::new();
            for (property, column) in columns {
                let column_sql = quoted_column(range_name, column)?;
                let field = if ctx.opts.alias_fields {
                    format!("{column_sql} as `{range_name}_{property}`")
                } else {
                    column_sql
                };
                fields.push((field, Vec::new()));
            }
            return Ok(fields);
        }

        // values over JSON ranges are resolved by the hydrator, not SQL
        if let Some(range_name) = &ident.range {
            if ctx.range(range_name)?.kind.is_json() {
                return Ok(Vec::new());
            }
        }
    }

    // ordinary value; parameters are collected aside so a dropped duplicate
    // does not desync the vector
    let saved = std::mem::take(&mut ctx.bound);
    let text = translate_expr(&alias.expr, ctx)?;
    let params = std::mem::replace(&mut ctx.bound, saved);

    let field = if ctx.opts.alias_fields {
        if !valid_ident(&alias.name) {
            return Err(Error::new(Reason::Unrepresentable {
                found: format!("alias `{}`", alias.name),
            }));
        }
        format!("{text} as `{}`", alias.name)
    } else {
        text
    };
    Ok(vec![(field, params)])
}

fn translate_roots(ctx: &Context) -> Result<String> {
    let mut roots = Vec::new();
    for range in &ctx.retrieve.ranges {
        if let RangeKind::Database {
            entity,
            join_condition: None,
        } = &range.kind
        {
            roots.push(quoted_table(ctx, entity, &range.name)?);
        }
    }
    if roots.is_empty() {
        return Err(Error::new(Reason::MissingFromRoot));
    }
    Ok(roots.iter().join(", "))
}

#[derive(Debug, Clone, Copy, strum::Display)]
enum JoinType {
    #[strum(serialize = "INNER")]
    Inner,
    #[strum(serialize = "LEFT")]
    Left,
}

fn translate_joins(ctx: &mut Context) -> Result<Vec<String>> {
    let retrieve = ctx.retrieve;
    let mut joins = Vec::new();
    for range in &retrieve.ranges {
        let RangeKind::Database {
            entity,
            join_condition: Some(condition),
        } = &range.kind
        else {
            continue;
        };
        let join_type = if range.required {
            JoinType::Inner
        } else {
            JoinType::Left
        };
        let table = quoted_table(ctx, entity, &range.name)?;
        let on = translate_expr(condition, ctx)?;
        joins.push(format!("{join_type} JOIN {table} ON {on}"));
    }
    Ok(joins)
}

fn quoted_table(ctx: &Context, entity: &str, range_name: &str) -> Result<String> {
    let table = ctx.store.owning_table(entity).ok_or_else(|| {
        Error::new(Reason::NotFound {
            name: entity.to_string(),
            namespace: "entity".to_string(),
        })
    })?;
    if !valid_ident(table) || !valid_ident(range_name) {
        return Err(Error::new(Reason::Unrepresentable {
            found: format!("table `{table}` as `{range_name}`"),
        }));
    }
    Ok(format!("`{table}` as `{range_name}`"))
}

fn translate_order_by(ctx: &mut Context) -> Result<Option<String>> {
    let retrieve = ctx.retrieve;
    if retrieve.sort_in_application_logic {
        return Ok(None);
    }

    // caller-supplied IN ordering wins when InValuesAreFinal is set
    if retrieve.directive_enabled("InValuesAreFinal") {
        if let Some(key) = ctx.store.primary_key_of_main_range(retrieve) {
            if let Some(in_expr) = find_key_in(retrieve.conditions.as_ref(), &key) {
                let column = translate_ident(&in_expr.ident, ctx)?;
                let mut values: Vec<String> = Vec::new();
                for entry in &in_expr.list {
                    match &entry.kind {
                        ExprKind::Literal(lit) => values.push(inline_value(&literal_value(lit))),
                        ExprKind::Param(name) => match ctx.params.get(name) {
                            Some(Value::Array(items)) => {
                                values.extend(items.iter().map(inline_value))
                            }
                            Some(value) => values.push(inline_value(value)),
                            None => {
                                return Err(Error::new(Reason::NotFound {
                                    name: name.clone(),
                                    namespace: "parameter".to_string(),
                                }))
                            }
                        },
                        _ => {}
                    }
                }
                let values = values.into_iter().unique().collect_vec();
                // an IN sliced past the end has nothing to order by
                if !values.is_empty() {
                    return Ok(Some(format!(
                        "FIELD({column}, {})",
                        values.iter().join(", ")
                    )));
                }
            }
        }
    }

    if retrieve.sorts.is_empty() {
        return Ok(None);
    }
    let mut parts = Vec::new();
    for sort in &retrieve.sorts {
        let expr = translate_expr(&sort.column, ctx)?;
        let direction = match sort.direction {
            SortDirection::Asc => "ASC",
            SortDirection::Desc => "DESC",
        };
        parts.push(format!("{expr} {direction}"));
    }
    Ok(Some(parts.iter().join(", ")))
}

/// Inline a value into the SQL text; only used for FIELD ordering.
fn inline_value(value: &Value) -> String {
    match value {
        Value::Null => "NULL".to_string(),
        Value::Bool(b) => if *b { "TRUE" } else { "FALSE" }.to_string(),
        Value::Number(n) => n.to_string(),
        Value::String(s) => format!("'{}'", s.replace('\'', "''")),
        other => other.to_string(),
    }
}
