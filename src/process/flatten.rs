use serde_json::{Map, Value};
use std::collections::{HashMap, HashSet};
use tracing::debug;

use crate::process::diagnostics::{Diagnostic, Issue, Normalized};
use crate::process::table::{Cell, Table};

/// Promote the keys of the object held in `nested_field` to top-level
/// columns and drop `nested_field` itself.
///
/// - rows disagreeing on keys get the union, missing values `Null`
/// - objects nested deeper are joined with `.` (`template.image.url`)
/// - a promoted key that clashes with an existing column becomes
///   `<nested_field>.<key>`
/// - a `Null` nested value contributes no keys
///
/// Column order is the surviving original columns followed by the promoted
/// ones in first-seen order. If the field is absent, or any row holds a
/// non-object there, the table comes back unchanged with a diagnostic.
pub fn flatten(table: &Table, nested_field: &str) -> Normalized<Table> {
    let Some(nested_idx) = table.column_index(nested_field) else {
        return unchanged(
            table,
            Issue::NestedFieldMissing {
                field: nested_field.to_string(),
            },
        );
    };

    let mut promoted_rows: Vec<HashMap<String, Cell>> = Vec::with_capacity(table.num_rows());
    let mut promoted_keys: Vec<String> = Vec::new();
    let mut seen: HashSet<String> = HashSet::new();

    for (row, cells) in table.rows().iter().enumerate() {
        let mut flat = Vec::new();
        match &cells[nested_idx] {
            Cell::Null => {}
            Cell::Json(Value::Object(map)) => flatten_object(map, "", &mut flat),
            other => {
                return unchanged(
                    table,
                    Issue::NestedFieldNotObject {
                        field: nested_field.to_string(),
                        row,
                        found: other.type_name(),
                    },
                );
            }
        }
        for (key, _) in &flat {
            if seen.insert(key.clone()) {
                promoted_keys.push(key.clone());
            }
        }
        promoted_rows.push(flat.into_iter().collect());
    }

    let kept: Vec<(usize, &String)> = table
        .columns()
        .iter()
        .enumerate()
        .filter(|(i, _)| *i != nested_idx)
        .collect();
    let kept_names: HashSet<&str> = kept.iter().map(|(_, c)| c.as_str()).collect();

    let mut columns: Vec<String> = kept.iter().map(|(_, c)| (*c).clone()).collect();
    columns.extend(promoted_keys.iter().map(|key| {
        if kept_names.contains(key.as_str()) {
            format!("{}.{}", nested_field, key)
        } else {
            key.clone()
        }
    }));

    let rows = table
        .rows()
        .iter()
        .zip(promoted_rows.iter_mut())
        .map(|(cells, promoted)| {
            let mut row: Vec<Cell> = kept.iter().map(|(i, _)| cells[*i].clone()).collect();
            row.extend(
                promoted_keys
                    .iter()
                    .map(|key| promoted.remove(key).unwrap_or(Cell::Null)),
            );
            row
        })
        .collect();

    debug!(
        field = nested_field,
        promoted = promoted_keys.len(),
        rows = table.num_rows(),
        "flattened nested field"
    );
    Normalized::clean(Table::from_rows(columns, rows))
}

fn flatten_object(map: &Map<String, Value>, prefix: &str, out: &mut Vec<(String, Cell)>) {
    for (key, value) in map {
        let name = if prefix.is_empty() {
            key.clone()
        } else {
            format!("{}.{}", prefix, key)
        };
        match value {
            Value::Object(inner) if !inner.is_empty() => flatten_object(inner, &name, out),
            _ => out.push((name, Cell::from(value))),
        }
    }
}

fn unchanged(table: &Table, issue: Issue) -> Normalized<Table> {
    let diag = Diagnostic::new(issue);
    diag.log();
    Normalized::with_diagnostics(table.clone(), vec![diag])
}
