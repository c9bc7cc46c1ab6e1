use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use tracing::{debug, debug_span, instrument};

use crate::process::coerce::coerce;
use crate::process::diagnostics::{Diagnostic, Issue, Normalized};
use crate::process::flatten::flatten;
use crate::process::selector::{json_type, Selector};
use crate::process::table::Table;
use crate::schema::ColumnSchema;

/// How to cut one output table out of a document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TableSpec {
    pub name: String,
    pub selector: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub columns: Option<ColumnSchema>,
    /// Field whose object value is promoted to top-level columns.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub flatten: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sort_by: Option<String>,
}

impl TableSpec {
    pub fn new(name: impl Into<String>, selector: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            selector: selector.into(),
            columns: None,
            flatten: None,
            sort_by: None,
        }
    }

    pub fn with_columns(mut self, columns: ColumnSchema) -> Self {
        self.columns = Some(columns);
        self
    }

    pub fn with_flatten(mut self, field: impl Into<String>) -> Self {
        self.flatten = Some(field.into());
        self
    }

    pub fn with_sort_by(mut self, column: impl Into<String>) -> Self {
        self.sort_by = Some(column.into());
        self
    }
}

/// Build one table per spec. Every requested name is present in the result;
/// a spec whose selector does not land on rows yields an empty table and a
/// diagnostic without affecting the others.
#[instrument(level = "debug", skip_all, fields(tables = specs.len()))]
pub fn extract_subtrees(document: &Value, specs: &[TableSpec]) -> Normalized<BTreeMap<String, Table>> {
    let mut tables = BTreeMap::new();
    let mut diagnostics = Vec::new();

    for spec in specs {
        let table = extract_table(document, spec).drain_into(&mut diagnostics);
        debug!(
            table = %spec.name,
            rows = table.num_rows(),
            columns = table.num_columns(),
            "extracted"
        );
        tables.insert(spec.name.clone(), table);
    }

    Normalized::with_diagnostics(tables, diagnostics)
}

/// Navigate, then flatten, coerce and sort, in that order.
pub fn extract_table(document: &Value, spec: &TableSpec) -> Normalized<Table> {
    let _span = debug_span!("extract_table", table = %spec.name).entered();
    let mut diagnostics = Vec::new();

    let mut table = match locate(document, &spec.selector) {
        Ok(table) => table,
        Err(issue) => {
            let diag = Diagnostic::new(issue).in_table(&spec.name);
            diag.log();
            return Normalized::with_diagnostics(Table::empty(), vec![diag]);
        }
    };

    if let Some(field) = &spec.flatten {
        table = flatten(&table, field).drain_into(&mut diagnostics);
    }
    if let Some(schema) = &spec.columns {
        table = coerce(&table, schema).drain_into(&mut diagnostics);
    }
    if let Some(column) = &spec.sort_by {
        match table.column_index(column) {
            Some(idx) => table = table.sorted_by(idx),
            // an empty array gives a column-less table; nothing to sort
            None if table.is_empty() => {}
            None => {
                let diag = Diagnostic::new(Issue::SortColumnMissing {
                    column: column.clone(),
                });
                diag.log();
                diagnostics.push(diag);
            }
        }
    }

    let diagnostics = diagnostics
        .into_iter()
        .map(|d| d.in_table(&spec.name))
        .collect();
    Normalized::with_diagnostics(table, diagnostics)
}

/// Rows under `selector`: an array of objects gives one row each, a lone
/// object gives a single row, anything else is a shape mismatch.
fn locate(document: &Value, selector: &str) -> Result<Table, Issue> {
    let selector = Selector::parse(selector)?;
    match selector.resolve(document)? {
        Value::Array(items) => {
            let records = items
                .iter()
                .enumerate()
                .map(|(i, item)| {
                    item.as_object().ok_or_else(|| Issue::SelectorMismatch {
                        selector: selector.to_string(),
                        at: format!("{}[{}]", selector, i),
                        expected: "object",
                        found: json_type(item),
                    })
                })
                .collect::<Result<Vec<&Map<String, Value>>, Issue>>()?;
            Ok(Table::from_records(records))
        }
        Value::Object(map) => Ok(Table::from_records([map])),
        other => Err(Issue::SelectorMismatch {
            selector: selector.to_string(),
            at: selector.to_string(),
            expected: "array or object",
            found: json_type(other),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::process::table::Cell;
    use crate::schema::ColumnType;
    use serde_json::json;

    fn doc() -> Value {
        json!({
            "workout_counts": {"workouts": [
                {"name": "Cycling", "count": 120},
                {"name": "Running", "count": 8}
            ]},
            "streaks": {"current_weekly": 4, "start_date_of_current_weekly": 1700000000},
            "scalars": [1, 2]
        })
    }

    #[test]
    fn missing_path_gives_empty_table_but_others_fill() {
        let specs = vec![
            TableSpec::new("workout_counts", "workout_counts.workouts"),
            TableSpec::new("personal_records", "personal_records[0].records"),
            TableSpec::new("streaks", "streaks"),
        ];

        let result = extract_subtrees(&doc(), &specs);

        assert_eq!(result.output.len(), 3);
        assert_eq!(result.output["workout_counts"].num_rows(), 2);
        assert_eq!(result.output["streaks"].num_rows(), 1);
        assert!(result.output["personal_records"].is_empty());
        assert_eq!(result.diagnostics.len(), 1);
        assert_eq!(
            result.diagnostics[0].table.as_deref(),
            Some("personal_records")
        );
    }

    #[test]
    fn wrong_shapes_are_absorbed() {
        let specs = vec![
            TableSpec::new("scalar_list", "scalars"),
            TableSpec::new("scalar_leaf", "streaks.current_weekly"),
            TableSpec::new("bad_syntax", "streaks[x]"),
            TableSpec::new("index_on_object", "streaks[0]"),
        ];

        let result = extract_subtrees(&doc(), &specs);

        assert_eq!(result.output.len(), 4);
        assert!(result.output.values().all(Table::is_empty));
        assert_eq!(result.diagnostics.len(), 4);
    }

    #[test]
    fn flatten_runs_before_coerce_and_sort() {
        let document = json!({"achievement_counts": {"achievements": [
            {"count": "2", "template": {"slug": "b", "points": "20"}},
            {"count": "1", "template": {"slug": "a", "points": "10"}}
        ]}});
        let spec = TableSpec::new("achievements", "achievement_counts.achievements")
            .with_flatten("template")
            .with_columns(
                ColumnSchema::new()
                    .with("count", ColumnType::Integer)
                    .with("points", ColumnType::Integer),
            )
            .with_sort_by("count");

        let result = extract_table(&document, &spec);

        assert!(result.is_clean(), "{:?}", result.diagnostics);
        let t = result.output;
        assert_eq!(t.columns(), ["count", "slug", "points"]);
        assert_eq!(t.get(0, "slug"), Some(&Cell::Str("a".into())));
        assert_eq!(t.get(0, "points"), Some(&Cell::Int(10)));
        assert_eq!(t.get(1, "count"), Some(&Cell::Int(2)));
    }

    #[test]
    fn missing_sort_column_is_reported() {
        let spec = TableSpec::new("workout_counts", "workout_counts.workouts").with_sort_by("slug");
        let result = extract_table(&doc(), &spec);
        assert_eq!(result.output.num_rows(), 2);
        assert_eq!(
            result.diagnostics,
            vec![Diagnostic::new(Issue::SortColumnMissing {
                column: "slug".into()
            })
            .in_table("workout_counts")]
        );
    }

    #[test]
    fn spec_deserializes_from_yaml() {
        let spec: TableSpec = serde_yaml::from_str(
            r#"
name: streaks
selector: streaks
columns:
  start_date_of_current_weekly: "epoch:s"
"#,
        )
        .unwrap();
        assert_eq!(spec.flatten, None);
        assert_eq!(spec.columns.map(|c| c.len()), Some(1));

        let unknown = serde_yaml::from_str::<TableSpec>("name: a\nselector: b\npath: c\n");
        assert!(unknown.is_err());
    }
}
