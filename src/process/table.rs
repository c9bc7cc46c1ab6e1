use chrono::{DateTime, SecondsFormat, Utc};
use serde_json::{Map, Value};
use std::cmp::Ordering;
use std::collections::HashMap;

/// One table cell. Scalars come straight from JSON; `DateTime` only appears
/// after coercion; `Json` holds arrays/objects nobody flattened.
#[derive(Debug, Clone, PartialEq)]
pub enum Cell {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
    DateTime(DateTime<Utc>),
    Json(Value),
}

impl Cell {
    pub fn is_null(&self) -> bool {
        matches!(self, Cell::Null)
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Cell::Int(i) => Some(*i),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Cell::Float(f) => Some(*f),
            Cell::Int(i) => Some(*i as f64),
            _ => None,
        }
    }

    pub fn as_datetime(&self) -> Option<&DateTime<Utc>> {
        match self {
            Cell::DateTime(dt) => Some(dt),
            _ => None,
        }
    }

    /// Short tag used in diagnostics.
    pub fn type_name(&self) -> &'static str {
        match self {
            Cell::Null => "null",
            Cell::Bool(_) => "bool",
            Cell::Int(_) => "integer",
            Cell::Float(_) => "float",
            Cell::Str(_) => "string",
            Cell::DateTime(_) => "datetime",
            Cell::Json(Value::Array(_)) => "array",
            Cell::Json(_) => "object",
        }
    }

    /// Back to JSON. Datetimes become RFC 3339 strings.
    pub fn to_json(&self) -> Value {
        match self {
            Cell::Null => Value::Null,
            Cell::Bool(b) => Value::Bool(*b),
            Cell::Int(i) => Value::from(*i),
            Cell::Float(f) => serde_json::Number::from_f64(*f)
                .map(Value::Number)
                .unwrap_or(Value::Null),
            Cell::Str(s) => Value::String(s.clone()),
            Cell::DateTime(dt) => Value::String(dt.to_rfc3339_opts(SecondsFormat::AutoSi, true)),
            Cell::Json(v) => v.clone(),
        }
    }

    /// Ordering for sorting rows: nulls last, numbers numerically, then
    /// strings, datetimes, bools, and JSON by its text.
    pub fn sort_cmp(&self, other: &Cell) -> Ordering {
        fn rank(c: &Cell) -> u8 {
            match c {
                Cell::Int(_) | Cell::Float(_) => 0,
                Cell::Str(_) => 1,
                Cell::DateTime(_) => 2,
                Cell::Bool(_) => 3,
                Cell::Json(_) => 4,
                Cell::Null => 5,
            }
        }
        match (self, other) {
            (Cell::Int(a), Cell::Int(b)) => a.cmp(b),
            (Cell::Str(a), Cell::Str(b)) => a.cmp(b),
            (Cell::DateTime(a), Cell::DateTime(b)) => a.cmp(b),
            (Cell::Bool(a), Cell::Bool(b)) => a.cmp(b),
            (Cell::Json(a), Cell::Json(b)) => a.to_string().cmp(&b.to_string()),
            (a, b) => match (a.as_f64(), b.as_f64()) {
                (Some(x), Some(y)) => x.total_cmp(&y),
                _ => rank(a).cmp(&rank(b)),
            },
        }
    }
}

impl From<&Value> for Cell {
    fn from(value: &Value) -> Self {
        match value {
            Value::Null => Cell::Null,
            Value::Bool(b) => Cell::Bool(*b),
            Value::Number(n) => match n.as_i64() {
                Some(i) => Cell::Int(i),
                None => n.as_f64().map(Cell::Float).unwrap_or(Cell::Null),
            },
            Value::String(s) => Cell::Str(s.clone()),
            Value::Array(_) | Value::Object(_) => Cell::Json(value.clone()),
        }
    }
}

/// Rows of cells under an ordered set of column names. Every row has exactly
/// one cell per column. Transforms never mutate a table; they build a new one.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Table {
    columns: Vec<String>,
    rows: Vec<Vec<Cell>>,
}

impl Table {
    pub fn empty() -> Self {
        Self::default()
    }

    /// Build from rows that already line up with `columns`.
    ///
    /// Short rows are padded with `Null`; extra cells are dropped.
    pub fn from_rows(columns: Vec<String>, rows: Vec<Vec<Cell>>) -> Self {
        let width = columns.len();
        let rows = rows
            .into_iter()
            .map(|mut row| {
                row.resize(width, Cell::Null);
                row
            })
            .collect();
        Self { columns, rows }
    }

    /// Build from JSON objects. Columns are the union of keys in first-seen
    /// order; a record missing a key gets `Null` there.
    pub fn from_records<'a, I>(records: I) -> Self
    where
        I: IntoIterator<Item = &'a Map<String, Value>>,
    {
        let records: Vec<&Map<String, Value>> = records.into_iter().collect();
        let mut columns: Vec<String> = Vec::new();
        let mut index: HashMap<String, usize> = HashMap::new();
        for record in &records {
            for key in record.keys() {
                if !index.contains_key(key) {
                    index.insert(key.clone(), columns.len());
                    columns.push(key.clone());
                }
            }
        }

        let rows = records
            .iter()
            .map(|record| {
                columns
                    .iter()
                    .map(|c| record.get(c).map(Cell::from).unwrap_or(Cell::Null))
                    .collect()
            })
            .collect();

        Self { columns, rows }
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn rows(&self) -> &[Vec<Cell>] {
        &self.rows
    }

    pub fn num_rows(&self) -> usize {
        self.rows.len()
    }

    pub fn num_columns(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == name)
    }

    pub fn column(&self, name: &str) -> Option<Vec<&Cell>> {
        let idx = self.column_index(name)?;
        Some(self.rows.iter().map(|r| &r[idx]).collect())
    }

    pub fn get(&self, row: usize, column: &str) -> Option<&Cell> {
        let idx = self.column_index(column)?;
        self.rows.get(row).map(|r| &r[idx])
    }

    /// Copy of this table with one column's cells swapped out.
    pub fn with_column(&self, idx: usize, cells: Vec<Cell>) -> Self {
        let rows = self
            .rows
            .iter()
            .zip(cells)
            .map(|(row, cell)| {
                let mut row = row.clone();
                row[idx] = cell;
                row
            })
            .collect();
        Self {
            columns: self.columns.clone(),
            rows,
        }
    }

    /// Copy of this table with rows stably sorted on one column.
    pub fn sorted_by(&self, idx: usize) -> Self {
        let mut rows = self.rows.clone();
        rows.sort_by(|a, b| a[idx].sort_cmp(&b[idx]));
        Self {
            columns: self.columns.clone(),
            rows,
        }
    }

    /// Rows as JSON objects, keys in column order.
    pub fn to_records(&self) -> Vec<Value> {
        self.rows
            .iter()
            .map(|row| {
                let map: Map<String, Value> = self
                    .columns
                    .iter()
                    .zip(row)
                    .map(|(c, cell)| (c.clone(), cell.to_json()))
                    .collect();
                Value::Object(map)
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn objects(v: &Value) -> Vec<&Map<String, Value>> {
        v.as_array()
            .unwrap()
            .iter()
            .map(|r| r.as_object().unwrap())
            .collect()
    }

    #[test]
    fn from_records_takes_union_of_keys() {
        let data = json!([{"a": 1, "b": "x"}, {"c": 2.5, "a": 2}]);
        let t = Table::from_records(objects(&data));
        assert_eq!(t.columns(), ["a", "b", "c"]);
        assert_eq!(t.num_rows(), 2);
        assert_eq!(t.get(0, "c"), Some(&Cell::Null));
        assert_eq!(t.get(1, "b"), Some(&Cell::Null));
        assert_eq!(t.get(1, "c"), Some(&Cell::Float(2.5)));
        assert_eq!(t.get(1, "a"), Some(&Cell::Int(2)));
    }

    #[test]
    fn compound_values_are_kept_as_json() {
        let data = json!([{"template": {"x": 1}, "tags": [1, 2]}]);
        let t = Table::from_records(objects(&data));
        assert_eq!(t.get(0, "template"), Some(&Cell::Json(json!({"x": 1}))));
        assert_eq!(t.get(0, "tags").map(Cell::type_name), Some("array"));
    }

    #[test]
    fn to_records_restores_objects() {
        let data = json!([{"a": 1, "b": null}, {"a": 2, "b": "y"}]);
        let t = Table::from_records(objects(&data));
        assert_eq!(t.to_records(), data.as_array().unwrap().clone());
    }

    #[test]
    fn sort_puts_nulls_last_and_mixes_numbers() {
        let t = Table::from_rows(
            vec!["k".into()],
            vec![
                vec![Cell::Null],
                vec![Cell::Float(2.5)],
                vec![Cell::Int(1)],
                vec![Cell::Int(10)],
            ],
        );
        let sorted = t.sorted_by(0);
        let keys: Vec<&Cell> = sorted.column("k").unwrap();
        assert_eq!(
            keys,
            [&Cell::Int(1), &Cell::Float(2.5), &Cell::Int(10), &Cell::Null]
        );
        // original untouched
        assert_eq!(t.get(0, "k"), Some(&Cell::Null));
    }

    #[test]
    fn from_rows_pads_short_rows() {
        let t = Table::from_rows(
            vec!["a".into(), "b".into()],
            vec![vec![Cell::Int(1)]],
        );
        assert_eq!(t.get(0, "b"), Some(&Cell::Null));
    }
}
