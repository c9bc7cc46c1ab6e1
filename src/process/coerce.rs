use chrono::SecondsFormat;
use tracing::debug;

use crate::process::diagnostics::{Diagnostic, Issue, Normalized};
use crate::process::table::{Cell, Table};
use crate::process::{date_parser, utils};
use crate::schema::{ColumnSchema, ColumnType};

/// Convert every schema column present in `table` to its declared type.
///
/// Columns are all-or-nothing: one bad cell leaves that whole column as it
/// was and records a single diagnostic, while the other columns still
/// convert. Nulls stay null whatever the target. Columns the schema does not
/// name, and schema entries the table lacks, are ignored.
pub fn coerce(table: &Table, schema: &ColumnSchema) -> Normalized<Table> {
    let mut out = table.clone();
    let mut diagnostics = Vec::new();

    for (name, ty) in schema.iter() {
        let Some(idx) = out.column_index(name) else {
            debug!(column = %name, "schema column not in table, skipping");
            continue;
        };
        match coerce_column(&out, idx, name, ty) {
            Ok(cells) => out = out.with_column(idx, cells),
            Err(issue) => {
                let diag = Diagnostic::new(issue);
                diag.log();
                diagnostics.push(diag);
            }
        }
    }

    Normalized::with_diagnostics(out, diagnostics)
}

fn coerce_column(
    table: &Table,
    idx: usize,
    name: &str,
    ty: &ColumnType,
) -> Result<Vec<Cell>, Issue> {
    table
        .rows()
        .iter()
        .enumerate()
        .map(|(row, cells)| {
            let cell = &cells[idx];
            coerce_cell(cell, ty).map_err(|reason| Issue::ColumnCoercion {
                column: name.to_string(),
                target: ty.clone(),
                row,
                value: cell.to_json().to_string(),
                reason,
            })
        })
        .collect()
}

/// Convert a single cell. Cells already of the target type come back as-is.
pub fn coerce_cell(cell: &Cell, ty: &ColumnType) -> Result<Cell, String> {
    if cell.is_null() {
        return Ok(Cell::Null);
    }

    match ty {
        ColumnType::Integer => match cell {
            Cell::Int(i) => Ok(Cell::Int(*i)),
            Cell::Float(f) => utils::float_to_int(*f).map(Cell::Int),
            Cell::Bool(b) => Ok(Cell::Int(i64::from(*b))),
            Cell::Str(s) => utils::parse_int(s).map(Cell::Int),
            other => Err(unsupported(other, ty)),
        },
        ColumnType::Float => match cell {
            Cell::Float(f) => Ok(Cell::Float(*f)),
            Cell::Int(i) => Ok(Cell::Float(*i as f64)),
            Cell::Bool(b) => Ok(Cell::Float(if *b { 1.0 } else { 0.0 })),
            Cell::Str(s) => utils::parse_float(s).map(Cell::Float),
            other => Err(unsupported(other, ty)),
        },
        ColumnType::String => Ok(match cell {
            Cell::Null => Cell::Null,
            Cell::Str(s) => Cell::Str(s.clone()),
            Cell::Int(i) => Cell::Str(i.to_string()),
            Cell::Float(f) => Cell::Str(f.to_string()),
            Cell::Bool(b) => Cell::Str(b.to_string()),
            Cell::DateTime(dt) => Cell::Str(dt.to_rfc3339_opts(SecondsFormat::AutoSi, true)),
            Cell::Json(v) => Cell::Str(v.to_string()),
        }),
        ColumnType::DateTimeFromFormat(format) => match cell {
            Cell::DateTime(dt) => Ok(Cell::DateTime(*dt)),
            Cell::Str(s) => date_parser::parse_with_format(s, format).map(Cell::DateTime),
            other => Err(unsupported(other, ty)),
        },
        ColumnType::DateTimeIso => match cell {
            Cell::DateTime(dt) => Ok(Cell::DateTime(*dt)),
            Cell::Str(s) => date_parser::parse_iso(s).map(Cell::DateTime),
            other => Err(unsupported(other, ty)),
        },
        ColumnType::DateTimeFromUnit(unit) => match cell {
            Cell::DateTime(dt) => Ok(Cell::DateTime(*dt)),
            Cell::Int(i) => date_parser::from_epoch_int(*i, *unit).map(Cell::DateTime),
            Cell::Float(f) => date_parser::from_epoch_float(*f, *unit).map(Cell::DateTime),
            Cell::Str(s) => match utils::parse_int(s) {
                Ok(i) => date_parser::from_epoch_int(i, *unit),
                Err(_) => utils::parse_float(s)
                    .and_then(|f| date_parser::from_epoch_float(f, *unit)),
            }
            .map(Cell::DateTime),
            other => Err(unsupported(other, ty)),
        },
    }
}

fn unsupported(cell: &Cell, ty: &ColumnType) -> String {
    format!("{} values cannot become {}", cell.type_name(), ty)
}
