// src/schema/arrow.rs

use arrow::datatypes::{DataType, Field as ArrowField, Schema as ArrowSchema, TimeUnit};
use std::sync::Arc;

use crate::process::{Cell, Table};

/// Timezone attached to every timestamp column.
pub const TIMESTAMP_TZ: &str = "UTC";

/// Pick an Arrow type for a column from the cells it actually holds.
///
/// Nulls are ignored:
/// - only integers              → Int64
/// - integers and/or floats     → Float64
/// - only bools                 → Boolean
/// - only datetimes             → Timestamp(µs, UTC)
/// - anything else / all null   → Utf8
pub fn infer_arrow_type<'a>(cells: impl IntoIterator<Item = &'a Cell>) -> DataType {
    let mut ints = false;
    let mut floats = false;
    let mut bools = false;
    let mut datetimes = false;
    let mut other = false;

    for cell in cells {
        match cell {
            Cell::Null => {}
            Cell::Int(_) => ints = true,
            Cell::Float(_) => floats = true,
            Cell::Bool(_) => bools = true,
            Cell::DateTime(_) => datetimes = true,
            Cell::Str(_) | Cell::Json(_) => other = true,
        }
    }

    match (ints, floats, bools, datetimes, other) {
        (true, false, false, false, false) => DataType::Int64,
        (_, true, false, false, false) => DataType::Float64,
        (false, false, true, false, false) => DataType::Boolean,
        (false, false, false, true, false) => {
            DataType::Timestamp(TimeUnit::Microsecond, Some(Arc::from(TIMESTAMP_TZ)))
        }
        _ => DataType::Utf8,
    }
}

/// Build an ArrowSchema (inside an Arc) for a table, every field nullable.
pub fn build_arrow_schema(table: &Table) -> Arc<ArrowSchema> {
    let fields: Vec<ArrowField> = table
        .columns()
        .iter()
        .enumerate()
        .map(|(idx, name)| {
            let dt = infer_arrow_type(table.rows().iter().map(|r| &r[idx]));
            ArrowField::new(name, dt, /* nullable = */ true)
        })
        .collect();

    Arc::new(ArrowSchema::new(fields))
}
