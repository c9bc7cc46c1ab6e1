use crate::process::table::{Cell, Table};
use crate::schema::arrow::{build_arrow_schema, TIMESTAMP_TZ};
use anyhow::{bail, Result};
use arrow::{
    array::{
        ArrayRef, BooleanBuilder, Float64Builder, Int64Builder, StringBuilder,
        TimestampMicrosecondBuilder,
    },
    datatypes::{DataType, TimeUnit},
    record_batch::RecordBatch,
};
use std::sync::Arc;

/// Convert a table into a single Arrow record batch, one typed array per
/// column (types from [`build_arrow_schema`]).
pub fn table_to_record_batch(table: &Table) -> Result<RecordBatch> {
    if table.num_columns() == 0 {
        bail!("table has no columns");
    }
    let schema = build_arrow_schema(table);
    let mut out = Vec::with_capacity(table.num_columns());

    for (idx, fld) in schema.fields().iter().enumerate() {
        let cells = table.rows().iter().map(|r| &r[idx]);
        let col: ArrayRef = match fld.data_type() {
            DataType::Int64 => {
                let mut b = Int64Builder::new();
                for cell in cells {
                    b.append_option(cell.as_i64());
                }
                Arc::new(b.finish())
            }
            DataType::Float64 => {
                let mut b = Float64Builder::new();
                for cell in cells {
                    b.append_option(cell.as_f64());
                }
                Arc::new(b.finish())
            }
            DataType::Boolean => {
                let mut b = BooleanBuilder::new();
                for cell in cells {
                    b.append_option(match cell {
                        Cell::Bool(v) => Some(*v),
                        _ => None,
                    });
                }
                Arc::new(b.finish())
            }
            DataType::Timestamp(TimeUnit::Microsecond, _) => {
                let mut b = TimestampMicrosecondBuilder::new();
                for cell in cells {
                    b.append_option(cell.as_datetime().map(|dt| dt.timestamp_micros()));
                }
                Arc::new(b.finish().with_timezone(TIMESTAMP_TZ))
            }
            // Everything else is rendered as text
            _ => {
                let mut b = StringBuilder::new();
                for cell in cells {
                    match cell {
                        Cell::Null => b.append_null(),
                        Cell::Str(s) => b.append_value(s),
                        other => b.append_value(other.to_json().to_string()),
                    }
                }
                Arc::new(b.finish())
            }
        };
        out.push(col);
    }

    RecordBatch::try_new(schema, out).map_err(Into::into)
}

#[cfg(test)]
mod tests {
    use super::*;
    use arrow::array::{Array, Int64Array, StringArray, TimestampMicrosecondArray};
    use chrono::{TimeZone, Utc};
    use serde_json::json;

    #[test]
    fn typed_columns_round_out() -> Result<()> {
        let when = Utc.with_ymd_and_hms(2024, 9, 2, 0, 0, 0).unwrap();
        let table = Table::from_rows(
            vec!["count".into(), "when".into(), "tags".into()],
            vec![
                vec![Cell::Int(3), Cell::DateTime(when), Cell::Json(json!(["a"]))],
                vec![Cell::Null, Cell::Null, Cell::Str("plain".into())],
            ],
        );

        let batch = table_to_record_batch(&table)?;

        assert_eq!(batch.num_rows(), 2);
        let count = batch.column(0).as_any().downcast_ref::<Int64Array>().unwrap();
        assert_eq!(count.value(0), 3);
        assert!(count.is_null(1));
        let ts = batch
            .column(1)
            .as_any()
            .downcast_ref::<TimestampMicrosecondArray>()
            .unwrap();
        assert_eq!(ts.value(0), when.timestamp_micros());
        let tags = batch.column(2).as_any().downcast_ref::<StringArray>().unwrap();
        assert_eq!(tags.value(0), r#"["a"]"#);
        assert_eq!(tags.value(1), "plain");
        Ok(())
    }

    #[test]
    fn column_less_table_is_refused() {
        assert!(table_to_record_batch(&Table::empty()).is_err());
    }
}
