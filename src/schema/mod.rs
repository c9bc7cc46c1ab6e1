pub mod arrow;
pub mod types;
pub mod write;

pub use arrow::{build_arrow_schema, infer_arrow_type};
pub use types::{ColumnSchema, ColumnType, ColumnTypeError, EpochUnit};
pub use write::write_table_parquet;
