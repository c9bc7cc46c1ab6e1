use anyhow::{Context, Result};
use arrow::record_batch::RecordBatch;
use parquet::arrow::ArrowWriter;
use parquet::basic::Compression;
use parquet::file::properties::WriterProperties;
use std::{
    fs::{self, File},
    path::{Path, PathBuf},
};
use tracing::{debug, info};

use crate::process::{convert::table_to_record_batch, Table};

/// Write one table to `<dir>/<name>.parquet`.
///
/// Returns `None` for a table with no columns (nothing to describe). The file
/// is written to a dot-prefixed temp name first, then renamed over the target.
pub fn write_table_parquet<P: AsRef<Path>>(
    name: &str,
    table: &Table,
    dir: P,
) -> Result<Option<PathBuf>> {
    let dir = dir.as_ref();
    if table.num_columns() == 0 {
        debug!(table = name, "no columns, not writing");
        return Ok(None);
    }

    let batch = table_to_record_batch(table)
        .with_context(|| format!("building record batch for {}", name))?;

    fs::create_dir_all(dir).with_context(|| format!("creating {:?}", dir))?;
    let path = dir.join(format!("{}.parquet", name));
    let tmp_path = dir.join(format!(".{}.parquet.tmp", name));

    write_batch(&batch, &tmp_path)?;
    fs::rename(&tmp_path, &path)
        .with_context(|| format!("renaming {:?} -> {:?}", tmp_path, path))?;

    info!(table = name, rows = batch.num_rows(), path = %path.display(), "wrote parquet");
    Ok(Some(path))
}

fn write_batch(batch: &RecordBatch, path: &Path) -> Result<()> {
    let file = File::create(path).with_context(|| format!("creating {:?}", path))?;
    let props = WriterProperties::builder()
        .set_compression(Compression::SNAPPY)
        .build();
    let mut writer = ArrowWriter::try_new(file, batch.schema(), Some(props))
        .context("creating Arrow writer")?;
    writer.write(batch).context("writing batch")?;
    writer.close().context("closing writer")?;
    Ok(())
}
