//! Delimited text output
//!
//! Batches are written with the Arrow CSV writer. Booleans appear as
//! `true`/`false` and nulls as empty cells. The file is first written next to
//! the target and then renamed over it, so the target is either the previous
//! file or the complete new one.

use crate::error::Result;
use crate::utils::arrow_utils::with_index_column;
use crate::utils::logging::{log_operation_complete, log_operation_start};
use arrow::csv::WriterBuilder;
use arrow::record_batch::RecordBatch;
use std::fs::{self, File};
use std::io::BufWriter;
use std::path::{Path, PathBuf};
use std::time::Instant;

/// Layout of a delimited output file
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DelimitedFormat {
    /// Field separator
    pub delimiter: u8,
    /// Whether to prepend an unnamed 0-based row index column
    pub include_index: bool,
}

impl DelimitedFormat {
    /// Comma separated, no index column
    pub const CSV: Self = Self {
        delimiter: b',',
        include_index: false,
    };

    /// Tab separated with a leading index column
    pub const TSV_WITH_INDEX: Self = Self {
        delimiter: b'\t',
        include_index: true,
    };
}

/// Write a batch with a header row to `path`, overwriting any existing file
pub fn write_delimited(batch: &RecordBatch, path: &Path, format: DelimitedFormat) -> Result<()> {
    let target = path.display().to_string();
    log_operation_start("Writing", &target);
    let start = Instant::now();

    let indexed;
    let batch = if format.include_index {
        indexed = with_index_column(batch)?;
        &indexed
    } else {
        batch
    };

    let temp_path = temp_path_for(path);
    if let Err(e) = write_file(batch, &temp_path, format.delimiter) {
        let _ = fs::remove_file(&temp_path);
        return Err(e);
    }
    fs::rename(&temp_path, path)?;

    log_operation_complete("wrote", &target, batch.num_rows(), Some(start.elapsed()));
    Ok(())
}

/// Sibling of `path` the output is staged in
fn temp_path_for(path: &Path) -> PathBuf {
    let mut name = path.file_name().unwrap_or_default().to_os_string();
    name.push(".tmp");
    path.with_file_name(name)
}

fn write_file(batch: &RecordBatch, path: &Path, delimiter: u8) -> Result<()> {
    let mut writer = WriterBuilder::new()
        .with_header(true)
        .with_delimiter(delimiter)
        .build(BufWriter::new(File::create(path)?));
    writer.write(batch)?;

    let file = writer
        .into_inner()
        .into_inner()
        .map_err(|e| e.into_error())?;
    file.sync_all()?;
    Ok(())
}
