//! Console output utilities
//!
//! Stage messages go to stdout so that they appear regardless of the log level.

use crate::error::Result;
use crate::utils::arrow_utils::head;
use arrow::record_batch::RecordBatch;
use arrow::util::pretty::pretty_format_batches;

/// Announce the start of a pipeline stage
pub fn print_stage(message: &str) {
    println!("{message}");
}

/// Print the first rows of a batch as a table
pub fn print_preview(batch: &RecordBatch, num_rows: usize) -> Result<()> {
    let preview = head(batch, num_rows);
    println!("{}", pretty_format_batches(&[preview])?);
    println!(
        "[{} of {} rows, {} columns]",
        num_rows.min(batch.num_rows()),
        batch.num_rows(),
        batch.num_columns()
    );
    Ok(())
}
