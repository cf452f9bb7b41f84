//! Arrow utility functions
//!
//! Helpers for checking the shape of query results, decoding them into typed
//! rows, and adjusting them for output.

use crate::error::{CohortError, Result};
use arrow::array::{ArrayRef, UInt64Array};
use arrow::datatypes::{DataType, Field, Schema};
use arrow::record_batch::RecordBatch;
use serde::de::DeserializeOwned;
use std::sync::Arc;

/// Ensure every named column exists in the batch
///
/// # Errors
/// Returns a schema error naming the first missing column
pub fn require_columns(batch: &RecordBatch, names: &[&str]) -> Result<()> {
    let schema = batch.schema();
    for name in names {
        if schema.index_of(name).is_err() {
            return Err(CohortError::Schema(format!(
                "Column {name} not found in result (columns: {})",
                schema
                    .fields()
                    .iter()
                    .map(|f| f.name().as_str())
                    .collect::<Vec<_>>()
                    .join(", ")
            )));
        }
    }
    Ok(())
}

/// Decode a batch into typed rows after checking the required columns
///
/// Columns not named by `T` are ignored.
pub fn decode_rows<T: DeserializeOwned>(batch: &RecordBatch, required: &[&str]) -> Result<Vec<T>> {
    require_columns(batch, required)?;
    Ok(serde_arrow::from_record_batch(batch)?)
}

/// Prepend an unnamed column holding the 0-based row position
pub fn with_index_column(batch: &RecordBatch) -> Result<RecordBatch> {
    let schema = batch.schema();
    let index: ArrayRef = Arc::new(UInt64Array::from_iter_values(
        0..batch.num_rows() as u64,
    ));

    let mut fields = vec![Arc::new(Field::new("", DataType::UInt64, false))];
    fields.extend(schema.fields().iter().cloned());
    let mut columns = vec![index];
    columns.extend(batch.columns().iter().cloned());

    Ok(RecordBatch::try_new(Arc::new(Schema::new(fields)), columns)?)
}

/// The first `n` rows of a batch
#[must_use]
pub fn head(batch: &RecordBatch, n: usize) -> RecordBatch {
    batch.slice(0, n.min(batch.num_rows()))
}
