//! Conversion of BigQuery JSON rows into Arrow record batches
//!
//! The REST API returns every scalar as a JSON string. Columns are typed from
//! the result schema; nested and repeated values are kept as JSON text.
//! `TIMESTAMP` cells arrive as integer microseconds when requested with
//! `useInt64Timestamp`, otherwise as float seconds; both are accepted.

use super::api::{ErrorEnvelope, TableFieldSchema, TableRow};
use crate::error::{QueryError, QueryResult};
use arrow::array::{
    ArrayRef, BooleanBuilder, Date32Builder, Float64Builder, Int64Builder, StringBuilder,
    Time64MicrosecondBuilder, TimestampMicrosecondBuilder,
};
use arrow::datatypes::{DataType, Field, Schema, TimeUnit};
use arrow::record_batch::{RecordBatch, RecordBatchOptions};
use chrono::{Datelike, NaiveDate, NaiveDateTime, NaiveTime, Timelike};
use serde_json::Value;
use std::sync::Arc;

const UTC: &str = "UTC";

/// Arrow type used for a BigQuery column
#[must_use]
pub fn arrow_type(field: &TableFieldSchema) -> DataType {
    if field.is_repeated() {
        return DataType::Utf8;
    }

    match field.field_type.to_ascii_uppercase().as_str() {
        "INTEGER" | "INT64" => DataType::Int64,
        "FLOAT" | "FLOAT64" | "NUMERIC" | "BIGNUMERIC" => DataType::Float64,
        "BOOLEAN" | "BOOL" => DataType::Boolean,
        "DATE" => DataType::Date32,
        "TIMESTAMP" => DataType::Timestamp(TimeUnit::Microsecond, Some(UTC.into())),
        "DATETIME" => DataType::Timestamp(TimeUnit::Microsecond, None),
        "TIME" => DataType::Time64(TimeUnit::Microsecond),
        _ => DataType::Utf8,
    }
}

/// Arrow schema for a BigQuery result schema
#[must_use]
pub fn arrow_schema(fields: &[TableFieldSchema]) -> Schema {
    Schema::new(
        fields
            .iter()
            .map(|field| Field::new(&field.name, arrow_type(field), !field.is_required()))
            .collect::<Vec<_>>(),
    )
}

/// Build one record batch from the schema and all fetched rows
pub fn rows_to_batch(fields: &[TableFieldSchema], rows: &[TableRow]) -> QueryResult<RecordBatch> {
    for (row_idx, row) in rows.iter().enumerate() {
        if row.f.len() != fields.len() {
            return Err(QueryError::Decode(format!(
                "Row {row_idx} has {} cells, schema has {} fields",
                row.f.len(),
                fields.len()
            )));
        }
    }

    let columns = fields
        .iter()
        .enumerate()
        .map(|(col_idx, field)| {
            let cells = rows.iter().map(|row| &row.f[col_idx].v);
            build_column(field, cells)
        })
        .collect::<QueryResult<Vec<ArrayRef>>>()?;

    let options = RecordBatchOptions::new().with_row_count(Some(rows.len()));
    RecordBatch::try_new_with_options(Arc::new(arrow_schema(fields)), columns, &options)
        .map_err(|e| QueryError::Decode(e.to_string()))
}

fn build_column<'a>(
    field: &TableFieldSchema,
    cells: impl Iterator<Item = &'a Value>,
) -> QueryResult<ArrayRef> {
    let invalid = |value: &Value| {
        QueryError::Decode(format!(
            "Invalid {} value for column {}: {value}",
            field.field_type, field.name
        ))
    };

    let array: ArrayRef = match arrow_type(field) {
        DataType::Int64 => {
            let mut builder = Int64Builder::new();
            for value in cells {
                match value {
                    Value::Null => builder.append_null(),
                    Value::String(s) => builder.append_value(s.parse().map_err(|_| invalid(value))?),
                    Value::Number(n) => builder.append_value(n.as_i64().ok_or_else(|| invalid(value))?),
                    _ => return Err(invalid(value)),
                }
            }
            Arc::new(builder.finish())
        }
        DataType::Float64 => {
            let mut builder = Float64Builder::new();
            for value in cells {
                match value {
                    Value::Null => builder.append_null(),
                    Value::String(s) => builder.append_value(s.parse().map_err(|_| invalid(value))?),
                    Value::Number(n) => builder.append_value(n.as_f64().ok_or_else(|| invalid(value))?),
                    _ => return Err(invalid(value)),
                }
            }
            Arc::new(builder.finish())
        }
        DataType::Boolean => {
            let mut builder = BooleanBuilder::new();
            for value in cells {
                match value {
                    Value::Null => builder.append_null(),
                    Value::Bool(b) => builder.append_value(*b),
                    Value::String(s) if s.eq_ignore_ascii_case("true") => builder.append_value(true),
                    Value::String(s) if s.eq_ignore_ascii_case("false") => builder.append_value(false),
                    _ => return Err(invalid(value)),
                }
            }
            Arc::new(builder.finish())
        }
        DataType::Date32 => {
            let mut builder = Date32Builder::new();
            for value in cells {
                match value {
                    Value::Null => builder.append_null(),
                    Value::String(s) => {
                        let date = NaiveDate::parse_from_str(s, "%Y-%m-%d")
                            .map_err(|_| invalid(value))?;
                        builder.append_value(days_since_epoch(date));
                    }
                    _ => return Err(invalid(value)),
                }
            }
            Arc::new(builder.finish())
        }
        DataType::Timestamp(_, Some(_)) => {
            let mut builder = TimestampMicrosecondBuilder::new().with_timezone(UTC);
            for value in cells {
                match value {
                    Value::Null => builder.append_null(),
                    Value::String(s) => {
                        builder.append_value(timestamp_micros(s).ok_or_else(|| invalid(value))?);
                    }
                    _ => return Err(invalid(value)),
                }
            }
            Arc::new(builder.finish())
        }
        DataType::Timestamp(_, None) => {
            let mut builder = TimestampMicrosecondBuilder::new();
            for value in cells {
                match value {
                    Value::Null => builder.append_null(),
                    Value::String(s) => {
                        let datetime = NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S%.f")
                            .or_else(|_| NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S%.f"))
                            .map_err(|_| invalid(value))?;
                        builder.append_value(datetime.and_utc().timestamp_micros());
                    }
                    _ => return Err(invalid(value)),
                }
            }
            Arc::new(builder.finish())
        }
        DataType::Time64(_) => {
            let mut builder = Time64MicrosecondBuilder::new();
            for value in cells {
                match value {
                    Value::Null => builder.append_null(),
                    Value::String(s) => {
                        let time = NaiveTime::parse_from_str(s, "%H:%M:%S%.f")
                            .map_err(|_| invalid(value))?;
                        builder.append_value(
                            i64::from(time.num_seconds_from_midnight()) * MICROS_PER_SECOND
                                + i64::from(time.nanosecond() / 1_000),
                        );
                    }
                    _ => return Err(invalid(value)),
                }
            }
            Arc::new(builder.finish())
        }
        _ => {
            let mut builder = StringBuilder::new();
            for value in cells {
                match value {
                    Value::Null => builder.append_null(),
                    Value::String(s) => builder.append_value(s),
                    other => builder.append_value(other.to_string()),
                }
            }
            Arc::new(builder.finish())
        }
    };

    Ok(array)
}

/// Days from 0001-01-01 to 1970-01-01
const EPOCH_DAYS_FROM_CE: i32 = 719_163;

fn days_since_epoch(date: NaiveDate) -> i32 {
    date.num_days_from_ce() - EPOCH_DAYS_FROM_CE
}

const MICROS_PER_SECOND: i64 = 1_000_000;

/// Microseconds since the epoch of a `TIMESTAMP` cell
///
/// Integer text is microseconds; text with a fraction or exponent is seconds.
fn timestamp_micros(text: &str) -> Option<i64> {
    if text.contains(['.', 'e', 'E']) {
        let seconds: f64 = text.parse().ok()?;
        let micros = (seconds * 1e6).round();
        micros.is_finite().then_some(micros as i64)
    } else {
        text.parse().ok()
    }
}

/// Classify a non-2xx response body from the API
#[must_use]
pub fn api_error(status: u16, body: &str) -> QueryError {
    match serde_json::from_str::<ErrorEnvelope>(body) {
        Ok(envelope) => {
            let reason = envelope
                .error
                .errors
                .iter()
                .find_map(|detail| detail.reason.as_deref());
            QueryError::from_status(status, reason, envelope.error.message.clone())
        }
        Err(_) => QueryError::from_status(status, None, body.trim().to_string()),
    }
}
