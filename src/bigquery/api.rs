//! Wire types of the BigQuery v2 REST API
//!
//! Only the fields the extraction reads are modelled; everything else in the
//! responses is ignored.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Body of `jobs.query`
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QueryRequest {
    pub query: String,
    pub use_legacy_sql: bool,
    pub max_results: u32,
    pub timeout_ms: u32,
    pub format_options: FormatOptions,
}

/// Output formatting of result cells
#[derive(Debug, Clone, Copy, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FormatOptions {
    /// Send `TIMESTAMP` cells as integer microseconds instead of float seconds
    pub use_int64_timestamp: bool,
}

/// Response of `jobs.query` and `jobs.getQueryResults`
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QueryResponse {
    pub schema: Option<TableSchema>,
    pub job_reference: Option<JobReference>,
    pub total_rows: Option<String>,
    pub page_token: Option<String>,
    #[serde(default)]
    pub rows: Vec<TableRow>,
    #[serde(default)]
    pub job_complete: bool,
}

/// Response of `tabledata.list`
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TableDataList {
    pub total_rows: Option<String>,
    pub page_token: Option<String>,
    #[serde(default)]
    pub rows: Vec<TableRow>,
}

/// Response of `jobs.get`, reduced to the destination table
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Job {
    pub configuration: Option<JobConfiguration>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JobConfiguration {
    pub query: Option<JobConfigurationQuery>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JobConfigurationQuery {
    pub destination_table: Option<TableReference>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JobReference {
    pub project_id: String,
    pub job_id: String,
    pub location: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TableReference {
    pub project_id: String,
    pub dataset_id: String,
    pub table_id: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct TableSchema {
    #[serde(default)]
    pub fields: Vec<TableFieldSchema>,
}

/// One column of a result schema
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct TableFieldSchema {
    pub name: String,
    #[serde(rename = "type")]
    pub field_type: String,
    pub mode: Option<String>,
}

impl TableFieldSchema {
    #[must_use]
    pub fn is_repeated(&self) -> bool {
        self.mode.as_deref() == Some("REPEATED")
    }

    #[must_use]
    pub fn is_required(&self) -> bool {
        self.mode.as_deref() == Some("REQUIRED")
    }
}

/// A result row: one cell per schema field, in schema order
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TableRow {
    #[serde(default)]
    pub f: Vec<TableCell>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct TableCell {
    #[serde(default)]
    pub v: Value,
}

/// Error envelope returned with non-2xx responses
#[derive(Debug, Clone, Deserialize)]
pub struct ErrorEnvelope {
    pub error: ErrorBody,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ErrorBody {
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub errors: Vec<ErrorDetail>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ErrorDetail {
    pub reason: Option<String>,
}

/// Response of the metadata server token endpoint
#[derive(Debug, Clone, Deserialize)]
pub struct MetadataToken {
    pub access_token: String,
}
