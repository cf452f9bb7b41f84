//! Error handling for cohort extraction.
//!
//! Failures fall into three groups: warehouse access failures ([`QueryError`]),
//! invalid study configuration ([`ConfigError`]), and data-shape failures
//! raised while decoding or reshaping result tables.

use arrow::error::ArrowError;
use std::io;

/// Errors raised while running a query against the warehouse
#[derive(Debug, thiserror::Error)]
pub enum QueryError {
    /// Credentials were rejected or lack the required permission
    #[error("Unauthorized ({status}): {message}")]
    Unauthorized { status: u16, message: String },

    /// The service is unavailable, overloaded, or rate limited
    #[error("Service unavailable ({status}): {message}")]
    Unavailable { status: u16, message: String },

    /// The query text was rejected by the warehouse
    #[error("Invalid query: {0}")]
    InvalidQuery(String),

    /// A referenced dataset, table, or job does not exist
    #[error("Not found: {0}")]
    NotFound(String),

    /// The request never produced an HTTP response
    #[error("Transport error: {0}")]
    Transport(String),

    /// The response could not be turned into a table
    #[error("Decode error: {0}")]
    Decode(String),
}

impl QueryError {
    /// Whether this failure concerns access to the service rather than the
    /// query itself
    #[must_use]
    pub const fn is_access_failure(&self) -> bool {
        matches!(
            self,
            Self::Unauthorized { .. } | Self::Unavailable { .. } | Self::Transport(_)
        )
    }

    /// Classify an HTTP error response from the warehouse API
    ///
    /// `reason` is the first `errors[].reason` of the API error body, when present.
    #[must_use]
    pub fn from_status(status: u16, reason: Option<&str>, message: String) -> Self {
        match (status, reason) {
            (_, Some("rateLimitExceeded" | "backendError" | "internalError")) => {
                Self::Unavailable { status, message }
            }
            (401 | 403, _) => Self::Unauthorized { status, message },
            (404, _) => Self::NotFound(message),
            (429, _) | (500..=599, _) => Self::Unavailable { status, message },
            _ => Self::InvalidQuery(message),
        }
    }
}

impl From<reqwest::Error> for QueryError {
    fn from(error: reqwest::Error) -> Self {
        if error.is_decode() {
            Self::Decode(error.to_string())
        } else {
            Self::Transport(error.to_string())
        }
    }
}

/// Errors in the study configuration
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// No phenotypes are defined
    #[error("At least one phenotype must be configured")]
    NoPhenotypes,

    /// A phenotype name is empty or clashes with a fixed output column
    #[error("Invalid phenotype name: {0:?}")]
    InvalidPhenotypeName(String),

    /// Two phenotypes share a name
    #[error("Duplicate phenotype name: {0}")]
    DuplicatePhenotypeName(String),

    /// Two phenotypes share a concept identifier
    #[error("Duplicate phenotype concept id: {0}")]
    DuplicateConceptId(i64),

    /// The dataset identifier is not of the form `project.dataset`
    #[error("Invalid dataset identifier: {0:?}")]
    InvalidDataset(String),

    /// The extreme visit list is empty
    #[error("At least one extreme visit type must be configured")]
    NoVisitTypes,
}

/// Specialized error type for cohort extraction
#[derive(Debug, thiserror::Error)]
pub enum CohortError {
    /// Error opening, reading, or writing a file
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    /// Error building or writing Arrow data
    #[error("Arrow error: {0}")]
    Arrow(#[from] ArrowError),

    /// Error decoding a record batch into typed rows
    #[error("Row decoding error: {0}")]
    RowDecoding(#[from] serde_arrow::Error),

    /// Error parsing JSON
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Error running a query
    #[error("Query error: {0}")]
    Query(#[from] QueryError),

    /// Error in the study configuration
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// A result table is missing a column or has an unexpected shape
    #[error("Schema error: {0}")]
    Schema(String),

    /// Credentials for the warehouse could not be obtained
    #[error("Authentication error: {0}")]
    Auth(String),
}

/// Result type for cohort extraction operations
pub type Result<T> = std::result::Result<T, CohortError>;

/// Result type for query execution
pub type QueryResult<T> = std::result::Result<T, QueryError>;
