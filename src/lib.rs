//! A Rust library for extracting cohort covariates and phenotype labels
//! from a BigQuery clinical data warehouse.

pub mod algorithm;
pub mod bigquery;
pub mod config;
pub mod error;
pub mod models;
pub mod output;
pub mod pipeline;
pub mod query;
pub mod utils;

// Re-export the most common types for easier use
// Core types
pub use config::{ConditionScope, FallbackPolicy, PhenotypeDefinition, PhenotypeMap, StudyConfig};
pub use error::{CohortError, ConfigError, QueryError, QueryResult, Result};
pub use models::{ConditionOccurrence, CovariateRow, CovariateTable, Person, SexAtBirth};

// Query execution
pub use bigquery::{BigQueryClient, ReadPath};
pub use query::{QueryBackend, QueryExecutor};

// Consolidation
pub use algorithm::{PhenotypeAggregate, PhenotypeSummary, aggregate_phenotypes, merge_covariates};
pub use models::person::sex_is_concordant;

// Arrow types
pub use arrow::record_batch::RecordBatch;
