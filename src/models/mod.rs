//! Data models for the cohort tables
//!
//! Typed rows decoded from the query results, and the covariate output.

pub mod condition;
pub mod covariate;
pub mod person;

pub use condition::ConditionOccurrence;
pub use covariate::{CovariateRow, CovariateTable};
pub use person::{Person, PersonRecord, SexAtBirth};
