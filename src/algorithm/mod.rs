//! Cohort consolidation algorithms

pub mod covariates;
pub mod phenotype;

pub use covariates::merge_covariates;
pub use phenotype::{PhenotypeAggregate, PhenotypeSummary, aggregate_phenotypes};
