//! Covariate merging
//!
//! Left joins the cohort with the phenotype aggregate. Every person is kept
//! exactly once per input row; persons without occurrences get all flags
//! false and keep their query-time age.

use super::phenotype::PhenotypeAggregate;
use crate::models::covariate::{CovariateRow, CovariateTable};
use crate::models::person::Person;

/// Merge persons with their phenotype summaries
///
/// The output age is the minimum age at occurrence when the person has one,
/// even when it is greater than the query-time age; otherwise the query-time
/// age is kept.
#[must_use]
pub fn merge_covariates(persons: &[Person], aggregate: &PhenotypeAggregate) -> CovariateTable {
    let phenotype_count = aggregate.phenotype_names().len();

    let rows = persons
        .iter()
        .map(|person| {
            let summary = aggregate.get(person.person_id);
            CovariateRow {
                person_id: person.person_id,
                age: summary
                    .and_then(|s| s.min_age_at_occurrence)
                    .or(person.age),
                sex_at_birth: person.sex_at_birth.code(),
                flags: summary.map_or_else(|| vec![false; phenotype_count], |s| s.flags.clone()),
            }
        })
        .collect();

    CovariateTable::new(aggregate.phenotype_names().to_vec(), rows)
}
