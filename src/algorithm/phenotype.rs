//! Phenotype aggregation
//!
//! Collapses condition occurrences into one summary per person: a flag per
//! phenotype (logical OR over the person's occurrences) and the minimum age
//! at occurrence over all of them. Both reductions are order independent.

use crate::config::PhenotypeMap;
use crate::models::condition::ConditionOccurrence;
use rustc_hash::FxHashMap;

/// Per-person result of the aggregation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PhenotypeSummary {
    /// One flag per phenotype, in phenotype map order
    pub flags: Vec<bool>,
    /// Smallest non-null age at occurrence across all the person's rows
    pub min_age_at_occurrence: Option<i64>,
}

impl PhenotypeSummary {
    fn empty(phenotype_count: usize) -> Self {
        Self {
            flags: vec![false; phenotype_count],
            min_age_at_occurrence: None,
        }
    }

    fn record(&mut self, phenotype: Option<usize>, age: Option<i64>) {
        if let Some(idx) = phenotype {
            self.flags[idx] = true;
        }
        self.min_age_at_occurrence = match (self.min_age_at_occurrence, age) {
            (Some(current), Some(age)) => Some(current.min(age)),
            (current, None) => current,
            (None, age) => age,
        };
    }
}

/// Summaries keyed by person identifier
///
/// Persons without any occurrence are absent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PhenotypeAggregate {
    phenotype_names: Vec<String>,
    by_person: FxHashMap<i64, PhenotypeSummary>,
}

impl PhenotypeAggregate {
    /// Summary for a person, if they had any occurrence
    #[must_use]
    pub fn get(&self, person_id: i64) -> Option<&PhenotypeSummary> {
        self.by_person.get(&person_id)
    }

    /// Phenotype names in flag order
    #[must_use]
    pub fn phenotype_names(&self) -> &[String] {
        &self.phenotype_names
    }

    /// Number of persons with at least one occurrence
    #[must_use]
    pub fn len(&self) -> usize {
        self.by_person.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.by_person.is_empty()
    }

    /// Person identifiers with at least one occurrence, in ascending order
    #[must_use]
    pub fn person_ids(&self) -> Vec<i64> {
        let mut ids: Vec<i64> = self.by_person.keys().copied().collect();
        ids.sort_unstable();
        ids
    }
}

/// Aggregate condition occurrences per person
///
/// Occurrences whose parent concept is not in the map still count towards
/// the minimum age but set no flag.
#[must_use]
pub fn aggregate_phenotypes(
    occurrences: &[ConditionOccurrence],
    phenotypes: &PhenotypeMap,
) -> PhenotypeAggregate {
    let mut by_person: FxHashMap<i64, PhenotypeSummary> = FxHashMap::default();
    let mut untracked = 0usize;

    for occurrence in occurrences {
        let phenotype = phenotypes.index_of(occurrence.parent_concept_id);
        if phenotype.is_none() {
            untracked += 1;
        }

        by_person
            .entry(occurrence.person_id)
            .or_insert_with(|| PhenotypeSummary::empty(phenotypes.len()))
            .record(phenotype, occurrence.age_at_occurrence);
    }

    if untracked > 0 {
        log::warn!("{untracked} condition rows have an untracked parent concept");
    }

    PhenotypeAggregate {
        phenotype_names: phenotypes.names().map(str::to_string).collect(),
        by_person,
    }
}
