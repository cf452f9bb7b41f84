//! Condition occurrence model
//!
//! One row per occurrence of a descendant of a tracked phenotype concept,
//! labelled with the phenotype's parent concept.

use crate::error::Result;
use crate::query::sql::columns;
use crate::utils::arrow_utils::decode_rows;
use arrow::record_batch::RecordBatch;
use serde::Deserialize;

/// A row of the condition query
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ConditionOccurrence {
    #[serde(rename = "PERSON_ID")]
    pub person_id: i64,
    /// Canonical phenotype concept the occurrence was matched under
    #[serde(rename = "PARENT_CONDITION_CONCEPT_ID")]
    pub parent_concept_id: i64,
    #[serde(rename = "CONDITION_CONCEPT_NAME", default)]
    pub concept_name: Option<String>,
    #[serde(rename = "VISIT_TYPE", default)]
    pub visit_type: Option<String>,
    #[serde(rename = "CONDITION_TYPE", default)]
    pub condition_type: Option<String>,
    #[serde(rename = "AGE_AT_OCCURRENCE")]
    pub age_at_occurrence: Option<i64>,
}

impl ConditionOccurrence {
    /// Create an occurrence with only the fields the aggregation reads
    #[must_use]
    pub const fn new(person_id: i64, parent_concept_id: i64, age_at_occurrence: Option<i64>) -> Self {
        Self {
            person_id,
            parent_concept_id,
            concept_name: None,
            visit_type: None,
            condition_type: None,
            age_at_occurrence,
        }
    }

    /// Set the descriptive labels
    #[must_use]
    pub fn with_labels(mut self, concept_name: &str, visit_type: &str, condition_type: &str) -> Self {
        self.concept_name = Some(concept_name.to_string());
        self.visit_type = Some(visit_type.to_string());
        self.condition_type = Some(condition_type.to_string());
        self
    }
}

/// Decode the condition query result
pub fn condition_occurrences(batch: &RecordBatch) -> Result<Vec<ConditionOccurrence>> {
    decode_rows(
        batch,
        &[
            columns::PERSON_ID,
            columns::PARENT_CONDITION_CONCEPT_ID,
            columns::AGE_AT_OCCURRENCE,
        ],
    )
}
