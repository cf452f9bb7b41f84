//! SQL text for the extraction queries
//!
//! Every query is generated from the study configuration. Identifier lists
//! are integers, so they are inlined directly.

use crate::config::{ConditionScope, PhenotypeMap};
use itertools::Itertools;

/// Column names produced by the condition query
pub mod columns {
    pub const PERSON_ID: &str = "PERSON_ID";
    pub const AGE: &str = "AGE";
    pub const SEX_AT_BIRTH: &str = "SEX_AT_BIRTH";
    pub const GENDER: &str = "GENDER";
    pub const PARENT_CONDITION_CONCEPT_ID: &str = "PARENT_CONDITION_CONCEPT_ID";
    pub const CONDITION_CONCEPT_NAME: &str = "CONDITION_CONCEPT_NAME";
    pub const VISIT_TYPE: &str = "VISIT_TYPE";
    pub const CONDITION_TYPE: &str = "CONDITION_TYPE";
    pub const AGE_AT_OCCURRENCE: &str = "AGE_AT_OCCURRENCE";
}

/// Comma separated list of identifiers for an `IN (...)` clause
#[must_use]
pub fn id_list(ids: impl IntoIterator<Item = i64>) -> String {
    ids.into_iter().join(", ")
}

/// Persons with EHR data, with age in whole years at query time
#[must_use]
pub fn person_query(dataset: &str) -> String {
    format!(
        "SELECT
    id AS PERSON_ID,
    DATE_DIFF(CURRENT_DATE(), CAST(date_of_birth AS DATE), YEAR) AS AGE,
    T_DISP_sex_at_birth AS SEX_AT_BIRTH,
    T_DISP_gender AS GENDER
FROM `{dataset}`.T_ENT_person
WHERE has_ehr_data = true"
    )
}

/// Condition occurrences of any descendant of a phenotype concept
///
/// Each phenotype concept is also mapped to itself so that occurrences coded
/// with the canonical concept are captured.
#[must_use]
pub fn condition_query(
    dataset: &str,
    phenotypes: &PhenotypeMap,
    scope: ConditionScope,
    extreme_visit_ids: &[i64],
) -> String {
    let codes = id_list(phenotypes.concept_ids());
    let self_mappings = phenotypes
        .concept_ids()
        .map(|code| {
            format!(
                "    UNION ALL SELECT {code} AS PARENT_CONDITION_CONCEPT_ID, {code} AS CHILD_CONDITION_CONCEPT_ID"
            )
        })
        .join("\n");
    let visit_filter = match scope {
        ConditionScope::AllVisits => String::new(),
        ConditionScope::ExtremeVisits => format!(
            "\n        WHERE visit_type IN ({})",
            id_list(extreme_visit_ids.iter().copied())
        ),
    };

    format!(
        "SELECT
    person_id AS PERSON_ID,
    PARENT_CONDITION_CONCEPT_ID AS PARENT_CONDITION_CONCEPT_ID,
    T_DISP_standard_concept_name AS CONDITION_CONCEPT_NAME,
    visit_occurrence_concept_name AS VISIT_TYPE,
    T_DISP_condition_type_concept_name AS CONDITION_TYPE,
    age_at_occurrence AS AGE_AT_OCCURRENCE
FROM
    (SELECT ancestor AS PARENT_CONDITION_CONCEPT_ID, descendant AS CHILD_CONDITION_CONCEPT_ID
        FROM `{dataset}`.T_HAD_conditionConcept_default
        WHERE ancestor IN ({codes})
{self_mappings}
    ) AS CONDITION_IDS
INNER JOIN
    (SELECT *
        FROM `{dataset}`.T_ENT_conditionOccurrence{visit_filter}
    ) AS CONDITION_OCCURRENCE
ON CONDITION_IDS.CHILD_CONDITION_CONCEPT_ID = CONDITION_OCCURRENCE.condition_concept_id"
    )
}

/// Raw demographic fields of persons with an anchor condition during one of
/// the given visit types
#[must_use]
pub fn demographics_query(dataset: &str, anchor_concept_id: i64, visit_type_ids: &[i64]) -> String {
    let visits = id_list(visit_type_ids.iter().copied());
    format!(
        "SELECT
    date_of_birth,
    ethnicity,
    T_DISP_ethnicity,
    ethnicity_concept_id,
    gender,
    T_DISP_gender,
    gender_concept_id,
    person_id,
    race,
    T_DISP_race,
    race_concept_id,
    self_reported_category,
    T_DISP_self_reported_category,
    self_reported_category_concept_id,
    sex_at_birth,
    T_DISP_sex_at_birth,
    sex_at_birth_concept_id
FROM `{dataset}`.T_ENT_person
WHERE id IN (
    SELECT person_id AS primary_id
    FROM `{dataset}`.T_ENT_conditionOccurrence
    WHERE
        condition_concept_id IN (
            SELECT descendant
            FROM `{dataset}`.T_HAD_conditionConcept_default
            WHERE ancestor = {anchor_concept_id}
            UNION ALL SELECT {anchor_concept_id})
        AND visit_type IN ({visits}))"
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::PhenotypeDefinition;

    fn phenotypes() -> PhenotypeMap {
        PhenotypeMap::new(vec![
            PhenotypeDefinition::new(4_183_609, "ACUTE_INFLUENZA"),
            PhenotypeDefinition::new(255_848, "PNEUMONIA"),
        ])
        .unwrap()
    }

    #[test]
    fn test_condition_query_all_visits() {
        let sql = condition_query("p.d", &phenotypes(), ConditionScope::AllVisits, &[8782]);

        assert!(sql.contains("WHERE ancestor IN (4183609, 255848)"));
        assert!(sql.contains("UNION ALL SELECT 4183609 AS PARENT_CONDITION_CONCEPT_ID, 4183609 AS CHILD_CONDITION_CONCEPT_ID"));
        assert!(sql.contains("UNION ALL SELECT 255848 AS PARENT_CONDITION_CONCEPT_ID"));
        assert!(sql.contains("FROM `p.d`.T_ENT_conditionOccurrence"));
        assert!(!sql.contains("visit_type IN"));
    }

    #[test]
    fn test_condition_query_extreme_visits() {
        let sql = condition_query(
            "p.d",
            &phenotypes(),
            ConditionScope::ExtremeVisits,
            &[8782, 32037],
        );

        assert!(sql.contains("WHERE visit_type IN (8782, 32037)"));
    }

    #[test]
    fn test_person_and_demographics_queries() {
        let person = person_query("p.d");
        assert!(person.contains("FROM `p.d`.T_ENT_person"));
        assert!(person.contains("has_ehr_data = true"));

        let demographics = demographics_query("p.d", 4_266_367, &[8668, 9203]);
        assert!(demographics.contains("WHERE ancestor = 4266367"));
        assert!(demographics.contains("UNION ALL SELECT 4266367)"));
        assert!(demographics.contains("visit_type IN (8668, 9203)"));
    }
}
