//! Person entity model
//!
//! Persons come from the person query with the sex at birth and gender
//! display labels. Only persons whose labels are concordant enter the cohort;
//! their sex at birth is then binary encoded.

use crate::error::Result;
use crate::query::sql::columns;
use crate::utils::arrow_utils::decode_rows;
use arrow::record_batch::RecordBatch;
use serde::Deserialize;
use std::fmt;

/// Whether sex at birth and gender form one of the accepted pairings
///
/// Only `("Male", "Man")` and `("Female", "Woman")` are concordant. Matching is
/// exact; any other label, including unspecified values, is discordant.
#[must_use]
pub fn sex_is_concordant(sex_at_birth: &str, gender: &str) -> bool {
    matches!(
        (sex_at_birth, gender),
        ("Male", "Man") | ("Female", "Woman")
    )
}

/// Binary sex at birth of a concordant person
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SexAtBirth {
    Female,
    Male,
}

impl SexAtBirth {
    /// Output encoding: 1 for male, 0 for female
    #[must_use]
    pub const fn code(self) -> i64 {
        match self {
            Self::Male => 1,
            Self::Female => 0,
        }
    }
}

impl fmt::Display for SexAtBirth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Male => write!(f, "Male"),
            Self::Female => write!(f, "Female"),
        }
    }
}

/// A row of the person query, before the concordance filter
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct PersonRecord {
    #[serde(rename = "PERSON_ID")]
    pub person_id: i64,
    /// Whole years from birth to the query date; null without a birth date
    #[serde(rename = "AGE")]
    pub age: Option<i64>,
    #[serde(rename = "SEX_AT_BIRTH")]
    pub sex_at_birth: Option<String>,
    #[serde(rename = "GENDER")]
    pub gender: Option<String>,
}

impl PersonRecord {
    /// Whether the record passes the concordance filter
    #[must_use]
    pub fn sex_is_concordant(&self) -> bool {
        match (&self.sex_at_birth, &self.gender) {
            (Some(sex), Some(gender)) => sex_is_concordant(sex, gender),
            _ => false,
        }
    }
}

/// A cohort member
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Person {
    pub person_id: i64,
    pub age: Option<i64>,
    pub sex_at_birth: SexAtBirth,
}

impl Person {
    /// Create a new person
    #[must_use]
    pub const fn new(person_id: i64, age: Option<i64>, sex_at_birth: SexAtBirth) -> Self {
        Self {
            person_id,
            age,
            sex_at_birth,
        }
    }

    /// Admit a record to the cohort, or `None` if it is discordant
    #[must_use]
    pub fn from_record(record: &PersonRecord) -> Option<Self> {
        if !record.sex_is_concordant() {
            return None;
        }

        let sex_at_birth = if record.sex_at_birth.as_deref() == Some("Male") {
            SexAtBirth::Male
        } else {
            SexAtBirth::Female
        };

        Some(Self::new(record.person_id, record.age, sex_at_birth))
    }
}

/// Decode the person query result into records
pub fn person_records(batch: &RecordBatch) -> Result<Vec<PersonRecord>> {
    decode_rows(
        batch,
        &[
            columns::PERSON_ID,
            columns::AGE,
            columns::SEX_AT_BIRTH,
            columns::GENDER,
        ],
    )
}

/// Decode the person query result and keep only concordant persons
///
/// Input order is preserved.
pub fn concordant_persons(batch: &RecordBatch) -> Result<Vec<Person>> {
    let records = person_records(batch)?;
    let persons: Vec<Person> = records.iter().filter_map(Person::from_record).collect();

    log::debug!(
        "Kept {} of {} persons with concordant sex and gender",
        persons.len(),
        records.len()
    );

    Ok(persons)
}
