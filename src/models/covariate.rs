//! Covariate table model
//!
//! The final output: one row per cohort member with the resolved age, the
//! encoded sex at birth and one flag per phenotype.

use crate::config::phenotype::FIXED_COLUMNS;
use crate::error::Result;
use arrow::array::{ArrayRef, BooleanArray, Int64Array};
use arrow::datatypes::{DataType, Field, Schema};
use arrow::record_batch::RecordBatch;
use std::sync::Arc;

/// One output row
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CovariateRow {
    pub person_id: i64,
    /// Age at the first qualifying event, else age at query time
    pub age: Option<i64>,
    /// 1 for male, 0 for female
    pub sex_at_birth: i64,
    /// Phenotype flags in phenotype column order
    pub flags: Vec<bool>,
}

/// Covariates for the whole cohort
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CovariateTable {
    phenotype_names: Vec<String>,
    rows: Vec<CovariateRow>,
}

impl CovariateTable {
    /// Create a table; every row must carry one flag per phenotype name
    #[must_use]
    pub fn new(phenotype_names: Vec<String>, rows: Vec<CovariateRow>) -> Self {
        debug_assert!(rows.iter().all(|row| row.flags.len() == phenotype_names.len()));
        Self {
            phenotype_names,
            rows,
        }
    }

    /// Phenotype column names in output order
    #[must_use]
    pub fn phenotype_names(&self) -> &[String] {
        &self.phenotype_names
    }

    /// Rows in cohort order
    #[must_use]
    pub fn rows(&self) -> &[CovariateRow] {
        &self.rows
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// First row for a person
    #[must_use]
    pub fn row(&self, person_id: i64) -> Option<&CovariateRow> {
        self.rows.iter().find(|row| row.person_id == person_id)
    }

    /// Flag value of a phenotype for a person
    #[must_use]
    pub fn flag(&self, person_id: i64, phenotype: &str) -> Option<bool> {
        let column = self.phenotype_names.iter().position(|name| name == phenotype)?;
        self.row(person_id).map(|row| row.flags[column])
    }

    /// Number of persons flagged for each phenotype
    #[must_use]
    pub fn phenotype_counts(&self) -> Vec<(&str, usize)> {
        self.phenotype_names
            .iter()
            .enumerate()
            .map(|(column, name)| {
                let count = self.rows.iter().filter(|row| row.flags[column]).count();
                (name.as_str(), count)
            })
            .collect()
    }

    /// Arrow schema of the output
    #[must_use]
    pub fn schema(&self) -> Schema {
        let [person_id, age, sex_at_birth] = FIXED_COLUMNS;
        let mut fields = vec![
            Field::new(person_id, DataType::Int64, false),
            Field::new(age, DataType::Int64, true),
            Field::new(sex_at_birth, DataType::Int64, false),
        ];
        fields.extend(
            self.phenotype_names
                .iter()
                .map(|name| Field::new(name, DataType::Boolean, false)),
        );
        Schema::new(fields)
    }

    /// Convert the table into a record batch in output column order
    pub fn to_record_batch(&self) -> Result<RecordBatch> {
        let mut columns: Vec<ArrayRef> = vec![
            Arc::new(Int64Array::from_iter_values(
                self.rows.iter().map(|row| row.person_id),
            )),
            Arc::new(Int64Array::from_iter(self.rows.iter().map(|row| row.age))),
            Arc::new(Int64Array::from_iter_values(
                self.rows.iter().map(|row| row.sex_at_birth),
            )),
        ];

        for column in 0..self.phenotype_names.len() {
            let flags: BooleanArray = self.rows.iter().map(|row| Some(row.flags[column])).collect();
            columns.push(Arc::new(flags));
        }

        Ok(RecordBatch::try_new(Arc::new(self.schema()), columns)?)
    }
}
