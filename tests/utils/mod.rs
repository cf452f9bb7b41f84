//! Shared fixtures for the integration tests
#![allow(dead_code)]

pub mod fake_bigquery;

use std::cell::{Cell, RefCell};
use std::sync::Arc;

use arrow::array::{ArrayRef, Int64Array, StringArray};
use arrow::datatypes::{DataType, Field, Schema};
use arrow::record_batch::RecordBatch;
use cohort_extract::{PhenotypeDefinition, PhenotypeMap, QueryBackend, QueryError, QueryResult};

pub const INFLUENZA: i64 = 4_183_609;
pub const PANCREATITIS: i64 = 199_074;
pub const PNEUMONIA: i64 = 255_848;

/// The study's three infection phenotypes
#[must_use]
pub fn infection_phenotypes() -> PhenotypeMap {
    PhenotypeMap::new(vec![
        PhenotypeDefinition::new(INFLUENZA, "ACUTE_INFLUENZA"),
        PhenotypeDefinition::new(PANCREATITIS, "ACUTE_PANCREATITIS"),
        PhenotypeDefinition::new(PNEUMONIA, "PNEUMONIA"),
    ])
    .unwrap()
}

/// A person query result: (id, age, sex at birth, gender)
#[must_use]
pub fn person_batch(rows: &[(i64, Option<i64>, Option<&str>, Option<&str>)]) -> RecordBatch {
    let schema = Schema::new(vec![
        Field::new("PERSON_ID", DataType::Int64, false),
        Field::new("AGE", DataType::Int64, true),
        Field::new("SEX_AT_BIRTH", DataType::Utf8, true),
        Field::new("GENDER", DataType::Utf8, true),
    ]);
    let columns: Vec<ArrayRef> = vec![
        Arc::new(Int64Array::from_iter_values(rows.iter().map(|r| r.0))),
        Arc::new(Int64Array::from_iter(rows.iter().map(|r| r.1))),
        Arc::new(StringArray::from_iter(rows.iter().map(|r| r.2))),
        Arc::new(StringArray::from_iter(rows.iter().map(|r| r.3))),
    ];
    RecordBatch::try_new(Arc::new(schema), columns).unwrap()
}

/// A condition query result: (person id, parent concept, age at occurrence)
#[must_use]
pub fn condition_batch(rows: &[(i64, i64, Option<i64>)]) -> RecordBatch {
    let schema = Schema::new(vec![
        Field::new("PERSON_ID", DataType::Int64, false),
        Field::new("PARENT_CONDITION_CONCEPT_ID", DataType::Int64, false),
        Field::new("CONDITION_CONCEPT_NAME", DataType::Utf8, true),
        Field::new("VISIT_TYPE", DataType::Utf8, true),
        Field::new("CONDITION_TYPE", DataType::Utf8, true),
        Field::new("AGE_AT_OCCURRENCE", DataType::Int64, true),
    ]);
    let columns: Vec<ArrayRef> = vec![
        Arc::new(Int64Array::from_iter_values(rows.iter().map(|r| r.0))),
        Arc::new(Int64Array::from_iter_values(rows.iter().map(|r| r.1))),
        Arc::new(StringArray::from_iter_values(rows.iter().map(|_| "Pneumonia"))),
        Arc::new(StringArray::from_iter_values(rows.iter().map(|_| "Inpatient Visit"))),
        Arc::new(StringArray::from_iter_values(rows.iter().map(|_| "EHR"))),
        Arc::new(Int64Array::from_iter(rows.iter().map(|r| r.2))),
    ];
    RecordBatch::try_new(Arc::new(schema), columns).unwrap()
}

/// A small raw demographics result
#[must_use]
pub fn demographics_batch() -> RecordBatch {
    let schema = Schema::new(vec![
        Field::new("person_id", DataType::Int64, false),
        Field::new("T_DISP_gender", DataType::Utf8, true),
        Field::new("T_DISP_race", DataType::Utf8, true),
    ]);
    let columns: Vec<ArrayRef> = vec![
        Arc::new(Int64Array::from(vec![11, 12])),
        Arc::new(StringArray::from(vec![Some("Woman"), None])),
        Arc::new(StringArray::from(vec![Some("Asian"), Some("White")])),
    ];
    RecordBatch::try_new(Arc::new(schema), columns).unwrap()
}

/// Backend answering each query with the canned batch for its kind
pub struct CannedBackend {
    pub persons: RecordBatch,
    pub conditions: RecordBatch,
    pub demographics: RecordBatch,
    pub queries: RefCell<Vec<String>>,
}

impl CannedBackend {
    pub fn new(persons: RecordBatch, conditions: RecordBatch) -> Self {
        Self {
            persons,
            conditions,
            demographics: demographics_batch(),
            queries: RefCell::new(Vec::new()),
        }
    }
}

impl QueryBackend for CannedBackend {
    fn label(&self) -> &str {
        "canned"
    }

    async fn fetch(&self, sql: &str) -> QueryResult<RecordBatch> {
        self.queries.borrow_mut().push(sql.to_string());
        if sql.contains("has_ehr_data") {
            Ok(self.persons.clone())
        } else if sql.contains("PARENT_CONDITION_CONCEPT_ID") {
            Ok(self.conditions.clone())
        } else if sql.contains("self_reported_category") {
            Ok(self.demographics.clone())
        } else {
            Err(QueryError::InvalidQuery(format!("unexpected query: {sql}")))
        }
    }
}

/// Backend that always fails with the error produced by `make_error`
pub struct FailingBackend {
    pub make_error: fn() -> QueryError,
    pub calls: Cell<usize>,
}

impl FailingBackend {
    pub fn new(make_error: fn() -> QueryError) -> Self {
        Self {
            make_error,
            calls: Cell::new(0),
        }
    }
}

impl QueryBackend for FailingBackend {
    fn label(&self) -> &str {
        "failing"
    }

    async fn fetch(&self, _sql: &str) -> QueryResult<RecordBatch> {
        self.calls.set(self.calls.get() + 1);
        Err((self.make_error)())
    }
}

pub fn forbidden() -> QueryError {
    QueryError::Unauthorized {
        status: 403,
        message: "Permission bigquery.tables.getData denied".to_string(),
    }
}

pub fn invalid_query() -> QueryError {
    QueryError::InvalidQuery("Syntax error: Unexpected keyword FROM".to_string())
}
