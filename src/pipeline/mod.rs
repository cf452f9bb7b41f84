//! Extraction pipelines
//!
//! Each pipeline runs its queries one after another through a
//! [`QueryExecutor`] and reshapes the results. Nothing is written until every
//! query and transformation has succeeded.

use crate::algorithm::{PhenotypeAggregate, aggregate_phenotypes, merge_covariates};
use crate::config::{ConditionScope, PhenotypeMap, StudyConfig};
use crate::error::Result;
use crate::models::condition::condition_occurrences;
use crate::models::covariate::CovariateTable;
use crate::models::person::{Person, concordant_persons};
use crate::output::{DelimitedFormat, write_delimited};
use crate::query::sql::{self, id_list};
use crate::query::{QueryBackend, QueryExecutor};
use crate::utils::logging::{log_operation_complete, log_operation_start, print_stage};
use arrow::record_batch::RecordBatch;
use log::info;
use std::time::Instant;

/// Run one named query and log its size and duration
async fn run_query<P: QueryBackend, F: QueryBackend>(
    executor: &QueryExecutor<P, F>,
    name: &str,
    sql: &str,
) -> Result<RecordBatch> {
    log_operation_start("Querying", name);
    log::debug!("{name} query:\n{sql}");
    let start = Instant::now();

    let batch = executor.run(sql).await?;

    log_operation_complete("fetched", name, batch.num_rows(), Some(start.elapsed()));
    Ok(batch)
}

/// Load the cohort: persons with EHR data and concordant sex and gender
pub async fn load_persons<P: QueryBackend, F: QueryBackend>(
    executor: &QueryExecutor<P, F>,
    config: &StudyConfig,
) -> Result<Vec<Person>> {
    let batch = run_query(executor, "persons", &sql::person_query(&config.dataset)).await?;
    concordant_persons(&batch)
}

/// Load condition occurrences in the configured scope and aggregate them
pub async fn load_phenotypes<P: QueryBackend, F: QueryBackend>(
    executor: &QueryExecutor<P, F>,
    config: &StudyConfig,
    phenotypes: &PhenotypeMap,
) -> Result<PhenotypeAggregate> {
    let name = match config.condition_scope {
        ConditionScope::AllVisits => "conditions",
        ConditionScope::ExtremeVisits => "extreme visit conditions",
    };
    let query = sql::condition_query(
        &config.dataset,
        phenotypes,
        config.condition_scope,
        &config.extreme_visit_ids(),
    );

    let batch = run_query(executor, name, &query).await?;
    let occurrences = condition_occurrences(&batch)?;
    let aggregate = aggregate_phenotypes(&occurrences, phenotypes);
    info!(
        "{} condition rows cover {} persons",
        occurrences.len(),
        aggregate.len()
    );

    Ok(aggregate)
}

/// Build the covariate table for the cohort
pub async fn extract_covariates<P: QueryBackend, F: QueryBackend>(
    executor: &QueryExecutor<P, F>,
    config: &StudyConfig,
) -> Result<CovariateTable> {
    let phenotypes = config.phenotype_map()?;

    print_stage("Loading person data.");
    let persons = load_persons(executor, config).await?;

    print_stage(&format!(
        "Loading conditions matching: {}",
        id_list(phenotypes.concept_ids())
    ));
    let aggregate = load_phenotypes(executor, config, &phenotypes).await?;

    print_stage("Consolidating dataset.");
    let table = merge_covariates(&persons, &aggregate);
    for (name, count) in table.phenotype_counts() {
        info!("{name}: {count} of {} persons", table.len());
    }

    Ok(table)
}

/// Build the covariate table and write it to the configured CSV path
pub async fn run_covariates<P: QueryBackend, F: QueryBackend>(
    executor: &QueryExecutor<P, F>,
    config: &StudyConfig,
) -> Result<CovariateTable> {
    let table = extract_covariates(executor, config).await?;
    write_delimited(
        &table.to_record_batch()?,
        &config.covariates_path,
        DelimitedFormat::CSV,
    )?;
    Ok(table)
}

/// Fetch the raw demographics of persons with the anchor condition
pub async fn extract_demographics<P: QueryBackend, F: QueryBackend>(
    executor: &QueryExecutor<P, F>,
    config: &StudyConfig,
) -> Result<RecordBatch> {
    let query = sql::demographics_query(
        &config.dataset,
        config.demographics.anchor_concept_id,
        &config.demographics.visit_type_ids,
    );
    run_query(executor, "demographics", &query).await
}

/// Fetch the raw demographics and write them to the configured TSV path
pub async fn run_demographics<P: QueryBackend, F: QueryBackend>(
    executor: &QueryExecutor<P, F>,
    config: &StudyConfig,
) -> Result<RecordBatch> {
    print_stage("Loading demographics.");
    let batch = extract_demographics(executor, config).await?;
    write_delimited(
        &batch,
        &config.demographics_path,
        DelimitedFormat::TSV_WITH_INDEX,
    )?;
    Ok(batch)
}
