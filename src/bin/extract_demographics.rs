//! Raw demographics of persons with an extreme-visit occurrence of the
//! anchor condition, written as a TSV with a leading index column.

use anyhow::Context;
use cohort_extract::pipeline::run_demographics;
use cohort_extract::{BigQueryClient, StudyConfig};
use std::path::Path;

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let config = match std::env::args().nth(1) {
        Some(path) => StudyConfig::from_json_file(Path::new(&path))
            .with_context(|| format!("Failed to load study configuration from {path}"))?,
        None => StudyConfig::default(),
    };
    let client = BigQueryClient::connect(&config)
        .await
        .context("Failed to connect to BigQuery")?;

    let batch = run_demographics(&client.executor(config.fallback_policy), &config).await?;
    log::info!(
        "Wrote {} demographic rows to {}",
        batch.num_rows(),
        config.demographics_path.display()
    );

    println!("Done.");
    Ok(())
}
