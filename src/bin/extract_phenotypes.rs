//! Exploratory look at the persons selected by the demographics query.
//! Prints the first rows; nothing is written.

use anyhow::Context;
use cohort_extract::pipeline::extract_demographics;
use cohort_extract::utils::logging::print_preview;
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

    let batch = extract_demographics(&client.executor(config.fallback_policy), &config).await?;
    print_preview(&batch, config.preview_rows)?;

    Ok(())
}
