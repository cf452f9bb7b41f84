use anyhow::Context;
use cohort_extract::pipeline::run_covariates;
use cohort_extract::{BigQueryClient, StudyConfig};
use std::path::Path;

/// Load the study configuration named by the first argument, or the defaults
fn load_config() -> anyhow::Result<StudyConfig> {
    match std::env::args().nth(1) {
        Some(path) => StudyConfig::from_json_file(Path::new(&path))
            .with_context(|| format!("Failed to load study configuration from {path}")),
        None => Ok(StudyConfig::default()),
    }
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    // Setup logging
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let config = load_config()?;
    let client = BigQueryClient::connect(&config)
        .await
        .context("Failed to connect to BigQuery")?;
    let executor = client.executor(config.fallback_policy);

    let table = run_covariates(&executor, &config).await?;
    log::info!(
        "Wrote {} covariate rows to {}",
        table.len(),
        config.covariates_path.display()
    );

    println!("Done.");
    Ok(())
}
