//! Access tokens for the warehouse
//!
//! Credentials are expected to be configured in the environment already.
//! Sources are tried in order: an explicit token variable, the `gcloud` CLI,
//! then the compute metadata server.

use super::api::MetadataToken;
use crate::error::{CohortError, Result};
use log::debug;
use std::env;
use tokio::process::Command;

/// Environment variable holding a ready-made OAuth access token
pub const TOKEN_ENV_VAR: &str = "GOOGLE_OAUTH_ACCESS_TOKEN";

/// Environment variable naming the default project
pub const PROJECT_ENV_VAR: &str = "GOOGLE_CLOUD_PROJECT";

const METADATA_TOKEN_URL: &str =
    "http://metadata.google.internal/computeMetadata/v1/instance/service-accounts/default/token";

/// Obtain an access token from the first source that provides one
pub async fn resolve_access_token(http: &reqwest::Client) -> Result<String> {
    if let Ok(token) = env::var(TOKEN_ENV_VAR) {
        if !token.trim().is_empty() {
            debug!("Using access token from {TOKEN_ENV_VAR}");
            return Ok(token.trim().to_string());
        }
    }

    let gcloud_error = match gcloud_token().await {
        Ok(token) => {
            debug!("Using access token from gcloud");
            return Ok(token);
        }
        Err(e) => e,
    };

    match metadata_token(http).await {
        Ok(token) => {
            debug!("Using access token from the metadata server");
            Ok(token)
        }
        Err(metadata_error) => Err(CohortError::Auth(format!(
            "no credentials found ({TOKEN_ENV_VAR} unset; gcloud: {gcloud_error}; metadata server: {metadata_error})"
        ))),
    }
}

async fn gcloud_token() -> std::result::Result<String, String> {
    let output = Command::new("gcloud")
        .args(["auth", "print-access-token"])
        .output()
        .await
        .map_err(|e| e.to_string())?;

    if !output.status.success() {
        return Err(String::from_utf8_lossy(&output.stderr).trim().to_string());
    }

    let token = String::from_utf8_lossy(&output.stdout).trim().to_string();
    if token.is_empty() {
        return Err("empty token".to_string());
    }
    Ok(token)
}

async fn metadata_token(http: &reqwest::Client) -> std::result::Result<String, String> {
    let response = http
        .get(METADATA_TOKEN_URL)
        .header("Metadata-Flavor", "Google")
        .send()
        .await
        .map_err(|e| e.to_string())?;

    if !response.status().is_success() {
        return Err(format!("status {}", response.status()));
    }

    response
        .json::<MetadataToken>()
        .await
        .map(|token| token.access_token)
        .map_err(|e| e.to_string())
}

/// Project billed for query jobs
///
/// Uses the configured project, then the environment, then the project part
/// of the dataset identifier.
#[must_use]
pub fn resolve_billing_project(configured: Option<&str>, dataset_project: Option<&str>) -> Option<String> {
    configured
        .map(str::to_string)
        .or_else(|| env::var(PROJECT_ENV_VAR).ok().filter(|p| !p.trim().is_empty()))
        .or_else(|| dataset_project.map(str::to_string))
}
