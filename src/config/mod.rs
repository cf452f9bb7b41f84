//! Study configuration.
//!
//! The phenotype map, the visit type lists, the warehouse dataset and the
//! output locations are declared here instead of inline in the queries.
//! Defaults reproduce the infection study; a JSON file can override any field.

pub mod phenotype;

pub use phenotype::{PhenotypeDefinition, PhenotypeMap};

use crate::error::{ConfigError, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};

/// Dataset holding the indexed person and condition tables
pub const DEFAULT_DATASET: &str = "wb-silky-artichoke-2408.C2024Q3R8_index_111825";

/// A visit type concept used to restrict condition occurrences
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VisitType {
    /// Visit concept identifier
    pub concept_id: i64,
    /// Human readable name (documentation only)
    #[serde(default)]
    pub name: String,
}

impl VisitType {
    /// Create a new visit type
    #[must_use]
    pub fn new(concept_id: i64, name: &str) -> Self {
        Self {
            concept_id,
            name: name.to_string(),
        }
    }
}

/// Which condition occurrences count towards a phenotype
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConditionScope {
    /// Every occurrence, regardless of visit type
    #[default]
    AllVisits,
    /// Only occurrences during one of the configured extreme visit types
    ExtremeVisits,
}

/// Which failures of the accelerated read path fall back to the standard path
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FallbackPolicy {
    /// Only authorization, availability and transport failures
    #[default]
    AccessFailures,
    /// Any failure at all
    Always,
}

impl FallbackPolicy {
    /// Whether a failure of the accelerated path should be retried
    #[must_use]
    pub const fn should_fall_back(self, error: &crate::error::QueryError) -> bool {
        match self {
            Self::Always => true,
            Self::AccessFailures => error.is_access_failure(),
        }
    }
}

/// Settings for the raw demographics extraction
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DemographicsConfig {
    /// Condition concept whose descendants select the persons
    pub anchor_concept_id: i64,
    /// Visit types during which the condition must occur
    pub visit_type_ids: Vec<i64>,
}

impl Default for DemographicsConfig {
    fn default() -> Self {
        Self {
            anchor_concept_id: 4_266_367,
            visit_type_ids: vec![
                8668, 38_004_207, 38_004_218, 38_004_222, 38_004_228, 38_004_238, 38_004_251,
                38_004_267, 38_004_269, 38_004_268, 38_004_262, 38_004_249, 38_004_246,
                38_004_245, 38_004_250, 38_004_258, 581_479, 38_004_259, 8883, 8870, 9203,
                32037, 8782, 8717, 38_004_515,
            ],
        }
    }
}

/// Configuration for an extraction run
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StudyConfig {
    /// Fully qualified dataset, `project.dataset`
    pub dataset: String,
    /// Project billed for query jobs (falls back to the environment, then the dataset project)
    pub billing_project: Option<String>,
    /// Phenotypes in output column order
    pub phenotypes: Vec<PhenotypeDefinition>,
    /// Visit types considered high acuity
    pub extreme_visit_types: Vec<VisitType>,
    /// Occurrences counted by the covariate extraction
    pub condition_scope: ConditionScope,
    /// When the accelerated read path falls back
    pub fallback_policy: FallbackPolicy,
    /// Raw demographics extraction settings
    pub demographics: DemographicsConfig,
    /// Output file of the covariate extraction
    pub covariates_path: PathBuf,
    /// Output file of the demographics extraction
    pub demographics_path: PathBuf,
    /// Rows shown by the phenotype preview
    pub preview_rows: usize,
    /// Maximum rows requested per result page
    pub page_size: u32,
}

impl Default for StudyConfig {
    fn default() -> Self {
        Self {
            dataset: DEFAULT_DATASET.to_string(),
            billing_project: None,
            phenotypes: vec![
                PhenotypeDefinition::new(4_183_609, "ACUTE_INFLUENZA"),
                PhenotypeDefinition::new(199_074, "ACUTE_PANCREATITIS"),
                PhenotypeDefinition::new(255_848, "PNEUMONIA"),
            ],
            extreme_visit_types: vec![
                VisitType::new(8782, "Urgent Care Facility"),
                VisitType::new(32037, "Intensive Care"),
                VisitType::new(4_163_685, "Emergency department patient visit"),
                VisitType::new(8870, "Emergency Room - Hospital"),
                VisitType::new(262, "Emergency Room and Inpatient Visit"),
                VisitType::new(38_004_515, "Hospital"),
                VisitType::new(9203, "Emergency Room Visit"),
                VisitType::new(8668, "Ambulance - Land"),
            ],
            condition_scope: ConditionScope::AllVisits,
            fallback_policy: FallbackPolicy::AccessFailures,
            demographics: DemographicsConfig::default(),
            covariates_path: PathBuf::from("covariates.csv"),
            demographics_path: PathBuf::from("covariates.tsv"),
            preview_rows: 5,
            page_size: 50_000,
        }
    }
}

impl StudyConfig {
    /// Create a new configuration with default settings
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Load a configuration from a JSON file
    ///
    /// Fields missing from the file keep their default values.
    pub fn from_json_file(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path)?;
        Self::from_json_str(&text)
    }

    /// Parse and validate a configuration from JSON text
    pub fn from_json_str(text: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    /// Set the dataset
    #[must_use]
    pub fn with_dataset(mut self, dataset: &str) -> Self {
        self.dataset = dataset.to_string();
        self
    }

    /// Set the billing project
    #[must_use]
    pub fn with_billing_project(mut self, project: &str) -> Self {
        self.billing_project = Some(project.to_string());
        self
    }

    /// Replace the phenotype definitions
    #[must_use]
    pub fn with_phenotypes(mut self, phenotypes: Vec<PhenotypeDefinition>) -> Self {
        self.phenotypes = phenotypes;
        self
    }

    /// Set the condition scope
    #[must_use]
    pub fn with_condition_scope(mut self, scope: ConditionScope) -> Self {
        self.condition_scope = scope;
        self
    }

    /// Set the fallback policy
    #[must_use]
    pub fn with_fallback_policy(mut self, policy: FallbackPolicy) -> Self {
        self.fallback_policy = policy;
        self
    }

    /// Set the covariate output path
    #[must_use]
    pub fn with_covariates_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.covariates_path = path.into();
        self
    }

    /// Set the demographics output path
    #[must_use]
    pub fn with_demographics_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.demographics_path = path.into();
        self
    }

    /// Project part of the dataset identifier
    #[must_use]
    pub fn dataset_project(&self) -> Option<&str> {
        self.dataset
            .split_once('.')
            .map(|(project, _)| project)
            .filter(|project| !project.is_empty())
    }

    /// Visit type identifiers of the extreme visit list
    #[must_use]
    pub fn extreme_visit_ids(&self) -> Vec<i64> {
        self.extreme_visit_types
            .iter()
            .map(|visit| visit.concept_id)
            .collect()
    }

    /// Build the validated phenotype map
    pub fn phenotype_map(&self) -> Result<PhenotypeMap> {
        Ok(PhenotypeMap::new(self.phenotypes.clone())?)
    }

    /// Check the configuration for internal consistency
    pub fn validate(&self) -> Result<()> {
        let dataset_ok = self
            .dataset
            .split_once('.')
            .is_some_and(|(project, dataset)| !project.is_empty() && !dataset.is_empty());
        if !dataset_ok {
            return Err(ConfigError::InvalidDataset(self.dataset.clone()).into());
        }

        if self.extreme_visit_types.is_empty() {
            return Err(ConfigError::NoVisitTypes.into());
        }

        let mut seen = HashSet::new();
        for visit in &self.extreme_visit_types {
            if !seen.insert(visit.concept_id) {
                log::warn!("Visit type {} is listed more than once", visit.concept_id);
            }
        }

        self.phenotype_map().map(|_| ())
    }
}
