//! Phenotype definitions
//!
//! A phenotype is a named canonical condition concept. The map keeps the
//! declared order, which is the order of the phenotype columns in the output.

use crate::error::ConfigError;
use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// Output columns that precede the phenotype columns
pub const FIXED_COLUMNS: [&str; 3] = ["PERSON_ID", "AGE", "SEX_AT_BIRTH"];

/// A phenotype and the parent concept that identifies it
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PhenotypeDefinition {
    /// Canonical (ancestor) condition concept identifier
    pub concept_id: i64,
    /// Phenotype name, used as the output column header
    pub name: String,
}

impl PhenotypeDefinition {
    /// Create a new phenotype definition
    #[must_use]
    pub fn new(concept_id: i64, name: &str) -> Self {
        Self {
            concept_id,
            name: name.to_string(),
        }
    }
}

/// Validated, ordered mapping from concept identifier to phenotype
#[derive(Debug, Clone)]
pub struct PhenotypeMap {
    definitions: Vec<PhenotypeDefinition>,
    index_by_concept: FxHashMap<i64, usize>,
}

impl PhenotypeMap {
    /// Build a map from definitions in output order
    ///
    /// Names must be non-empty, unique, and distinct from the fixed output
    /// columns; concept identifiers must be unique.
    pub fn new(definitions: Vec<PhenotypeDefinition>) -> Result<Self, ConfigError> {
        if definitions.is_empty() {
            return Err(ConfigError::NoPhenotypes);
        }

        let mut names = HashSet::new();
        let mut index_by_concept = FxHashMap::default();

        for (idx, definition) in definitions.iter().enumerate() {
            let name = definition.name.trim();
            if name.is_empty() || name != definition.name || FIXED_COLUMNS.contains(&name) {
                return Err(ConfigError::InvalidPhenotypeName(definition.name.clone()));
            }
            if !names.insert(name) {
                return Err(ConfigError::DuplicatePhenotypeName(definition.name.clone()));
            }
            if index_by_concept.insert(definition.concept_id, idx).is_some() {
                return Err(ConfigError::DuplicateConceptId(definition.concept_id));
            }
        }

        Ok(Self {
            definitions,
            index_by_concept,
        })
    }

    /// Position of the phenotype identified by a parent concept
    #[must_use]
    pub fn index_of(&self, concept_id: i64) -> Option<usize> {
        self.index_by_concept.get(&concept_id).copied()
    }

    /// Number of phenotypes
    #[must_use]
    pub fn len(&self) -> usize {
        self.definitions.len()
    }

    /// Whether the map is empty (never true for a validated map)
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.definitions.is_empty()
    }

    /// Phenotype names in declared order
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.definitions.iter().map(|d| d.name.as_str())
    }

    /// Concept identifiers in declared order
    pub fn concept_ids(&self) -> impl Iterator<Item = i64> + '_ {
        self.definitions.iter().map(|d| d.concept_id)
    }

    /// Definitions in declared order
    #[must_use]
    pub fn definitions(&self) -> &[PhenotypeDefinition] {
        &self.definitions
    }
}
