//! # Configuration Resolver
//!
//! Computes the effective configuration of a run context by deep-merging the matching
//! selector fragments, least specific first.

pub mod configuration_resolver;
pub mod merge;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use thiserror::Error;

use crate::models::{FragmentCategory, FragmentId};

pub use configuration_resolver::ConfigurationResolver;
pub use merge::deep_merge;

/// Errors raised while resolving a configuration
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ResolverError {
    /// No fragment of a core category matches the context
    #[error("No configuration found for {context}")]
    NoConfigurationFound { context: String },

    #[error("Workflow {workflow} must have at least one core fragment category")]
    EmptyCoreCategories { workflow: String },
}

pub type ResolverResult<T> = Result<T, ResolverError>;

/// Merged value of one non-core fragment category
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RelatedSelector {
    pub value: Value,
    /// Contributing fragments, least specific first
    pub provenance: Vec<FragmentId>,
}

/// The resolved configuration of a run context
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EffectiveConfiguration {
    pub workflow: String,
    /// Merged payload of the core categories
    pub config_value: Value,
    /// Contributing core fragments, least specific first
    pub provenance: Vec<FragmentId>,
    #[serde(default)]
    pub related_selectors: BTreeMap<FragmentCategory, RelatedSelector>,
    /// Time of the last store write the resolution observed
    pub resolved_at: DateTime<Utc>,
}

impl EffectiveConfiguration {
    /// Look up a value by a dot-separated path, e.g. `cellranger.expectedCells`
    pub fn value_at(&self, path: &str) -> Option<&Value> {
        path.split('.')
            .try_fold(&self.config_value, |value, segment| value.get(segment))
    }

    pub fn related(&self, category: FragmentCategory) -> Option<&RelatedSelector> {
        self.related_selectors.get(&category)
    }
}
