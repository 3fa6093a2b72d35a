use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

use super::selector_fragment::FragmentCategory;
use super::workflow_step::StepKind;

/// A released version of a workflow
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkflowVersion {
    pub name: String,
    #[serde(default)]
    pub deprecated: bool,
}

impl WorkflowVersion {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            deprecated: false,
        }
    }
}

/// Blueprint for one step of every run of a workflow
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StepTemplate {
    pub name: String,
    pub kind: StepKind,
}

impl StepTemplate {
    pub fn new(name: impl Into<String>, kind: StepKind) -> Self {
        Self {
            name: name.into(),
            kind,
        }
    }
}

/// A workflow known to the system with its operator-managed settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Workflow {
    pub name: String,
    pub priority: i32,
    pub enabled: bool,
    /// Upper bound on concurrently active runs; `None` falls back to the engine default
    pub max_parallel_runs: Option<usize>,
    /// Empty means every sequencing type is supported
    #[serde(default)]
    pub supported_seq_types: BTreeSet<String>,
    /// Empty means every reference genome is allowed
    #[serde(default)]
    pub allowed_reference_genomes: BTreeSet<String>,
    pub deprecation_date: Option<NaiveDate>,
    #[serde(default)]
    pub versions: Vec<WorkflowVersion>,
    pub steps: Vec<StepTemplate>,
    /// Fragment categories merged into the run configuration
    pub core_categories: BTreeSet<FragmentCategory>,
}

impl Workflow {
    pub fn new(name: impl Into<String>, steps: Vec<StepTemplate>) -> Self {
        Self {
            name: name.into(),
            priority: 0,
            enabled: true,
            max_parallel_runs: None,
            supported_seq_types: BTreeSet::new(),
            allowed_reference_genomes: BTreeSet::new(),
            deprecation_date: None,
            versions: Vec::new(),
            steps,
            core_categories: [FragmentCategory::DefaultValues, FragmentCategory::Generic]
                .into_iter()
                .collect(),
        }
    }

    pub fn with_version(mut self, version: impl Into<String>) -> Self {
        self.versions.push(WorkflowVersion::new(version));
        self
    }

    pub fn with_priority(mut self, priority: i32) -> Self {
        self.priority = priority;
        self
    }

    pub fn with_max_parallel_runs(mut self, max_parallel_runs: usize) -> Self {
        self.max_parallel_runs = Some(max_parallel_runs);
        self
    }

    pub fn with_supported_seq_type(mut self, seq_type: impl Into<String>) -> Self {
        self.supported_seq_types.insert(seq_type.into());
        self
    }

    pub fn with_allowed_reference_genome(mut self, reference_genome: impl Into<String>) -> Self {
        self.allowed_reference_genomes.insert(reference_genome.into());
        self
    }

    pub fn is_deprecated(&self, today: NaiveDate) -> bool {
        self.deprecation_date.is_some_and(|date| date <= today)
    }

    /// Latest version that is not deprecated
    pub fn default_version(&self) -> Option<&WorkflowVersion> {
        self.versions.iter().rev().find(|version| !version.deprecated)
    }

    pub fn version(&self, name: &str) -> Option<&WorkflowVersion> {
        self.versions.iter().find(|version| version.name == name)
    }
}

/// Operator update of a workflow's settings; `None` leaves a field unchanged
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct WorkflowSettingsUpdate {
    pub priority: Option<i32>,
    pub enabled: Option<bool>,
    pub max_parallel_runs: Option<Option<usize>>,
    pub supported_seq_types: Option<BTreeSet<String>>,
    pub allowed_reference_genomes: Option<BTreeSet<String>>,
    pub deprecation_date: Option<Option<NaiveDate>>,
}
