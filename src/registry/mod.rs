//! # Workflow Registry
//!
//! The workflows known to the system and the operator-managed settings that decide
//! whether, and how eagerly, new runs are started for them.

pub mod workflow_registry;

use chrono::NaiveDate;
use thiserror::Error;

pub use workflow_registry::WorkflowRegistry;

/// Errors raised by workflow registry lookups and trigger checks
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RegistryError {
    #[error("Workflow {0} not found")]
    WorkflowNotFound(String),

    #[error("Workflow {0} is disabled")]
    WorkflowDisabled(String),

    #[error("Workflow {workflow} is deprecated since {since}")]
    WorkflowDeprecated { workflow: String, since: NaiveDate },

    #[error("Workflow {workflow} has no version {version}")]
    UnknownVersion { workflow: String, version: String },

    #[error("Workflow {workflow} does not support sequencing type {seq_type}")]
    UnsupportedSeqType { workflow: String, seq_type: String },

    #[error("Workflow {workflow} does not allow reference genome {reference_genome}")]
    ReferenceGenomeNotAllowed {
        workflow: String,
        reference_genome: String,
    },

    #[error("Invalid workflow definition: {0}")]
    Validation(String),
}

pub type RegistryResult<T> = Result<T, RegistryError>;
