use chrono::NaiveDate;
use dashmap::DashMap;
use tracing::info;

use super::{RegistryError, RegistryResult};
use crate::models::{RunContext, SelectorAxis, Workflow, WorkflowSettingsUpdate};

/// Thread-safe registry of workflows
#[derive(Debug, Default)]
pub struct WorkflowRegistry {
    workflows: DashMap<String, Workflow>,
}

impl WorkflowRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register or replace a workflow definition
    pub fn register(&self, workflow: Workflow) -> RegistryResult<()> {
        if workflow.name.trim().is_empty() {
            return Err(RegistryError::Validation("name must not be empty".to_string()));
        }
        if workflow.steps.is_empty() {
            return Err(RegistryError::Validation(format!(
                "workflow {} has no steps",
                workflow.name
            )));
        }
        if workflow.core_categories.is_empty() {
            return Err(RegistryError::Validation(format!(
                "workflow {} has no core fragment categories",
                workflow.name
            )));
        }

        info!(
            workflow = %workflow.name,
            steps = workflow.steps.len(),
            priority = workflow.priority,
            "Registered workflow"
        );
        self.workflows.insert(workflow.name.clone(), workflow);
        Ok(())
    }

    pub fn get(&self, name: &str) -> RegistryResult<Workflow> {
        self.workflows
            .get(name)
            .map(|entry| entry.value().clone())
            .ok_or_else(|| RegistryError::WorkflowNotFound(name.to_string()))
    }

    /// All workflows, highest priority first
    pub fn list(&self) -> Vec<Workflow> {
        let mut workflows: Vec<Workflow> = self
            .workflows
            .iter()
            .map(|entry| entry.value().clone())
            .collect();
        workflows.sort_by(|a, b| b.priority.cmp(&a.priority).then_with(|| a.name.cmp(&b.name)));
        workflows
    }

    /// Apply an operator settings update
    pub fn update_settings(
        &self,
        name: &str,
        update: WorkflowSettingsUpdate,
    ) -> RegistryResult<Workflow> {
        let mut entry = self
            .workflows
            .get_mut(name)
            .ok_or_else(|| RegistryError::WorkflowNotFound(name.to_string()))?;
        let workflow = entry.value_mut();

        if let Some(priority) = update.priority {
            workflow.priority = priority;
        }
        if let Some(enabled) = update.enabled {
            workflow.enabled = enabled;
        }
        if let Some(max_parallel_runs) = update.max_parallel_runs {
            workflow.max_parallel_runs = max_parallel_runs;
        }
        if let Some(seq_types) = update.supported_seq_types {
            workflow.supported_seq_types = seq_types;
        }
        if let Some(reference_genomes) = update.allowed_reference_genomes {
            workflow.allowed_reference_genomes = reference_genomes;
        }
        if let Some(deprecation_date) = update.deprecation_date {
            workflow.deprecation_date = deprecation_date;
        }

        info!(
            workflow = %workflow.name,
            enabled = workflow.enabled,
            priority = workflow.priority,
            max_parallel_runs = ?workflow.max_parallel_runs,
            "Updated workflow settings"
        );
        Ok(workflow.clone())
    }

    /// Mark a version as deprecated; the default version skips it from now on
    pub fn deprecate_version(&self, name: &str, version: &str) -> RegistryResult<()> {
        let mut entry = self
            .workflows
            .get_mut(name)
            .ok_or_else(|| RegistryError::WorkflowNotFound(name.to_string()))?;

        let found = entry
            .versions
            .iter_mut()
            .find(|candidate| candidate.name == version)
            .ok_or_else(|| RegistryError::UnknownVersion {
                workflow: name.to_string(),
                version: version.to_string(),
            })?;
        found.deprecated = true;
        Ok(())
    }

    /// Check that a run may be started for the context and return its workflow
    pub fn check_triggerable(&self, context: &RunContext, today: NaiveDate) -> RegistryResult<Workflow> {
        let workflow = self.get(&context.workflow)?;

        if !workflow.enabled {
            return Err(RegistryError::WorkflowDisabled(workflow.name));
        }
        if let Some(since) = workflow.deprecation_date.filter(|_| workflow.is_deprecated(today)) {
            return Err(RegistryError::WorkflowDeprecated {
                workflow: workflow.name,
                since,
            });
        }
        if let Some(version) = context.axis(SelectorAxis::WorkflowVersion) {
            if !workflow.versions.is_empty() && workflow.version(version).is_none() {
                return Err(RegistryError::UnknownVersion {
                    workflow: workflow.name,
                    version: version.to_string(),
                });
            }
        }
        if let Some(seq_type) = context.axis(SelectorAxis::SeqType) {
            if !workflow.supported_seq_types.is_empty()
                && !workflow.supported_seq_types.contains(seq_type)
            {
                return Err(RegistryError::UnsupportedSeqType {
                    workflow: workflow.name,
                    seq_type: seq_type.to_string(),
                });
            }
        }
        if let Some(reference_genome) = context.axis(SelectorAxis::ReferenceGenome) {
            if !workflow.allowed_reference_genomes.is_empty()
                && !workflow.allowed_reference_genomes.contains(reference_genome)
            {
                return Err(RegistryError::ReferenceGenomeNotAllowed {
                    workflow: workflow.name,
                    reference_genome: reference_genome.to_string(),
                });
            }
        }

        Ok(workflow)
    }

    pub fn len(&self) -> usize {
        self.workflows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.workflows.is_empty()
    }
}
