//! # Workflow Run Model
//!
//! One execution attempt of a workflow against a context.
//!
//! A run owns its steps and artefacts. Its configuration snapshot is captured when the
//! run is created and never changes afterwards; a restarted run is a new run that
//! re-resolves configuration and links back through `restarted_from`.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::context::RunContext;
use super::transition::TransitionHistory;
use super::workflow_artefact::WorkflowArtefact;
use super::workflow_step::WorkflowStep;
use super::{RunId, StepId};
use crate::resolver::EffectiveConfiguration;
use crate::state_machine::states::RunState;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkflowRun {
    pub id: RunId,
    pub workflow: String,
    pub workflow_version: Option<String>,
    pub context: RunContext,
    /// Captured at creation; `None` only when no configuration could be resolved
    pub configuration: Option<EffectiveConfiguration>,
    pub state: RunState,
    pub priority: i32,
    pub display_name: String,
    pub short_name: String,
    pub comment: Option<String>,
    pub steps: Vec<WorkflowStep>,
    pub artefacts: Vec<WorkflowArtefact>,
    pub created_at: DateTime<Utc>,
    pub started_at: Option<DateTime<Utc>>,
    pub ended_at: Option<DateTime<Utc>>,
    pub last_updated: DateTime<Utc>,
    pub restarted_from: Option<RunId>,
    pub restarted_as: Option<RunId>,
    pub transitions: TransitionHistory,
}

impl WorkflowRun {
    /// `true` once SUCCESS or FAILED_FINAL was reached
    pub fn is_final(&self) -> bool {
        self.state.is_final()
    }

    /// Current step instances in ordinal order, restarted predecessors excluded
    pub fn current_steps(&self) -> impl Iterator<Item = &WorkflowStep> {
        let mut steps: Vec<&WorkflowStep> =
            self.steps.iter().filter(|step| step.is_current()).collect();
        steps.sort_by_key(|step| step.ordinal);
        steps.into_iter()
    }

    pub fn step(&self, step_id: StepId) -> Option<&WorkflowStep> {
        self.steps.iter().find(|step| step.id == step_id)
    }

    pub fn step_mut(&mut self, step_id: StepId) -> Option<&mut WorkflowStep> {
        self.steps.iter_mut().find(|step| step.id == step_id)
    }

    pub fn step_index(&self, step_id: StepId) -> Option<usize> {
        self.steps.iter().position(|step| step.id == step_id)
    }

    /// Follow the restart lineage of a step to its current instance
    pub fn latest_in_lineage(&self, step_id: StepId) -> Option<&WorkflowStep> {
        let mut step = self.step(step_id)?;
        while let Some(next) = step.restarted_by {
            step = self.step(next)?;
        }
        Some(step)
    }

    /// Current step shown in the run list: the first one not yet satisfied
    pub fn active_step(&self) -> Option<&WorkflowStep> {
        self.current_steps()
            .find(|step| !step.state.satisfies_dependencies())
            .or_else(|| self.current_steps().last())
    }

    /// The failed current step, if any
    pub fn failed_step(&self) -> Option<&WorkflowStep> {
        self.current_steps()
            .find(|step| step.state.is_restartable())
    }

    pub fn duration(&self) -> chrono::Duration {
        self.ended_at.unwrap_or(self.last_updated) - self.created_at
    }
}
