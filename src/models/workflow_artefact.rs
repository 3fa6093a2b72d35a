use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{ArtefactId, RunId, StepId};
use crate::state_machine::states::StepState;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ArtefactState {
    PlannedOrRunning,
    Success,
    Failed,
    Omitted,
}

impl ArtefactState {
    /// State of a planned artefact once its producing step ended in `step_state`
    pub fn settled_by(step_state: StepState) -> Option<Self> {
        match step_state {
            StepState::Success => Some(Self::Success),
            StepState::Failed => Some(Self::Failed),
            StepState::Killed | StepState::Omitted | StepState::OmittedMissingPrecondition => {
                Some(Self::Omitted)
            }
            _ => None,
        }
    }
}

/// Output of a successful step, owned by the producing run and referenced by
/// downstream runs through its id.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkflowArtefact {
    pub id: ArtefactId,
    pub produced_by_run: RunId,
    pub produced_by_step: StepId,
    pub artefact_type: String,
    pub display_name: String,
    pub state: ArtefactState,
    pub created_at: DateTime<Utc>,
}

impl WorkflowArtefact {
    pub fn new(
        id: ArtefactId,
        run_id: RunId,
        step_id: StepId,
        announced: NewArtefact,
        state: ArtefactState,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            produced_by_run: run_id,
            produced_by_step: step_id,
            artefact_type: announced.artefact_type,
            display_name: announced.display_name,
            state,
            created_at: now,
        }
    }
}

/// Artefact announced by the execution backend, planned at dispatch or reported with a
/// step result
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewArtefact {
    pub artefact_type: String,
    pub display_name: String,
}

impl NewArtefact {
    pub fn new(artefact_type: impl Into<String>, display_name: impl Into<String>) -> Self {
        Self {
            artefact_type: artefact_type.into(),
            display_name: display_name.into(),
        }
    }
}
