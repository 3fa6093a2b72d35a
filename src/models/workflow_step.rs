//! # Workflow Step Model
//!
//! One unit of work inside a workflow run: a cluster job, an external workflow
//! execution, a validation, or an operator decision.
//!
//! Steps are exclusively owned by their run. A restart never rewinds a step; it marks
//! the old instance `RESTARTED` and appends a successor carrying a `restart_of` pointer,
//! so the run's step list only grows.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::time::Duration;

use super::transition::TransitionHistory;
use super::{RunId, StepId};
use crate::state_machine::states::StepState;

/// Where a dispatched step is executed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ExecutionTarget {
    /// Inside the core or as a cluster job it submits
    Otp,
    /// On an external workflow execution service
    Wes,
}

impl ExecutionTarget {
    pub fn running_state(&self) -> StepState {
        match self {
            Self::Otp => StepState::RunningOtp,
            Self::Wes => StepState::RunningWes,
        }
    }
}

/// Closed set of step kinds, each carrying only the data its transitions need
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum StepKind {
    /// Input preparation (linking, copying) done by the core
    Prepare,
    /// A job submitted to the compute cluster
    ClusterJob { queue: Option<String> },
    /// A run on an external workflow execution service
    WesJob { workflow_url: String },
    /// Result validation; dispatched like a core step, then checked
    Validation,
    /// Suspends the run until an operator decides
    UserDecision { prompt: String },
    /// Registration of the produced artefacts
    Finalize,
}

impl StepKind {
    /// The execution target, or `None` for steps that are not dispatched
    pub fn execution_target(&self) -> Option<ExecutionTarget> {
        match self {
            Self::Prepare | Self::ClusterJob { .. } | Self::Validation | Self::Finalize => {
                Some(ExecutionTarget::Otp)
            }
            Self::WesJob { .. } => Some(ExecutionTarget::Wes),
            Self::UserDecision { .. } => None,
        }
    }
}

/// Progress details reported by the execution backend
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StepDetail {
    pub job_id: Option<String>,
    pub queue_time: Option<Duration>,
    pub process_time: Option<Duration>,
    pub error_message: Option<String>,
    /// Set while a dispatch of the pending step awaits the backend's acknowledgement
    #[serde(default)]
    pub dispatch_requested_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkflowStep {
    pub id: StepId,
    pub run_id: RunId,
    pub ordinal: u32,
    pub name: String,
    pub kind: StepKind,
    pub state: StepState,
    pub detail: StepDetail,
    pub created_at: DateTime<Utc>,
    pub last_updated: DateTime<Utc>,
    /// Step instance this one replaces
    pub restart_of: Option<StepId>,
    /// Step instance that replaced this one
    pub restarted_by: Option<StepId>,
    pub transitions: TransitionHistory,
}

impl WorkflowStep {
    pub fn new(
        id: StepId,
        run_id: RunId,
        ordinal: u32,
        name: impl Into<String>,
        kind: StepKind,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            run_id,
            ordinal,
            name: name.into(),
            kind,
            state: StepState::Created,
            detail: StepDetail::default(),
            created_at: now,
            last_updated: now,
            restart_of: None,
            restarted_by: None,
            transitions: TransitionHistory::starting_at(StepState::Created.to_string(), now),
        }
    }

    /// Fresh successor instance of this step, starting from `CREATED`
    pub fn successor(&self, id: StepId, now: DateTime<Utc>) -> Self {
        let mut step = Self::new(id, self.run_id, self.ordinal, &self.name, self.kind.clone(), now);
        step.restart_of = Some(self.id);
        step
    }

    /// Whether a scheduling pass already claimed this step for the backend
    pub fn is_dispatch_in_flight(&self) -> bool {
        self.state == StepState::Pending && self.detail.dispatch_requested_at.is_some()
    }

    /// Whether this instance is the current one of its lineage
    pub fn is_current(&self) -> bool {
        self.restarted_by.is_none()
    }

    pub fn duration(&self) -> chrono::Duration {
        self.last_updated - self.created_at
    }
}
