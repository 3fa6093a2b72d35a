//! # Orchestration Types
//!
//! Values exchanged between the run engine and the execution backends.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::time::Duration;

use crate::models::{ExecutionTarget, FragmentCategory, NewArtefact, RunId, StepId, StepKind};
use crate::state_machine::{RunState, StepState};

/// Everything a backend needs to start a step
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DispatchRequest {
    pub run_id: RunId,
    pub step_id: StepId,
    pub step_name: String,
    pub kind: StepKind,
    pub target: ExecutionTarget,
    /// Merged configuration snapshot of the run
    pub configuration: Value,
    /// Resolved values of the non-core fragment categories
    #[serde(default)]
    pub related_configuration: BTreeMap<FragmentCategory, Value>,
}

/// Acknowledgement of an accepted dispatch
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DispatchReceipt {
    pub job_id: Option<String>,
    /// Outputs the job will produce; listed on the run as planned until the step ends
    #[serde(default)]
    pub planned_artefacts: Vec<NewArtefact>,
}

/// Framework integration trait for step execution
///
/// Dispatch is fire-and-forget: the backend accepts the step and reports progress
/// later through [`JobCallback`] values. It must not wait for the job to finish.
#[async_trait::async_trait]
pub trait StepDispatcher: Send + Sync {
    /// Backend name for logging
    fn name(&self) -> &'static str;

    /// Hand a step to the backend
    async fn dispatch(&self, request: DispatchRequest) -> Result<DispatchReceipt, String>;
}

/// Progress report of an execution backend
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobCallback {
    pub step_id: StepId,
    pub kind: CallbackKind,
}

impl JobCallback {
    pub fn new(step_id: StepId, kind: CallbackKind) -> Self {
        Self { step_id, kind }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum CallbackKind {
    /// The job waits in the cluster queue
    Queued {
        job_id: Option<String>,
        queue_time: Option<Duration>,
    },
    /// The job is running
    Progress { process_time: Duration },
    /// The job finished; its results are being validated
    Checking,
    /// The job needs an operator decision
    AwaitingUser,
    Succeeded {
        #[serde(default)]
        artefacts: Vec<NewArtefact>,
        process_time: Option<Duration>,
    },
    Failed { message: String },
}

/// What applying a callback did
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum CallbackOutcome {
    /// Step and run moved to new states
    Transitioned {
        step_state: StepState,
        run_state: RunState,
    },
    /// Only the job details changed
    DetailsUpdated,
    /// Duplicate or stale callback, nothing changed
    Ignored { reason: String },
}

/// Operator answer for a step waiting for user input
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "decision", rename_all = "snake_case")]
pub enum UserDecision {
    Continue,
    Fail { reason: String },
}

/// Result of one scheduling pass
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DispatchSummary {
    pub dispatched: Vec<StepId>,
    pub awaiting_user: Vec<StepId>,
    /// Runs left pending because their workflow is at its parallel limit
    pub deferred: Vec<RunId>,
    pub failed: Vec<StepId>,
}

impl DispatchSummary {
    pub fn is_empty(&self) -> bool {
        self.dispatched.is_empty()
            && self.awaiting_user.is_empty()
            && self.deferred.is_empty()
            && self.failed.is_empty()
    }
}
