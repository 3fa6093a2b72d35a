use serde::{Deserialize, Serialize};

use super::states::RunState;
use crate::models::ExecutionTarget;

/// Events that can trigger workflow run state transitions
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum RunEvent {
    /// Hand the created run to the scheduler
    Enqueue,
    /// Step states changed; move to the aggregated run state
    Reevaluate(RunState),
    /// No configuration is available for the run
    OmitMissingPrecondition,
    /// Operator gives up on a failed run
    MarkFailedFinal,
    /// A new run replaces this failed run
    MarkRestarted,
    /// Operator cancels the run
    Kill,
}

impl RunEvent {
    /// Get a string representation of the event type for logging
    pub fn event_type(&self) -> &'static str {
        match self {
            Self::Enqueue => "enqueue",
            Self::Reevaluate(_) => "reevaluate",
            Self::OmitMissingPrecondition => "omit_missing_precondition",
            Self::MarkFailedFinal => "mark_failed_final",
            Self::MarkRestarted => "mark_restarted",
            Self::Kill => "kill",
        }
    }
}

/// Events that can trigger workflow step state transitions
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum StepEvent {
    /// Schedule the step
    Enqueue,
    /// The execution backend accepted the step
    Dispatch(ExecutionTarget),
    /// Results are being validated
    Check,
    /// The step needs an operator decision
    AwaitUser,
    /// Mark step as successful
    Succeed,
    /// Mark step as failed with error message
    Fail(String),
    /// The step is not needed for this run
    Omit,
    /// The step cannot run because its configuration is missing
    OmitMissingPrecondition,
    /// Cancel the step
    Kill,
    /// A successor instance replaces this step
    MarkRestarted,
}

impl StepEvent {
    /// Get a string representation of the event type for logging
    pub fn event_type(&self) -> &'static str {
        match self {
            Self::Enqueue => "enqueue",
            Self::Dispatch(_) => "dispatch",
            Self::Check => "check",
            Self::AwaitUser => "await_user",
            Self::Succeed => "succeed",
            Self::Fail(_) => "fail",
            Self::Omit => "omit",
            Self::OmitMissingPrecondition => "omit_missing_precondition",
            Self::Kill => "kill",
            Self::MarkRestarted => "mark_restarted",
        }
    }

    /// Extract error message if this is a failure event
    pub fn error_message(&self) -> Option<&str> {
        match self {
            Self::Fail(msg) => Some(msg),
            _ => None,
        }
    }

    /// Check if this event represents a terminal transition
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            Self::Succeed
                | Self::Fail(_)
                | Self::Omit
                | Self::OmitMissingPrecondition
                | Self::Kill
                | Self::MarkRestarted
        )
    }

    /// Create a failure event with the given error message
    pub fn fail_with_error(error: impl Into<String>) -> Self {
        Self::Fail(error.into())
    }
}
