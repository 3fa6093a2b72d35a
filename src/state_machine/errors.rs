use std::fmt;
use thiserror::Error;

use crate::models::{FragmentId, RunId, StepId};

/// Reference to the aggregate an error is about
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EntityRef {
    Run(RunId),
    Step(StepId),
    Fragment(FragmentId),
}

impl fmt::Display for EntityRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Run(id) => write!(f, "workflow run {id}"),
            Self::Step(id) => write!(f, "workflow step {id}"),
            Self::Fragment(id) => write!(f, "selector fragment {id}"),
        }
    }
}

/// Error types for state machine operations
#[derive(Error, Debug, Clone, PartialEq)]
pub enum StateMachineError {
    #[error("Illegal transition of {entity} from {from} on {event}")]
    IllegalTransition {
        entity: EntityRef,
        from: String,
        event: String,
    },

    #[error("{entity} is already {target}{}", successor_suffix(.successor))]
    AlreadyInTargetState {
        entity: EntityRef,
        target: String,
        successor: Option<EntityRef>,
    },

    #[error("Guard condition failed: {reason}")]
    GuardFailed { reason: String },

    #[error("Action execution failed: {reason}")]
    ActionFailed { reason: String },

    #[error("Serialization error: {0}")]
    Serialization(String),
}

fn successor_suffix(successor: &Option<EntityRef>) -> String {
    successor
        .map(|entity| format!(" (replaced by {entity})"))
        .unwrap_or_default()
}

/// Specific error type for guard condition failures
#[derive(Error, Debug, Clone, PartialEq)]
pub enum GuardError {
    #[error("Business rule violation: {rule}")]
    BusinessRuleViolation { rule: String },

    #[error("Missing precondition: {precondition}")]
    MissingPrecondition { precondition: String },
}

/// Specific error type for action execution failures
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ActionError {
    #[error("Invalid state for action execution: {state}")]
    InvalidState { state: String },
}

impl From<GuardError> for StateMachineError {
    fn from(err: GuardError) -> Self {
        Self::GuardFailed {
            reason: err.to_string(),
        }
    }
}

impl From<ActionError> for StateMachineError {
    fn from(err: ActionError) -> Self {
        Self::ActionFailed {
            reason: err.to_string(),
        }
    }
}

impl From<serde_json::Error> for StateMachineError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization(err.to_string())
    }
}

/// Result type alias for state machine operations
pub type StateMachineResult<T> = Result<T, StateMachineError>;
pub type GuardResult<T> = Result<T, GuardError>;
pub type ActionResult<T> = Result<T, ActionError>;

/// Helper function to create illegal transition errors
pub fn illegal_transition(
    entity: EntityRef,
    from: impl fmt::Display,
    event: impl Into<String>,
) -> StateMachineError {
    StateMachineError::IllegalTransition {
        entity,
        from: from.to_string(),
        event: event.into(),
    }
}

/// Helper function to create idempotent no-op signals
pub fn already_in_target_state(
    entity: EntityRef,
    target: impl fmt::Display,
    successor: Option<EntityRef>,
) -> StateMachineError {
    StateMachineError::AlreadyInTargetState {
        entity,
        target: target.to_string(),
        successor,
    }
}

/// Helper function to create business rule violations
pub fn business_rule_violation(rule: impl Into<String>) -> GuardError {
    GuardError::BusinessRuleViolation { rule: rule.into() }
}
