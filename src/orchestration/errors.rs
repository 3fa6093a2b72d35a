use thiserror::Error;

use crate::models::{RunId, StepId};
use crate::registry::RegistryError;
use crate::resolver::ResolverError;
use crate::state_machine::{EntityRef, StateMachineError};

/// Errors raised by the run engine and the recovery controller
#[derive(Error, Debug, Clone, PartialEq)]
pub enum OrchestrationError {
    #[error(transparent)]
    Resolver(#[from] ResolverError),

    #[error(transparent)]
    Registry(#[from] RegistryError),

    #[error(transparent)]
    StateMachine(#[from] StateMachineError),

    #[error("Workflow run {0} not found")]
    RunNotFound(RunId),

    #[error("Workflow step {0} not found")]
    StepNotFound(StepId),

    #[error("Workflow {workflow} reached its limit of {limit} parallel runs")]
    ParallelLimitReached { workflow: String, limit: usize },

    #[error("Dispatch of workflow step {step_id} failed: {reason}")]
    DispatchFailed { step_id: StepId, reason: String },

    #[error("Validation failed: {0}")]
    Validation(String),
}

impl OrchestrationError {
    /// Whether no configuration could be resolved for the requested context
    pub fn is_no_configuration_found(&self) -> bool {
        matches!(self, Self::Resolver(ResolverError::NoConfigurationFound { .. }))
    }

    pub fn is_illegal_transition(&self) -> bool {
        matches!(
            self,
            Self::StateMachine(StateMachineError::IllegalTransition { .. })
        )
    }

    pub fn is_already_in_target_state(&self) -> bool {
        matches!(
            self,
            Self::StateMachine(StateMachineError::AlreadyInTargetState { .. })
        )
    }

    /// The replacing entity reported by an `AlreadyInTargetState` error
    pub fn successor(&self) -> Option<EntityRef> {
        match self {
            Self::StateMachine(StateMachineError::AlreadyInTargetState { successor, .. }) => {
                *successor
            }
            _ => None,
        }
    }
}

pub type OrchestrationResult<T> = Result<T, OrchestrationError>;
