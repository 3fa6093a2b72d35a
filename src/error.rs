use thiserror::Error;

use crate::config::ConfigurationError;
use crate::orchestration::OrchestrationError;
use crate::registry::RegistryError;
use crate::resolver::ResolverError;
use crate::selector::SelectorError;
use crate::state_machine::StateMachineError;

/// Crate-wide error type aggregating the subsystem errors.
///
/// Every public operation returns one of the subsystem errors; this enum exists for
/// callers that drive several subsystems and want a single `?`-compatible type.
#[derive(Debug, Error)]
pub enum WorkflowCoreError {
    #[error(transparent)]
    Selector(#[from] SelectorError),

    #[error(transparent)]
    Resolver(#[from] ResolverError),

    #[error(transparent)]
    StateMachine(#[from] StateMachineError),

    #[error(transparent)]
    Registry(#[from] RegistryError),

    #[error(transparent)]
    Orchestration(#[from] OrchestrationError),

    #[error(transparent)]
    Configuration(#[from] ConfigurationError),
}

impl WorkflowCoreError {
    /// Whether this error is the "no related selectors" signal rather than a failure
    pub fn is_no_configuration_found(&self) -> bool {
        match self {
            Self::Resolver(ResolverError::NoConfigurationFound { .. }) => true,
            Self::Orchestration(err) => err.is_no_configuration_found(),
            _ => false,
        }
    }
}

pub type Result<T> = std::result::Result<T, WorkflowCoreError>;
