use super::errors::{business_rule_violation, GuardError, GuardResult};
use crate::models::{WorkflowRun, WorkflowStep};

/// Trait for implementing state transition guards
pub trait StateGuard<T> {
    /// Check if a transition is allowed
    fn check(&self, entity: &T) -> GuardResult<bool>;

    /// Get a description of this guard for logging
    fn description(&self) -> &'static str;
}

/// Guard to check that a run captured a configuration before it executes anything
pub struct ConfigurationPresentGuard;

impl StateGuard<WorkflowRun> for ConfigurationPresentGuard {
    fn check(&self, run: &WorkflowRun) -> GuardResult<bool> {
        if run.configuration.is_none() {
            return Err(GuardError::MissingPrecondition {
                precondition: format!("workflow run {} has no resolved configuration", run.id),
            });
        }

        Ok(true)
    }

    fn description(&self) -> &'static str {
        "Run must have a configuration snapshot"
    }
}

/// Guard to check that a run still accepts recovery of single steps
pub struct RunAcceptsRecoveryGuard;

impl StateGuard<WorkflowRun> for RunAcceptsRecoveryGuard {
    fn check(&self, run: &WorkflowRun) -> GuardResult<bool> {
        if run.state.is_terminal() {
            return Err(business_rule_violation(format!(
                "Workflow run {} is {} and cannot be recovered",
                run.id, run.state
            )));
        }

        if run.configuration.is_none() {
            return Err(GuardError::MissingPrecondition {
                precondition: format!("workflow run {} has no resolved configuration", run.id),
            });
        }

        Ok(true)
    }

    fn description(&self) -> &'static str {
        "Run must not be terminal and must have a configuration"
    }
}

/// Guard to check that a finished step may be recomputed for a following step
pub struct StepCanBeRecomputedGuard;

impl StateGuard<WorkflowStep> for StepCanBeRecomputedGuard {
    fn check(&self, step: &WorkflowStep) -> GuardResult<bool> {
        if step.state.is_terminal() && step.is_current() {
            Ok(true)
        } else {
            Err(business_rule_violation(format!(
                "Workflow step {} in state {} cannot be recomputed",
                step.id, step.state
            )))
        }
    }

    fn description(&self) -> &'static str {
        "Step must be finished and current to be recomputed"
    }
}
