use serde_json::{json, Value};

use super::context::TransitionContext;
use super::errors::{ActionError, ActionResult};
use super::states::{RunState, StepState};
use crate::constants::events;
use crate::logging::{log_run_operation, log_step_operation};
use crate::models::{WorkflowRun, WorkflowStep};

/// Trait for implementing state transition actions
pub trait StateAction<T> {
    /// Execute the action
    fn execute(
        &self,
        entity: &T,
        from_state: Option<String>,
        to_state: String,
        event: &str,
        context: &mut TransitionContext,
    ) -> ActionResult<()>;

    /// Get a description of this action for logging
    fn description(&self) -> &'static str;
}

/// Action to queue lifecycle events when state transitions occur
pub struct PublishTransitionEventAction;

impl StateAction<WorkflowRun> for PublishTransitionEventAction {
    fn execute(
        &self,
        run: &WorkflowRun,
        from_state: Option<String>,
        to_state: String,
        event: &str,
        context: &mut TransitionContext,
    ) -> ActionResult<()> {
        let event_context = build_run_event_context(run, &from_state, &to_state, event);

        context.record_event(events::WORKFLOW_RUN_TRANSITIONED, event_context.clone());
        if let Some(event_name) = determine_run_event_name(&to_state)? {
            context.record_event(event_name, event_context);
        }

        Ok(())
    }

    fn description(&self) -> &'static str {
        "Publish lifecycle event for run transition"
    }
}

impl StateAction<WorkflowStep> for PublishTransitionEventAction {
    fn execute(
        &self,
        step: &WorkflowStep,
        from_state: Option<String>,
        to_state: String,
        event: &str,
        context: &mut TransitionContext,
    ) -> ActionResult<()> {
        let event_context = build_step_event_context(step, &from_state, &to_state, event);

        context.record_event(events::WORKFLOW_STEP_TRANSITIONED, event_context.clone());
        if let Some(event_name) = determine_step_event_name(&to_state)? {
            context.record_event(event_name, event_context);
        }

        Ok(())
    }

    fn description(&self) -> &'static str {
        "Publish lifecycle event for step transition"
    }
}

/// Action to write a structured log line for every transition
pub struct LogTransitionAction;

impl StateAction<WorkflowRun> for LogTransitionAction {
    fn execute(
        &self,
        run: &WorkflowRun,
        from_state: Option<String>,
        to_state: String,
        event: &str,
        _context: &mut TransitionContext,
    ) -> ActionResult<()> {
        log_run_operation(
            "transition",
            Some(run.id),
            Some(&run.workflow),
            &to_state,
            Some(&format!("from={} event={event}", from_state.as_deref().unwrap_or("-"))),
        );
        Ok(())
    }

    fn description(&self) -> &'static str {
        "Log run transition"
    }
}

impl StateAction<WorkflowStep> for LogTransitionAction {
    fn execute(
        &self,
        step: &WorkflowStep,
        from_state: Option<String>,
        to_state: String,
        event: &str,
        _context: &mut TransitionContext,
    ) -> ActionResult<()> {
        log_step_operation(
            "transition",
            Some(step.run_id),
            Some(step.id),
            Some(&step.name),
            &to_state,
            Some(&format!("from={} event={event}", from_state.as_deref().unwrap_or("-"))),
        );
        Ok(())
    }

    fn description(&self) -> &'static str {
        "Log step transition"
    }
}

fn determine_run_event_name(to_state: &str) -> ActionResult<Option<&'static str>> {
    let state = to_state
        .parse::<RunState>()
        .map_err(|_| ActionError::InvalidState {
            state: to_state.to_string(),
        })?;
    Ok(match state {
        RunState::FailedFinal => Some(events::WORKFLOW_RUN_FAILED_FINAL),
        RunState::Killed => Some(events::WORKFLOW_RUN_KILLED),
        RunState::Restarted => Some(events::WORKFLOW_RUN_RESTARTED),
        _ => None,
    })
}

fn determine_step_event_name(to_state: &str) -> ActionResult<Option<&'static str>> {
    let state = to_state
        .parse::<StepState>()
        .map_err(|_| ActionError::InvalidState {
            state: to_state.to_string(),
        })?;
    Ok(match state {
        StepState::Failed => Some(events::WORKFLOW_STEP_FAILED),
        StepState::Restarted => Some(events::WORKFLOW_STEP_RESTARTED),
        _ => None,
    })
}

fn build_run_event_context(
    run: &WorkflowRun,
    from_state: &Option<String>,
    to_state: &str,
    event: &str,
) -> Value {
    json!({
        "run_id": run.id,
        "workflow": run.workflow,
        "workflow_version": run.workflow_version,
        "from_state": from_state,
        "to_state": to_state,
        "event": event,
    })
}

fn build_step_event_context(
    step: &WorkflowStep,
    from_state: &Option<String>,
    to_state: &str,
    event: &str,
) -> Value {
    json!({
        "run_id": step.run_id,
        "step_id": step.id,
        "step_name": step.name,
        "from_state": from_state,
        "to_state": to_state,
        "event": event,
        "restart_of": step.restart_of,
    })
}
