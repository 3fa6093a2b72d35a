//! # Recovery Controller
//!
//! Operator-initiated recovery of failed work.
//!
//! Restarts never rewrite history: the old step or run is tagged `RESTARTED` and a new
//! instance is linked to it. Every operation is idempotent in the sense that repeating
//! it reports `AlreadyInTargetState` with a reference to the replacing entity instead
//! of creating a second replacement.

use std::sync::Arc;
use tracing::{info, warn};

use super::errors::{OrchestrationError, OrchestrationResult};
use super::run_engine::{record_run_created, reevaluate_run, transition_step, RunEngine};
use crate::logging::{log_run_operation, log_step_operation};
use crate::models::{RunId, StepId, WorkflowRun, WorkflowStep};
use crate::resolver::ResolverError;
use crate::state_machine::errors::{already_in_target_state, illegal_transition};
use crate::state_machine::guards::{RunAcceptsRecoveryGuard, StepCanBeRecomputedGuard};
use crate::state_machine::{
    EntityRef, RunEvent, RunState, RunStateMachine, StateGuard, StateMachineError, StepEvent,
    StepState, TransitionContext,
};

/// Per-target results of a bulk recovery request
pub type BulkResults<T, R> = Vec<(T, OrchestrationResult<R>)>;

pub struct RecoveryController {
    engine: Arc<RunEngine>,
    actor: Option<String>,
}

impl RecoveryController {
    pub fn new(engine: Arc<RunEngine>) -> Self {
        Self {
            engine,
            actor: None,
        }
    }

    /// Controller whose actions are recorded in the transition history as `actor`'s
    pub fn acting_as(&self, actor: impl Into<String>) -> Self {
        Self {
            engine: Arc::clone(&self.engine),
            actor: Some(actor.into()),
        }
    }

    fn transition_context(&self) -> TransitionContext {
        match &self.actor {
            Some(actor) => TransitionContext::with_actor(actor.clone()),
            None => TransitionContext::new(),
        }
    }

    /// Replace a failed, killed or omitted step with a fresh instance.
    ///
    /// The run returns to `PENDING` and the new instance is picked up by the next
    /// scheduling pass.
    pub fn restart_step(&self, step_id: StepId) -> OrchestrationResult<StepId> {
        let repository = self.engine.repository();
        let run_id = repository.run_id_for_step(step_id)?;

        let mut transition_context = self.transition_context();
        let (successor, run_state) =
            repository.apply(run_id, &mut transition_context, |run, context| {
                ensure_not_restarted(run, step_id)?;
                ensure_recoverable(run, "restart_step")?;
                ensure_step_restartable(run, step_id, "restart_step")?;

                let successor = self.recreate_step(run, step_id, context)?;
                let run_state = reevaluate_run(run, context)?;
                Ok((successor, run_state))
            })?;
        transition_context.flush(self.engine.event_publisher());

        log_step_operation(
            "restart_step",
            Some(run_id),
            Some(step_id),
            None,
            &StepState::Restarted.to_string(),
            Some(&format!("successor={successor} run_state={run_state}")),
        );
        Ok(successor)
    }

    /// Recompute the step preceding a failed step, then the failed step itself.
    ///
    /// Returns the new instances in execution order.
    pub fn restart_previous_step(&self, step_id: StepId) -> OrchestrationResult<Vec<StepId>> {
        let repository = self.engine.repository();
        let run_id = repository.run_id_for_step(step_id)?;

        let mut transition_context = self.transition_context();
        let successors = repository.apply(run_id, &mut transition_context, |run, context| {
            ensure_not_restarted(run, step_id)?;
            ensure_recoverable(run, "restart_previous_step")?;

            let ordinal = ensure_step_restartable(run, step_id, "restart_previous_step")?.ordinal;
            let predecessor = run
                .current_steps()
                .filter(|other| other.ordinal < ordinal)
                .max_by_key(|other| other.ordinal)
                .ok_or_else(|| {
                    OrchestrationError::Validation(format!(
                        "workflow step {step_id} has no preceding step"
                    ))
                })?;
            StepCanBeRecomputedGuard
                .check(predecessor)
                .map_err(StateMachineError::from)?;
            let predecessor_id = predecessor.id;

            let successors = vec![
                self.recreate_step(run, predecessor_id, context)?,
                self.recreate_step(run, step_id, context)?,
            ];
            reevaluate_run(run, context)?;
            Ok(successors)
        })?;
        transition_context.flush(self.engine.event_publisher());

        log_step_operation(
            "restart_previous_step",
            Some(run_id),
            Some(step_id),
            None,
            &StepState::Restarted.to_string(),
            Some(&format!("successors={successors:?}")),
        );
        Ok(successors)
    }

    /// Restart the failed step of a run
    pub fn restart_failed_step(&self, run_id: RunId) -> OrchestrationResult<StepId> {
        let run = self.engine.repository().snapshot(run_id)?;
        let step_id = run.failed_step().map(|step| step.id).ok_or_else(|| {
            OrchestrationError::Validation(format!("workflow run {run_id} has no restartable step"))
        })?;
        self.restart_step(step_id)
    }

    /// Replace a failed run with a new run for the same context.
    ///
    /// Configuration is resolved again, so fragment changes made since the failure
    /// apply to the new run. When nothing resolves anymore the new run is created as
    /// `OMITTED_MISSING_PRECONDITION` and the old run still counts as restarted.
    pub fn restart_run(&self, run_id: RunId) -> OrchestrationResult<RunId> {
        let repository = self.engine.repository();
        let old_run = repository.snapshot(run_id)?;
        ensure_run_restartable(&old_run)?;

        let workflow = self.engine.registry().get(&old_run.workflow)?;
        let configuration = match self.engine.resolver().resolve(&old_run.context) {
            Ok(configuration) => Some(configuration),
            Err(err @ ResolverError::NoConfigurationFound { .. }) => {
                warn!(run_id, error = %err, "Restarted run misses its configuration");
                None
            }
            Err(err) => return Err(err.into()),
        };

        let mut transition_context = self.transition_context();
        let mut new_run = self.engine.build_run(
            &workflow,
            old_run.context.clone(),
            configuration,
            Some(run_id),
            transition_context.now,
        );
        record_run_created(&new_run, &mut transition_context);
        initialize_run(&mut new_run, &mut transition_context)?;
        let new_run_id = new_run.id;

        repository.apply(run_id, &mut transition_context, |run, context| {
            ensure_run_restartable(run)?;
            RunStateMachine::new(run).transition(RunEvent::MarkRestarted, context)?;
            run.restarted_as = Some(new_run_id);
            Ok(())
        })?;
        let new_state = new_run.state;
        repository.insert(new_run);
        transition_context.flush(self.engine.event_publisher());

        log_run_operation(
            "restart_run",
            Some(run_id),
            Some(&old_run.workflow),
            &RunState::Restarted.to_string(),
            Some(&format!("successor={new_run_id} successor_state={new_state}")),
        );
        Ok(new_run_id)
    }

    /// Give up on a failed run; the state is final
    pub fn mark_failed_final(&self, run_id: RunId) -> OrchestrationResult<RunState> {
        let mut transition_context = self.transition_context();
        let state = self
            .engine
            .repository()
            .apply(run_id, &mut transition_context, |run, context| {
                if run.state == RunState::FailedFinal {
                    return Err(
                        already_in_target_state(EntityRef::Run(run_id), run.state, None).into(),
                    );
                }
                Ok(RunStateMachine::new(run).transition(RunEvent::MarkFailedFinal, context)?)
            })?;
        transition_context.flush(self.engine.event_publisher());

        log_run_operation("mark_failed_final", Some(run_id), None, &state.to_string(), None);
        Ok(state)
    }

    /// Restart several steps; each step succeeds or fails on its own
    pub fn restart_steps(&self, step_ids: &[StepId]) -> BulkResults<StepId, StepId> {
        let results: BulkResults<StepId, StepId> = step_ids
            .iter()
            .map(|step_id| (*step_id, self.restart_step(*step_id)))
            .collect();
        log_bulk("restart_steps", &results);
        results
    }

    /// Mark several runs as failed final; each run succeeds or fails on its own
    pub fn mark_failed_final_bulk(&self, run_ids: &[RunId]) -> BulkResults<RunId, RunState> {
        let results: BulkResults<RunId, RunState> = run_ids
            .iter()
            .map(|run_id| (*run_id, self.mark_failed_final(*run_id)))
            .collect();
        log_bulk("mark_failed_final_bulk", &results);
        results
    }

    /// Tag a step as restarted and append its successor to the run
    fn recreate_step(
        &self,
        run: &mut WorkflowRun,
        step_id: StepId,
        context: &mut TransitionContext,
    ) -> OrchestrationResult<StepId> {
        let successor_id = self.engine.repository().next_step_id();
        let successor = run
            .step(step_id)
            .ok_or(OrchestrationError::StepNotFound(step_id))?
            .successor(successor_id, context.now);

        transition_step(run, step_id, StepEvent::MarkRestarted, context)?;
        if let Some(step) = run.step_mut(step_id) {
            step.restarted_by = Some(successor_id);
        }
        run.steps.push(successor);

        Ok(successor_id)
    }
}

fn ensure_not_restarted(run: &WorkflowRun, step_id: StepId) -> OrchestrationResult<()> {
    let step = run
        .step(step_id)
        .ok_or(OrchestrationError::StepNotFound(step_id))?;

    if step.state == StepState::Restarted {
        let successor = run
            .latest_in_lineage(step_id)
            .map(|latest| EntityRef::Step(latest.id));
        return Err(already_in_target_state(EntityRef::Step(step_id), step.state, successor).into());
    }
    Ok(())
}

/// Only failed, killed or omitted steps are replaced; any other state is an illegal source
fn ensure_step_restartable<'a>(
    run: &'a WorkflowRun,
    step_id: StepId,
    operation: &str,
) -> OrchestrationResult<&'a WorkflowStep> {
    let step = run
        .step(step_id)
        .ok_or(OrchestrationError::StepNotFound(step_id))?;

    if !step.state.is_restartable() {
        return Err(illegal_transition(EntityRef::Step(step_id), step.state, operation).into());
    }
    Ok(step)
}

fn ensure_recoverable(run: &WorkflowRun, operation: &str) -> OrchestrationResult<()> {
    if run.state.is_terminal() {
        return Err(illegal_transition(EntityRef::Run(run.id), run.state, operation).into());
    }
    RunAcceptsRecoveryGuard
        .check(run)
        .map_err(StateMachineError::from)?;
    Ok(())
}

fn ensure_run_restartable(run: &WorkflowRun) -> OrchestrationResult<()> {
    match run.state {
        RunState::Failed => Ok(()),
        RunState::Restarted => Err(already_in_target_state(
            EntityRef::Run(run.id),
            run.state,
            run.restarted_as.map(EntityRef::Run),
        )
        .into()),
        state => Err(illegal_transition(EntityRef::Run(run.id), state, "restart_run").into()),
    }
}

/// Enqueue a freshly built run, or omit it with all its steps when it has no configuration
fn initialize_run(run: &mut WorkflowRun, context: &mut TransitionContext) -> OrchestrationResult<()> {
    if run.configuration.is_some() {
        RunStateMachine::new(run).transition(RunEvent::Enqueue, context)?;
        return Ok(());
    }

    let step_ids: Vec<StepId> = run.steps.iter().map(|step| step.id).collect();
    for step_id in step_ids {
        transition_step(run, step_id, StepEvent::OmitMissingPrecondition, context)?;
    }
    RunStateMachine::new(run).transition(RunEvent::OmitMissingPrecondition, context)?;
    Ok(())
}

fn log_bulk<T: std::fmt::Display, R>(operation: &str, results: &BulkResults<T, R>) {
    let failed: Vec<String> = results
        .iter()
        .filter_map(|(target, result)| {
            result
                .as_ref()
                .err()
                .map(|err| format!("{target}: {err}"))
        })
        .collect();

    info!(
        operation = operation,
        requested = results.len(),
        failed = failed.len(),
        "Bulk recovery finished"
    );
    for failure in failed {
        warn!(operation = operation, failure = %failure, "Bulk recovery target rejected");
    }
}
