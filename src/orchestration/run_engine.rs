//! # Run Engine
//!
//! Creates workflow runs from trigger requests, hands ready steps to the execution
//! backends and applies the backends' callbacks.
//!
//! ## Flow
//!
//! ```text
//! trigger(context) -> registry checks -> resolve configuration -> run PENDING
//! dispatch_ready() -> next step per run (priority order, parallel limits) -> backend
//! apply_callback() -> step transition -> run state re-aggregated
//! ```
//!
//! Locks are never held across an await: a scheduling pass prepares requests under
//! the run lock, releases it, dispatches, and re-acquires the lock to record the
//! acknowledgement.

use chrono::{DateTime, Utc};
use serde_json::json;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, info, warn};

use super::errors::{OrchestrationError, OrchestrationResult};
use super::run_repository::RunRepository;
use super::types::{
    CallbackKind, CallbackOutcome, DispatchReceipt, DispatchRequest, DispatchSummary,
    JobCallback, StepDispatcher, UserDecision,
};
use crate::config::EngineConfig;
use crate::constants::{events, status_groups};
use crate::events::EventPublisher;
use crate::logging::{log_run_operation, log_step_operation};
use crate::models::{
    ArtefactState, ExecutionTarget, RunContext, RunId, SelectorAxis, StepId, TransitionHistory,
    Workflow, WorkflowArtefact, WorkflowRun, WorkflowStep,
};
use crate::registry::WorkflowRegistry;
use crate::resolver::{ConfigurationResolver, EffectiveConfiguration};
use crate::state_machine::errors::{already_in_target_state, illegal_transition};
use crate::state_machine::{
    EntityRef, RunEvent, RunState, RunStateMachine, StepEvent, StepState, StepStateMachine,
    TransitionContext,
};

/// Step prepared for dispatch during a scheduling pass
enum PreparedStep {
    Dispatch(DispatchRequest),
    AwaitingUser(StepId),
}

pub struct RunEngine {
    registry: Arc<WorkflowRegistry>,
    resolver: Arc<ConfigurationResolver>,
    repository: Arc<RunRepository>,
    event_publisher: EventPublisher,
    config: EngineConfig,
}

impl RunEngine {
    pub fn new(
        registry: Arc<WorkflowRegistry>,
        resolver: Arc<ConfigurationResolver>,
        repository: Arc<RunRepository>,
        event_publisher: EventPublisher,
        config: EngineConfig,
    ) -> Self {
        Self {
            registry,
            resolver,
            repository,
            event_publisher,
            config,
        }
    }

    pub fn registry(&self) -> &Arc<WorkflowRegistry> {
        &self.registry
    }

    pub fn resolver(&self) -> &Arc<ConfigurationResolver> {
        &self.resolver
    }

    pub fn repository(&self) -> &Arc<RunRepository> {
        &self.repository
    }

    pub fn event_publisher(&self) -> &EventPublisher {
        &self.event_publisher
    }

    /// Register a workflow and the fragment categories feeding its configuration
    pub fn register_workflow(&self, workflow: Workflow) -> OrchestrationResult<()> {
        let name = workflow.name.clone();
        let core_categories = workflow.core_categories.clone();

        self.registry.register(workflow)?;
        self.resolver
            .register_core_categories(&name, core_categories)?;
        Ok(())
    }

    /// Create a run for the context and queue it for scheduling.
    ///
    /// Nothing is created when the workflow refuses the context or no configuration
    /// resolves for it.
    pub fn trigger(&self, context: RunContext) -> OrchestrationResult<RunId> {
        let workflow = self
            .registry
            .check_triggerable(&context, Utc::now().date_naive())?;

        let configuration = self.resolver.resolve(&context).map_err(|err| {
            warn!(context = %context, error = %err, "Run not created");
            OrchestrationError::from(err)
        })?;

        let mut transition_context = TransitionContext::new();
        let mut run = self.build_run(
            &workflow,
            context,
            Some(configuration),
            None,
            transition_context.now,
        );
        record_run_created(&run, &mut transition_context);
        RunStateMachine::new(&mut run).transition(RunEvent::Enqueue, &mut transition_context)?;

        let run_id = run.id;
        self.repository.insert(run);
        transition_context.flush(&self.event_publisher);

        log_run_operation("trigger", Some(run_id), Some(&workflow.name), "PENDING", None);
        Ok(run_id)
    }

    /// Build a run with fresh step instances from the workflow's step template
    pub(crate) fn build_run(
        &self,
        workflow: &Workflow,
        context: RunContext,
        configuration: Option<EffectiveConfiguration>,
        restarted_from: Option<RunId>,
        now: DateTime<Utc>,
    ) -> WorkflowRun {
        let id = self.repository.next_run_id();
        let workflow_version = select_workflow_version(workflow, &context, configuration.as_ref());

        let steps = workflow
            .steps
            .iter()
            .enumerate()
            .map(|(ordinal, template)| {
                WorkflowStep::new(
                    self.repository.next_step_id(),
                    id,
                    ordinal as u32,
                    &template.name,
                    template.kind.clone(),
                    now,
                )
            })
            .collect();

        let display_name = context
            .display_name
            .clone()
            .unwrap_or_else(|| default_display_name(&workflow.name, &context));
        let short_name = short_name(&workflow.name, &context, id);

        WorkflowRun {
            id,
            workflow: workflow.name.clone(),
            workflow_version,
            context,
            configuration,
            state: RunState::Created,
            priority: workflow.priority,
            display_name,
            short_name,
            comment: None,
            steps,
            artefacts: Vec::new(),
            created_at: now,
            started_at: None,
            ended_at: None,
            last_updated: now,
            restarted_from,
            restarted_as: None,
            transitions: TransitionHistory::starting_at(RunState::Created.to_string(), now),
        }
    }

    /// Hand the next ready step of every pending run to the backend.
    ///
    /// Runs are visited by workflow priority, oldest first. A run whose workflow is
    /// at its parallel limit stays `PENDING` and is reported as deferred.
    pub async fn dispatch_ready(&self, dispatcher: &dyn StepDispatcher) -> DispatchSummary {
        let mut summary = DispatchSummary::default();
        let requests = self.schedule(&mut summary);

        for request in requests {
            let run_id = request.run_id;
            let step_id = request.step_id;
            let target = request.target;

            match dispatcher.dispatch(request).await {
                Ok(receipt) => match self.record_dispatch(run_id, step_id, target, receipt) {
                    Ok(true) => summary.dispatched.push(step_id),
                    Ok(false) => debug!(step_id, "Step changed state while being dispatched"),
                    Err(err) => warn!(step_id, error = %err, "Dispatch acknowledgement not applied"),
                },
                Err(reason) => {
                    let error = OrchestrationError::DispatchFailed { step_id, reason };
                    warn!(run_id, step_id, backend = dispatcher.name(), error = %error, "Dispatch failed");

                    match self.fail_step(run_id, step_id, error.to_string()) {
                        Ok(()) => summary.failed.push(step_id),
                        Err(err) => warn!(step_id, error = %err, "Dispatch failure not recorded"),
                    }
                }
            }
        }

        if !summary.is_empty() {
            info!(
                dispatched = summary.dispatched.len(),
                awaiting_user = summary.awaiting_user.len(),
                deferred = summary.deferred.len(),
                failed = summary.failed.len(),
                backend = dispatcher.name(),
                "Scheduling pass finished"
            );
        }
        summary
    }

    fn schedule(&self, summary: &mut DispatchSummary) -> Vec<DispatchRequest> {
        let runs = self.repository.snapshots();

        let mut active: HashMap<String, usize> = HashMap::new();
        for run in runs.iter().filter(|run| {
            status_groups::ACTIVE_RUN_STATES.contains(&run.state)
                || run.current_steps().any(WorkflowStep::is_dispatch_in_flight)
        }) {
            *active.entry(run.workflow.clone()).or_default() += 1;
        }

        let mut candidates: Vec<&WorkflowRun> = runs
            .iter()
            .filter(|run| run.state == RunState::Pending)
            .collect();
        candidates.sort_by(|a, b| {
            b.priority
                .cmp(&a.priority)
                .then(a.created_at.cmp(&b.created_at))
                .then(a.id.cmp(&b.id))
        });

        let mut requests = Vec::new();
        for candidate in candidates {
            if self.config.dispatch_batch_size > 0 && requests.len() >= self.config.dispatch_batch_size {
                summary.deferred.push(candidate.id);
                continue;
            }

            let running = active.get(&candidate.workflow).copied().unwrap_or(0);
            if let Err(err) = self.ensure_capacity(&candidate.workflow, running) {
                debug!(run_id = candidate.id, error = %err, "Run deferred");
                summary.deferred.push(candidate.id);
                continue;
            }

            let mut transition_context = TransitionContext::new();
            let prepared = self
                .repository
                .apply(candidate.id, &mut transition_context, |run, context| {
                    prepare_next_step(run, context)
                });
            transition_context.flush(&self.event_publisher);

            match prepared {
                Ok(Some(PreparedStep::Dispatch(request))) => {
                    *active.entry(candidate.workflow.clone()).or_default() += 1;
                    requests.push(request);
                }
                Ok(Some(PreparedStep::AwaitingUser(step_id))) => summary.awaiting_user.push(step_id),
                Ok(None) => {}
                Err(err) => warn!(run_id = candidate.id, error = %err, "Run could not be scheduled"),
            }
        }

        requests
    }

    /// Fail when the workflow already runs as many runs as it may
    fn ensure_capacity(&self, workflow: &str, running: usize) -> OrchestrationResult<()> {
        let limit = self
            .registry
            .get(workflow)
            .ok()
            .and_then(|workflow| workflow.max_parallel_runs)
            .unwrap_or(self.config.default_max_parallel_runs);

        if limit > 0 && running >= limit {
            return Err(OrchestrationError::ParallelLimitReached {
                workflow: workflow.to_string(),
                limit,
            });
        }
        Ok(())
    }

    fn record_dispatch(
        &self,
        run_id: RunId,
        step_id: StepId,
        target: ExecutionTarget,
        receipt: DispatchReceipt,
    ) -> OrchestrationResult<bool> {
        let mut transition_context = TransitionContext::new();
        let dispatched = self
            .repository
            .apply(run_id, &mut transition_context, |run, context| {
                let step = run.step(step_id).ok_or(OrchestrationError::StepNotFound(step_id))?;
                if step.state != StepState::Pending {
                    return Ok(false);
                }

                transition_step(run, step_id, StepEvent::Dispatch(target), context)?;
                if let Some(step) = run.step_mut(step_id) {
                    step.detail.job_id = receipt.job_id;
                    step.detail.dispatch_requested_at = None;
                }
                for announced in receipt.planned_artefacts {
                    let artefact = WorkflowArtefact::new(
                        self.repository.next_artefact_id(),
                        run_id,
                        step_id,
                        announced,
                        ArtefactState::PlannedOrRunning,
                        context.now,
                    );
                    run.artefacts.push(artefact);
                }
                reevaluate_run(run, context)?;
                Ok(true)
            })?;
        transition_context.flush(&self.event_publisher);

        if dispatched {
            log_step_operation(
                "dispatch",
                Some(run_id),
                Some(step_id),
                None,
                &target.running_state().to_string(),
                None,
            );
        }
        Ok(dispatched)
    }

    fn fail_step(&self, run_id: RunId, step_id: StepId, message: String) -> OrchestrationResult<()> {
        let mut transition_context = TransitionContext::new();
        self.repository
            .apply(run_id, &mut transition_context, |run, context| {
                let step = run.step(step_id).ok_or(OrchestrationError::StepNotFound(step_id))?;
                if step.state.is_terminal() {
                    return Ok(());
                }
                transition_step(run, step_id, StepEvent::Fail(message), context)?;
                if let Some(step) = run.step_mut(step_id) {
                    step.detail.dispatch_requested_at = None;
                }
                reevaluate_run(run, context)?;
                Ok(())
            })?;
        transition_context.flush(&self.event_publisher);
        Ok(())
    }

    /// Apply a backend progress report.
    ///
    /// Callbacks for finished steps are duplicates or arrive after a kill or restart;
    /// they are ignored without error.
    pub fn apply_callback(&self, callback: JobCallback) -> OrchestrationResult<CallbackOutcome> {
        let step_id = callback.step_id;
        let run_id = self.repository.run_id_for_step(step_id)?;

        let mut transition_context = TransitionContext::new();
        let outcome = self
            .repository
            .apply(run_id, &mut transition_context, |run, context| {
                self.apply_callback_to_run(run, callback, context)
            })?;
        transition_context.flush(&self.event_publisher);

        match &outcome {
            CallbackOutcome::Ignored { reason } => {
                debug!(run_id, step_id, reason = %reason, "Callback ignored")
            }
            CallbackOutcome::Transitioned { step_state, run_state } => log_step_operation(
                "callback",
                Some(run_id),
                Some(step_id),
                None,
                &step_state.to_string(),
                Some(&format!("run_state={run_state}")),
            ),
            CallbackOutcome::DetailsUpdated => {}
        }
        Ok(outcome)
    }

    fn apply_callback_to_run(
        &self,
        run: &mut WorkflowRun,
        callback: JobCallback,
        context: &mut TransitionContext,
    ) -> OrchestrationResult<CallbackOutcome> {
        let step_id = callback.step_id;
        let step = run
            .step(step_id)
            .ok_or(OrchestrationError::StepNotFound(step_id))?;
        let state = step.state;
        let target = step.kind.execution_target();

        if state.is_terminal() {
            return Ok(CallbackOutcome::Ignored {
                reason: format!("workflow step {step_id} is already {state}"),
            });
        }

        let event = match callback.kind {
            CallbackKind::Queued { job_id, queue_time } => {
                if let Some(step) = run.step_mut(step_id) {
                    if job_id.is_some() {
                        step.detail.job_id = job_id;
                    }
                    step.detail.queue_time = queue_time.or(step.detail.queue_time);
                    step.last_updated = context.now;
                }
                return Ok(CallbackOutcome::DetailsUpdated);
            }
            CallbackKind::Progress { process_time } => {
                if let Some(step) = run.step_mut(step_id) {
                    step.detail.process_time = Some(process_time);
                    step.last_updated = context.now;
                }
                return Ok(CallbackOutcome::DetailsUpdated);
            }
            CallbackKind::Checking if state == StepState::Checking => {
                return Ok(duplicate(step_id, state));
            }
            CallbackKind::AwaitingUser if state == StepState::WaitingForUser => {
                return Ok(duplicate(step_id, state));
            }
            CallbackKind::Checking => StepEvent::Check,
            CallbackKind::AwaitingUser => StepEvent::AwaitUser,
            CallbackKind::Failed { message } => StepEvent::Fail(message),
            CallbackKind::Succeeded {
                artefacts,
                process_time,
            } => {
                if let Some(step) = run.step_mut(step_id) {
                    step.detail.process_time = process_time.or(step.detail.process_time);
                }
                let run_id = run.id;
                for reported in artefacts {
                    let artefact_type = reported.artefact_type.clone();
                    let planned = run.artefacts.iter_mut().find(|artefact| {
                        artefact.produced_by_step == step_id
                            && artefact.state == ArtefactState::PlannedOrRunning
                            && artefact.artefact_type == artefact_type
                    });
                    let artefact_id = match planned {
                        Some(artefact) => {
                            artefact.display_name = reported.display_name;
                            artefact.state = ArtefactState::Success;
                            artefact.id
                        }
                        None => {
                            let artefact = WorkflowArtefact::new(
                                self.repository.next_artefact_id(),
                                run_id,
                                step_id,
                                reported,
                                ArtefactState::Success,
                                context.now,
                            );
                            let artefact_id = artefact.id;
                            run.artefacts.push(artefact);
                            artefact_id
                        }
                    };
                    context.record_event(
                        events::WORKFLOW_ARTEFACT_PRODUCED,
                        json!({
                            "artefact_id": artefact_id,
                            "run_id": run_id,
                            "step_id": step_id,
                            "artefact_type": artefact_type,
                        }),
                    );
                }
                StepEvent::Succeed
            }
        };

        // A result can overtake the dispatch acknowledgement
        if state == StepState::Pending && matches!(event, StepEvent::Check | StepEvent::Succeed) {
            let target = target.ok_or_else(|| {
                OrchestrationError::Validation(format!(
                    "workflow step {step_id} is not executed by a backend"
                ))
            })?;
            transition_step(run, step_id, StepEvent::Dispatch(target), context)?;
        }

        let step_state = transition_step(run, step_id, event, context)?;
        let run_state = reevaluate_run(run, context)?;

        Ok(CallbackOutcome::Transitioned {
            step_state,
            run_state,
        })
    }

    /// Answer a step waiting for an operator decision
    pub fn resolve_user_decision(
        &self,
        step_id: StepId,
        decision: UserDecision,
    ) -> OrchestrationResult<StepState> {
        let run_id = self.repository.run_id_for_step(step_id)?;

        let mut transition_context = TransitionContext::new();
        let step_state = self
            .repository
            .apply(run_id, &mut transition_context, |run, context| {
                let step = run.step(step_id).ok_or(OrchestrationError::StepNotFound(step_id))?;
                if step.state != StepState::WaitingForUser {
                    return Err(illegal_transition(
                        EntityRef::Step(step_id),
                        step.state,
                        "resolve_user_decision",
                    )
                    .into());
                }

                let event = match decision {
                    UserDecision::Continue => StepEvent::Succeed,
                    UserDecision::Fail { reason } => StepEvent::Fail(reason),
                };
                let step_state = transition_step(run, step_id, event, context)?;
                reevaluate_run(run, context)?;
                Ok(step_state)
            })?;
        transition_context.flush(&self.event_publisher);

        log_step_operation(
            "resolve_user_decision",
            Some(run_id),
            Some(step_id),
            None,
            &step_state.to_string(),
            None,
        );
        Ok(step_state)
    }

    /// Cancel a run and every unfinished step of it
    pub fn kill_run(&self, run_id: RunId) -> OrchestrationResult<RunState> {
        let mut transition_context = TransitionContext::new();
        self.repository
            .apply(run_id, &mut transition_context, |run, context| {
                if run.state == RunState::Killed {
                    return Err(already_in_target_state(EntityRef::Run(run_id), run.state, None).into());
                }

                let unfinished: Vec<StepId> = run
                    .current_steps()
                    .filter(|step| !step.state.is_terminal())
                    .map(|step| step.id)
                    .collect();
                for step_id in unfinished {
                    transition_step(run, step_id, StepEvent::Kill, context)?;
                }

                RunStateMachine::new(run).transition(RunEvent::Kill, context)?;
                Ok(())
            })?;
        transition_context.flush(&self.event_publisher);

        log_run_operation("kill", Some(run_id), None, "KILLED", None);
        Ok(RunState::Killed)
    }

    /// Cancel a single step; the run becomes restartable
    pub fn kill_step(&self, step_id: StepId) -> OrchestrationResult<RunState> {
        let run_id = self.repository.run_id_for_step(step_id)?;

        let mut transition_context = TransitionContext::new();
        let run_state = self
            .repository
            .apply(run_id, &mut transition_context, |run, context| {
                if run.step(step_id).map(|step| step.state) == Some(StepState::Killed) {
                    return Err(
                        already_in_target_state(EntityRef::Step(step_id), StepState::Killed, None)
                            .into(),
                    );
                }
                transition_step(run, step_id, StepEvent::Kill, context)?;
                reevaluate_run(run, context)
            })?;
        transition_context.flush(&self.event_publisher);

        log_step_operation("kill", Some(run_id), Some(step_id), None, "KILLED", None);
        Ok(run_state)
    }

    /// Skip a step that has not started; the run continues with the following step
    pub fn omit_step(&self, step_id: StepId) -> OrchestrationResult<RunState> {
        let run_id = self.repository.run_id_for_step(step_id)?;

        let mut transition_context = TransitionContext::new();
        let run_state = self
            .repository
            .apply(run_id, &mut transition_context, |run, context| {
                if run.state.is_terminal() {
                    return Err(illegal_transition(EntityRef::Run(run_id), run.state, "omit").into());
                }

                let step = run.step(step_id).ok_or(OrchestrationError::StepNotFound(step_id))?;
                if step.state == StepState::Omitted {
                    return Err(
                        already_in_target_state(EntityRef::Step(step_id), step.state, None).into(),
                    );
                }
                if step.is_dispatch_in_flight() {
                    return Err(illegal_transition(EntityRef::Step(step_id), step.state, "omit").into());
                }

                transition_step(run, step_id, StepEvent::Omit, context)?;
                reevaluate_run(run, context)
            })?;
        transition_context.flush(&self.event_publisher);

        log_step_operation("omit", Some(run_id), Some(step_id), None, "OMITTED", None);
        Ok(run_state)
    }

    /// Set or clear the operator comment of a run
    pub fn set_comment(&self, run_id: RunId, comment: Option<String>) -> OrchestrationResult<()> {
        let comment = comment
            .map(|comment| comment.trim().to_string())
            .filter(|comment| !comment.is_empty());

        let mut transition_context = TransitionContext::new();
        self.repository
            .apply(run_id, &mut transition_context, |run, _| {
                run.comment = comment;
                Ok(())
            })
    }

    pub fn get_run(&self, run_id: RunId) -> OrchestrationResult<WorkflowRun> {
        self.repository.snapshot(run_id)
    }

    pub fn runs(&self) -> Vec<WorkflowRun> {
        self.repository.snapshots()
    }
}

/// Enqueue the next step of a pending run and describe what to do with it
fn prepare_next_step(
    run: &mut WorkflowRun,
    context: &mut TransitionContext,
) -> OrchestrationResult<Option<PreparedStep>> {
    if run.state != RunState::Pending {
        return Ok(None);
    }

    let Some(step) = run
        .current_steps()
        .find(|step| !step.state.satisfies_dependencies())
    else {
        return Ok(None);
    };
    let step_id = step.id;
    let step_state = step.state;
    let in_flight = step.is_dispatch_in_flight();
    let step_name = step.name.clone();
    let kind = step.kind.clone();

    match step_state {
        StepState::Created => {
            transition_step(run, step_id, StepEvent::Enqueue, context)?;
        }
        // Claimed by an overlapping pass that has not been acknowledged yet
        StepState::Pending if in_flight => return Ok(None),
        StepState::Pending => {}
        _ => return Ok(None),
    }

    let Some(target) = kind.execution_target() else {
        transition_step(run, step_id, StepEvent::AwaitUser, context)?;
        reevaluate_run(run, context)?;
        return Ok(Some(PreparedStep::AwaitingUser(step_id)));
    };

    let configuration = run.configuration.as_ref().ok_or_else(|| {
        OrchestrationError::Validation(format!("workflow run {} has no configuration", run.id))
    })?;
    let request = DispatchRequest {
        run_id: run.id,
        step_id,
        step_name,
        kind,
        target,
        configuration: configuration.config_value.clone(),
        related_configuration: configuration
            .related_selectors
            .iter()
            .map(|(category, related)| (*category, related.value.clone()))
            .collect(),
    };

    if let Some(step) = run.step_mut(step_id) {
        step.detail.dispatch_requested_at = Some(context.now);
    }
    Ok(Some(PreparedStep::Dispatch(request)))
}

/// Transition one step of a run
pub(crate) fn transition_step(
    run: &mut WorkflowRun,
    step_id: StepId,
    event: StepEvent,
    context: &mut TransitionContext,
) -> OrchestrationResult<StepState> {
    let step = run
        .step_mut(step_id)
        .ok_or(OrchestrationError::StepNotFound(step_id))?;
    let state = StepStateMachine::new(step).transition(event, context)?;

    if let Some(settled) = ArtefactState::settled_by(state) {
        for artefact in run.artefacts.iter_mut().filter(|artefact| {
            artefact.produced_by_step == step_id && artefact.state == ArtefactState::PlannedOrRunning
        }) {
            artefact.state = settled;
        }
    }
    Ok(state)
}

/// Re-aggregate the run state after step changes and return it
pub(crate) fn reevaluate_run(
    run: &mut WorkflowRun,
    context: &mut TransitionContext,
) -> OrchestrationResult<RunState> {
    RunStateMachine::new(run).reevaluate(context)?;
    Ok(run.state)
}

pub(crate) fn record_run_created(run: &WorkflowRun, context: &mut TransitionContext) {
    context.record_event(
        events::WORKFLOW_RUN_CREATED,
        json!({
            "run_id": run.id,
            "workflow": run.workflow,
            "workflow_version": run.workflow_version,
            "restarted_from": run.restarted_from,
            "provenance": run.configuration.as_ref().map(|configuration| &configuration.provenance),
        }),
    );
}

fn duplicate(step_id: StepId, state: StepState) -> CallbackOutcome {
    CallbackOutcome::Ignored {
        reason: format!("workflow step {step_id} is already {state}"),
    }
}

/// Version from the context, then from the configuration, then the workflow default
fn select_workflow_version(
    workflow: &Workflow,
    context: &RunContext,
    configuration: Option<&EffectiveConfiguration>,
) -> Option<String> {
    context
        .axis(SelectorAxis::WorkflowVersion)
        .map(str::to_string)
        .or_else(|| {
            configuration
                .and_then(|configuration| configuration.value_at("workflowVersion"))
                .and_then(|value| value.as_str())
                .map(str::to_string)
        })
        .or_else(|| workflow.default_version().map(|version| version.name.clone()))
}

fn default_display_name(workflow: &str, context: &RunContext) -> String {
    if context.sample_ids.is_empty() {
        context.to_string()
    } else {
        format!("{workflow}: {}", context.sample_ids.join(", "))
    }
}

fn short_name(workflow: &str, context: &RunContext, run_id: RunId) -> String {
    match context
        .sample_ids
        .first()
        .map(String::as_str)
        .or_else(|| context.axis(SelectorAxis::Project))
    {
        Some(subject) => format!("{workflow}: {subject}"),
        None => format!("{workflow} #{run_id}"),
    }
}
