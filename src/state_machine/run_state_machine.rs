use super::{
    actions::{LogTransitionAction, PublishTransitionEventAction, StateAction},
    context::TransitionContext,
    errors::{illegal_transition, EntityRef, StateMachineResult},
    events::RunEvent,
    guards::{ConfigurationPresentGuard, StateGuard},
    states::{RunState, StepState},
};
use crate::models::{RunId, WorkflowRun};

/// Workflow run state machine operating on a borrowed run
pub struct RunStateMachine<'a> {
    run: &'a mut WorkflowRun,
}

impl<'a> RunStateMachine<'a> {
    /// Create a new run state machine instance
    pub fn new(run: &'a mut WorkflowRun) -> Self {
        Self { run }
    }

    /// Get the current state of the run
    pub fn current_state(&self) -> RunState {
        self.run.state
    }

    /// Attempt to transition the run state
    pub fn transition(
        &mut self,
        event: RunEvent,
        context: &mut TransitionContext,
    ) -> StateMachineResult<RunState> {
        let current_state = self.current_state();
        let target_state = self.determine_target_state(current_state, &event)?;

        self.check_guards(target_state)?;

        let event_str = serde_json::to_string(&event)?;
        self.apply(current_state, target_state, &event_str, context);

        self.execute_actions(current_state, target_state, &event_str, context)?;

        Ok(target_state)
    }

    /// Move the run to the state aggregated from its current steps.
    ///
    /// Returns `None` when the run keeps its state: it was not enqueued yet, it is
    /// terminal, or the aggregate did not change.
    pub fn reevaluate(
        &mut self,
        context: &mut TransitionContext,
    ) -> StateMachineResult<Option<RunState>> {
        let current_state = self.current_state();
        if current_state == RunState::Created || current_state.is_terminal() {
            return Ok(None);
        }

        let aggregated = aggregate_run_state(&*self.run);
        if aggregated == current_state {
            return Ok(None);
        }

        self.transition(RunEvent::Reevaluate(aggregated), context)
            .map(Some)
    }

    /// Determine the target state based on current state and event
    pub fn determine_target_state(
        &self,
        current_state: RunState,
        event: &RunEvent,
    ) -> StateMachineResult<RunState> {
        use RunState::*;

        let target = match (current_state, event) {
            (Created, RunEvent::Enqueue) => Pending,
            (Created, RunEvent::OmitMissingPrecondition) => OmittedMissingPrecondition,

            (Failed, RunEvent::MarkFailedFinal) => FailedFinal,
            (Failed, RunEvent::MarkRestarted) => Restarted,

            (state, RunEvent::Kill) if !state.is_terminal() => Killed,

            // Derived moves never reach the operator-only states
            (state, RunEvent::Reevaluate(target))
                if state != Created
                    && state.can_transition_to(*target)
                    && !matches!(
                        target,
                        FailedFinal | Restarted | Killed | OmittedMissingPrecondition
                    ) =>
            {
                *target
            }

            (from_state, _) => {
                return Err(illegal_transition(
                    EntityRef::Run(self.run.id),
                    from_state,
                    event.event_type(),
                ))
            }
        };

        Ok(target)
    }

    /// Check guard conditions for the transition
    fn check_guards(&self, target_state: RunState) -> StateMachineResult<()> {
        // A run never executes without its configuration snapshot
        if matches!(target_state, RunState::Running | RunState::Checking) {
            ConfigurationPresentGuard.check(&*self.run)?;
        }

        Ok(())
    }

    fn apply(
        &mut self,
        from_state: RunState,
        to_state: RunState,
        event_str: &str,
        context: &TransitionContext,
    ) {
        let run = &mut *self.run;
        run.state = to_state;
        run.last_updated = context.now;

        if to_state.is_active() && run.started_at.is_none() {
            run.started_at = Some(context.now);
        }
        if to_state.is_terminal() || to_state == RunState::Failed {
            run.ended_at = Some(context.now);
        } else {
            run.ended_at = None;
        }

        run.transitions.push(
            Some(from_state.to_string()),
            to_state.to_string(),
            event_str.to_string(),
            context.transition_metadata(),
            context.now,
        );
    }

    fn execute_actions(
        &self,
        from_state: RunState,
        to_state: RunState,
        event: &str,
        context: &mut TransitionContext,
    ) -> StateMachineResult<()> {
        let actions: Vec<Box<dyn StateAction<WorkflowRun> + Send + Sync>> = vec![
            Box::new(PublishTransitionEventAction),
            Box::new(LogTransitionAction),
        ];

        for action in actions {
            action.execute(
                &*self.run,
                Some(from_state.to_string()),
                to_state.to_string(),
                event,
                context,
            )?;
        }

        Ok(())
    }

    /// Check if the run is in a terminal state
    pub fn is_terminal(&self) -> bool {
        self.current_state().is_terminal()
    }

    /// Get the run ID
    pub fn run_id(&self) -> RunId {
        self.run.id
    }
}

/// Derive the run state from its current step instances.
///
/// Steps run in ordinal order, so the first step that has not satisfied its
/// dependencies decides whether the run can progress. Executing and checking steps
/// take precedence over everything else.
pub fn aggregate_run_state(run: &WorkflowRun) -> RunState {
    let steps: Vec<_> = run.current_steps().collect();

    if steps.iter().any(|step| step.state.is_active()) {
        return RunState::Running;
    }
    if steps.iter().any(|step| step.state == StepState::Checking) {
        return RunState::Checking;
    }

    let blocking = match steps.iter().find(|step| !step.state.satisfies_dependencies()) {
        None => return RunState::Success,
        Some(step) => step.state,
    };

    match blocking {
        StepState::Created | StepState::Pending => RunState::Pending,
        StepState::WaitingForUser => RunState::WaitingForUser,
        _ => RunState::Failed,
    }
}
