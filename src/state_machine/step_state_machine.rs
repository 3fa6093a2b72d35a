use super::{
    actions::{LogTransitionAction, PublishTransitionEventAction, StateAction},
    context::TransitionContext,
    errors::{illegal_transition, EntityRef, StateMachineResult},
    events::StepEvent,
    states::StepState,
};
use crate::models::{StepId, WorkflowStep};

/// Workflow step state machine operating on a borrowed step
pub struct StepStateMachine<'a> {
    step: &'a mut WorkflowStep,
}

impl<'a> StepStateMachine<'a> {
    /// Create a new step state machine instance
    pub fn new(step: &'a mut WorkflowStep) -> Self {
        Self { step }
    }

    /// Get the current state of the step
    pub fn current_state(&self) -> StepState {
        self.step.state
    }

    /// Attempt to transition the step state
    pub fn transition(
        &mut self,
        event: StepEvent,
        context: &mut TransitionContext,
    ) -> StateMachineResult<StepState> {
        let current_state = self.current_state();
        let target_state = self.determine_target_state(current_state, &event)?;

        let event_str = serde_json::to_string(&event)?;
        self.apply(current_state, target_state, &event, &event_str, context);

        self.execute_actions(current_state, target_state, &event_str, context)?;

        Ok(target_state)
    }

    /// Determine the target state based on current state and event
    pub fn determine_target_state(
        &self,
        current_state: StepState,
        event: &StepEvent,
    ) -> StateMachineResult<StepState> {
        use StepState::*;

        let target = match (current_state, event) {
            (Created, StepEvent::Enqueue) => Pending,

            (Pending, StepEvent::Dispatch(target)) => target.running_state(),

            (RunningOtp | RunningWes, StepEvent::Check) => Checking,

            (Pending | RunningOtp | RunningWes | Checking, StepEvent::AwaitUser) => WaitingForUser,

            (RunningOtp | RunningWes | Checking | WaitingForUser, StepEvent::Succeed) => Success,

            (Pending | RunningOtp | RunningWes | Checking | WaitingForUser, StepEvent::Fail(_)) => {
                Failed
            }

            (Created | Pending, StepEvent::Omit) => Omitted,
            (Created | Pending, StepEvent::OmitMissingPrecondition) => OmittedMissingPrecondition,

            (state, StepEvent::Kill) if !state.is_terminal() => Killed,

            // Only finished instances are replaced; a replaced instance stays replaced
            (state, StepEvent::MarkRestarted) if state.is_terminal() && state != Restarted => {
                Restarted
            }

            (from_state, _) => {
                return Err(illegal_transition(
                    EntityRef::Step(self.step.id),
                    from_state,
                    event.event_type(),
                ))
            }
        };

        Ok(target)
    }

    fn apply(
        &mut self,
        from_state: StepState,
        to_state: StepState,
        event: &StepEvent,
        event_str: &str,
        context: &TransitionContext,
    ) {
        let step = &mut *self.step;
        step.state = to_state;
        step.last_updated = context.now;

        match event {
            StepEvent::Fail(message) => step.detail.error_message = Some(message.clone()),
            StepEvent::Enqueue => step.detail.error_message = None,
            _ => {}
        }

        step.transitions.push(
            Some(from_state.to_string()),
            to_state.to_string(),
            event_str.to_string(),
            context.transition_metadata(),
            context.now,
        );
    }

    fn execute_actions(
        &self,
        from_state: StepState,
        to_state: StepState,
        event: &str,
        context: &mut TransitionContext,
    ) -> StateMachineResult<()> {
        let actions: Vec<Box<dyn StateAction<WorkflowStep> + Send + Sync>> = vec![
            Box::new(PublishTransitionEventAction),
            Box::new(LogTransitionAction),
        ];

        for action in actions {
            action.execute(
                &*self.step,
                Some(from_state.to_string()),
                to_state.to_string(),
                event,
                context,
            )?;
        }

        Ok(())
    }

    /// Check if the step is in a terminal state
    pub fn is_terminal(&self) -> bool {
        self.current_state().is_terminal()
    }

    /// Check if the step is currently executing on a backend
    pub fn is_active(&self) -> bool {
        self.current_state().is_active()
    }

    /// Get the step ID
    pub fn step_id(&self) -> StepId {
        self.step.id
    }
}
