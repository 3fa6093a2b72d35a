// State machine module for workflow runs and steps
//
// Runs and steps each have their own state graph. Step states are driven by the
// execution backends and by operator recovery; the run state is mostly derived from
// its current steps through `aggregate_run_state`.

pub mod actions;
pub mod context;
pub mod errors;
pub mod events;
pub mod guards;
pub mod run_state_machine;
pub mod states;
pub mod step_state_machine;

// Re-export main types for convenient access
pub use context::TransitionContext;
pub use errors::{ActionError, EntityRef, GuardError, StateMachineError, StateMachineResult};
pub use events::{RunEvent, StepEvent};
pub use run_state_machine::{aggregate_run_state, RunStateMachine};
pub use states::{RunState, StepState};
pub use step_state_machine::StepStateMachine;

// Common traits and utilities
pub use actions::StateAction;
pub use guards::StateGuard;
