//! # Domain Models
//!
//! Plain data types shared by the selector store, the resolver and the run engine.
//! Runs and fragments are the two root aggregates; steps and artefacts are owned by
//! their run.

pub mod context;
pub mod selector_fragment;
pub mod transition;
pub mod workflow;
pub mod workflow_artefact;
pub mod workflow_run;
pub mod workflow_step;

pub type RunId = i64;
pub type StepId = i64;
pub type FragmentId = i64;
pub type ArtefactId = i64;

pub use context::{AxisValues, RunContext, SelectionKey, SelectorAxis};
pub use selector_fragment::{FragmentCategory, FragmentKey, NewSelectorFragment, SelectorFragment};
pub use transition::{StateTransition, TransitionHistory};
pub use workflow::{StepTemplate, Workflow, WorkflowSettingsUpdate, WorkflowVersion};
pub use workflow_artefact::{ArtefactState, NewArtefact, WorkflowArtefact};
pub use workflow_run::WorkflowRun;
pub use workflow_step::{ExecutionTarget, StepDetail, StepKind, WorkflowStep};
