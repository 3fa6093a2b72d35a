//! # Orchestration Engine
//!
//! Run lifecycle management on top of the selector store and the configuration
//! resolver.
//!
//! ## Architecture
//!
//! The core decides *what* runs and *when*; execution backends decide *how*:
//! - **The core owns state**: run creation, step ordering, run state aggregation,
//!   recovery and the operator views
//! - **Backends own execution**: they accept steps through [`StepDispatcher`] and
//!   report back with [`JobCallback`] values
//!
//! ## Core Components
//!
//! - **RunEngine**: triggers runs, schedules ready steps, applies callbacks
//! - **RunRepository**: in-memory run aggregates with per-run locking
//! - **RecoveryController**: restart step / previous step / run, failed final
//! - **RunOverview**: condensed and detailed overview, run list
//! - **CallbackListener**: async adapter feeding backend callbacks to the engine
//! - **WorkflowCore**: bootstrap wiring all of the above from configuration

pub mod bootstrap;
pub mod callbacks;
pub mod errors;
pub mod overview;
pub mod recovery;
pub mod run_engine;
pub mod run_repository;
pub mod types;

pub use bootstrap::{BootstrapConfig, CoreStatus, WorkflowCore};
pub use callbacks::{CallbackListener, CallbackListenerStats};
pub use errors::{OrchestrationError, OrchestrationResult};
pub use overview::{
    CondensedRow, DetailedRow, OverviewBucket, OverviewFilter, OverviewState, RunList,
    RunListCounts, RunListPage, RunListRow, RunOverview, StepSummary,
};
pub use recovery::{BulkResults, RecoveryController};
pub use run_engine::RunEngine;
pub use run_repository::{RunHandle, RunRepository};
pub use types::{
    CallbackKind, CallbackOutcome, DispatchReceipt, DispatchRequest, DispatchSummary,
    JobCallback, StepDispatcher, UserDecision,
};
