#![allow(clippy::doc_markdown)] // Allow technical terms like CellRanger, WES in docs
#![allow(clippy::missing_errors_doc)] // Allow public functions without # Errors sections
#![allow(clippy::must_use_candidate)] // Allow methods without must_use when context is clear

//! # Workflow Core Rust
//!
//! Orchestration core for sequencing-data processing workflows.
//!
//! ## Overview
//!
//! The core turns a *run context* (workflow, project, sequencing type, reference
//! genome, ...) into a workflow run with a configuration snapshot, tracks every run
//! and step through their state machines, and offers operators the recovery actions
//! and overview screens they need when something fails.
//!
//! ## Architecture
//!
//! ```text
//! SelectorStore ──> ConfigurationResolver ──> RunEngine ──> StepDispatcher (backends)
//!                                                 ^              │
//!                                                 └─ JobCallback ┘
//! RecoveryController / RunOverview operate on the runs held by the RunRepository
//! ```
//!
//! Configuration is layered: selector fragments keyed by any subset of the context
//! axes are deep-merged from least to most specific, so a project-level fragment
//! overrides a workflow-wide default without repeating it.
//!
//! ## Module Organization
//!
//! - [`selector`] - Append-only store of configuration fragments
//! - [`resolver`] - Specificity-ordered deep merge into an effective configuration
//! - [`state_machine`] - Run and step state machines with guards and actions
//! - [`registry`] - Workflows and their operator settings
//! - [`orchestration`] - Run engine, recovery controller, overview projection
//! - [`config`] - Layered configuration loading
//! - [`events`] - Lifecycle event broadcast
//! - [`error`] - Crate-wide error type
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use serde_json::json;
//! use workflow_core::config::CoreConfig;
//! use workflow_core::models::{
//!     FragmentCategory, NewSelectorFragment, RunContext, StepKind, StepTemplate, Workflow,
//! };
//! use workflow_core::orchestration::WorkflowCore;
//!
//! # fn example() -> workflow_core::Result<()> {
//! let core = WorkflowCore::from_config(CoreConfig::default());
//! core.engine.register_workflow(Workflow::new(
//!     "CellRanger",
//!     vec![StepTemplate::new("count", StepKind::ClusterJob { queue: None })],
//! ))?;
//!
//! core.selector_store.add_fragment(NewSelectorFragment::new(
//!     "cellranger defaults",
//!     FragmentCategory::DefaultValues,
//!     "CellRanger",
//!     json!({"cellranger": {"expectedCells": 3000}}),
//! ))?;
//!
//! let run_id = core.engine.trigger(RunContext::new("CellRanger").with_project("P1"))?;
//! println!("created run {run_id}");
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod constants;
pub mod error;
pub mod events;
pub mod logging;
pub mod models;
pub mod orchestration;
pub mod registry;
pub mod resolver;
pub mod selector;
pub mod state_machine;

pub use config::{ConfigManager, CoreConfig};
pub use constants::status_groups;
pub use error::{Result, WorkflowCoreError};
pub use events::{EventPublisher, PublishedEvent};
pub use orchestration::{RecoveryController, RunEngine, RunOverview, WorkflowCore};
pub use registry::WorkflowRegistry;
pub use resolver::{ConfigurationResolver, EffectiveConfiguration};
pub use selector::SelectorStore;
pub use state_machine::{RunState, StepState};
