//! # System Constants
//!
//! Event names, environment variables and state groupings shared across the core.

/// Environment variable selecting the configuration environment
pub const ENVIRONMENT_VAR: &str = "WORKFLOW_CORE_ENV";

/// Prefix for environment variable configuration overrides (`WORKFLOW_CORE__ENGINE__...`)
pub const CONFIG_ENV_PREFIX: &str = "WORKFLOW_CORE";

/// File stem of the configuration files inside the configuration directory
pub const CONFIG_FILE_STEM: &str = "workflow-core";

/// Default configuration directory relative to the working directory
pub const DEFAULT_CONFIG_DIRECTORY: &str = "config";

/// Lifecycle event names published through the event publisher
pub mod events {
    pub const WORKFLOW_RUN_CREATED: &str = "workflow_run.created";
    pub const WORKFLOW_RUN_TRANSITIONED: &str = "workflow_run.transitioned";
    pub const WORKFLOW_RUN_RESTARTED: &str = "workflow_run.restarted";
    pub const WORKFLOW_RUN_FAILED_FINAL: &str = "workflow_run.failed_final";
    pub const WORKFLOW_RUN_KILLED: &str = "workflow_run.killed";

    pub const WORKFLOW_STEP_TRANSITIONED: &str = "workflow_step.transitioned";
    pub const WORKFLOW_STEP_RESTARTED: &str = "workflow_step.restarted";
    pub const WORKFLOW_STEP_FAILED: &str = "workflow_step.failed";

    pub const WORKFLOW_ARTEFACT_PRODUCED: &str = "workflow_artefact.produced";

    pub const SELECTOR_ADDED: &str = "selector.added";
    pub const SELECTOR_INVALIDATED: &str = "selector.invalidated";
    pub const SELECTOR_CONFLICT: &str = "selector.conflict";
}

/// State groupings used by the projections and the engine
pub mod status_groups {
    use crate::state_machine::states::RunState;

    /// Run states counted against a workflow's parallel run limit
    pub const ACTIVE_RUN_STATES: &[RunState] = &[RunState::Running, RunState::Checking];
}
