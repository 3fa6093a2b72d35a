//! # Structured Logging Module
//!
//! Environment-aware structured logging for the workflow core, plus the operation
//! loggers used at every state transition, selector write and recovery action.

use chrono::Utc;
use std::sync::OnceLock;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

use crate::config::LoggingConfig;
use crate::constants::ENVIRONMENT_VAR;
use crate::models::{FragmentId, RunId, StepId};

static LOGGER_INITIALIZED: OnceLock<()> = OnceLock::new();

/// Initialize structured logging once per process.
///
/// `RUST_LOG` wins over the configured level. A subscriber installed by the host
/// application is left in place.
pub fn init_structured_logging(config: &LoggingConfig) {
    LOGGER_INITIALIZED.get_or_init(|| {
        let environment = get_environment();
        let filter = EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new(get_log_level(&environment, config)));

        let layer = if config.json {
            fmt::layer()
                .with_target(true)
                .with_thread_ids(true)
                .with_ansi(false)
                .json()
                .with_filter(filter)
                .boxed()
        } else {
            fmt::layer()
                .with_target(true)
                .with_thread_ids(true)
                .with_filter(filter)
                .boxed()
        };

        // Use try_init to avoid panic if global subscriber already set
        if tracing_subscriber::registry().with(layer).try_init().is_err() {
            tracing::debug!("Global tracing subscriber already initialized - continuing with existing subscriber");
        }

        tracing::info!(
            environment = %environment,
            json = config.json,
            "STRUCTURED LOGGING: Initialized"
        );
    });
}

/// Get current environment from environment variables
fn get_environment() -> String {
    std::env::var(ENVIRONMENT_VAR).unwrap_or_else(|_| "development".to_string())
}

/// Get log level based on environment; the test environment always logs debug
fn get_log_level(environment: &str, config: &LoggingConfig) -> String {
    match environment {
        "test" => "debug".to_string(),
        _ => config.level.clone(),
    }
}

/// Log structured data for run operations
pub fn log_run_operation(
    operation: &str,
    run_id: Option<RunId>,
    workflow: Option<&str>,
    status: &str,
    details: Option<&str>,
) {
    tracing::info!(
        operation = %operation,
        run_id = run_id,
        workflow = workflow,
        status = %status,
        details = details,
        timestamp = %Utc::now().to_rfc3339(),
        "RUN_OPERATION"
    );
}

/// Log structured data for step operations
pub fn log_step_operation(
    operation: &str,
    run_id: Option<RunId>,
    step_id: Option<StepId>,
    step_name: Option<&str>,
    status: &str,
    details: Option<&str>,
) {
    tracing::info!(
        operation = %operation,
        run_id = run_id,
        step_id = step_id,
        step_name = step_name,
        status = %status,
        details = details,
        timestamp = %Utc::now().to_rfc3339(),
        "STEP_OPERATION"
    );
}

/// Log structured data for selector store writes
pub fn log_selector_operation(
    operation: &str,
    fragment_id: Option<FragmentId>,
    name: Option<&str>,
    status: &str,
    details: Option<&str>,
) {
    tracing::info!(
        operation = %operation,
        fragment_id = fragment_id,
        name = name,
        status = %status,
        details = details,
        timestamp = %Utc::now().to_rfc3339(),
        "SELECTOR_OPERATION"
    );
}
