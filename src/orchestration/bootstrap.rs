//! # Workflow Core Bootstrap
//!
//! Wires the selector store, resolver, registry, run repository, engine, recovery
//! controller and overview projection together from a [`CoreConfig`].
//!
//! ## Usage
//!
//! ```rust,no_run
//! use workflow_core::orchestration::bootstrap::{BootstrapConfig, WorkflowCore};
//!
//! # async fn example() -> Result<(), workflow_core::config::ConfigurationError> {
//! let core = WorkflowCore::bootstrap(BootstrapConfig::default())?;
//! let (callbacks, listener) = core.spawn_callback_listener(256);
//! # drop(callbacks);
//! # let _ = listener.await;
//! # Ok(())
//! # }
//! ```

use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::info;

use super::callbacks::{CallbackListener, CallbackListenerStats};
use super::overview::RunOverview;
use super::recovery::RecoveryController;
use super::run_engine::RunEngine;
use super::run_repository::RunRepository;
use super::types::JobCallback;
use crate::config::{ConfigManager, ConfigurationError, CoreConfig};
use crate::events::EventPublisher;
use crate::logging::init_structured_logging;
use crate::registry::WorkflowRegistry;
use crate::resolver::ConfigurationResolver;
use crate::selector::SelectorStore;

/// Bootstrap configuration for the workflow core
#[derive(Debug, Clone, Default)]
pub struct BootstrapConfig {
    /// Custom configuration directory (None = `./config`)
    pub config_directory: Option<PathBuf>,
    /// Environment override (None = auto-detect)
    pub environment_override: Option<String>,
    /// Skip installing the tracing subscriber, e.g. when the host application owns it
    pub skip_logging_init: bool,
}

/// Point-in-time counters of a running core
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CoreStatus {
    pub environment: String,
    pub workflows: usize,
    pub runs: usize,
    pub live_fragments: usize,
    pub selector_generation: u64,
    pub event_subscribers: usize,
}

/// All subsystems of the workflow core sharing one event publisher
pub struct WorkflowCore {
    pub config: CoreConfig,
    pub environment: String,
    pub event_publisher: EventPublisher,
    pub selector_store: Arc<SelectorStore>,
    pub resolver: Arc<ConfigurationResolver>,
    pub registry: Arc<WorkflowRegistry>,
    pub repository: Arc<RunRepository>,
    pub engine: Arc<RunEngine>,
    pub recovery: RecoveryController,
    pub overview: RunOverview,
}

impl WorkflowCore {
    /// Load the layered configuration, initialize logging and build the core
    pub fn bootstrap(bootstrap_config: BootstrapConfig) -> Result<Self, ConfigurationError> {
        let manager = match &bootstrap_config.environment_override {
            Some(environment) => ConfigManager::load_from_directory_with_env(
                bootstrap_config.config_directory.clone(),
                environment,
            )?,
            None => ConfigManager::load_from_directory(bootstrap_config.config_directory.clone())?,
        };

        if !bootstrap_config.skip_logging_init {
            init_structured_logging(&manager.config().logging);
        }

        let mut core = Self::from_config(manager.config().clone());
        core.environment = manager.environment().to_string();

        info!(
            environment = %core.environment,
            config_directory = %manager.config_directory().display(),
            "Workflow core bootstrapped"
        );
        Ok(core)
    }

    /// Build the core from an already loaded configuration
    pub fn from_config(config: CoreConfig) -> Self {
        let event_publisher = EventPublisher::new(config.events.channel_capacity);
        let selector_store = Arc::new(SelectorStore::new(event_publisher.clone()));
        let resolver = Arc::new(ConfigurationResolver::new(
            Arc::clone(&selector_store),
            &config.resolver,
        ));
        let registry = Arc::new(WorkflowRegistry::new());
        let repository = Arc::new(RunRepository::new());

        let engine = Arc::new(RunEngine::new(
            Arc::clone(&registry),
            Arc::clone(&resolver),
            Arc::clone(&repository),
            event_publisher.clone(),
            config.engine.clone(),
        ));
        let recovery = RecoveryController::new(Arc::clone(&engine));
        let overview = RunOverview::new(Arc::clone(&registry), Arc::clone(&repository));

        Self {
            config,
            environment: ConfigManager::detect_environment(),
            event_publisher,
            selector_store,
            resolver,
            registry,
            repository,
            engine,
            recovery,
            overview,
        }
    }

    /// Start a callback listener on the current runtime.
    ///
    /// The listener stops once every clone of the returned sender is dropped and
    /// reports its totals through the join handle.
    pub fn spawn_callback_listener(
        &self,
        capacity: usize,
    ) -> (mpsc::Sender<JobCallback>, JoinHandle<CallbackListenerStats>) {
        let (sender, listener) = CallbackListener::channel(Arc::clone(&self.engine), capacity);
        let handle = tokio::spawn(listener.run());
        (sender, handle)
    }

    pub fn status(&self) -> CoreStatus {
        CoreStatus {
            environment: self.environment.clone(),
            workflows: self.registry.len(),
            runs: self.repository.len(),
            live_fragments: self.selector_store.live_count(),
            selector_generation: self.selector_store.generation(),
            event_subscribers: self.event_publisher.subscriber_count(),
        }
    }
}
