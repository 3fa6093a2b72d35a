//! # Configuration Management
//!
//! Typed configuration of the workflow core, loaded in layers:
//!
//! 1. `config/workflow-core.toml` (base)
//! 2. `config/workflow-core.<environment>.toml` (environment overrides)
//! 3. `WORKFLOW_CORE__<SECTION>__<FIELD>` environment variables
//!
//! Every field has a default, so an empty configuration directory yields a valid
//! [`CoreConfig`].
//!
//! ## Usage
//!
//! ```rust,no_run
//! use workflow_core::config::ConfigManager;
//!
//! let manager = ConfigManager::load()?;
//! let config = manager.config();
//! println!("Parallel run default: {}", config.engine.default_max_parallel_runs);
//! # Ok::<(), workflow_core::config::ConfigurationError>(())
//! ```

pub mod error;
pub mod loader;

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

use crate::models::FragmentCategory;

pub use error::{ConfigResult, ConfigurationError};
pub use loader::ConfigManager;

/// Root configuration structure
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CoreConfig {
    pub engine: EngineConfig,
    pub resolver: ResolverConfig,
    pub events: EventsConfig,
    pub logging: LoggingConfig,
}

/// Run engine scheduling settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Parallel run limit for workflows without their own; 0 means unlimited
    pub default_max_parallel_runs: usize,
    /// Steps handed to backends per scheduling pass; 0 means unlimited
    pub dispatch_batch_size: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            default_max_parallel_runs: 0,
            dispatch_batch_size: 100,
        }
    }
}

/// Configuration resolver settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ResolverConfig {
    pub cache_enabled: bool,
    /// Categories merged into `config_value` for workflows that register none
    pub core_categories: BTreeSet<FragmentCategory>,
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self {
            cache_enabled: true,
            core_categories: [FragmentCategory::DefaultValues, FragmentCategory::Generic]
                .into_iter()
                .collect(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EventsConfig {
    /// Buffer of the lifecycle event broadcast channel
    pub channel_capacity: usize,
}

impl Default for EventsConfig {
    fn default() -> Self {
        Self {
            channel_capacity: 1000,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Default filter directive; `RUST_LOG` takes precedence
    pub level: String,
    pub json: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json: false,
        }
    }
}

impl CoreConfig {
    /// Validate the configuration for consistency and required fields
    pub fn validate(&self) -> Result<(), ConfigurationError> {
        if self.events.channel_capacity == 0 {
            return Err(ConfigurationError::invalid_value(
                "events.channel_capacity",
                "0",
                "channel capacity must be greater than 0",
            ));
        }

        if self.resolver.core_categories.is_empty() {
            return Err(ConfigurationError::missing_required_field(
                "resolver.core_categories",
                "resolver configuration",
            ));
        }

        if self.logging.level.trim().is_empty() {
            return Err(ConfigurationError::missing_required_field(
                "logging.level",
                "logging configuration",
            ));
        }

        Ok(())
    }
}
