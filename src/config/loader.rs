//! Configuration Loader
//!
//! Environment-aware configuration loading. Discovers the TOML files of the
//! configuration directory, layers the environment overrides on top and applies
//! `WORKFLOW_CORE__*` environment variables last.

use config::{Config, Environment, File};
use std::collections::HashMap;
use std::env;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::debug;

use super::error::{ConfigResult, ConfigurationError};
use super::CoreConfig;
use crate::constants::{
    CONFIG_ENV_PREFIX, CONFIG_FILE_STEM, DEFAULT_CONFIG_DIRECTORY, ENVIRONMENT_VAR,
};

/// Loaded and validated configuration with the sources it came from
#[derive(Debug)]
pub struct ConfigManager {
    config: CoreConfig,
    environment: String,
    config_directory: PathBuf,
}

impl ConfigManager {
    /// Load configuration with environment auto-detection
    pub fn load() -> ConfigResult<Arc<ConfigManager>> {
        Self::load_from_directory(None)
    }

    /// Load configuration from a specific directory
    pub fn load_from_directory(config_dir: Option<PathBuf>) -> ConfigResult<Arc<ConfigManager>> {
        let environment = Self::detect_environment();
        Self::load_from_directory_with_env(config_dir, &environment)
    }

    /// Load configuration from a specific directory with explicit environment.
    /// This is useful for testing without modifying global environment variables.
    pub fn load_from_directory_with_env(
        config_dir: Option<PathBuf>,
        environment: &str,
    ) -> ConfigResult<Arc<ConfigManager>> {
        Self::load_with_sources(config_dir, environment, None)
    }

    /// Load configuration with an explicit set of `WORKFLOW_CORE__*` variables instead
    /// of the process environment
    pub fn load_with_overrides(
        config_dir: Option<PathBuf>,
        environment: &str,
        overrides: HashMap<String, String>,
    ) -> ConfigResult<Arc<ConfigManager>> {
        Self::load_with_sources(config_dir, environment, Some(overrides))
    }

    fn load_with_sources(
        config_dir: Option<PathBuf>,
        environment: &str,
        overrides: Option<HashMap<String, String>>,
    ) -> ConfigResult<Arc<ConfigManager>> {
        let explicit_directory = config_dir.is_some();
        let config_directory = config_dir.unwrap_or_else(Self::default_config_directory);

        if explicit_directory && !config_directory.is_dir() {
            return Err(ConfigurationError::DirectoryNotFound {
                path: config_directory,
            });
        }

        debug!(
            "Loading configuration for environment '{}' from directory: {}",
            environment,
            config_directory.display()
        );

        let base_file = config_directory.join(format!("{CONFIG_FILE_STEM}.toml"));
        let environment_file =
            config_directory.join(format!("{CONFIG_FILE_STEM}.{environment}.toml"));

        let settings = Config::builder()
            .add_source(File::from(base_file).required(false))
            .add_source(File::from(environment_file).required(false))
            .add_source(
                Environment::with_prefix(CONFIG_ENV_PREFIX)
                    .prefix_separator("__")
                    .separator("__")
                    .try_parsing(true)
                    .source(overrides),
            )
            .build()
            .map_err(|e| ConfigurationError::load_error(environment, e))?;

        let config: CoreConfig = settings
            .try_deserialize()
            .map_err(|e| ConfigurationError::DeserializationError {
                error: e.to_string(),
            })?;

        config.validate()?;

        debug!(
            "Configuration loaded successfully: {}",
            serde_json::to_string(&config).unwrap_or_else(|_| "[serialization error]".to_string())
        );

        Ok(Arc::new(ConfigManager {
            config,
            environment: environment.to_string(),
            config_directory,
        }))
    }

    pub fn config(&self) -> &CoreConfig {
        &self.config
    }

    pub fn environment(&self) -> &str {
        &self.environment
    }

    pub fn config_directory(&self) -> &Path {
        &self.config_directory
    }

    /// Detect the current environment
    pub fn detect_environment() -> String {
        env::var(ENVIRONMENT_VAR)
            .unwrap_or_else(|_| "development".to_string())
            .to_lowercase()
    }

    fn default_config_directory() -> PathBuf {
        env::current_dir()
            .map(|dir| dir.join(DEFAULT_CONFIG_DIRECTORY))
            .unwrap_or_else(|_| PathBuf::from(DEFAULT_CONFIG_DIRECTORY))
    }
}
