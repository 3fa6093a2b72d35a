use std::collections::HashMap;
use std::fs;
use std::path::PathBuf;
use tempfile::TempDir;

use workflow_core::config::{ConfigManager, ConfigurationError};
use workflow_core::models::FragmentCategory;
use workflow_core::orchestration::{BootstrapConfig, WorkflowCore};

fn repository_config_directory() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("config")
}

#[test]
fn test_shipped_configuration_layers_by_environment() {
    let development =
        ConfigManager::load_from_directory_with_env(Some(repository_config_directory()), "development")
            .unwrap();
    assert_eq!(development.config().engine.dispatch_batch_size, 100);
    assert_eq!(development.config().engine.default_max_parallel_runs, 0);
    assert!(!development.config().logging.json);

    let production =
        ConfigManager::load_from_directory_with_env(Some(repository_config_directory()), "production")
            .unwrap();
    assert_eq!(production.config().engine.default_max_parallel_runs, 20);
    assert!(production.config().logging.json);
    assert!(production
        .config()
        .resolver
        .core_categories
        .contains(&FragmentCategory::DefaultValues));
}

#[test]
fn test_overrides_win_over_files() {
    let dir = TempDir::new().unwrap();
    fs::write(
        dir.path().join("workflow-core.toml"),
        "[engine]\ndispatch_batch_size = 10\n\n[events]\nchannel_capacity = 32\n",
    )
    .unwrap();

    let overrides = HashMap::from([(
        "WORKFLOW_CORE__ENGINE__DISPATCH_BATCH_SIZE".to_string(),
        "3".to_string(),
    )]);
    let manager =
        ConfigManager::load_with_overrides(Some(dir.path().to_path_buf()), "staging", overrides)
            .unwrap();

    assert_eq!(manager.config().engine.dispatch_batch_size, 3);
    assert_eq!(manager.config().events.channel_capacity, 32);
    assert_eq!(manager.environment(), "staging");
}

#[test]
fn test_invalid_values_are_rejected() {
    let dir = TempDir::new().unwrap();
    fs::write(
        dir.path().join("workflow-core.toml"),
        "[events]\nchannel_capacity = 0\n",
    )
    .unwrap();

    let err = ConfigManager::load_from_directory_with_env(Some(dir.path().to_path_buf()), "test")
        .unwrap_err();
    assert!(matches!(err, ConfigurationError::InvalidValue { .. }));
}

#[test]
fn test_bootstrap_builds_a_core_from_a_directory() {
    let dir = TempDir::new().unwrap();
    fs::write(
        dir.path().join("workflow-core.toml"),
        "[engine]\ndefault_max_parallel_runs = 2\n",
    )
    .unwrap();

    let core = WorkflowCore::bootstrap(BootstrapConfig {
        config_directory: Some(dir.path().to_path_buf()),
        environment_override: Some("test".to_string()),
        skip_logging_init: true,
    })
    .unwrap();

    assert_eq!(core.environment, "test");
    assert_eq!(core.config.engine.default_max_parallel_runs, 2);
    let status = core.status();
    assert_eq!(status.environment, "test");
    assert_eq!(status.runs, 0);
}
