use liftlog::config::Config;

#[test]
fn test_default_config() {
    let config = Config::default();
    assert_eq!(config.sync.auto_sync_interval_minutes, 5);
    assert_eq!(config.sync.request_timeout_secs, 30);
    assert_eq!(config.sync.initial_backoff_secs, 5);
    assert_eq!(config.sync.max_backoff_secs, 300);
    assert!(config.storage.database_url.is_empty());
    assert_eq!(config.backend.api_token_env, "LIFTLOG_API_TOKEN");
    assert!(!config.logging.enabled);
}

#[test]
fn test_config_validation() {
    let mut config = Config::default();

    // Valid config should pass
    assert!(config.validate().is_ok());

    // Sync interval above a day should fail
    config.sync.auto_sync_interval_minutes = 2000;
    assert!(config.validate().is_err());

    // Reset and test a backoff cap below the initial delay
    config.sync.auto_sync_interval_minutes = 5;
    config.sync.max_backoff_secs = 1;
    assert!(config.validate().is_err());

    config.sync.max_backoff_secs = 300;
    config.sync.backoff_multiplier = 0.5;
    assert!(config.validate().is_err());

    config.sync.backoff_multiplier = 2.0;
    config.sync.request_timeout_secs = 0;
    assert!(config.validate().is_err());
}

#[test]
fn test_config_serialization() {
    let config = Config::default();
    let toml_str = toml::to_string_pretty(&config).unwrap();
    assert!(toml_str.contains("auto_sync_interval_minutes = 5"));
    assert!(toml_str.contains("initial_backoff_secs = 5"));
}

#[test]
fn test_partial_config_deserialization() {
    // Partial TOML configs merge with defaults
    let partial_toml = r#"
[sync]
auto_sync_interval_minutes = 15

[logging]
enabled = true
"#;

    let config: Config = toml::from_str(partial_toml).unwrap();

    assert_eq!(config.sync.auto_sync_interval_minutes, 15);
    assert!(config.logging.enabled);

    // Unspecified values use defaults
    assert_eq!(config.sync.request_timeout_secs, 30);
    assert_eq!(config.sync.initial_backoff_secs, 5);
    assert!(config.storage.database_url.is_empty());
}

#[test]
fn test_empty_config_deserialization() {
    let config: Config = toml::from_str("").unwrap();
    let default_config = Config::default();

    assert_eq!(
        config.sync.auto_sync_interval_minutes,
        default_config.sync.auto_sync_interval_minutes
    );
    assert_eq!(config.logging.enabled, default_config.logging.enabled);
}

#[test]
fn test_generate_config_creates_directory() {
    use std::fs;

    let temp_dir = std::env::temp_dir().join("liftlog_test_config");
    let config_path = temp_dir.join("nested").join("config.toml");

    if temp_dir.exists() {
        let _ = fs::remove_dir_all(&temp_dir);
    }
    assert!(!temp_dir.exists());

    let result = Config::generate_default_config(&config_path);
    assert!(result.is_ok());
    assert!(temp_dir.exists());

    // The generated file parses back to a valid config
    let loaded = Config::load_from_file(&config_path);
    assert!(loaded.is_ok());

    let _ = fs::remove_dir_all(&temp_dir);
}

#[test]
fn test_explicit_database_url_is_used() {
    let mut config = Config::default();
    config.storage.database_url = "sqlite::memory:".to_owned();
    assert_eq!(config.database_url().unwrap(), "sqlite::memory:");
}
