//! Integration tests for waymark-config

use std::path::PathBuf;
use temp_env::with_vars;
use waymark_config::domains::logging::{LogFormat, LogLevel};
use waymark_config::*;

#[test]
fn test_default_config_validation() {
    let config = WaymarkConfig::default();
    assert!(config.validate_all().is_ok());
}

#[test]
fn test_config_loader_from_env() {
    let vars = vec![
        ("WAYMARK_LOG_LEVEL", Some("debug")),
        ("WAYMARK_LOG_FORMAT", Some("json")),
        ("WAYMARK_MIGRATIONS_ROOT", Some("db/migrations")),
        ("WAYMARK_FORCE", Some("true")),
    ];

    with_vars(vars, || {
        let loader = ConfigLoader::new();
        let config = loader.from_env().unwrap();

        assert_eq!(config.logging.level, LogLevel::Debug);
        assert_eq!(config.logging.format, LogFormat::Json);
        assert_eq!(config.runner.migrations_root, PathBuf::from("db/migrations"));
        assert!(config.runner.default_force);
    });
}

#[test]
fn test_invalid_env_override() {
    with_vars(vec![("WAYMARK_FORCE", Some("sometimes"))], || {
        let err = ConfigLoader::new().from_env().unwrap_err();
        assert!(matches!(err, ConfigError::EnvError(_)));
    });

    with_vars(vec![("WAYMARK_LOG_LEVEL", Some("loud"))], || {
        assert!(ConfigLoader::new().from_env().is_err());
    });
}

#[test]
fn test_custom_prefix() {
    with_vars(vec![("DEPLOY_MIGRATIONS_ROOT", Some("schema"))], || {
        let config = ConfigLoader::with_prefix("DEPLOY").from_env().unwrap();
        assert_eq!(config.runner.migrations_root, PathBuf::from("schema"));
    });
}

#[test]
fn test_yaml_config_serialization() {
    let yaml = WaymarkConfig::generate_sample();
    let parsed: WaymarkConfig = serde_yaml::from_str(&yaml).unwrap();
    assert!(parsed.validate_all().is_ok());
}

#[test]
fn test_config_file_with_env_override() {
    let yaml = r#"
logging:
  level: warn
  format: compact
  directives:
    - "sqlx=error"

runner:
  migrations_root: "./store-migrations"
  settings_file_stem: "deploy"
"#;

    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("waymark.yaml");
    std::fs::write(&path, yaml).unwrap();

    with_vars(vec![("WAYMARK_LOG_LEVEL", Some("trace"))], || {
        let config = ConfigLoader::new().load(Some(&path)).unwrap();

        assert_eq!(config.logging.level, LogLevel::Trace);
        assert_eq!(config.logging.format, LogFormat::Compact);
        assert_eq!(config.logging.filter_expression(), "trace,sqlx=error");
        assert_eq!(
            config.runner.migrations_root,
            PathBuf::from("./store-migrations")
        );
        assert_eq!(config.runner.settings_file_stem, "deploy");
    });
}

#[test]
fn test_invalid_config_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("waymark.yaml");
    std::fs::write(&path, "runner:\n  settings_file_stem: \"\"\n").unwrap();

    with_vars(Vec::<(&str, Option<&str>)>::new(), || {
        assert!(ConfigLoader::new().from_file(&path).is_err());
    });
}

#[test]
fn test_settings_discovery_from_runner_config() {
    let root = tempfile::tempdir().unwrap();
    let folder = root.path().join("sqlite");
    std::fs::create_dir_all(&folder).unwrap();
    std::fs::write(
        root.path().join("deploy.yaml"),
        "sqlite:\n  url: \"sqlite::memory:\"\n",
    )
    .unwrap();
    std::fs::write(root.path().join("waymark.yaml"), "ignored: true\n").unwrap();

    let runner = RunnerConfig {
        settings_file_stem: "deploy".to_string(),
        ..Default::default()
    };
    let discovered = SettingsDiscovery::from_config(&runner)
        .discover(&folder)
        .unwrap();

    assert!(discovered.settings.get("ignored").is_none());
    assert_eq!(
        discovered
            .settings
            .section("sqlite")
            .and_then(|s| s.get_str("url").map(str::to_string)),
        Some("sqlite::memory:".to_string())
    );
    assert!(discovered.secrets.is_none());
}
