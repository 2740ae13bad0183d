//! Integration tests for frontier-config

use frontier_config::*;
use frontier_config::domains::logging::{LogFormat, LogLevel};
use std::io::Write;
use std::time::Duration;
use temp_env::with_vars;

#[test]
fn test_default_config_validation() {
    let config = FrontierConfig::default();
    assert!(config.validate_all().is_ok());
}

#[test]
fn test_config_loader_from_env() {
    let vars = vec![
        ("FRONTIER_TICK_INTERVAL_MS", Some("250")),
        ("FRONTIER_RESET_GRACE_PERIOD_MS", Some("1500")),
        ("FRONTIER_RESET_TIMEOUT_SECONDS", Some("90")),
        ("FRONTIER_RESET_TOPIC", Some("ctl")),
        ("FRONTIER_LOG_LEVEL", Some("debug")),
    ];

    with_vars(vars, || {
        let loader = ConfigLoader::new();
        let config = loader.from_env().unwrap();

        assert_eq!(config.main_thread.tick_interval, Duration::from_millis(250));
        assert_eq!(config.reset.grace_period, Duration::from_millis(1500));
        assert_eq!(config.reset.reset_timeout, Duration::from_secs(90));
        assert_eq!(config.message_bus.reset_topic, "ctl");
        assert_eq!(config.logging.level, LogLevel::Debug);
    });
}

#[test]
fn test_invalid_env_value_is_reported() {
    with_vars(vec![("FRONTIER_RESET_TIMEOUT_SECONDS", Some("soon"))], || {
        let result = ConfigLoader::new().from_env();
        assert!(matches!(result, Err(ConfigError::EnvError(_))));
    });

    with_vars(vec![("FRONTIER_LOG_FORMAT", Some("xml"))], || {
        let result = ConfigLoader::new().from_env();
        assert!(matches!(result, Err(ConfigError::EnvError(_))));
    });
}

#[test]
fn test_yaml_config_serialization() {
    let config = FrontierConfig::default();
    let yaml = serde_yaml::to_string(&config).unwrap();

    let parsed: FrontierConfig = serde_yaml::from_str(&yaml).unwrap();
    assert!(parsed.validate_all().is_ok());
    assert_eq!(parsed.reset.reset_timeout, Duration::from_secs(60));
    assert_eq!(parsed.main_thread.tick_interval, Duration::from_millis(100));
}

#[test]
fn test_comprehensive_config() {
    let yaml = r#"
main_thread:
  tick_interval: 50

reset:
  poll_interval: 20
  poll_timeout: 500
  grace_period: 2000
  reset_timeout: 30

message_bus:
  reset_topic: "crawl-reset"
  reset_ack_topic: "crawl-reset-ack"
  capacity: 1000

logging:
  level: warn
  format: json
  directives:
    - "frontier_worker=debug"
"#;

    let config: FrontierConfig = serde_yaml::from_str(yaml).unwrap();
    assert!(config.validate_all().is_ok());

    assert_eq!(config.main_thread.tick_interval, Duration::from_millis(50));
    assert_eq!(config.reset.poll_interval, Duration::from_millis(20));
    assert_eq!(config.reset.poll_timeout, Duration::from_millis(500));
    assert_eq!(config.reset.grace_period, Duration::from_secs(2));
    assert_eq!(config.reset.reset_timeout, Duration::from_secs(30));
    assert_eq!(config.message_bus.reset_topic, "crawl-reset");
    assert_eq!(config.message_bus.capacity, Some(1000));
    assert_eq!(config.logging.level, LogLevel::Warn);
    assert_eq!(config.logging.format, LogFormat::Json);
    assert_eq!(config.logging.filter_directive(), "warn,frontier_worker=debug");
}

#[test]
fn test_partial_config_uses_defaults() {
    let yaml = r#"
reset:
  reset_timeout: 120
"#;

    let config: FrontierConfig = serde_yaml::from_str(yaml).unwrap();
    assert_eq!(config.reset.reset_timeout, Duration::from_secs(120));
    assert_eq!(config.reset.grace_period, Duration::from_secs(5));
    assert_eq!(config.message_bus.reset_ack_topic, "frontier-reset-ack");
}

#[test]
fn test_validation_errors() {
    let mut config = FrontierConfig::default();
    config.reset.grace_period = Duration::from_secs(120);

    match config.validate_all() {
        Err(ConfigError::DomainError { domain, .. }) => assert_eq!(domain, "reset"),
        other => panic!("Expected reset domain error, got {:?}", other),
    }
}

#[test]
fn test_load_from_yaml_file() {
    let mut file = tempfile::Builder::new().suffix(".yaml").tempfile().unwrap();
    writeln!(file, "main_thread:\n  tick_interval: 20\nlogging:\n  level: trace").unwrap();

    // Other tests set FRONTIER_* variables concurrently
    let config = ConfigLoader::with_prefix("FILE_TEST").load(Some(file.path())).unwrap();
    assert_eq!(config.main_thread.tick_interval, Duration::from_millis(20));
    assert_eq!(config.logging.level, LogLevel::Trace);
}

#[test]
fn test_load_from_json_file() {
    let mut file = tempfile::Builder::new().suffix(".json").tempfile().unwrap();
    write!(file, r#"{{"message_bus": {{"reset_topic": "r", "reset_ack_topic": "a"}}}}"#).unwrap();

    let config = ConfigLoader::with_prefix("FILE_TEST").from_file(file.path()).unwrap();
    assert_eq!(config.message_bus.reset_topic, "r");
    assert_eq!(config.message_bus.reset_ack_topic, "a");
}

#[test]
fn test_missing_file_is_an_error() {
    let result = ConfigLoader::new().from_file("/nonexistent/frontier.yaml");
    assert!(matches!(result, Err(ConfigError::FileReadError(_))));
}

#[test]
fn test_custom_prefix_loader() {
    let vars = vec![
        ("CRAWLER_LOG_LEVEL", Some("error")),
        ("FRONTIER_LOG_LEVEL", Some("trace")),
    ];

    with_vars(vars, || {
        let config = ConfigLoader::with_prefix("CRAWLER").from_env().unwrap();
        assert_eq!(config.logging.level, LogLevel::Error);
    });
}

#[test]
fn test_generate_sample_config() {
    let sample = FrontierConfig::generate_sample();
    assert!(sample.contains("main_thread"));
    assert!(sample.contains("reset_timeout"));
    assert!(sample.contains("frontier-reset-ack"));

    let parsed: FrontierConfig = serde_yaml::from_str(&sample).unwrap();
    assert!(parsed.validate_all().is_ok());
}
