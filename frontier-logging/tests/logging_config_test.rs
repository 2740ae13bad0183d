//! Logging initialisation tests

use frontier_config::domains::logging::{LogFormat, LogLevel, LoggingConfig};
use frontier_logging::{build_env_filter, init_logging_from_config, init_simple_tracing};

#[test]
fn test_init_is_idempotent() {
    let config = LoggingConfig {
        level: LogLevel::Debug,
        format: LogFormat::Compact,
        ..Default::default()
    };

    assert!(init_logging_from_config(&config).is_ok());
    // A second subscriber cannot be installed; initialisation must not fail
    assert!(init_logging_from_config(&config).is_ok());
    assert!(init_simple_tracing("warn").is_ok());

    tracing::info!(component = "test", "logging initialised");
}

#[test]
fn test_env_filter_accepts_config_directives() {
    let config = LoggingConfig {
        level: LogLevel::Warn,
        directives: vec!["frontier_worker=trace".to_string()],
        ..Default::default()
    };

    let filter = build_env_filter(&config.filter_directive());
    assert!(filter.to_string().contains("frontier_worker=trace"));
}

#[test]
fn test_env_filter_falls_back_on_garbage() {
    // Must not panic on an unparsable directive
    let _ = build_env_filter("[[not a directive");
}
