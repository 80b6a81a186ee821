//! Logging configuration as seen from a consuming crate.
//!
//! The global subscriber can only be installed once per process, so the one
//! test that installs it also checks that a second install is refused.

use mongodb_exporter_observability::{
    init_tracing, init_tracing_with_config, LogConfig, LogError, LogFormat, LogOutput,
};

#[test]
fn test_config_builder_chaining() {
    let config = LogConfig::new()
        .with_format(LogFormat::Json)
        .with_level("debug")
        .with_timestamps(false)
        .with_color(false)
        .with_thread_ids(true)
        .with_targets(false)
        .with_output(LogOutput::Stdout);

    assert_eq!(config.format, LogFormat::Json);
    assert_eq!(config.level.as_deref(), Some("debug"));
    assert!(!config.use_timestamps);
    assert!(!config.use_color);
    assert!(config.include_thread_ids);
    assert!(!config.include_targets);
    assert_eq!(config.output, LogOutput::Stdout);
}

#[test]
fn test_second_install_is_refused() {
    let first = init_tracing_with_config(
        LogConfig::new()
            .with_format(LogFormat::Compact)
            .with_level("warn")
            .with_color(false),
    );
    assert!(first.is_ok());

    let second = init_tracing(LogFormat::Json, Some("info"));
    assert!(matches!(second, Err(LogError::AlreadyInitialized(_))));
}
