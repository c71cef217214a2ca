//! Unit tests for the logging subsystem.

use std::path::PathBuf;

use tracing_subscriber::fmt::format::FmtSpan;

use super::{format_service_name, types::*, Rotation};

#[test]
fn test_logger_config_defaults() {
    let config = LoggerConfig::default();
    assert_eq!(config.service_name, "(catbridge)");
    assert!(!config.stdout_config.json_format);
    assert_eq!(config.stdout_config.fmt_span, FmtSpan::CLOSE);
    assert!(config.file_logging_config.is_none());
}

#[test]
fn test_logger_config_builder_pattern() {
    let config = LoggerConfig::new("catbridge-cli".to_string())
        .with_json_logging(true)
        .with_fmt_span(FmtSpan::NONE)
        .with_file_logging(FileLoggingConfig::new(
            PathBuf::from("/tmp/logs"),
            "catbridge".to_string(),
        ));

    assert_eq!(config.service_name, "catbridge-cli");
    assert!(config.stdout_config.json_format);
    assert_eq!(config.stdout_config.fmt_span, FmtSpan::NONE);
    let file = config.file_logging_config.unwrap();
    assert_eq!(file.directory, PathBuf::from("/tmp/logs"));
    assert_eq!(file.file_name_prefix, "catbridge");
}

#[test]
fn test_file_logging_config_builder() {
    let file = FileLoggingConfig::new(PathBuf::from("logs"), "bridge".to_string())
        .with_rotation(Rotation::HOURLY)
        .with_json_format(true);
    assert!(file.json_format);
    assert_eq!(format!("{:?}", file.rotation), format!("{:?}", Rotation::HOURLY));
}

#[test]
fn test_format_service_name() {
    assert_eq!(format_service_name("catbridge", None), "catbridge");
    assert_eq!(format_service_name("catbridge", Some("op1")), "catbridge%op1");
}
