//! File-based configuration loading.

use stagecoach_config::{ConfigError, ConfigLoader, LogFormat};
use std::io::Write;

fn write_config(suffix: &str, content: &str) -> tempfile::NamedTempFile {
    let mut file = tempfile::Builder::new()
        .suffix(suffix)
        .tempfile()
        .unwrap();
    file.write_all(content.as_bytes()).unwrap();
    file
}

#[test]
fn loads_complete_toml_file() {
    let file = write_config(
        ".toml",
        r#"
        [logging]
        level = "warn"
        format = "pretty"

        [request_id]
        header = "x-correlation-id"
        trust_incoming = true
        max_length = 64

        [cors]
        enabled = true
        allowed_origins = ["https://app.example.com"]
        allowed_methods = ["GET", "POST"]
        allow_credentials = true
        max_age_secs = 600

        [errors]
        expose_internal_errors = true
        "#,
    );

    let config = ConfigLoader::new()
        .with_file(file.path())
        .unwrap()
        .load()
        .unwrap();

    assert_eq!(config.logging.level, "warn");
    assert_eq!(config.logging.format, LogFormat::Pretty);
    assert_eq!(config.request_id.header, "x-correlation-id");
    assert_eq!(config.request_id.max_length, 64);
    assert_eq!(config.cors.allowed_methods, vec!["GET", "POST"]);
    assert_eq!(config.cors.max_age_secs, Some(600));
    assert!(config.errors.expose_internal_errors);
    assert_eq!(config.errors.internal_error_message, "An internal error occurred");
}

#[test]
fn loads_json_file() {
    let file = write_config(".json", r#"{"request_id": {"trust_incoming": true}}"#);

    let config = ConfigLoader::new()
        .with_optional_file(file.path())
        .unwrap()
        .load()
        .unwrap();

    assert!(config.request_id.trust_incoming);
    assert_eq!(config.request_id.header, "x-request-id");
}

#[test]
fn rejects_unsupported_extension() {
    let file = write_config(".yaml", "logging: {}");
    let result = ConfigLoader::new().with_file(file.path());
    assert!(matches!(result, Err(ConfigError::ValidationError(_))));
}

#[test]
fn rejects_unknown_fields() {
    let file = write_config(".toml", "[logging]\ncolour = true\n");
    assert!(ConfigLoader::new().with_file(file.path()).is_err());
}

#[test]
fn validation_runs_on_load() {
    let file = write_config(
        ".toml",
        r#"
        [cors]
        allowed_origins = ["*"]
        allow_credentials = true
        "#,
    );

    let result = ConfigLoader::new().with_file(file.path()).unwrap().load();
    assert!(matches!(result, Err(ConfigError::ValidationError(_))));
}
