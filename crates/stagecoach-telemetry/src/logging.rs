//! Structured logging for Stagecoach.
//!
//! Sets up a `tracing-subscriber` registry with an [`EnvFilter`] and either
//! JSON (production) or pretty (development) formatting, and defines the
//! field names and macros the pipeline logs with.
//!
//! # Example
//!
//! ```rust,ignore
//! use stagecoach_telemetry::{init_logging, LogConfig};
//!
//! init_logging(&LogConfig::development())?;
//! tracing::info!(request_id = "0190...", "Processing request");
//! ```

use crate::error::TelemetryError;
use crate::TelemetryResult;
use stagecoach_config::{LogFormat, LoggingConfig};
use tracing_subscriber::fmt::format::FmtSpan;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer};

/// Logging configuration.
#[derive(Debug, Clone)]
pub struct LogConfig {
    /// Whether logging is enabled.
    pub enabled: bool,

    /// Filter directive (e.g., "info", "stagecoach_pipeline=debug").
    pub level: String,

    /// Whether to output JSON format.
    pub json_format: bool,

    /// Whether to emit span open/close events.
    pub span_events: bool,

    /// Whether to include file/line info.
    pub file_line_info: bool,

    /// Whether to include ANSI colors (pretty format only).
    pub ansi: bool,

    /// Whether to include target (module path).
    pub include_target: bool,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            level: "info".to_string(),
            json_format: true,
            span_events: false,
            file_line_info: false,
            ansi: false,
            include_target: true,
        }
    }
}

impl LogConfig {
    /// Creates a development configuration with human-readable output.
    #[must_use]
    pub fn development() -> Self {
        Self {
            enabled: true,
            level: "debug".to_string(),
            json_format: false,
            span_events: true,
            file_line_info: true,
            ansi: true,
            include_target: true,
        }
    }

    /// Creates a production configuration with JSON output.
    #[must_use]
    pub fn production() -> Self {
        Self::default()
    }
}

impl From<&LoggingConfig> for LogConfig {
    fn from(config: &LoggingConfig) -> Self {
        Self {
            enabled: config.enabled,
            level: config.level.clone(),
            json_format: config.format == LogFormat::Json,
            span_events: false,
            file_line_info: config.include_location,
            ansi: config.ansi_enabled,
            include_target: true,
        }
    }
}

/// Installs the global logging subscriber.
///
/// Does nothing when `config.enabled` is false.
///
/// # Errors
///
/// Returns [`TelemetryError::InvalidFilter`] for a bad filter directive and
/// [`TelemetryError::LoggingInit`] if a global subscriber is already set.
pub fn init_logging(config: &LogConfig) -> TelemetryResult<()> {
    if !config.enabled {
        return Ok(());
    }

    let filter = create_env_filter(&config.level)?;

    let span_events = if config.span_events {
        FmtSpan::NEW | FmtSpan::CLOSE
    } else {
        FmtSpan::NONE
    };

    if config.json_format {
        let fmt_layer = tracing_subscriber::fmt::layer()
            .json()
            .with_span_events(span_events)
            .with_file(config.file_line_info)
            .with_line_number(config.file_line_info)
            .with_target(config.include_target)
            .with_filter(filter);

        tracing_subscriber::registry()
            .with(fmt_layer)
            .try_init()
            .map_err(|e| TelemetryError::LoggingInit(e.to_string()))?;
    } else {
        let fmt_layer = tracing_subscriber::fmt::layer()
            .pretty()
            .with_ansi(config.ansi)
            .with_span_events(span_events)
            .with_file(config.file_line_info)
            .with_line_number(config.file_line_info)
            .with_target(config.include_target)
            .with_filter(filter);

        tracing_subscriber::registry()
            .with(fmt_layer)
            .try_init()
            .map_err(|e| TelemetryError::LoggingInit(e.to_string()))?;
    }

    Ok(())
}

/// Creates an env filter from a directive string.
///
/// # Errors
///
/// Returns [`TelemetryError::InvalidFilter`] if the directive is invalid.
pub fn create_env_filter(filter: &str) -> TelemetryResult<EnvFilter> {
    EnvFilter::try_new(filter).map_err(|e| TelemetryError::InvalidFilter(e.to_string()))
}

/// Standard log field names.
pub mod fields {
    /// Request ID field name.
    pub const REQUEST_ID: &str = "request_id";

    /// HTTP method field name.
    pub const HTTP_METHOD: &str = "http.method";

    /// HTTP path field name.
    pub const HTTP_PATH: &str = "http.path";

    /// HTTP status code field name.
    pub const HTTP_STATUS: &str = "http.status_code";

    /// Duration field name (in milliseconds).
    pub const DURATION_MS: &str = "duration_ms";

    /// Error field name.
    pub const ERROR: &str = "error";

    /// Error code field name.
    pub const ERROR_CODE: &str = "error.code";

    /// Pipeline stage field name.
    pub const STAGE: &str = "stage";

    /// Request facet field name.
    pub const FACET: &str = "facet";

    /// Lifecycle hook field name.
    pub const HOOK: &str = "hook";
}

/// Logs a request start event.
#[macro_export]
macro_rules! log_request_start {
    ($request_id:expr, $method:expr, $path:expr) => {
        $crate::tracing::info!(
            request_id = %$request_id,
            http.method = %$method,
            http.path = %$path,
            "Request started"
        );
    };
}

/// Logs a request completion event.
#[macro_export]
macro_rules! log_request_complete {
    ($request_id:expr, $status:expr, $duration_ms:expr) => {
        $crate::tracing::info!(
            request_id = %$request_id,
            http.status_code = $status,
            duration_ms = $duration_ms,
            "Request completed"
        );
    };
}

/// Logs a request failure event.
///
/// Server errors are logged at `error`, everything else at `warn`.
#[macro_export]
macro_rules! log_request_error {
    ($request_id:expr, $stage:expr, $code:expr, $status:expr, $error:expr) => {
        if $status >= 500 {
            $crate::tracing::error!(
                request_id = %$request_id,
                stage = %$stage,
                error.code = %$code,
                http.status_code = $status,
                error = %$error,
                "Request failed"
            );
        } else {
            $crate::tracing::warn!(
                request_id = %$request_id,
                stage = %$stage,
                error.code = %$code,
                http.status_code = $status,
                error = %$error,
                "Request failed"
            );
        }
    };
}

/// Logs a lifecycle hook failure. Hook failures never change the outcome.
#[macro_export]
macro_rules! log_hook_failure {
    ($request_id:expr, $hook:expr, $error:expr) => {
        $crate::tracing::warn!(
            request_id = %$request_id,
            hook = $hook,
            error = %$error,
            "Lifecycle hook failed"
        );
    };
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = LogConfig::default();
        assert!(config.enabled);
        assert!(config.json_format);
        assert_eq!(config.level, "info");
    }

    #[test]
    fn test_development_config() {
        let config = LogConfig::development();
        assert!(!config.json_format);
        assert!(config.span_events);
        assert!(config.file_line_info);
        assert_eq!(config.level, "debug");
    }

    #[test]
    fn test_from_logging_section() {
        let section = LoggingConfig {
            level: "warn".into(),
            format: LogFormat::Pretty,
            include_location: true,
            ..Default::default()
        };

        let config = LogConfig::from(&section);
        assert_eq!(config.level, "warn");
        assert!(!config.json_format);
        assert!(config.file_line_info);
    }

    #[test]
    fn test_create_env_filter() {
        assert!(create_env_filter("info,stagecoach_pipeline=debug").is_ok());
        assert!(matches!(
            create_env_filter("stagecoach=[bad"),
            Err(TelemetryError::InvalidFilter(_))
        ));
    }

    #[test]
    fn test_disabled_logging() {
        let config = LogConfig {
            enabled: false,
            ..Default::default()
        };
        assert!(init_logging(&config).is_ok());
    }

    #[test]
    fn test_macros_expand_without_subscriber() {
        let request_id = "req-1";
        crate::log_request_start!(request_id, "GET", "/users");
        crate::log_request_complete!(request_id, 200_u16, 3_u64);
        crate::log_request_error!(request_id, "parse", "PARSE_ERROR", 401_u16, "missing header");
        crate::log_request_error!(request_id, "handle", "HANDLER_ERROR", 500_u16, "boom");
        crate::log_hook_failure!(request_id, "on_response", "sink unavailable");
    }
}
