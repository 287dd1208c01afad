//! Configuration section types.
//!
//! Every section rejects unknown fields and fills omitted fields with
//! defaults, so a file only needs to name what it changes.

use serde::{Deserialize, Serialize};

/// Log format.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// JSON formatted logs (production).
    #[default]
    Json,
    /// Human-readable pretty format (development).
    Pretty,
}

/// Logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct LoggingConfig {
    /// Enable logging.
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Log level or filter directive (e.g. `info`, `stagecoach_pipeline=debug`).
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Log output format.
    #[serde(default)]
    pub format: LogFormat,

    /// Include ANSI color codes in output.
    #[serde(default)]
    pub ansi_enabled: bool,

    /// Include source file and line in logs.
    #[serde(default)]
    pub include_location: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            level: default_log_level(),
            format: LogFormat::default(),
            ansi_enabled: false,
            include_location: false,
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

/// Request id configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct RequestIdConfig {
    /// Header carrying the request id, inbound and on rendered responses.
    #[serde(default = "default_request_id_header")]
    pub header: String,

    /// Reuse an id sent by the caller instead of generating one.
    ///
    /// Enable only for traffic from trusted internal services.
    #[serde(default)]
    pub trust_incoming: bool,

    /// Longest incoming id accepted when `trust_incoming` is set.
    #[serde(default = "default_max_length")]
    pub max_length: usize,
}

impl Default for RequestIdConfig {
    fn default() -> Self {
        Self {
            header: default_request_id_header(),
            trust_incoming: false,
            max_length: default_max_length(),
        }
    }
}

fn default_request_id_header() -> String {
    "x-request-id".to_string()
}

const fn default_max_length() -> usize {
    128
}

/// CORS preflight configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct CorsConfig {
    /// Answer preflight requests before the pipeline runs.
    #[serde(default)]
    pub enabled: bool,

    /// Allowed origins; `"*"` allows any origin.
    #[serde(default)]
    pub allowed_origins: Vec<String>,

    /// Allowed methods.
    #[serde(default = "default_cors_methods")]
    pub allowed_methods: Vec<String>,

    /// Allowed request headers.
    #[serde(default = "default_cors_headers")]
    pub allowed_headers: Vec<String>,

    /// Response headers exposed to browsers.
    #[serde(default)]
    pub expose_headers: Vec<String>,

    /// Allow credentials (cookies, authorization headers).
    #[serde(default)]
    pub allow_credentials: bool,

    /// Preflight cache duration in seconds.
    #[serde(default = "default_max_age_secs")]
    pub max_age_secs: Option<u64>,
}

impl Default for CorsConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            allowed_origins: Vec::new(),
            allowed_methods: default_cors_methods(),
            allowed_headers: default_cors_headers(),
            expose_headers: Vec::new(),
            allow_credentials: false,
            max_age_secs: default_max_age_secs(),
        }
    }
}

impl CorsConfig {
    /// Returns true if any origin is allowed.
    #[must_use]
    pub fn allows_any_origin(&self) -> bool {
        self.allowed_origins.iter().any(|origin| origin == "*")
    }
}

fn default_cors_methods() -> Vec<String> {
    ["GET", "HEAD", "POST", "PUT", "DELETE", "PATCH"]
        .into_iter()
        .map(String::from)
        .collect()
}

fn default_cors_headers() -> Vec<String> {
    ["content-type", "authorization", "x-request-id"]
        .into_iter()
        .map(String::from)
        .collect()
}

#[allow(clippy::unnecessary_wraps)]
const fn default_max_age_secs() -> Option<u64> {
    Some(86_400)
}

/// Error rendering configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct ErrorsConfig {
    /// Show 5xx error messages to clients (development only).
    #[serde(default)]
    pub expose_internal_errors: bool,

    /// Message shown instead of hidden 5xx messages.
    #[serde(default = "default_internal_error_message")]
    pub internal_error_message: String,
}

impl Default for ErrorsConfig {
    fn default() -> Self {
        Self {
            expose_internal_errors: false,
            internal_error_message: default_internal_error_message(),
        }
    }
}

fn default_internal_error_message() -> String {
    "An internal error occurred".to_string()
}

const fn default_true() -> bool {
    true
}
