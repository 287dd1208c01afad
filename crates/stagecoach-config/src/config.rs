//! Main configuration types.
//!
//! This module provides the top-level [`StagecoachConfig`] struct and its builder.

use serde::{Deserialize, Serialize};

use crate::{ConfigError, CorsConfig, ErrorsConfig, LoggingConfig, RequestIdConfig};

/// Levels accepted as a bare `logging.level`.
const LOG_LEVELS: [&str; 5] = ["trace", "debug", "info", "warn", "error"];

/// Complete Stagecoach configuration.
///
/// Use [`ConfigLoader`](crate::ConfigLoader) to load configuration from files
/// and environment variables.
///
/// # Example
///
/// ```
/// use stagecoach_config::StagecoachConfig;
///
/// let config = StagecoachConfig::default();
/// assert_eq!(config.request_id.header, "x-request-id");
/// assert!(!config.errors.expose_internal_errors);
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(deny_unknown_fields)]
pub struct StagecoachConfig {
    /// Logging configuration.
    #[serde(default)]
    pub logging: LoggingConfig,

    /// Request id generation and propagation.
    #[serde(default)]
    pub request_id: RequestIdConfig,

    /// CORS preflight handling.
    #[serde(default)]
    pub cors: CorsConfig,

    /// Error rendering.
    #[serde(default)]
    pub errors: ErrorsConfig,
}

impl StagecoachConfig {
    /// Create a new configuration builder.
    #[must_use]
    pub fn builder() -> StagecoachConfigBuilder {
        StagecoachConfigBuilder::new()
    }

    /// Validate the configuration.
    ///
    /// # Errors
    ///
    /// Returns a `ConfigError` if:
    /// - `logging.level` is empty
    /// - `request_id.header` is not a valid lowercase header name
    /// - `request_id.max_length` is zero
    /// - CORS allows credentials together with any origin
    /// - a CORS method is not a valid method token
    pub fn validate(&self) -> Result<(), ConfigError> {
        let level = self.logging.level.trim();
        if level.is_empty() {
            return Err(ConfigError::invalid_value("logging.level", "must not be empty"));
        }
        // Bare levels are checked; filter directives are left to the subscriber.
        if !level.contains(['=', ',']) && !LOG_LEVELS.contains(&level.to_lowercase().as_str()) {
            return Err(ConfigError::invalid_value(
                "logging.level",
                format!("unknown level: {level}"),
            ));
        }

        if !is_header_name(&self.request_id.header) {
            return Err(ConfigError::invalid_value(
                "request_id.header",
                format!("not a valid lowercase header name: {}", self.request_id.header),
            ));
        }

        if self.request_id.max_length == 0 {
            return Err(ConfigError::invalid_value(
                "request_id.max_length",
                "must be greater than zero",
            ));
        }

        if self.cors.allow_credentials && self.cors.allows_any_origin() {
            return Err(ConfigError::validation_error(
                "cors.allow_credentials cannot be combined with the \"*\" origin",
            ));
        }

        if let Some(method) = self
            .cors
            .allowed_methods
            .iter()
            .find(|method| !is_token(method))
        {
            return Err(ConfigError::invalid_value(
                "cors.allowed_methods",
                format!("not a valid method: {method}"),
            ));
        }

        Ok(())
    }

    /// Create a development configuration preset.
    ///
    /// - Pretty log formatting with ANSI colors
    /// - Debug log level
    /// - Internal error messages exposed
    /// - Permissive CORS
    ///
    /// # Example
    ///
    /// ```
    /// use stagecoach_config::StagecoachConfig;
    ///
    /// let config = StagecoachConfig::development();
    /// assert_eq!(config.logging.level, "debug");
    /// assert!(config.errors.expose_internal_errors);
    /// ```
    #[must_use]
    pub fn development() -> Self {
        let mut config = Self::default();

        config.logging.level = "debug".to_string();
        config.logging.format = crate::LogFormat::Pretty;
        config.logging.ansi_enabled = true;
        config.logging.include_location = true;

        config.errors.expose_internal_errors = true;

        config.cors.enabled = true;
        config.cors.allowed_origins = vec!["*".to_string()];

        config
    }

    /// Create a production configuration preset.
    ///
    /// - JSON log formatting
    /// - Info log level
    /// - Internal error messages hidden
    ///
    /// # Example
    ///
    /// ```
    /// use stagecoach_config::StagecoachConfig;
    ///
    /// let config = StagecoachConfig::production();
    /// assert_eq!(config.logging.format, stagecoach_config::LogFormat::Json);
    /// ```
    #[must_use]
    pub fn production() -> Self {
        let mut config = Self::default();

        config.logging.level = "info".to_string();
        config.logging.format = crate::LogFormat::Json;
        config.logging.ansi_enabled = false;

        config.errors.expose_internal_errors = false;

        config
    }
}

fn is_token(value: &str) -> bool {
    !value.is_empty()
        && value
            .bytes()
            .all(|b| b.is_ascii_alphanumeric() || b"!#$%&'*+-.^_`|~".contains(&b))
}

fn is_header_name(value: &str) -> bool {
    is_token(value) && !value.bytes().any(|b| b.is_ascii_uppercase())
}

/// Builder for [`StagecoachConfig`].
#[derive(Debug, Default)]
pub struct StagecoachConfigBuilder {
    logging: Option<LoggingConfig>,
    request_id: Option<RequestIdConfig>,
    cors: Option<CorsConfig>,
    errors: Option<ErrorsConfig>,
}

impl StagecoachConfigBuilder {
    /// Create a new builder with default values.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the logging configuration.
    #[must_use]
    pub fn logging(mut self, logging: LoggingConfig) -> Self {
        self.logging = Some(logging);
        self
    }

    /// Set the request id configuration.
    #[must_use]
    pub fn request_id(mut self, request_id: RequestIdConfig) -> Self {
        self.request_id = Some(request_id);
        self
    }

    /// Set the CORS configuration.
    #[must_use]
    pub fn cors(mut self, cors: CorsConfig) -> Self {
        self.cors = Some(cors);
        self
    }

    /// Set the error rendering configuration.
    #[must_use]
    pub fn errors(mut self, errors: ErrorsConfig) -> Self {
        self.errors = Some(errors);
        self
    }

    /// Build the configuration.
    ///
    /// Any unset sections will use their default values.
    #[must_use]
    pub fn build(self) -> StagecoachConfig {
        StagecoachConfig {
            logging: self.logging.unwrap_or_default(),
            request_id: self.request_id.unwrap_or_default(),
            cors: self.cors.unwrap_or_default(),
            errors: self.errors.unwrap_or_default(),
        }
    }

    /// Build and validate the configuration.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if validation fails.
    pub fn build_validated(self) -> Result<StagecoachConfig, ConfigError> {
        let config = self.build();
        config.validate()?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        assert!(StagecoachConfig::default().validate().is_ok());
        assert!(StagecoachConfig::development().validate().is_ok());
        assert!(StagecoachConfig::production().validate().is_ok());
    }

    #[test]
    fn test_builder_keeps_other_defaults() {
        let config = StagecoachConfig::builder()
            .request_id(RequestIdConfig {
                trust_incoming: true,
                ..Default::default()
            })
            .build();

        assert!(config.request_id.trust_incoming);
        assert_eq!(config.logging.level, "info");
    }

    #[test]
    fn test_invalid_header_name() {
        let result = StagecoachConfig::builder()
            .request_id(RequestIdConfig {
                header: "X Request Id".into(),
                ..Default::default()
            })
            .build_validated();

        assert!(matches!(result, Err(ConfigError::InvalidValue { .. })));
    }

    #[test]
    fn test_uppercase_header_name_rejected() {
        let mut config = StagecoachConfig::default();
        config.request_id.header = "X-Request-Id".into();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_unknown_log_level() {
        let mut config = StagecoachConfig::default();
        config.logging.level = "verbose".into();
        assert!(config.validate().is_err());

        config.logging.level = "info,stagecoach_pipeline=debug".into();
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_credentials_with_any_origin() {
        let mut config = StagecoachConfig::development();
        config.cors.allow_credentials = true;
        assert!(matches!(
            config.validate(),
            Err(ConfigError::ValidationError(_))
        ));
    }

    #[test]
    fn test_invalid_cors_method() {
        let mut config = StagecoachConfig::default();
        config.cors.allowed_methods.push("GE T".into());
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_zero_max_length() {
        let mut config = StagecoachConfig::default();
        config.request_id.max_length = 0;
        assert!(config.validate().is_err());
    }
}
