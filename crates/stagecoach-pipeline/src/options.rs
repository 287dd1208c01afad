//! Pipeline options.
//!
//! Options that apply to every invocation of a route: request-id handling
//! and how failures are rendered by [`RouteHandler::respond`].
//!
//! [`RouteHandler::respond`]: crate::RouteHandler::respond

use http::HeaderName;
use stagecoach_config::{ConfigError, ErrorsConfig, RequestIdConfig, StagecoachConfig};

/// Request-id handling.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestIdOptions {
    /// Header the id is read from and echoed on.
    pub header: HeaderName,
    /// Use a well-formed incoming id instead of generating one.
    pub trust_incoming: bool,
    /// Longest incoming id accepted.
    pub max_length: usize,
}

impl Default for RequestIdOptions {
    fn default() -> Self {
        Self {
            header: HeaderName::from_static("x-request-id"),
            trust_incoming: false,
            max_length: 128,
        }
    }
}

impl RequestIdOptions {
    /// Returns the incoming id if it may be trusted.
    pub(crate) fn incoming<'a>(&self, headers: &'a http::HeaderMap) -> Option<&'a str> {
        if !self.trust_incoming {
            return None;
        }
        headers
            .get(&self.header)
            .and_then(|value| value.to_str().ok())
            .map(str::trim)
            .filter(|id| !id.is_empty() && id.len() <= self.max_length)
    }
}

impl TryFrom<&RequestIdConfig> for RequestIdOptions {
    type Error = ConfigError;

    fn try_from(config: &RequestIdConfig) -> Result<Self, Self::Error> {
        let header = HeaderName::from_bytes(config.header.as_bytes())
            .map_err(|e| ConfigError::invalid_value("request_id.header", e.to_string()))?;
        Ok(Self {
            header,
            trust_incoming: config.trust_incoming,
            max_length: config.max_length,
        })
    }
}

/// Options shared by every invocation of a route.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PipelineOptions {
    /// Request-id handling.
    pub request_id: RequestIdOptions,
    /// Render server error messages as-is instead of the generic message.
    pub expose_internal_errors: bool,
    /// Message rendered for server errors when they are not exposed.
    pub internal_error_message: String,
}

impl Default for PipelineOptions {
    fn default() -> Self {
        Self {
            request_id: RequestIdOptions::default(),
            expose_internal_errors: false,
            internal_error_message: "An internal error occurred".to_string(),
        }
    }
}

impl PipelineOptions {
    /// Creates options with default settings.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the request-id header.
    #[must_use]
    pub fn request_id_header(mut self, header: HeaderName) -> Self {
        self.request_id.header = header;
        self
    }

    /// Trusts well-formed incoming request ids.
    #[must_use]
    pub const fn trust_incoming_request_id(mut self, trust: bool) -> Self {
        self.request_id.trust_incoming = trust;
        self
    }

    /// Sets whether server error messages are rendered as-is.
    ///
    /// Only enable this in development.
    #[must_use]
    pub const fn expose_internal_errors(mut self, expose: bool) -> Self {
        self.expose_internal_errors = expose;
        self
    }

    /// Sets the message rendered for hidden server errors.
    #[must_use]
    pub fn internal_error_message(mut self, message: impl Into<String>) -> Self {
        self.internal_error_message = message.into();
        self
    }

    /// Builds options from the `request_id` and `errors` config sections.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidValue`] if the header name is invalid.
    pub fn from_config(config: &StagecoachConfig) -> Result<Self, ConfigError> {
        let ErrorsConfig {
            expose_internal_errors,
            internal_error_message,
        } = &config.errors;

        Ok(Self {
            request_id: RequestIdOptions::try_from(&config.request_id)?,
            expose_internal_errors: *expose_internal_errors,
            internal_error_message: internal_error_message.clone(),
        })
    }
}

impl TryFrom<&StagecoachConfig> for PipelineOptions {
    type Error = ConfigError;

    fn try_from(config: &StagecoachConfig) -> Result<Self, Self::Error> {
        Self::from_config(config)
    }
}
