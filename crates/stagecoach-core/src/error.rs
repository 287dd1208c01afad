//! Error types for Stagecoach.
//!
//! This module provides [`RouteError`], the single classified failure type
//! produced by the request pipeline. Every failure that crosses the pipeline
//! boundary is either a `RouteError` or (in bound mode only) the raw error
//! returned by a terminal handler.
//!
//! # Error codes
//!
//! | [`ErrorCode`] | Produced by | Default status |
//! |---|---|---|
//! | `PREPARE_ERROR` | a prepare stage failed | 400 (bound) / 500 (direct) |
//! | `PARSE_ERROR` | a parse stage facet failed | 400, 401, 404 or 405 |
//! | `REQUEST_MAPPING_ERROR` | the request extractor failed | 500 |
//! | `HANDLER_ERROR` | the terminal handler failed | 500 |
//!
//! A value that is already a `RouteError` is never re-wrapped. Use
//! [`RouteError::classify`] when turning an `anyhow::Error` returned by user
//! code into a `RouteError`: a `RouteError` hidden inside passes through with
//! its code and status intact.

use http::StatusCode;
use serde::ser::SerializeStruct;
use serde::{Deserialize, Serialize, Serializer};
use std::fmt;
use std::sync::Arc;

/// Result type alias using [`RouteError`].
pub type RouteResult<T> = Result<T, RouteError>;

/// A shared, type-erased underlying error.
pub type Cause = Arc<dyn std::error::Error + Send + Sync + 'static>;

/// Machine-readable classification of a [`RouteError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    /// A prepare stage failed.
    PrepareError,
    /// A parse stage failed to extract or validate a facet.
    ParseError,
    /// The configured request extractor could not produce a request.
    RequestMappingError,
    /// The terminal handler failed (direct invocation only).
    HandlerError,
}

impl ErrorCode {
    /// Returns the wire form of the code, e.g. `PARSE_ERROR`.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::PrepareError => "PREPARE_ERROR",
            Self::ParseError => "PARSE_ERROR",
            Self::RequestMappingError => "REQUEST_MAPPING_ERROR",
            Self::HandlerError => "HANDLER_ERROR",
        }
    }

    /// Returns the HTTP status used when no more specific status applies.
    #[must_use]
    pub const fn default_status_code(self) -> StatusCode {
        match self {
            Self::PrepareError | Self::ParseError => StatusCode::BAD_REQUEST,
            Self::RequestMappingError | Self::HandlerError => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Classified pipeline failure.
///
/// `RouteError` carries a machine code, a human message, a short detail
/// naming where the failure happened, the HTTP status the caller should
/// answer with, and the original cause. It is immutable once built and cheap
/// to clone (the cause is shared).
///
/// # Example
///
/// ```
/// use stagecoach_core::{ErrorCode, RouteError};
/// use http::StatusCode;
///
/// let err = RouteError::parse("auth", StatusCode::UNAUTHORIZED, "missing Authorization header");
/// assert_eq!(err.code(), ErrorCode::ParseError);
/// assert_eq!(err.http_status(), StatusCode::UNAUTHORIZED);
/// assert_eq!(err.detail(), "Error parsing `auth`");
/// ```
#[derive(Clone, thiserror::Error)]
#[error("[{code}] {message}")]
pub struct RouteError {
    message: String,
    code: ErrorCode,
    detail: String,
    http_status: StatusCode,
    #[source]
    cause: Option<Cause>,
}

impl RouteError {
    /// Creates an error with the code's default status and no detail.
    #[must_use]
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            code,
            detail: String::new(),
            http_status: code.default_status_code(),
            cause: None,
        }
    }

    /// Creates a `PREPARE_ERROR` wrapping `cause`.
    #[must_use]
    pub fn prepare(cause: anyhow::Error, http_status: StatusCode) -> Self {
        Self::new(ErrorCode::PrepareError, cause.to_string())
            .with_detail("Error running prepare stage")
            .with_status(http_status)
            .with_cause(cause)
    }

    /// Creates a `PARSE_ERROR` for the named facet.
    #[must_use]
    pub fn parse(facet: &str, http_status: StatusCode, message: impl Into<String>) -> Self {
        Self::new(ErrorCode::ParseError, message)
            .with_detail(format!("Error parsing `{facet}`"))
            .with_status(http_status)
    }

    /// Creates a `REQUEST_MAPPING_ERROR` wrapping `cause`.
    #[must_use]
    pub fn request_mapping(cause: anyhow::Error) -> Self {
        Self::new(ErrorCode::RequestMappingError, cause.to_string())
            .with_detail("Error mapping request")
            .with_cause(cause)
    }

    /// Creates a `HANDLER_ERROR` wrapping `cause`.
    #[must_use]
    pub fn handler(cause: anyhow::Error) -> Self {
        Self::new(ErrorCode::HandlerError, cause.to_string())
            .with_detail("Error running handler")
            .with_cause(cause)
    }

    /// Turns an `anyhow::Error` into a `RouteError`.
    ///
    /// If `err` already wraps a `RouteError` it is returned unchanged;
    /// otherwise `wrap` builds the classification.
    ///
    /// ```
    /// use stagecoach_core::{ErrorCode, RouteError};
    /// use http::StatusCode;
    ///
    /// let original = RouteError::parse("body", StatusCode::BAD_REQUEST, "bad email");
    /// let passed = RouteError::classify(original.clone().into(), RouteError::handler);
    /// assert_eq!(passed.code(), ErrorCode::ParseError);
    ///
    /// let wrapped = RouteError::classify(anyhow::anyhow!("boom"), RouteError::handler);
    /// assert_eq!(wrapped.code(), ErrorCode::HandlerError);
    /// ```
    pub fn classify(err: anyhow::Error, wrap: impl FnOnce(anyhow::Error) -> Self) -> Self {
        match err.downcast::<Self>() {
            Ok(route_error) => route_error,
            Err(other) => wrap(other),
        }
    }

    /// Replaces the detail text.
    #[must_use]
    pub fn with_detail(mut self, detail: impl Into<String>) -> Self {
        self.detail = detail.into();
        self
    }

    /// Replaces the HTTP status.
    #[must_use]
    pub fn with_status(mut self, http_status: StatusCode) -> Self {
        self.http_status = http_status;
        self
    }

    /// Attaches the underlying cause.
    #[must_use]
    pub fn with_cause(mut self, cause: anyhow::Error) -> Self {
        let boxed: Box<dyn std::error::Error + Send + Sync + 'static> = cause.into();
        self.cause = Some(Arc::from(boxed));
        self
    }

    /// Returns the human-readable message.
    #[must_use]
    pub fn message(&self) -> &str {
        &self.message
    }

    /// Returns the machine code.
    #[must_use]
    pub const fn code(&self) -> ErrorCode {
        self.code
    }

    /// Returns the detail text (may be empty).
    #[must_use]
    pub fn detail(&self) -> &str {
        &self.detail
    }

    /// Returns the HTTP status the caller should answer with.
    #[must_use]
    pub const fn http_status(&self) -> StatusCode {
        self.http_status
    }

    /// Returns the original cause, if any.
    #[must_use]
    pub fn cause(&self) -> Option<&Cause> {
        self.cause.as_ref()
    }

    /// Returns true if this error has the given code.
    #[must_use]
    pub fn is(&self, code: ErrorCode) -> bool {
        self.code == code
    }
}

impl fmt::Debug for RouteError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RouteError")
            .field("code", &self.code)
            .field("message", &self.message)
            .field("detail", &self.detail)
            .field("http_status", &self.http_status.as_u16())
            .field("cause", &self.cause.as_ref().map(ToString::to_string))
            .finish()
    }
}

impl Serialize for RouteError {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut state = serializer.serialize_struct("RouteError", 4)?;
        state.serialize_field("code", &self.code)?;
        state.serialize_field("message", &self.message)?;
        state.serialize_field("detail", &self.detail)?;
        state.serialize_field("httpStatus", &self.http_status.as_u16())?;
        state.end()
    }
}
