//! The error surfaced by bound-mode invocation.
//!
//! Bound mode hands classified failures back as [`RouteError`] but passes a
//! failing terminal handler's own error through untouched, so the caller's
//! error middleware can decide on the response. [`PipelineError`] carries
//! either, and exposes code, status and message uniformly for `on_error`.

use http::StatusCode;
use stagecoach_core::{ErrorCode, RouteError};
use std::fmt;
use std::sync::Arc;
use thiserror::Error;

/// A raw error returned by a terminal handler.
///
/// Cloning shares the underlying error.
#[derive(Clone)]
pub struct HandlerError(Arc<anyhow::Error>);

impl HandlerError {
    /// Wraps a handler's error.
    #[must_use]
    pub fn new(err: anyhow::Error) -> Self {
        Self(Arc::new(err))
    }

    /// Returns the handler's error.
    #[must_use]
    pub fn inner(&self) -> &anyhow::Error {
        &self.0
    }

    /// Downcasts the handler's error by reference.
    #[must_use]
    pub fn downcast_ref<E>(&self) -> Option<&E>
    where
        E: fmt::Display + fmt::Debug + Send + Sync + 'static,
    {
        self.0.downcast_ref::<E>()
    }

    /// Recovers the handler's error.
    ///
    /// If other clones are still alive the error is wrapped instead.
    #[must_use]
    pub fn into_anyhow(self) -> anyhow::Error {
        match Arc::try_unwrap(self.0) {
            Ok(err) => err,
            Err(shared) => anyhow::Error::new(Self(shared)),
        }
    }
}

impl fmt::Debug for HandlerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(&*self.0, f)
    }
}

impl fmt::Display for HandlerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&*self.0, f)
    }
}

impl std::error::Error for HandlerError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.0.source()
    }
}

/// Any failure of a bound-mode invocation.
#[derive(Debug, Clone, Error)]
pub enum PipelineError {
    /// A classified failure: request mapping, prepare, parse, or a
    /// `RouteError` returned deliberately by the handler.
    #[error(transparent)]
    Route(#[from] RouteError),

    /// The terminal handler failed with an unclassified error.
    #[error(transparent)]
    Handler(#[from] HandlerError),
}

impl PipelineError {
    /// Classifies a terminal handler error.
    ///
    /// A `RouteError` keeps its identity; anything else stays raw.
    #[must_use]
    pub fn from_handler(err: anyhow::Error) -> Self {
        match err.downcast::<RouteError>() {
            Ok(route_error) => Self::Route(route_error),
            Err(other) => Self::Handler(HandlerError::new(other)),
        }
    }

    /// Returns the error code; raw handler errors report `HANDLER_ERROR`.
    #[must_use]
    pub fn code(&self) -> ErrorCode {
        match self {
            Self::Route(err) => err.code(),
            Self::Handler(_) => ErrorCode::HandlerError,
        }
    }

    /// Returns the HTTP status; raw handler errors report 500.
    #[must_use]
    pub fn http_status(&self) -> StatusCode {
        match self {
            Self::Route(err) => err.http_status(),
            Self::Handler(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Returns the human-readable message.
    #[must_use]
    pub fn message(&self) -> String {
        match self {
            Self::Route(err) => err.message().to_string(),
            Self::Handler(err) => err.to_string(),
        }
    }

    /// Returns the detail text.
    #[must_use]
    pub fn detail(&self) -> &str {
        match self {
            Self::Route(err) => err.detail(),
            Self::Handler(_) => "Error running handler",
        }
    }

    /// Returns the classified error, if this is one.
    #[must_use]
    pub fn as_route_error(&self) -> Option<&RouteError> {
        match self {
            Self::Route(err) => Some(err),
            Self::Handler(_) => None,
        }
    }

    /// Converts into a `RouteError`, wrapping raw handler errors as
    /// `HANDLER_ERROR`.
    #[must_use]
    pub fn into_route_error(self) -> RouteError {
        match self {
            Self::Route(err) => err,
            Self::Handler(err) => RouteError::handler(err.into_anyhow()),
        }
    }
}
