//! Facet extraction errors.
//!
//! Each [`FacetError`] knows which [`Facet`] it came from, which determines
//! the HTTP status of the resulting `PARSE_ERROR`.

use crate::Facet;
use http::StatusCode;
use stagecoach_core::RouteError;
use thiserror::Error;

/// Error raised while extracting a predefined facet.
#[derive(Debug, Error)]
pub enum FacetError {
    /// The `Authorization` header is absent.
    #[error("missing required Authorization header")]
    MissingAuthorization,

    /// The `Authorization` header is not valid visible ASCII.
    #[error("Authorization header is not a valid string")]
    InvalidAuthorization,

    /// The request method is not in the allowed set.
    #[error("Method {method} not allowed; expected one of: {allowed}")]
    MethodNotAllowed {
        /// The request's method.
        method: String,
        /// The allowed methods, comma separated.
        allowed: String,
    },

    /// The request path does not equal the expected path.
    #[error("Path {actual} does not match {expected}")]
    PathMismatch {
        /// The path the stage expects.
        expected: String,
        /// The request's path.
        actual: String,
    },

    /// Reading the body source failed.
    #[error("failed to read request body: {0}")]
    BodyRead(#[source] std::io::Error),

    /// The query string could not be decoded.
    #[error("failed to parse query string: {0}")]
    Query(#[from] serde_urlencoded::de::Error),
}

impl FacetError {
    /// Returns the facet this error belongs to.
    #[must_use]
    pub fn facet(&self) -> Facet {
        match self {
            Self::MissingAuthorization | Self::InvalidAuthorization => Facet::Auth,
            Self::MethodNotAllowed { .. } => Facet::Method,
            Self::PathMismatch { .. } => Facet::Path,
            Self::BodyRead(_) => Facet::Body,
            Self::Query(_) => Facet::Query,
        }
    }

    /// Returns the HTTP status for this error.
    #[must_use]
    pub fn status_code(&self) -> StatusCode {
        self.facet().failure_status()
    }

    /// Converts into a `PARSE_ERROR` [`RouteError`].
    #[must_use]
    pub fn into_route_error(self) -> RouteError {
        let facet = self.facet();
        RouteError::parse(facet.name(), facet.failure_status(), self.to_string())
            .with_cause(anyhow::Error::new(self))
    }
}

impl From<FacetError> for RouteError {
    fn from(err: FacetError) -> Self {
        err.into_route_error()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use stagecoach_core::ErrorCode;

    #[test]
    fn test_missing_authorization_is_401() {
        let err = FacetError::MissingAuthorization;
        assert_eq!(err.facet(), Facet::Auth);
        assert_eq!(err.status_code(), StatusCode::UNAUTHORIZED);

        let route = err.into_route_error();
        assert_eq!(route.code(), ErrorCode::ParseError);
        assert_eq!(route.detail(), "Error parsing `auth`");
        assert_eq!(route.http_status(), StatusCode::UNAUTHORIZED);
    }

    #[test]
    fn test_method_not_allowed_lists_methods() {
        let err = FacetError::MethodNotAllowed {
            method: "DELETE".into(),
            allowed: "GET, POST".into(),
        };
        assert_eq!(err.status_code(), StatusCode::METHOD_NOT_ALLOWED);
        assert!(err.to_string().contains("GET, POST"));
    }

    #[test]
    fn test_path_mismatch_is_404() {
        let err = FacetError::PathMismatch {
            expected: "/a".into(),
            actual: "/b".into(),
        };
        let route: RouteError = err.into();
        assert_eq!(route.http_status(), StatusCode::NOT_FOUND);
        assert_eq!(route.detail(), "Error parsing `path`");
    }

    #[test]
    fn test_body_read_is_400() {
        let err = FacetError::BodyRead(std::io::Error::new(std::io::ErrorKind::Other, "gone"));
        assert_eq!(err.facet(), Facet::Body);
        assert_eq!(err.status_code(), StatusCode::BAD_REQUEST);
    }
}
