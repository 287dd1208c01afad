//! Facet names.
//!
//! A facet is one named slice of an inbound request. Seven facets are
//! predefined; any other name is a custom facet whose handler receives the
//! request and the current context fields directly.

use http::StatusCode;
use std::fmt;

/// One named slice of a request.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Facet {
    /// The raw header collection.
    Headers,
    /// The decoded request body.
    Body,
    /// The parsed query string.
    Query,
    /// Cookies from the `Cookie` header.
    Cookies,
    /// The raw `Authorization` header value.
    Auth,
    /// The request method, checked against an allowed set.
    Method,
    /// The request path, checked for an exact match.
    Path,
    /// A caller-defined extraction unit.
    Custom(String),
}

impl Facet {
    /// Names of the predefined facets.
    pub const PREDEFINED: [&'static str; 7] =
        ["headers", "body", "query", "cookies", "auth", "method", "path"];

    /// Resolves a facet name; unknown names become [`Facet::Custom`].
    ///
    /// ```
    /// use stagecoach_extract::Facet;
    ///
    /// assert_eq!(Facet::from_name("auth"), Facet::Auth);
    /// assert_eq!(Facet::from_name("tenant"), Facet::Custom("tenant".into()));
    /// ```
    #[must_use]
    pub fn from_name(name: &str) -> Self {
        match name {
            "headers" => Self::Headers,
            "body" => Self::Body,
            "query" => Self::Query,
            "cookies" => Self::Cookies,
            "auth" => Self::Auth,
            "method" => Self::Method,
            "path" => Self::Path,
            other => Self::Custom(other.to_string()),
        }
    }

    /// Returns the key under which results for this facet are stored.
    #[must_use]
    pub fn name(&self) -> &str {
        match self {
            Self::Headers => "headers",
            Self::Body => "body",
            Self::Query => "query",
            Self::Cookies => "cookies",
            Self::Auth => "auth",
            Self::Method => "method",
            Self::Path => "path",
            Self::Custom(name) => name,
        }
    }

    /// Returns the HTTP status used when parsing this facet fails.
    #[must_use]
    pub const fn failure_status(&self) -> StatusCode {
        match self {
            Self::Auth => StatusCode::UNAUTHORIZED,
            Self::Method => StatusCode::METHOD_NOT_ALLOWED,
            Self::Path => StatusCode::NOT_FOUND,
            _ => StatusCode::BAD_REQUEST,
        }
    }

    /// Returns true for [`Facet::Custom`].
    #[must_use]
    pub const fn is_custom(&self) -> bool {
        matches!(self, Self::Custom(_))
    }
}

impl fmt::Display for Facet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_predefined_round_trip() {
        for name in Facet::PREDEFINED {
            let facet = Facet::from_name(name);
            assert!(!facet.is_custom());
            assert_eq!(facet.name(), name);
        }
    }

    #[test]
    fn test_failure_status() {
        assert_eq!(Facet::Auth.failure_status(), StatusCode::UNAUTHORIZED);
        assert_eq!(Facet::Method.failure_status(), StatusCode::METHOD_NOT_ALLOWED);
        assert_eq!(Facet::Path.failure_status(), StatusCode::NOT_FOUND);
        assert_eq!(Facet::Body.failure_status(), StatusCode::BAD_REQUEST);
        assert_eq!(
            Facet::Custom("x".into()).failure_status(),
            StatusCode::BAD_REQUEST
        );
    }

    #[test]
    fn test_display() {
        assert_eq!(Facet::Cookies.to_string(), "cookies");
        assert_eq!(Facet::Custom("tenant".into()).to_string(), "tenant");
    }
}
