//! Exact path matching for the path facet.

use crate::FacetError;
use serde::Serialize;
use serde_json::Map;

/// Result of a successful path match.
///
/// Exact matching never captures parameters, so `params` is always empty.
/// It is kept in the shape so handlers reading `parsed.path.params` work
/// unchanged if pattern matching is added.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PathMatch {
    /// The path that matched.
    pub matched: String,
    /// Captured parameters.
    pub params: Map<String, serde_json::Value>,
}

/// Compares the request path to `expected` exactly.
///
/// # Errors
///
/// Returns [`FacetError::PathMismatch`] when the paths differ.
pub fn match_exact(expected: &str, actual: &str) -> Result<PathMatch, FacetError> {
    if expected == actual {
        Ok(PathMatch {
            matched: actual.to_string(),
            params: Map::new(),
        })
    } else {
        Err(FacetError::PathMismatch {
            expected: expected.to_string(),
            actual: actual.to_string(),
        })
    }
}
