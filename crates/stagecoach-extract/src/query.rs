//! Query string parsing.

use crate::FacetError;
use std::collections::HashMap;

/// Parsed query string: one value per key, last occurrence wins.
pub type QueryMap = HashMap<String, String>;

/// Parses a URL query string into a string map.
///
/// Percent-encoding and `+` are decoded. Repeated keys keep the last value.
///
/// ```
/// use stagecoach_extract::parse_query;
///
/// let query = parse_query("q=rust+lang&limit=10&limit=20").unwrap();
/// assert_eq!(query.get("q").map(String::as_str), Some("rust lang"));
/// assert_eq!(query.get("limit").map(String::as_str), Some("20"));
/// ```
pub fn parse_query(query: &str) -> Result<QueryMap, FacetError> {
    let pairs: Vec<(String, String)> = serde_urlencoded::from_str(query)?;
    Ok(pairs.into_iter().collect())
}
