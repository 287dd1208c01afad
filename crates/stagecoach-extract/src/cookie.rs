//! Cookie parsing.
//!
//! The `Cookie` header is split on `;` and each segment on its first `=`.
//! Names and values are trimmed. Segments without `=` and segments with an
//! empty name are skipped; malformed input is never an error.

use http::{header, HeaderMap};
use std::collections::HashMap;

/// Cookies by name.
pub type CookieMap = HashMap<String, String>;

/// Parses a `Cookie` header value.
///
/// ```
/// use stagecoach_extract::parse_cookies;
///
/// let cookies = parse_cookies("session=abc123; theme=dark; junk; =orphan");
/// assert_eq!(cookies.len(), 2);
/// assert_eq!(cookies.get("session").map(String::as_str), Some("abc123"));
/// ```
#[must_use]
pub fn parse_cookies(header_value: &str) -> CookieMap {
    let mut cookies = CookieMap::new();

    for segment in header_value.split(';') {
        let Some((name, value)) = segment.split_once('=') else {
            continue;
        };
        let name = name.trim();
        if name.is_empty() {
            continue;
        }
        cookies.insert(name.to_string(), value.trim().to_string());
    }

    cookies
}

/// Reads cookies from all `Cookie` headers of a request.
///
/// Header values that are not valid strings are ignored.
#[must_use]
pub fn cookies_from_headers(headers: &HeaderMap) -> CookieMap {
    headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|value| parse_cookies(value).into_iter())
        .collect()
}
