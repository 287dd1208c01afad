//! Header-derived facets.

use crate::FacetError;
use http::{header, HeaderMap};

/// Returns the raw `Authorization` header value.
///
/// No scheme parsing is done; a value of `Bearer t2` is returned as is.
///
/// # Errors
///
/// Returns [`FacetError::MissingAuthorization`] when the header is absent and
/// [`FacetError::InvalidAuthorization`] when it is not a valid string.
pub fn authorization(headers: &HeaderMap) -> Result<String, FacetError> {
    let value = headers
        .get(header::AUTHORIZATION)
        .ok_or(FacetError::MissingAuthorization)?;

    value
        .to_str()
        .map(str::to_string)
        .map_err(|_| FacetError::InvalidAuthorization)
}
