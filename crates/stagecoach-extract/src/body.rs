//! Body decoding.
//!
//! The body facet hands stages a decoded JSON value:
//!
//! - an empty body decodes to `{}`
//! - a body that is valid JSON decodes to that value
//! - anything else falls back to the body text (lossy UTF-8)

use bytes::Bytes;
use serde_json::Value;

/// Decodes raw body bytes into the value given to body facet handlers.
///
/// ```
/// use bytes::Bytes;
/// use serde_json::json;
/// use stagecoach_extract::decode_body;
///
/// assert_eq!(decode_body(&Bytes::new()), json!({}));
/// assert_eq!(decode_body(&Bytes::from_static(br#"{"a":1}"#)), json!({"a": 1}));
/// assert_eq!(decode_body(&Bytes::from_static(b"name=alice")), json!("name=alice"));
/// ```
#[must_use]
pub fn decode_body(bytes: &Bytes) -> Value {
    if bytes.is_empty() {
        return Value::Object(serde_json::Map::new());
    }

    match serde_json::from_slice(bytes) {
        Ok(value) => value,
        Err(e) => {
            tracing::debug!(error = %e, "body is not JSON, using raw text");
            Value::String(String::from_utf8_lossy(bytes).into_owned())
        }
    }
}
