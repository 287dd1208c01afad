//! Per-request execution context.
//!
//! The [`ExecutionContext`] is the accumulator threaded through every prepare
//! and parse stage and finally handed to the terminal handler. It is a
//! dynamically keyed map: prepare stages contribute top-level fields, parse
//! stages contribute entries under the reserved `parsed` map.
//!
//! Two merge rules apply:
//!
//! - **Fields**: a prepare stage's result is shallow-merged over the existing
//!   fields; later keys overwrite earlier ones.
//! - **Parsed facets**: if both the existing and the incoming value for a
//!   facet are objects, the incoming object is shallow-merged over the
//!   existing one. Otherwise the incoming value replaces the old one.

use serde::de::DeserializeOwned;
use serde::ser::SerializeMap;
use serde::{Serialize, Serializer};
use serde_json::{Map, Value};
use uuid::Uuid;

/// Reserved field holding the request correlation id.
pub const REQUEST_ID_FIELD: &str = "requestId";

/// Reserved key holding parse results.
pub const PARSED_KEY: &str = "parsed";

/// A flat string-keyed map of JSON values.
pub type Fields = Map<String, Value>;

/// Generates a fresh request id (UUID v7, time-ordered).
#[must_use]
pub fn generate_request_id() -> String {
    Uuid::now_v7().to_string()
}

/// Merges `incoming` over `existing` using the parsed-facet rule.
///
/// ```
/// use serde_json::json;
/// use stagecoach_core::context::merge_value;
///
/// let merged = merge_value(Some(json!({"email": "a@b.c"})), json!({"isValid": true}));
/// assert_eq!(merged, json!({"email": "a@b.c", "isValid": true}));
///
/// let replaced = merge_value(Some(json!({"email": "a@b.c"})), json!("raw"));
/// assert_eq!(replaced, json!("raw"));
/// ```
#[must_use]
pub fn merge_value(existing: Option<Value>, incoming: Value) -> Value {
    match (existing, incoming) {
        (Some(Value::Object(mut base)), Value::Object(patch)) => {
            base.extend(patch);
            Value::Object(base)
        }
        (_, incoming) => incoming,
    }
}

/// The per-request accumulator.
///
/// # Example
///
/// ```
/// use serde_json::json;
/// use stagecoach_core::ExecutionContext;
///
/// let mut ctx = ExecutionContext::new("req-1");
/// ctx.merge_fields(json!({"role": "admin"}).as_object().unwrap().clone());
/// ctx.merge_parsed("auth", json!({"token": "t1"}));
/// ctx.merge_parsed("auth", json!({"token": "t2"}));
///
/// assert_eq!(ctx.request_id(), Some("req-1"));
/// assert_eq!(ctx.field("role"), Some(&json!("admin")));
/// assert_eq!(ctx.parsed_facet("auth"), Some(&json!({"token": "t2"})));
/// ```
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ExecutionContext {
    fields: Fields,
    parsed: Fields,
}

impl ExecutionContext {
    /// Creates a context holding only the reserved `requestId` field.
    #[must_use]
    pub fn new(request_id: impl Into<String>) -> Self {
        let mut fields = Fields::new();
        fields.insert(REQUEST_ID_FIELD.to_string(), Value::String(request_id.into()));
        Self {
            fields,
            parsed: Fields::new(),
        }
    }

    /// Returns true if `map` is a complete context (it carries `parsed`).
    #[must_use]
    pub fn is_complete(map: &Fields) -> bool {
        map.contains_key(PARSED_KEY)
    }

    /// Builds a context from a flat map, splitting off the `parsed` entry.
    ///
    /// A non-object `parsed` entry yields an empty parse map.
    #[must_use]
    pub fn from_map(mut map: Fields) -> Self {
        let parsed = match map.remove(PARSED_KEY) {
            Some(Value::Object(parsed)) => parsed,
            _ => Fields::new(),
        };
        Self { fields: map, parsed }
    }

    /// Returns the top-level fields.
    #[must_use]
    pub fn fields(&self) -> &Fields {
        &self.fields
    }

    /// Returns the parse results.
    #[must_use]
    pub fn parsed(&self) -> &Fields {
        &self.parsed
    }

    /// Returns a single top-level field.
    #[must_use]
    pub fn field(&self, key: &str) -> Option<&Value> {
        self.fields.get(key)
    }

    /// Returns the parse result stored for a facet.
    #[must_use]
    pub fn parsed_facet(&self, facet: &str) -> Option<&Value> {
        self.parsed.get(facet)
    }

    /// Returns the request correlation id, if present.
    #[must_use]
    pub fn request_id(&self) -> Option<&str> {
        self.fields.get(REQUEST_ID_FIELD).and_then(Value::as_str)
    }

    /// Deserializes a top-level field.
    ///
    /// Returns `None` if the field is absent or does not have the shape of `T`.
    #[must_use]
    pub fn get<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        self.fields
            .get(key)
            .and_then(|value| T::deserialize(value).ok())
    }

    /// Deserializes the parse result of a facet.
    ///
    /// Returns `None` if the facet is absent or does not have the shape of `T`.
    #[must_use]
    pub fn parsed_as<T: DeserializeOwned>(&self, facet: &str) -> Option<T> {
        self.parsed
            .get(facet)
            .and_then(|value| T::deserialize(value).ok())
    }

    /// Shallow-merges `patch` over the top-level fields.
    pub fn merge_fields(&mut self, patch: Fields) {
        self.fields.extend(patch);
    }

    /// Merges a facet result into the parse map.
    pub fn merge_parsed(&mut self, facet: &str, value: Value) {
        let existing = self.parsed.remove(facet);
        self.parsed
            .insert(facet.to_string(), merge_value(existing, value));
    }

    /// Consumes the context and returns `(fields, parsed)`.
    #[must_use]
    pub fn into_parts(self) -> (Fields, Fields) {
        (self.fields, self.parsed)
    }

    /// Returns the context as one flat map with parse results under `parsed`.
    #[must_use]
    pub fn to_map(&self) -> Fields {
        let mut map = self.fields.clone();
        map.insert(PARSED_KEY.to_string(), Value::Object(self.parsed.clone()));
        map
    }
}

impl Serialize for ExecutionContext {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.fields.len() + 1))?;
        for (key, value) in &self.fields {
            if key != PARSED_KEY {
                map.serialize_entry(key, value)?;
            }
        }
        map.serialize_entry(PARSED_KEY, &self.parsed)?;
        map.end()
    }
}
