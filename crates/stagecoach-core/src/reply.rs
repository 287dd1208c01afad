//! Response-shaped values and response helpers.
//!
//! A terminal handler (or an `on_request` hook) produces a [`Reply`]:
//! either a fully built HTTP response that is passed through untouched, or a
//! plain JSON value that is rendered as `200 OK` with
//! `Content-Type: application/json`.
//!
//! The free functions in this module are small response constructors for
//! handlers and hooks; they carry no pipeline state.

use bytes::Bytes;
use http::{header, HeaderValue, StatusCode};
use http_body_util::Full;
use serde::Serialize;
use serde_json::Value;

/// The HTTP response type produced by the pipeline.
pub type Response = http::Response<Full<Bytes>>;

/// A response-shaped value.
#[derive(Debug)]
pub enum Reply {
    /// A fully built response, passed through as-is.
    Http(Response),
    /// A plain value, rendered as a JSON `200 OK` response.
    Json(Value),
}

impl Reply {
    /// Serializes `data` into a [`Reply::Json`].
    ///
    /// # Errors
    ///
    /// Returns an error if `data` cannot be represented as JSON.
    pub fn json<T: Serialize>(data: &T) -> Result<Self, serde_json::Error> {
        Ok(Self::Json(serde_json::to_value(data)?))
    }

    /// Returns the status this reply will be sent with.
    #[must_use]
    pub fn status(&self) -> StatusCode {
        match self {
            Self::Http(response) => response.status(),
            Self::Json(_) => StatusCode::OK,
        }
    }

    /// Renders the reply into an HTTP response.
    #[must_use]
    pub fn into_response(self) -> Response {
        match self {
            Self::Http(response) => response,
            Self::Json(value) => json(StatusCode::OK, &value),
        }
    }
}

impl Clone for Reply {
    /// Clones the reply. Response extensions are not carried over.
    fn clone(&self) -> Self {
        match self {
            Self::Json(value) => Self::Json(value.clone()),
            Self::Http(response) => {
                let mut copy = http::Response::new(response.body().clone());
                *copy.status_mut() = response.status();
                *copy.version_mut() = response.version();
                *copy.headers_mut() = response.headers().clone();
                Self::Http(copy)
            }
        }
    }
}

impl From<Response> for Reply {
    fn from(response: Response) -> Self {
        Self::Http(response)
    }
}

impl From<Value> for Reply {
    fn from(value: Value) -> Self {
        Self::Json(value)
    }
}

impl From<()> for Reply {
    fn from((): ()) -> Self {
        Self::Json(Value::Null)
    }
}

fn build(status: StatusCode, content_type: &'static str, body: impl Into<Bytes>) -> Response {
    http::Response::builder()
        .status(status)
        .header(header::CONTENT_TYPE, HeaderValue::from_static(content_type))
        .body(Full::new(body.into()))
        .expect("static status and content type always build")
}

/// Builds a JSON response.
///
/// Serialization failures produce a `500` with a JSON error body.
#[must_use]
pub fn json<T: Serialize + ?Sized>(status: StatusCode, data: &T) -> Response {
    match serde_json::to_vec(data) {
        Ok(body) => build(status, "application/json", body),
        Err(e) => build(
            StatusCode::INTERNAL_SERVER_ERROR,
            "application/json",
            serde_json::json!({ "error": { "code": "SERIALIZATION_ERROR", "message": e.to_string() } })
                .to_string(),
        ),
    }
}

/// Builds a plain-text `200 OK` response.
#[must_use]
pub fn text(content: impl Into<String>) -> Response {
    build(StatusCode::OK, "text/plain; charset=utf-8", content.into())
}

/// Builds a `302 Found` redirect.
#[must_use]
pub fn redirect(location: &str) -> Response {
    let mut response = http::Response::builder()
        .status(StatusCode::FOUND)
        .body(Full::new(Bytes::new()))
        .expect("static status always builds");
    if let Ok(value) = HeaderValue::from_str(location) {
        response.headers_mut().insert(header::LOCATION, value);
    }
    response
}

/// Builds a JSON error response with the standard error envelope.
#[must_use]
pub fn error(status: StatusCode, code: &str, message: &str) -> Response {
    json(
        status,
        &serde_json::json!({
            "error": {
                "code": code,
                "message": message
            }
        }),
    )
}

/// Builds a `400 Bad Request` error response.
#[must_use]
pub fn bad_request(message: &str) -> Response {
    error(StatusCode::BAD_REQUEST, "BAD_REQUEST", message)
}

/// Builds a `401 Unauthorized` error response.
#[must_use]
pub fn unauthorized(message: &str) -> Response {
    error(StatusCode::UNAUTHORIZED, "UNAUTHORIZED", message)
}

/// Builds a `404 Not Found` error response.
#[must_use]
pub fn not_found(message: &str) -> Response {
    error(StatusCode::NOT_FOUND, "NOT_FOUND", message)
}

/// Builds a `500 Internal Server Error` error response.
#[must_use]
pub fn internal_error(message: &str) -> Response {
    error(StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_ERROR", message)
}

#[cfg(test)]
mod tests {
    use super::*;
    use http_body_util::BodyExt;

    async fn body_json(response: Response) -> Value {
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn test_json_reply_renders_200() {
        let reply = Reply::from(serde_json::json!({"ok": true}));
        assert_eq!(reply.status(), StatusCode::OK);

        let response = reply.into_response();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            response.headers().get(header::CONTENT_TYPE).unwrap(),
            "application/json"
        );
        assert_eq!(body_json(response).await, serde_json::json!({"ok": true}));
    }

    #[test]
    fn test_http_reply_passes_through() {
        let reply = Reply::from(text("hi"));
        assert_eq!(reply.status(), StatusCode::OK);
        let response = reply.into_response();
        assert_eq!(
            response.headers().get(header::CONTENT_TYPE).unwrap(),
            "text/plain; charset=utf-8"
        );
    }

    #[test]
    fn test_redirect_sets_location() {
        let response = redirect("/login");
        assert_eq!(response.status(), StatusCode::FOUND);
        assert_eq!(response.headers().get(header::LOCATION).unwrap(), "/login");
    }

    #[tokio::test]
    async fn test_error_helpers() {
        let response = unauthorized("token expired");
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        let body = body_json(response).await;
        assert_eq!(body["error"]["code"], "UNAUTHORIZED");
        assert_eq!(body["error"]["message"], "token expired");

        assert_eq!(bad_request("x").status(), StatusCode::BAD_REQUEST);
        assert_eq!(not_found("x").status(), StatusCode::NOT_FOUND);
        assert_eq!(internal_error("x").status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[tokio::test]
    async fn test_clone_keeps_status_headers_and_body() {
        let original = Reply::from(json(StatusCode::CREATED, &serde_json::json!({"id": 7})));
        let copy = original.clone();

        assert_eq!(copy.status(), StatusCode::CREATED);
        let response = copy.into_response();
        assert_eq!(
            response.headers().get(header::CONTENT_TYPE).unwrap(),
            "application/json"
        );
        assert_eq!(body_json(response).await, serde_json::json!({"id": 7}));
        assert_eq!(original.status(), StatusCode::CREATED);
    }
}
