//! Error envelope rendering.
//!
//! Failures rendered by [`RouteHandler::respond`] use one envelope:
//!
//! ```json
//! {
//!   "error": {
//!     "code": "PARSE_ERROR",
//!     "message": "missing required Authorization header",
//!     "detail": "Error parsing `auth`",
//!     "request_id": "0190b6a4-..."
//!   }
//! }
//! ```
//!
//! Server error messages are replaced by a generic message unless the
//! route's options expose them.
//!
//! [`RouteHandler::respond`]: crate::RouteHandler::respond

use crate::error::PipelineError;
use crate::options::PipelineOptions;
use http::HeaderValue;
use serde::Serialize;
use stagecoach_core::{reply, Response};

#[derive(Serialize)]
struct Envelope<'a> {
    error: EnvelopeBody<'a>,
}

#[derive(Serialize)]
struct EnvelopeBody<'a> {
    code: &'static str,
    message: String,
    detail: &'a str,
    request_id: &'a str,
}

/// Renders `error` into a JSON error response with the error's status.
pub(crate) fn error_response(
    error: &PipelineError,
    request_id: &str,
    options: &PipelineOptions,
) -> Response {
    let status = error.http_status();
    let message = if status.is_server_error() && !options.expose_internal_errors {
        options.internal_error_message.clone()
    } else {
        error.message()
    };

    let envelope = Envelope {
        error: EnvelopeBody {
            code: error.code().as_str(),
            message,
            detail: error.detail(),
            request_id,
        },
    };

    let mut response = reply::json(status, &envelope);
    set_request_id(&mut response, request_id, options);
    response
}

/// Echoes the request id on a response.
pub(crate) fn set_request_id(response: &mut Response, request_id: &str, options: &PipelineOptions) {
    if let Ok(value) = HeaderValue::from_str(request_id) {
        response
            .headers_mut()
            .insert(options.request_id.header.clone(), value);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use http::StatusCode;
    use http_body_util::BodyExt;
    use serde_json::{json, Value};
    use stagecoach_core::RouteError;

    async fn body(response: Response) -> Value {
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn test_client_error_envelope() {
        let err = PipelineError::from(RouteError::parse(
            "auth",
            StatusCode::UNAUTHORIZED,
            "missing token",
        ));
        let response = error_response(&err, "r1", &PipelineOptions::default());

        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(response.headers()["x-request-id"], "r1");
        assert_eq!(
            body(response).await,
            json!({
                "error": {
                    "code": "PARSE_ERROR",
                    "message": "missing token",
                    "detail": "Error parsing `auth`",
                    "request_id": "r1"
                }
            })
        );
    }

    #[tokio::test]
    async fn test_server_error_message_hidden() {
        let err = PipelineError::from_handler(anyhow::anyhow!("connection refused: 10.0.0.3"));
        let response = error_response(&err, "r2", &PipelineOptions::default());

        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let value = body(response).await;
        assert_eq!(value["error"]["code"], "HANDLER_ERROR");
        assert_eq!(value["error"]["message"], "An internal error occurred");
    }

    #[tokio::test]
    async fn test_server_error_message_exposed() {
        let err = PipelineError::from_handler(anyhow::anyhow!("connection refused"));
        let options = PipelineOptions::new().expose_internal_errors(true);
        let value = body(error_response(&err, "r3", &options)).await;
        assert_eq!(value["error"]["message"], "connection refused");
    }
}
