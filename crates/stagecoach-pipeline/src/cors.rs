//! CORS preflight handling.
//!
//! A route may be given a [`PreflightResponder`]. It is consulted as soon as
//! the inbound argument has been mapped to a [`Request`]; if it answers, its
//! response is returned as-is and no hook, stage, or handler runs.
//! [`CorsPolicy`] is the built-in responder.
//!
//! ## Headers
//!
//! - `Access-Control-Allow-Origin`
//! - `Access-Control-Allow-Methods`
//! - `Access-Control-Allow-Headers`
//! - `Access-Control-Allow-Credentials`
//! - `Access-Control-Max-Age`
//! - `Access-Control-Expose-Headers`
//!
//! ## Example
//!
//! ```
//! use http::Method;
//! use stagecoach_pipeline::CorsPolicy;
//! use std::time::Duration;
//!
//! let cors = CorsPolicy::builder()
//!     .allow_origin("https://app.example.com")
//!     .allow_methods([Method::GET, Method::POST])
//!     .allow_headers(["Content-Type", "Authorization"])
//!     .allow_credentials(true)
//!     .max_age(Duration::from_secs(3600))
//!     .build();
//! # let _ = cors;
//! ```

use bytes::Bytes;
use http::{header, HeaderValue, Method, StatusCode};
use http_body_util::Full;
use stagecoach_config::{ConfigError, CorsConfig};
use stagecoach_core::{Request, Response};
use std::time::Duration;

/// CORS header names.
pub mod headers {
    /// `Access-Control-Allow-Origin` header.
    pub const ALLOW_ORIGIN: &str = "access-control-allow-origin";
    /// `Access-Control-Allow-Methods` header.
    pub const ALLOW_METHODS: &str = "access-control-allow-methods";
    /// `Access-Control-Allow-Headers` header.
    pub const ALLOW_HEADERS: &str = "access-control-allow-headers";
    /// `Access-Control-Allow-Credentials` header.
    pub const ALLOW_CREDENTIALS: &str = "access-control-allow-credentials";
    /// `Access-Control-Max-Age` header.
    pub const MAX_AGE: &str = "access-control-max-age";
    /// `Access-Control-Expose-Headers` header.
    pub const EXPOSE_HEADERS: &str = "access-control-expose-headers";
    /// `Access-Control-Request-Method` header (preflight).
    pub const REQUEST_METHOD: &str = "access-control-request-method";
    /// `Access-Control-Request-Headers` header (preflight).
    pub const REQUEST_HEADERS: &str = "access-control-request-headers";
}

/// Answers CORS preflight requests before the pipeline runs.
pub trait PreflightResponder: Send + Sync {
    /// Returns a response if `request` is a preflight this responder handles.
    fn preflight(&self, request: &Request) -> Option<Response>;

    /// Adds headers to a rendered response for a regular request.
    fn decorate(&self, _request: &Request, _response: &mut Response) {}
}

/// Set of allowed origins.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AllowedOrigins {
    /// Any origin (`*`).
    Any,
    /// Only the listed origins.
    List(Vec<String>),
}

impl AllowedOrigins {
    /// Checks if an origin is allowed.
    #[must_use]
    pub fn is_allowed(&self, origin: &str) -> bool {
        match self {
            Self::Any => true,
            Self::List(origins) => origins.iter().any(|o| o == origin),
        }
    }

    fn header_value(&self, origin: &str) -> Option<HeaderValue> {
        match self {
            Self::Any => Some(HeaderValue::from_static("*")),
            Self::List(_) if self.is_allowed(origin) => HeaderValue::from_str(origin).ok(),
            Self::List(_) => None,
        }
    }
}

/// A CORS policy.
#[derive(Debug, Clone)]
pub struct CorsPolicy {
    allowed_origins: AllowedOrigins,
    allowed_methods: Vec<Method>,
    allowed_headers: Vec<String>,
    expose_headers: Vec<String>,
    allow_credentials: bool,
    max_age: Option<Duration>,
}

impl Default for CorsPolicy {
    fn default() -> Self {
        Self {
            allowed_origins: AllowedOrigins::List(Vec::new()),
            allowed_methods: vec![
                Method::GET,
                Method::HEAD,
                Method::POST,
                Method::PUT,
                Method::DELETE,
                Method::PATCH,
            ],
            allowed_headers: vec![
                "content-type".to_string(),
                "authorization".to_string(),
                "x-request-id".to_string(),
            ],
            expose_headers: Vec::new(),
            allow_credentials: false,
            max_age: Some(Duration::from_secs(86400)),
        }
    }
}

/// Builder for [`CorsPolicy`].
#[derive(Debug, Clone, Default)]
pub struct CorsBuilder {
    policy: CorsPolicy,
}

impl CorsBuilder {
    /// Creates a builder with default settings and no allowed origins.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Allows any origin.
    ///
    /// Browsers reject `*` together with credentials.
    #[must_use]
    pub fn allow_any_origin(mut self) -> Self {
        self.policy.allowed_origins = AllowedOrigins::Any;
        self
    }

    /// Adds an allowed origin.
    #[must_use]
    pub fn allow_origin(mut self, origin: impl Into<String>) -> Self {
        if let AllowedOrigins::List(origins) = &mut self.policy.allowed_origins {
            let origin = origin.into();
            if !origins.contains(&origin) {
                origins.push(origin);
            }
        }
        self
    }

    /// Replaces the allowed origins.
    #[must_use]
    pub fn allow_origins<I, S>(mut self, origins: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.policy.allowed_origins =
            AllowedOrigins::List(origins.into_iter().map(Into::into).collect());
        self
    }

    /// Replaces the allowed methods.
    #[must_use]
    pub fn allow_methods<I>(mut self, methods: I) -> Self
    where
        I: IntoIterator<Item = Method>,
    {
        self.policy.allowed_methods = methods.into_iter().collect();
        self
    }

    /// Replaces the allowed request headers. `*` allows any header.
    #[must_use]
    pub fn allow_headers<I, S>(mut self, headers: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.policy.allowed_headers = headers.into_iter().map(|h| h.into().to_lowercase()).collect();
        self
    }

    /// Sets headers exposed to scripts.
    #[must_use]
    pub fn expose_headers<I, S>(mut self, headers: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.policy.expose_headers = headers.into_iter().map(|h| h.into().to_lowercase()).collect();
        self
    }

    /// Sets whether credentials are allowed.
    #[must_use]
    pub const fn allow_credentials(mut self, allow: bool) -> Self {
        self.policy.allow_credentials = allow;
        self
    }

    /// Sets how long browsers may cache the preflight.
    #[must_use]
    pub const fn max_age(mut self, duration: Duration) -> Self {
        self.policy.max_age = Some(duration);
        self
    }

    /// Disables preflight caching.
    #[must_use]
    pub const fn no_max_age(mut self) -> Self {
        self.policy.max_age = None;
        self
    }

    /// Builds the policy.
    #[must_use]
    pub fn build(self) -> CorsPolicy {
        self.policy
    }
}

impl CorsPolicy {
    /// Creates a policy builder.
    #[must_use]
    pub fn builder() -> CorsBuilder {
        CorsBuilder::new()
    }

    /// Builds a policy from the `cors` config section.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidValue`] for an unparseable method.
    pub fn from_config(config: &CorsConfig) -> Result<Self, ConfigError> {
        let methods = config
            .allowed_methods
            .iter()
            .map(|m| {
                Method::from_bytes(m.as_bytes())
                    .map_err(|e| ConfigError::invalid_value("cors.allowed_methods", e.to_string()))
            })
            .collect::<Result<Vec<_>, _>>()?;

        let mut builder = CorsBuilder::new()
            .allow_methods(methods)
            .allow_headers(config.allowed_headers.iter().cloned())
            .expose_headers(config.expose_headers.iter().cloned())
            .allow_credentials(config.allow_credentials);

        builder = if config.allows_any_origin() {
            builder.allow_any_origin()
        } else {
            builder.allow_origins(config.allowed_origins.iter().cloned())
        };

        builder = match config.max_age_secs {
            Some(secs) => builder.max_age(Duration::from_secs(secs)),
            None => builder.no_max_age(),
        };

        Ok(builder.build())
    }

    fn is_preflight(request: &Request) -> bool {
        request.method() == Method::OPTIONS
            && request.headers().contains_key(header::ORIGIN)
            && request.headers().contains_key(headers::REQUEST_METHOD)
    }

    fn check_preflight(&self, request: &Request, origin: &str) -> Result<(), String> {
        if !self.allowed_origins.is_allowed(origin) {
            return Err("Origin not allowed".to_string());
        }

        if let Some(method) = request
            .header_str(headers::REQUEST_METHOD)
            .and_then(|m| m.parse::<Method>().ok())
        {
            if !self.allowed_methods.contains(&method) {
                return Err("Method not allowed".to_string());
            }
        }

        if self.allowed_headers.iter().any(|h| h == "*") {
            return Ok(());
        }
        if let Some(requested) = request.header_str(headers::REQUEST_HEADERS) {
            for name in requested.split(',').map(|h| h.trim().to_lowercase()) {
                if !name.is_empty() && !self.allowed_headers.contains(&name) {
                    return Err(format!("Header '{name}' not allowed"));
                }
            }
        }
        Ok(())
    }

    fn preflight_response(&self, origin: &str) -> Response {
        let mut builder = http::Response::builder().status(StatusCode::NO_CONTENT);

        if let Some(value) = self.allowed_origins.header_value(origin) {
            builder = builder.header(headers::ALLOW_ORIGIN, value);
        }

        let methods: Vec<_> = self.allowed_methods.iter().map(Method::as_str).collect();
        if !methods.is_empty() {
            builder = builder.header(headers::ALLOW_METHODS, methods.join(", "));
        }

        if !self.allowed_headers.is_empty() {
            builder = builder.header(headers::ALLOW_HEADERS, self.allowed_headers.join(", "));
        }

        if self.allow_credentials {
            builder = builder.header(headers::ALLOW_CREDENTIALS, "true");
        }

        if let Some(max_age) = self.max_age {
            builder = builder.header(headers::MAX_AGE, max_age.as_secs().to_string());
        }

        builder
            .header(
                header::VARY,
                "Origin, Access-Control-Request-Method, Access-Control-Request-Headers",
            )
            .body(Full::new(Bytes::new()))
            .expect("valid response")
    }

    fn forbidden_response(message: String) -> Response {
        http::Response::builder()
            .status(StatusCode::FORBIDDEN)
            .header(header::CONTENT_TYPE, "text/plain")
            .body(Full::new(Bytes::from(message)))
            .expect("valid response")
    }
}

impl PreflightResponder for CorsPolicy {
    fn preflight(&self, request: &Request) -> Option<Response> {
        if !Self::is_preflight(request) {
            return None;
        }

        let Some(origin) = request.header_str(header::ORIGIN) else {
            return Some(Self::forbidden_response("Missing Origin header".to_string()));
        };

        Some(match self.check_preflight(request, origin) {
            Ok(()) => self.preflight_response(origin),
            Err(message) => {
                tracing::debug!(origin, reason = %message, "CORS preflight rejected");
                Self::forbidden_response(message)
            }
        })
    }

    fn decorate(&self, request: &Request, response: &mut Response) {
        let Some(origin) = request.header_str(header::ORIGIN) else {
            return;
        };
        let Some(value) = self.allowed_origins.header_value(origin) else {
            return;
        };

        let headers = response.headers_mut();
        headers.insert(headers::ALLOW_ORIGIN, value);

        if self.allow_credentials {
            headers.insert(headers::ALLOW_CREDENTIALS, HeaderValue::from_static("true"));
        }

        if !self.expose_headers.is_empty() {
            if let Ok(value) = HeaderValue::from_str(&self.expose_headers.join(", ")) {
                headers.insert(headers::EXPOSE_HEADERS, value);
            }
        }

        headers.append(header::VARY, HeaderValue::from_static("Origin"));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use http::HeaderName;

    fn preflight(origin: &str, method: &str, request_headers: Option<&str>) -> Request {
        let mut request = Request::new(Method::OPTIONS, "/test".parse().unwrap())
            .header(header::ORIGIN, HeaderValue::from_str(origin).unwrap())
            .header(
                HeaderName::from_static(headers::REQUEST_METHOD),
                HeaderValue::from_str(method).unwrap(),
            );
        if let Some(h) = request_headers {
            request = request.header(
                HeaderName::from_static(headers::REQUEST_HEADERS),
                HeaderValue::from_str(h).unwrap(),
            );
        }
        request
    }

    fn policy() -> CorsPolicy {
        CorsPolicy::builder()
            .allow_origin("https://app.example.com")
            .allow_methods([Method::GET, Method::POST])
            .allow_headers(["Content-Type", "Authorization"])
            .max_age(Duration::from_secs(600))
            .build()
    }

    #[test]
    fn test_allowed_preflight() {
        let response = policy()
            .preflight(&preflight("https://app.example.com", "POST", Some("content-type")))
            .unwrap();

        assert_eq!(response.status(), StatusCode::NO_CONTENT);
        let headers = response.headers();
        assert_eq!(headers[headers::ALLOW_ORIGIN], "https://app.example.com");
        assert_eq!(headers[headers::ALLOW_METHODS], "GET, POST");
        assert_eq!(headers[headers::ALLOW_HEADERS], "content-type, authorization");
        assert_eq!(headers[headers::MAX_AGE], "600");
        assert!(!headers.contains_key(headers::ALLOW_CREDENTIALS));
    }

    #[test]
    fn test_disallowed_origin() {
        let response = policy()
            .preflight(&preflight("https://evil.example.com", "GET", None))
            .unwrap();
        assert_eq!(response.status(), StatusCode::FORBIDDEN);
    }

    #[test]
    fn test_disallowed_method_and_header() {
        let response = policy()
            .preflight(&preflight("https://app.example.com", "DELETE", None))
            .unwrap();
        assert_eq!(response.status(), StatusCode::FORBIDDEN);

        let response = policy()
            .preflight(&preflight("https://app.example.com", "GET", Some("x-secret")))
            .unwrap();
        assert_eq!(response.status(), StatusCode::FORBIDDEN);
    }

    #[test]
    fn test_non_preflight_is_ignored() {
        let request = Request::default()
            .header(header::ORIGIN, HeaderValue::from_static("https://app.example.com"));
        assert!(policy().preflight(&request).is_none());

        let bare_options = Request::new(Method::OPTIONS, "/".parse().unwrap());
        assert!(policy().preflight(&bare_options).is_none());
    }

    #[test]
    fn test_decorate_regular_response() {
        let policy = CorsPolicy::builder()
            .allow_any_origin()
            .expose_headers(["X-Request-ID"])
            .build();
        let request = Request::default()
            .header(header::ORIGIN, HeaderValue::from_static("https://any.example.com"));
        let mut response = stagecoach_core::reply::text("ok");

        policy.decorate(&request, &mut response);
        assert_eq!(response.headers()[headers::ALLOW_ORIGIN], "*");
        assert_eq!(response.headers()[headers::EXPOSE_HEADERS], "x-request-id");
    }

    #[test]
    fn test_from_config() {
        let config = CorsConfig {
            enabled: true,
            allowed_origins: vec!["*".into()],
            max_age_secs: None,
            ..Default::default()
        };
        let policy = CorsPolicy::from_config(&config).unwrap();
        assert_eq!(policy.allowed_origins, AllowedOrigins::Any);
        assert_eq!(policy.max_age, None);

        let response = policy
            .preflight(&preflight("https://x.example.com", "PATCH", None))
            .unwrap();
        assert_eq!(response.status(), StatusCode::NO_CONTENT);
        assert_eq!(response.headers()[headers::ALLOW_ORIGIN], "*");
    }

    #[test]
    fn test_from_config_bad_method() {
        let config = CorsConfig {
            allowed_methods: vec!["GE T".into()],
            ..Default::default()
        };
        assert!(CorsPolicy::from_config(&config).is_err());
    }
}
