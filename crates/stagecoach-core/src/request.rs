//! Inbound request value.
//!
//! A [`Request`] is the transport-independent view of one received request:
//! method, URI, headers and a [`Body`] that can be read asynchronously. How
//! a framework's call signature becomes a `Request` is decided by the route's
//! request extractor; [`Request::from_http`] covers the common
//! `http::Request<Full<Bytes>>` case.
//!
//! Bodies are modelled as a [`BodySource`] so that stream-like sources, which
//! can only be consumed once, are represented faithfully. The pipeline reads
//! a request body at most once per invocation.

use async_trait::async_trait;
use bytes::Bytes;
use http::header::AsHeaderName;
use http::{HeaderMap, HeaderName, HeaderValue, Method, Uri};
use http_body_util::{BodyExt, Full};
use std::fmt;
use std::io;
use std::sync::{Arc, Mutex};

/// An asynchronously readable request body.
#[async_trait]
pub trait BodySource: Send + Sync {
    /// Reads the complete body.
    async fn read(&self) -> io::Result<Bytes>;
}

/// An in-memory body that can be read any number of times.
#[derive(Debug, Clone, Default)]
pub struct MemoryBody(Bytes);

impl MemoryBody {
    /// Creates a body from bytes.
    pub fn new(bytes: impl Into<Bytes>) -> Self {
        Self(bytes.into())
    }
}

#[async_trait]
impl BodySource for MemoryBody {
    async fn read(&self) -> io::Result<Bytes> {
        Ok(self.0.clone())
    }
}

/// A body backed by an `http_body` value; it can be read exactly once.
pub struct HttpBody {
    inner: Mutex<Option<Full<Bytes>>>,
}

impl HttpBody {
    /// Wraps an `http_body_util::Full` body.
    #[must_use]
    pub fn new(body: Full<Bytes>) -> Self {
        Self {
            inner: Mutex::new(Some(body)),
        }
    }
}

#[async_trait]
impl BodySource for HttpBody {
    async fn read(&self) -> io::Result<Bytes> {
        let body = self
            .inner
            .lock()
            .map_err(|_| io::Error::new(io::ErrorKind::Other, "body lock poisoned"))?
            .take()
            .ok_or_else(|| io::Error::new(io::ErrorKind::Other, "body already consumed"))?;

        let collected = body
            .collect()
            .await
            .map_err(|e| io::Error::new(io::ErrorKind::Other, e))?;
        Ok(collected.to_bytes())
    }
}

/// The body of a [`Request`].
///
/// Cloning a `Body` shares the underlying source.
#[derive(Clone, Default)]
pub struct Body {
    source: Option<Arc<dyn BodySource>>,
}

impl Body {
    /// Creates an empty body.
    #[must_use]
    pub fn empty() -> Self {
        Self::default()
    }

    /// Creates a body from an arbitrary source.
    pub fn from_source(source: impl BodySource + 'static) -> Self {
        Self {
            source: Some(Arc::new(source)),
        }
    }

    /// Returns true if the request was built without a body.
    #[must_use]
    pub fn is_absent(&self) -> bool {
        self.source.is_none()
    }

    /// Reads the complete body. An absent body reads as empty bytes.
    pub async fn read(&self) -> io::Result<Bytes> {
        match &self.source {
            Some(source) => source.read().await,
            None => Ok(Bytes::new()),
        }
    }
}

impl fmt::Debug for Body {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Body")
            .field("present", &self.source.is_some())
            .finish()
    }
}

impl From<Bytes> for Body {
    fn from(bytes: Bytes) -> Self {
        Self::from_source(MemoryBody(bytes))
    }
}

impl From<&'static str> for Body {
    fn from(text: &'static str) -> Self {
        Self::from(Bytes::from_static(text.as_bytes()))
    }
}

impl From<String> for Body {
    fn from(text: String) -> Self {
        Self::from(Bytes::from(text))
    }
}

impl From<Vec<u8>> for Body {
    fn from(bytes: Vec<u8>) -> Self {
        Self::from(Bytes::from(bytes))
    }
}

/// One received request.
///
/// # Example
///
/// ```
/// use http::{header, HeaderValue, Method};
/// use stagecoach_core::Request;
///
/// let request = Request::new(Method::POST, "/users?active=true".parse().unwrap())
///     .header(header::CONTENT_TYPE, HeaderValue::from_static("application/json"))
///     .body(r#"{"name":"Alice"}"#);
///
/// assert_eq!(request.path(), "/users");
/// assert_eq!(request.query(), Some("active=true"));
/// assert_eq!(request.header_str(header::CONTENT_TYPE), Some("application/json"));
/// ```
#[derive(Debug, Clone)]
pub struct Request {
    method: Method,
    uri: Uri,
    headers: HeaderMap,
    body: Body,
}

impl Request {
    /// Creates a request with no headers and no body.
    #[must_use]
    pub fn new(method: Method, uri: Uri) -> Self {
        Self {
            method,
            uri,
            headers: HeaderMap::new(),
            body: Body::empty(),
        }
    }

    /// Creates a `GET` request for `uri`.
    ///
    /// # Errors
    ///
    /// Returns an error if `uri` is not a valid URI.
    pub fn get(uri: &str) -> Result<Self, http::uri::InvalidUri> {
        Ok(Self::new(Method::GET, uri.parse()?))
    }

    /// Creates a `POST` request for `uri`.
    ///
    /// # Errors
    ///
    /// Returns an error if `uri` is not a valid URI.
    pub fn post(uri: &str) -> Result<Self, http::uri::InvalidUri> {
        Ok(Self::new(Method::POST, uri.parse()?))
    }

    /// Converts an `http::Request` whose body is read lazily, once.
    #[must_use]
    pub fn from_http(request: http::Request<Full<Bytes>>) -> Self {
        let (parts, body) = request.into_parts();
        Self {
            method: parts.method,
            uri: parts.uri,
            headers: parts.headers,
            body: Body::from_source(HttpBody::new(body)),
        }
    }

    /// Adds a header, replacing any previous value.
    #[must_use]
    pub fn header(mut self, name: HeaderName, value: HeaderValue) -> Self {
        self.headers.insert(name, value);
        self
    }

    /// Replaces all headers.
    #[must_use]
    pub fn headers_from(mut self, headers: HeaderMap) -> Self {
        self.headers = headers;
        self
    }

    /// Sets the body.
    #[must_use]
    pub fn body(mut self, body: impl Into<Body>) -> Self {
        self.body = body.into();
        self
    }

    /// Returns the HTTP method.
    #[must_use]
    pub fn method(&self) -> &Method {
        &self.method
    }

    /// Returns the request URI.
    #[must_use]
    pub fn uri(&self) -> &Uri {
        &self.uri
    }

    /// Returns the path portion of the URI.
    #[must_use]
    pub fn path(&self) -> &str {
        self.uri.path()
    }

    /// Returns the raw query string, if present.
    #[must_use]
    pub fn query(&self) -> Option<&str> {
        self.uri.query()
    }

    /// Returns the request headers.
    #[must_use]
    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    /// Returns a header value as a string, if present and valid UTF-8.
    #[must_use]
    pub fn header_str<K: AsHeaderName>(&self, name: K) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }

    /// Returns the request body handle.
    #[must_use]
    pub fn body_source(&self) -> &Body {
        &self.body
    }
}

impl Default for Request {
    /// A synthetic `GET /` request with no headers and an empty body.
    fn default() -> Self {
        Self::new(Method::GET, Uri::from_static("/"))
    }
}

impl From<http::Request<Full<Bytes>>> for Request {
    fn from(request: http::Request<Full<Bytes>>) -> Self {
        Self::from_http(request)
    }
}
