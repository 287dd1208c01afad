//! Per-invocation facet cache.
//!
//! Several parse stages may each declare a body or query handler. The
//! [`FacetCache`] makes sure the body source is read and decoded at most once
//! and the query string parsed at most once per invocation. A cache is
//! created for every invocation and dropped with it; it never reaches the
//! terminal handler.

use crate::{cookies_from_headers, decode_body, parse_query, CookieMap, FacetError, QueryMap};
use serde_json::Value;
use stagecoach_core::Request;

/// Lazily filled facet values for one invocation.
#[derive(Debug, Default)]
pub struct FacetCache {
    body: Option<Value>,
    query: Option<QueryMap>,
    cookies: Option<CookieMap>,
}

impl FacetCache {
    /// Creates an empty cache.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the decoded body, reading the body source on first use.
    ///
    /// # Errors
    ///
    /// Returns [`FacetError::BodyRead`] if the body source fails.
    pub async fn body(&mut self, request: &Request) -> Result<Value, FacetError> {
        if let Some(body) = &self.body {
            return Ok(body.clone());
        }

        let bytes = request
            .body_source()
            .read()
            .await
            .map_err(FacetError::BodyRead)?;
        let decoded = decode_body(&bytes);
        self.body = Some(decoded.clone());
        Ok(decoded)
    }

    /// Returns the parsed query string, parsing it on first use.
    ///
    /// # Errors
    ///
    /// Returns [`FacetError::Query`] if the query string cannot be decoded.
    pub fn query(&mut self, request: &Request) -> Result<QueryMap, FacetError> {
        if let Some(query) = &self.query {
            return Ok(query.clone());
        }

        let query = parse_query(request.query().unwrap_or_default())?;
        self.query = Some(query.clone());
        Ok(query)
    }

    /// Returns the request cookies, parsing them on first use.
    pub fn cookies(&mut self, request: &Request) -> CookieMap {
        self.cookies
            .get_or_insert_with(|| cookies_from_headers(request.headers()))
            .clone()
    }

    /// Returns true once the body has been read.
    #[must_use]
    pub const fn body_loaded(&self) -> bool {
        self.body.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use bytes::Bytes;
    use serde_json::json;
    use stagecoach_core::{Body, BodySource};
    use std::io;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    struct CountingBody {
        reads: Arc<AtomicUsize>,
    }

    #[async_trait]
    impl BodySource for CountingBody {
        async fn read(&self) -> io::Result<Bytes> {
            self.reads.fetch_add(1, Ordering::SeqCst);
            Ok(Bytes::from_static(br#"{"email":"a@b.c"}"#))
        }
    }

    struct FailingBody;

    #[async_trait]
    impl BodySource for FailingBody {
        async fn read(&self) -> io::Result<Bytes> {
            Err(io::Error::new(io::ErrorKind::UnexpectedEof, "connection reset"))
        }
    }

    #[tokio::test]
    async fn test_body_read_once() {
        let reads = Arc::new(AtomicUsize::new(0));
        let request = Request::post("/users").unwrap().body(Body::from_source(CountingBody {
            reads: Arc::clone(&reads),
        }));

        let mut cache = FacetCache::new();
        assert!(!cache.body_loaded());
        let first = cache.body(&request).await.unwrap();
        let second = cache.body(&request).await.unwrap();

        assert_eq!(first, json!({"email": "a@b.c"}));
        assert_eq!(first, second);
        assert_eq!(reads.load(Ordering::SeqCst), 1);
        assert!(cache.body_loaded());
    }

    #[tokio::test]
    async fn test_body_read_failure() {
        let request = Request::post("/x").unwrap().body(Body::from_source(FailingBody));
        let err = FacetCache::new().body(&request).await.unwrap_err();
        assert!(matches!(err, FacetError::BodyRead(_)));
    }

    #[tokio::test]
    async fn test_absent_body_is_empty_object() {
        let request = Request::get("/x").unwrap();
        assert_eq!(FacetCache::new().body(&request).await.unwrap(), json!({}));
    }

    #[test]
    fn test_query_without_query_string() {
        let request = Request::get("/x").unwrap();
        assert!(FacetCache::new().query(&request).unwrap().is_empty());
    }

    #[test]
    fn test_query_cached() {
        let request = Request::get("/x?role=admin").unwrap();
        let mut cache = FacetCache::new();
        assert_eq!(cache.query(&request).unwrap()["role"], "admin");
        assert_eq!(cache.query(&request).unwrap()["role"], "admin");
    }
}
