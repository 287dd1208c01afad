//! Parse stages.
//!
//! A [`ParseStage`] declares an ordered set of facet rules. Running a stage
//! extracts each facet from the request, hands it to the facet's handler and
//! merges the result into the context's `parsed` map under the facet's name.
//!
//! # Example
//!
//! ```
//! use http::Method;
//! use serde_json::{json, Value};
//! use stagecoach_pipeline::ParseStage;
//!
//! let stage = ParseStage::new()
//!     .method([Method::POST, Method::PUT])
//!     .path("/users")
//!     .auth(|token: String| async move { Ok(json!({ "token": token })) })
//!     .body(|body: Value| async move {
//!         let email = body["email"].as_str().ok_or_else(|| anyhow::anyhow!("email is required"))?;
//!         Ok::<_, anyhow::Error>(json!({ "email": email }))
//!     });
//!
//! assert_eq!(stage.len(), 4);
//! ```

use crate::types::{erase1_json, erase2_json, AsyncFn1, AsyncFn2};
use http::HeaderMap;
use serde::Serialize;
use serde_json::Value;
use stagecoach_core::{ExecutionContext, Fields, Request, RouteError};
use stagecoach_extract::{
    authorization, match_exact, CookieMap, Facet, FacetCache, MethodSet, QueryMap,
};
use std::fmt;
use std::future::Future;
use std::sync::Arc;

/// How one facet is extracted and handled.
#[derive(Clone)]
enum FacetRule {
    Headers(AsyncFn1<HeaderMap, Value>),
    Body(AsyncFn1<Value, Value>),
    Query(AsyncFn1<QueryMap, Value>),
    Cookies(AsyncFn1<CookieMap, Value>),
    Auth(AsyncFn1<String, Value>),
    Method(MethodSet),
    Path(String),
    Custom {
        name: String,
        handler: AsyncFn2<Arc<Request>, Fields, Value>,
    },
}

impl FacetRule {
    fn facet(&self) -> Facet {
        match self {
            Self::Headers(_) => Facet::Headers,
            Self::Body(_) => Facet::Body,
            Self::Query(_) => Facet::Query,
            Self::Cookies(_) => Facet::Cookies,
            Self::Auth(_) => Facet::Auth,
            Self::Method(_) => Facet::Method,
            Self::Path(_) => Facet::Path,
            Self::Custom { name, .. } => Facet::Custom(name.clone()),
        }
    }

    async fn apply(
        &self,
        facet: &Facet,
        request: &Arc<Request>,
        ctx: &ExecutionContext,
        cache: &mut FacetCache,
    ) -> Result<Value, RouteError> {
        let handled = match self {
            Self::Headers(handler) => handler(request.headers().clone()).await,
            Self::Body(handler) => {
                let body = cache.body(request).await?;
                handler(body).await
            }
            Self::Query(handler) => {
                let query = cache.query(request)?;
                handler(query).await
            }
            Self::Cookies(handler) => handler(cache.cookies(request)).await,
            Self::Auth(handler) => {
                let raw = authorization(request.headers())?;
                handler(raw).await
            }
            Self::Method(allowed) => return Ok(Value::String(allowed.check(request.method())?)),
            Self::Path(expected) => {
                let matched = match_exact(expected, request.path())?;
                serde_json::to_value(matched).map_err(anyhow::Error::from)
            }
            Self::Custom { handler, .. } => {
                handler(Arc::clone(request), ctx.fields().clone()).await
            }
        };

        handled.map_err(|e| {
            RouteError::classify(e, |e| {
                RouteError::parse(facet.name(), facet.failure_status(), e.to_string())
                    .with_cause(e)
            })
        })
    }
}

/// One unit of parse work: an ordered set of facet rules.
///
/// Rules run in the order they were added. Adding a rule for a facet that
/// the stage already has replaces the earlier rule in place.
#[derive(Clone, Default)]
pub struct ParseStage {
    rules: Vec<FacetRule>,
}

impl ParseStage {
    /// Creates an empty parse stage.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn with_rule(mut self, rule: FacetRule) -> Self {
        let facet = rule.facet();
        match self.rules.iter().position(|existing| existing.facet() == facet) {
            Some(index) => self.rules[index] = rule,
            None => self.rules.push(rule),
        }
        self
    }

    /// Handles the raw header collection.
    pub fn headers<F, Fut, T>(self, f: F) -> Self
    where
        F: Fn(HeaderMap) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = anyhow::Result<T>> + Send + 'static,
        T: Serialize + 'static,
    {
        self.with_rule(FacetRule::Headers(erase1_json(f)))
    }

    /// Handles the decoded body: JSON if it parses, the raw text otherwise,
    /// `{}` when empty.
    pub fn body<F, Fut, T>(self, f: F) -> Self
    where
        F: Fn(Value) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = anyhow::Result<T>> + Send + 'static,
        T: Serialize + 'static,
    {
        self.with_rule(FacetRule::Body(erase1_json(f)))
    }

    /// Handles the parsed query string.
    pub fn query<F, Fut, T>(self, f: F) -> Self
    where
        F: Fn(QueryMap) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = anyhow::Result<T>> + Send + 'static,
        T: Serialize + 'static,
    {
        self.with_rule(FacetRule::Query(erase1_json(f)))
    }

    /// Handles the request cookies.
    pub fn cookies<F, Fut, T>(self, f: F) -> Self
    where
        F: Fn(CookieMap) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = anyhow::Result<T>> + Send + 'static,
        T: Serialize + 'static,
    {
        self.with_rule(FacetRule::Cookies(erase1_json(f)))
    }

    /// Handles the raw `Authorization` header value.
    ///
    /// A request without the header fails with 401 before `f` runs.
    pub fn auth<F, Fut, T>(self, f: F) -> Self
    where
        F: Fn(String) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = anyhow::Result<T>> + Send + 'static,
        T: Serialize + 'static,
    {
        self.with_rule(FacetRule::Auth(erase1_json(f)))
    }

    /// Requires the request method to be one of `allowed` (405 otherwise).
    ///
    /// The matched method name is stored at `parsed.method`.
    #[must_use]
    pub fn method(self, allowed: impl Into<MethodSet>) -> Self {
        self.with_rule(FacetRule::Method(allowed.into()))
    }

    /// Requires the request path to equal `path` exactly (404 otherwise).
    ///
    /// `{ "matched": path, "params": {} }` is stored at `parsed.path`.
    #[must_use]
    pub fn path(self, path: impl Into<String>) -> Self {
        self.with_rule(FacetRule::Path(path.into()))
    }

    /// Adds a custom facet whose handler receives the request and the
    /// current context fields. The result is stored under `name`.
    pub fn custom<F, Fut, T>(self, name: impl Into<String>, f: F) -> Self
    where
        F: Fn(Arc<Request>, Fields) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = anyhow::Result<T>> + Send + 'static,
        T: Serialize + 'static,
    {
        self.with_rule(FacetRule::Custom {
            name: name.into(),
            handler: erase2_json(f),
        })
    }

    /// Returns the facets this stage handles, in execution order.
    #[must_use]
    pub fn facets(&self) -> Vec<Facet> {
        self.rules.iter().map(FacetRule::facet).collect()
    }

    /// Returns the number of facet rules.
    #[must_use]
    pub fn len(&self) -> usize {
        self.rules.len()
    }

    /// Returns true if the stage has no rules.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    /// Runs every rule in order, merging results into `ctx`.
    pub(crate) async fn run(
        &self,
        request: &Arc<Request>,
        ctx: &mut ExecutionContext,
        cache: &mut FacetCache,
    ) -> Result<(), RouteError> {
        for rule in &self.rules {
            let facet = rule.facet();
            let value = rule.apply(&facet, request, ctx, cache).await?;
            tracing::trace!(facet = %facet, "facet parsed");
            ctx.merge_parsed(facet.name(), value);
        }
        Ok(())
    }
}

impl fmt::Debug for ParseStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ParseStage")
            .field("facets", &self.facets())
            .finish()
    }
}
