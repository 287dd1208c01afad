//! Lifecycle hooks.
//!
//! A [`HookSet`] holds at most one callback per lifecycle point. Every hook
//! is optional. A failing hook is logged and otherwise ignored: hooks observe
//! the pipeline, they never change its outcome. The two exceptions are the
//! reply returned by `on_request`, which short-circuits the stages and the
//! handler, and the fallback reply returned by `on_error` in bound mode.
//!
//! ```
//! use stagecoach_pipeline::{HookSet, Reply};
//! use serde_json::json;
//!
//! let hooks = HookSet::new()
//!     .on_request(|req, meta| async move {
//!         tracing::info!(request_id = %meta.request_id, path = req.path(), "incoming");
//!         Ok(None)
//!     })
//!     .on_error(|err, _meta| async move {
//!         Ok(Some(Reply::Json(json!({ "fallback": err.code().as_str() }))))
//!     });
//!
//! assert!(hooks.has_error_handler());
//! ```

use crate::error::PipelineError;
use crate::types::{erase1, erase2, AsyncFn1, AsyncFn2};
use chrono::{DateTime, Utc};
use serde::{Serialize, Serializer};
use stagecoach_core::{ExecutionContext, Reply, Request};
use std::fmt;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

/// Pipeline phase in which a failure happened.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Stage {
    /// Converting the framework argument into a [`Request`].
    Mapping,
    /// A prepare stage.
    Prepare,
    /// A parse stage.
    Parse,
    /// The terminal handler.
    Handle,
}

impl Stage {
    /// Returns the lowercase stage name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Mapping => "mapping",
            Self::Prepare => "prepare",
            Self::Parse => "parse",
            Self::Handle => "handle",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Metadata passed to `on_request`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RequestMeta {
    /// When the invocation started.
    pub timestamp: DateTime<Utc>,
    /// The invocation's request id.
    pub request_id: String,
}

/// Metadata passed to `on_response`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResponseMeta {
    /// When the reply was produced.
    pub timestamp: DateTime<Utc>,
    /// The invocation's request id.
    pub request_id: String,
    /// Time since the invocation started, serialized in milliseconds.
    #[serde(serialize_with = "serialize_millis")]
    pub duration: Duration,
}

/// Metadata passed to `on_error`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ErrorMeta {
    /// When the failure was observed.
    pub timestamp: DateTime<Utc>,
    /// The invocation's request id.
    pub request_id: String,
    /// The phase that failed.
    pub stage: Stage,
}

#[allow(clippy::trivially_copy_pass_by_ref)]
fn serialize_millis<S: Serializer>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_u128(duration.as_millis())
}

type ContextHook = AsyncFn2<Arc<Request>, ExecutionContext, ()>;

/// The optional lifecycle callbacks of a route.
#[derive(Clone, Default)]
pub struct HookSet {
    on_request: Option<AsyncFn2<Arc<Request>, RequestMeta, Option<Reply>>>,
    on_prepare_start: Option<AsyncFn1<Arc<Request>, ()>>,
    on_prepare_completed: Option<ContextHook>,
    on_parse_start: Option<ContextHook>,
    on_parse_complete: Option<ContextHook>,
    on_response: Option<AsyncFn2<Reply, ResponseMeta, ()>>,
    on_error: Option<AsyncFn2<PipelineError, ErrorMeta, Option<Reply>>>,
}

impl HookSet {
    /// Creates an empty hook set.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Runs before any stage. Returning a reply skips the stages and the
    /// handler; `on_response` still runs.
    #[must_use]
    pub fn on_request<F, Fut>(mut self, f: F) -> Self
    where
        F: Fn(Arc<Request>, RequestMeta) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = anyhow::Result<Option<Reply>>> + Send + 'static,
    {
        self.on_request = Some(erase2(f));
        self
    }

    /// Runs before the first prepare stage.
    #[must_use]
    pub fn on_prepare_start<F, Fut>(mut self, f: F) -> Self
    where
        F: Fn(Arc<Request>) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = anyhow::Result<()>> + Send + 'static,
    {
        self.on_prepare_start = Some(erase1(f));
        self
    }

    /// Runs after the last prepare stage with a snapshot of the context.
    #[must_use]
    pub fn on_prepare_completed<F, Fut>(mut self, f: F) -> Self
    where
        F: Fn(Arc<Request>, ExecutionContext) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = anyhow::Result<()>> + Send + 'static,
    {
        self.on_prepare_completed = Some(erase2(f));
        self
    }

    /// Runs before the first parse stage.
    #[must_use]
    pub fn on_parse_start<F, Fut>(mut self, f: F) -> Self
    where
        F: Fn(Arc<Request>, ExecutionContext) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = anyhow::Result<()>> + Send + 'static,
    {
        self.on_parse_start = Some(erase2(f));
        self
    }

    /// Runs after the last parse stage.
    #[must_use]
    pub fn on_parse_complete<F, Fut>(mut self, f: F) -> Self
    where
        F: Fn(Arc<Request>, ExecutionContext) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = anyhow::Result<()>> + Send + 'static,
    {
        self.on_parse_complete = Some(erase2(f));
        self
    }

    /// Runs with the final reply of a bound-mode invocation.
    #[must_use]
    pub fn on_response<F, Fut>(mut self, f: F) -> Self
    where
        F: Fn(Reply, ResponseMeta) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = anyhow::Result<()>> + Send + 'static,
    {
        self.on_response = Some(erase2(f));
        self
    }

    /// Runs when any phase fails. In bound mode a returned reply replaces
    /// the error.
    #[must_use]
    pub fn on_error<F, Fut>(mut self, f: F) -> Self
    where
        F: Fn(PipelineError, ErrorMeta) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = anyhow::Result<Option<Reply>>> + Send + 'static,
    {
        self.on_error = Some(erase2(f));
        self
    }

    /// Returns true if an `on_error` hook is registered.
    #[must_use]
    pub const fn has_error_handler(&self) -> bool {
        self.on_error.is_some()
    }

    pub(crate) async fn request(&self, request: &Arc<Request>, meta: RequestMeta) -> Option<Reply> {
        let hook = self.on_request.as_ref()?;
        let request_id = meta.request_id.clone();
        observe(&request_id, "on_request", hook(Arc::clone(request), meta).await).flatten()
    }

    pub(crate) async fn prepare_start(&self, request: &Arc<Request>, request_id: &str) {
        if let Some(hook) = &self.on_prepare_start {
            observe(request_id, "on_prepare_start", hook(Arc::clone(request)).await);
        }
    }

    pub(crate) async fn prepare_completed(&self, request: &Arc<Request>, ctx: &ExecutionContext) {
        run_context_hook(self.on_prepare_completed.as_ref(), "on_prepare_completed", request, ctx)
            .await;
    }

    pub(crate) async fn parse_start(&self, request: &Arc<Request>, ctx: &ExecutionContext) {
        run_context_hook(self.on_parse_start.as_ref(), "on_parse_start", request, ctx).await;
    }

    pub(crate) async fn parse_complete(&self, request: &Arc<Request>, ctx: &ExecutionContext) {
        run_context_hook(self.on_parse_complete.as_ref(), "on_parse_complete", request, ctx).await;
    }

    pub(crate) async fn response(&self, reply: &Reply, meta: ResponseMeta) {
        if let Some(hook) = &self.on_response {
            let request_id = meta.request_id.clone();
            observe(&request_id, "on_response", hook(reply.clone(), meta).await);
        }
    }

    pub(crate) async fn error(&self, error: &PipelineError, meta: ErrorMeta) -> Option<Reply> {
        let hook = self.on_error.as_ref()?;
        let request_id = meta.request_id.clone();
        observe(&request_id, "on_error", hook(error.clone(), meta).await).flatten()
    }
}

async fn run_context_hook(
    hook: Option<&ContextHook>,
    name: &'static str,
    request: &Arc<Request>,
    ctx: &ExecutionContext,
) {
    if let Some(hook) = hook {
        let request_id = ctx.request_id().unwrap_or_default().to_string();
        observe(&request_id, name, hook(Arc::clone(request), ctx.clone()).await);
    }
}

fn observe<T>(request_id: &str, hook: &'static str, result: anyhow::Result<T>) -> Option<T> {
    match result {
        Ok(value) => Some(value),
        Err(e) => {
            stagecoach_telemetry::log_hook_failure!(request_id, hook, e);
            None
        }
    }
}

impl fmt::Debug for HookSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HookSet")
            .field("on_request", &self.on_request.is_some())
            .field("on_prepare_start", &self.on_prepare_start.is_some())
            .field("on_prepare_completed", &self.on_prepare_completed.is_some())
            .field("on_parse_start", &self.on_parse_start.is_some())
            .field("on_parse_complete", &self.on_parse_complete.is_some())
            .field("on_response", &self.on_response.is_some())
            .field("on_error", &self.on_error.is_some())
            .finish()
    }
}
