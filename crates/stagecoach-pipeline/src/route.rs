//! Route definitions.
//!
//! A [`RouteDefinition`] is an immutable description of a route: its prepare
//! and parse stages, lifecycle hooks, request extractor and options. Every
//! builder method returns a new definition and leaves the receiver
//! untouched, so a partially built definition can be shared and branched:
//!
//! ```
//! use stagecoach_pipeline::{ParseStage, RouteDefinition};
//! use serde_json::json;
//!
//! let base = RouteDefinition::create()
//!     .prepare(|_req, _fields| async { Ok(json!({ "tenant": "acme" })) });
//!
//! let admin = base.prepare(|_req, _fields| async { Ok(json!({ "role": "admin" })) });
//! let public = base.parse(ParseStage::new().path("/public"));
//!
//! assert_eq!(base.prepare_count(), 1);
//! assert_eq!(admin.prepare_count(), 2);
//! assert_eq!(public.parse_count(), 1);
//! ```

use crate::cors::PreflightResponder;
use crate::error::PipelineError;
use crate::handler::{HandlerFn, RouteHandler};
use crate::hooks::{ErrorMeta, HookSet, RequestMeta, ResponseMeta, Stage};
use crate::options::PipelineOptions;
use crate::parse::ParseStage;
use crate::prepare::PrepareStage;
use crate::types::BoxFuture;
use http::StatusCode;
use serde::Serialize;
use stagecoach_core::{generate_request_id, ExecutionContext, Fields, Reply, Request, RouteError};
use stagecoach_extract::FacetCache;
use std::fmt;
use std::future::Future;
use std::sync::Arc;

pub(crate) type Extractor<A> = Arc<dyn Fn(A) -> anyhow::Result<Request> + Send + Sync>;
pub(crate) type RequestIdGenerator = Arc<dyn Fn() -> String + Send + Sync>;

/// An immutable route definition.
///
/// `A` is the argument type the sealed route accepts in bound mode; it is
/// [`Request`] until a [`request_extractor`](Self::request_extractor) is
/// set.
pub struct RouteDefinition<A = Request> {
    prepare: Arc<[PrepareStage]>,
    parse: Arc<[ParseStage]>,
    pub(crate) hooks: HookSet,
    pub(crate) extractor: Extractor<A>,
    pub(crate) request_id: RequestIdGenerator,
    pub(crate) cors: Option<Arc<dyn PreflightResponder>>,
    pub(crate) options: PipelineOptions,
}

impl<A> Clone for RouteDefinition<A> {
    fn clone(&self) -> Self {
        Self {
            prepare: Arc::clone(&self.prepare),
            parse: Arc::clone(&self.parse),
            hooks: self.hooks.clone(),
            extractor: Arc::clone(&self.extractor),
            request_id: Arc::clone(&self.request_id),
            cors: self.cors.clone(),
            options: self.options.clone(),
        }
    }
}

impl RouteDefinition<Request> {
    /// Creates an empty definition: no stages, no hooks, requests passed
    /// through unchanged and UUID v7 request ids.
    #[must_use]
    pub fn create() -> Self {
        Self {
            prepare: Arc::from([]),
            parse: Arc::from([]),
            hooks: HookSet::default(),
            extractor: Arc::new(|request: Request| -> anyhow::Result<Request> { Ok(request) }),
            request_id: Arc::new(generate_request_id),
            cors: None,
            options: PipelineOptions::default(),
        }
    }
}

impl Default for RouteDefinition<Request> {
    fn default() -> Self {
        Self::create()
    }
}

impl<A: 'static> RouteDefinition<A> {
    fn with_hooks(&self, update: impl FnOnce(HookSet) -> HookSet) -> Self {
        let mut next = self.clone();
        next.hooks = update(next.hooks);
        next
    }

    /// Appends a prepare stage.
    ///
    /// The closure receives the request and the current top-level fields.
    /// An object result is shallow-merged into the fields; `()` or `None`
    /// contributes nothing.
    #[must_use]
    pub fn prepare<F, Fut, T>(&self, f: F) -> Self
    where
        F: Fn(Arc<Request>, Fields) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = anyhow::Result<T>> + Send + 'static,
        T: Serialize + 'static,
    {
        self.prepare_stage(PrepareStage::new(f))
    }

    /// Appends an already built prepare stage.
    #[must_use]
    pub fn prepare_stage(&self, stage: PrepareStage) -> Self {
        let mut stages = self.prepare.to_vec();
        stages.push(stage);
        Self {
            prepare: stages.into(),
            ..self.clone()
        }
    }

    /// Appends a parse stage.
    #[must_use]
    pub fn parse(&self, stage: ParseStage) -> Self {
        let mut stages = self.parse.to_vec();
        stages.push(stage);
        Self {
            parse: stages.into(),
            ..self.clone()
        }
    }

    /// Sets the `on_request` hook.
    #[must_use]
    pub fn on_request<F, Fut>(&self, f: F) -> Self
    where
        F: Fn(Arc<Request>, RequestMeta) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = anyhow::Result<Option<Reply>>> + Send + 'static,
    {
        self.with_hooks(|hooks| hooks.on_request(f))
    }

    /// Sets the `on_prepare_start` hook.
    #[must_use]
    pub fn on_prepare_start<F, Fut>(&self, f: F) -> Self
    where
        F: Fn(Arc<Request>) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = anyhow::Result<()>> + Send + 'static,
    {
        self.with_hooks(|hooks| hooks.on_prepare_start(f))
    }

    /// Sets the `on_prepare_completed` hook.
    #[must_use]
    pub fn on_prepare_completed<F, Fut>(&self, f: F) -> Self
    where
        F: Fn(Arc<Request>, ExecutionContext) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = anyhow::Result<()>> + Send + 'static,
    {
        self.with_hooks(|hooks| hooks.on_prepare_completed(f))
    }

    /// Sets the `on_parse_start` hook.
    #[must_use]
    pub fn on_parse_start<F, Fut>(&self, f: F) -> Self
    where
        F: Fn(Arc<Request>, ExecutionContext) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = anyhow::Result<()>> + Send + 'static,
    {
        self.with_hooks(|hooks| hooks.on_parse_start(f))
    }

    /// Sets the `on_parse_complete` hook.
    #[must_use]
    pub fn on_parse_complete<F, Fut>(&self, f: F) -> Self
    where
        F: Fn(Arc<Request>, ExecutionContext) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = anyhow::Result<()>> + Send + 'static,
    {
        self.with_hooks(|hooks| hooks.on_parse_complete(f))
    }

    /// Sets the `on_response` hook.
    #[must_use]
    pub fn on_response<F, Fut>(&self, f: F) -> Self
    where
        F: Fn(Reply, ResponseMeta) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = anyhow::Result<()>> + Send + 'static,
    {
        self.with_hooks(|hooks| hooks.on_response(f))
    }

    /// Sets the `on_error` hook.
    #[must_use]
    pub fn on_error<F, Fut>(&self, f: F) -> Self
    where
        F: Fn(PipelineError, ErrorMeta) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = anyhow::Result<Option<Reply>>> + Send + 'static,
    {
        self.with_hooks(|hooks| hooks.on_error(f))
    }

    /// Replaces all hooks at once.
    #[must_use]
    pub fn hooks(&self, hooks: HookSet) -> Self {
        self.with_hooks(|_| hooks)
    }

    /// Changes the argument type the route accepts in bound mode.
    ///
    /// The extractor converts each argument into a [`Request`]. A failure
    /// becomes `REQUEST_MAPPING_ERROR` unless it already is a `RouteError`.
    #[must_use]
    pub fn request_extractor<B, F>(&self, f: F) -> RouteDefinition<B>
    where
        F: Fn(B) -> anyhow::Result<Request> + Send + Sync + 'static,
    {
        RouteDefinition {
            prepare: Arc::clone(&self.prepare),
            parse: Arc::clone(&self.parse),
            hooks: self.hooks.clone(),
            extractor: Arc::new(f),
            request_id: Arc::clone(&self.request_id),
            cors: self.cors.clone(),
            options: self.options.clone(),
        }
    }

    /// Replaces the request-id generator.
    #[must_use]
    pub fn request_id_generator<F>(&self, f: F) -> Self
    where
        F: Fn() -> String + Send + Sync + 'static,
    {
        Self {
            request_id: Arc::new(f),
            ..self.clone()
        }
    }

    /// Sets the responder consulted for CORS preflights.
    #[must_use]
    pub fn cors(&self, responder: impl PreflightResponder + 'static) -> Self {
        Self {
            cors: Some(Arc::new(responder)),
            ..self.clone()
        }
    }

    /// Replaces the pipeline options.
    #[must_use]
    pub fn options(&self, options: PipelineOptions) -> Self {
        Self {
            options,
            ..self.clone()
        }
    }

    /// Seals the definition with its terminal handler.
    ///
    /// The handler receives the request and the completed context and
    /// returns anything convertible into a [`Reply`].
    pub fn handle<F, Fut, R>(&self, f: F) -> RouteHandler<A>
    where
        F: Fn(Arc<Request>, ExecutionContext) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = anyhow::Result<R>> + Send + 'static,
        R: Into<Reply> + 'static,
    {
        let handler: HandlerFn = Arc::new(
            move |request: Arc<Request>, ctx: ExecutionContext| -> BoxFuture<'static, anyhow::Result<Reply>> {
                let fut = f(request, ctx);
                Box::pin(async move { fut.await.map(Into::into) })
            },
        );
        RouteHandler::new(self.clone(), handler)
    }

    /// Returns the number of prepare stages.
    #[must_use]
    pub fn prepare_count(&self) -> usize {
        self.prepare.len()
    }

    /// Returns the number of parse stages.
    #[must_use]
    pub fn parse_count(&self) -> usize {
        self.parse.len()
    }

    /// Returns the pipeline options.
    #[must_use]
    pub const fn pipeline_options(&self) -> &PipelineOptions {
        &self.options
    }

    /// Runs the prepare and parse phases with their hooks.
    ///
    /// The first failing stage aborts everything after it.
    pub(crate) async fn run_stages(
        &self,
        request: &Arc<Request>,
        ctx: &mut ExecutionContext,
        prepare_status: StatusCode,
    ) -> Result<(), (Stage, RouteError)> {
        let request_id = ctx.request_id().unwrap_or_default().to_string();

        self.hooks.prepare_start(request, &request_id).await;
        for stage in self.prepare.iter() {
            stage
                .run(request, ctx, prepare_status)
                .await
                .map_err(|e| (Stage::Prepare, e))?;
        }
        self.hooks.prepare_completed(request, ctx).await;

        self.hooks.parse_start(request, ctx).await;
        let mut cache = FacetCache::new();
        for stage in self.parse.iter() {
            stage
                .run(request, ctx, &mut cache)
                .await
                .map_err(|e| (Stage::Parse, e))?;
        }
        self.hooks.parse_complete(request, ctx).await;

        Ok(())
    }
}

impl<A> fmt::Debug for RouteDefinition<A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RouteDefinition")
            .field("prepare", &self.prepare)
            .field("parse", &self.parse)
            .field("hooks", &self.hooks)
            .field("cors", &self.cors.is_some())
            .field("options", &self.options)
            .finish_non_exhaustive()
    }
}
