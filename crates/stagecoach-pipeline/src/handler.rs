//! Sealed routes and their invocation modes.
//!
//! [`RouteHandler`] is produced by [`RouteDefinition::handle`]. It can be
//! invoked two ways:
//!
//! - **Bound mode** ([`call`](RouteHandler::call),
//!   [`respond`](RouteHandler::respond)): the route is mounted on a server.
//!   The inbound argument is mapped to a [`Request`], every hook fires, and a
//!   failing handler's own error is handed back untouched.
//! - **Direct mode** ([`invoke`](RouteHandler::invoke)): the route is called
//!   from code or tests. Only the prepare, parse and error hooks fire, and
//!   every failure is a [`RouteError`].
//!
//! ```text
//! map request → preflight → on_request → on_prepare_start → prepare
//!   → on_prepare_completed → on_parse_start → parse → on_parse_complete
//!   → handler → on_response
//! ```

use crate::error::PipelineError;
use crate::hooks::{ErrorMeta, RequestMeta, ResponseMeta, Stage};
use crate::render;
use crate::route::RouteDefinition;
use crate::types::BoxFuture;
use chrono::Utc;
use http::StatusCode;
use stagecoach_core::{ExecutionContext, Fields, Reply, Request, Response, RouteError};
use stagecoach_telemetry::{log_request_complete, log_request_error, log_request_start};
use std::fmt;
use std::sync::Arc;
use std::time::Instant;

pub(crate) type HandlerFn =
    Arc<dyn Fn(Arc<Request>, ExecutionContext) -> BoxFuture<'static, anyhow::Result<Reply>> + Send + Sync>;

struct Inner<A> {
    route: RouteDefinition<A>,
    handler: HandlerFn,
}

/// A sealed route: a [`RouteDefinition`] plus its terminal handler.
///
/// Cloning is cheap and clones share the definition. A handler may be
/// invoked concurrently from any number of tasks.
pub struct RouteHandler<A = Request> {
    inner: Arc<Inner<A>>,
}

impl<A> Clone for RouteHandler<A> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<A> fmt::Debug for RouteHandler<A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RouteHandler")
            .field("route", &self.inner.route)
            .finish_non_exhaustive()
    }
}

/// Input of a direct-mode invocation.
///
/// Without a request a synthetic `GET /` with no headers and an empty body
/// is used. A context that carries the reserved `parsed` key is treated as
/// complete: stages and their hooks are skipped and the handler receives it
/// verbatim; a handler failure still reaches `on_error`. Any other context
/// seeds the fields before the prepare stages.
#[derive(Debug, Clone, Default)]
pub struct DirectCall {
    request: Option<Request>,
    context: Option<Fields>,
}

impl DirectCall {
    /// Creates an empty call.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the request.
    #[must_use]
    pub fn request(mut self, request: Request) -> Self {
        self.request = Some(request);
        self
    }

    /// Sets the context override.
    #[must_use]
    pub fn context(mut self, context: Fields) -> Self {
        self.context = Some(context);
        self
    }

    /// Sets a complete context, skipping all stages.
    #[must_use]
    pub fn with_context(self, context: &ExecutionContext) -> Self {
        self.context(context.to_map())
    }
}

/// How a bound-mode run ended.
enum Outcome {
    Preflight(Response),
    Completed {
        request: Option<Arc<Request>>,
        request_id: String,
        result: Result<Reply, PipelineError>,
    },
}

impl<A: 'static> RouteHandler<A> {
    pub(crate) fn new(route: RouteDefinition<A>, handler: HandlerFn) -> Self {
        Self {
            inner: Arc::new(Inner { route, handler }),
        }
    }

    /// Returns the route definition.
    #[must_use]
    pub fn definition(&self) -> &RouteDefinition<A> {
        &self.inner.route
    }

    /// Runs the route in bound mode.
    ///
    /// # Errors
    ///
    /// Returns the failure unless `on_error` supplied a fallback reply.
    /// Request mapping, prepare and parse failures are
    /// [`PipelineError::Route`]; a failing handler's error is returned as
    /// [`PipelineError::Handler`] unless it already is a `RouteError`.
    pub async fn call(&self, args: A) -> Result<Reply, PipelineError> {
        match self.run_bound(args).await {
            Outcome::Preflight(response) => Ok(Reply::Http(response)),
            Outcome::Completed { result, .. } => result,
        }
    }

    /// Runs the route in bound mode and renders the result.
    ///
    /// Successful replies get the request-id header and CORS headers;
    /// failures are rendered as a JSON error envelope with the error's
    /// status.
    pub async fn respond(&self, args: A) -> Response {
        let (request, request_id, result) = match self.run_bound(args).await {
            Outcome::Preflight(response) => return response,
            Outcome::Completed {
                request,
                request_id,
                result,
            } => (request, request_id, result),
        };

        let options = &self.inner.route.options;
        let mut response = match result {
            Ok(reply) => {
                let mut response = reply.into_response();
                render::set_request_id(&mut response, &request_id, options);
                response
            }
            Err(error) => render::error_response(&error, &request_id, options),
        };

        if let (Some(cors), Some(request)) = (&self.inner.route.cors, &request) {
            cors.decorate(request, &mut response);
        }
        response
    }

    async fn run_bound(&self, args: A) -> Outcome {
        let started = Instant::now();
        let route = &self.inner.route;

        let request = match (route.extractor)(args) {
            Ok(request) => Arc::new(request),
            Err(e) => {
                let request_id = (route.request_id)();
                let error = RouteError::classify(e, RouteError::request_mapping);
                let result = self
                    .fail(error.into(), Stage::Mapping, &request_id, started)
                    .await;
                return Outcome::Completed {
                    request: None,
                    request_id,
                    result,
                };
            }
        };

        if let Some(response) = route.cors.as_ref().and_then(|cors| cors.preflight(&request)) {
            tracing::debug!(
                http.path = %request.path(),
                http.status_code = response.status().as_u16(),
                "CORS preflight answered"
            );
            return Outcome::Preflight(response);
        }

        let request_id = route
            .options
            .request_id
            .incoming(request.headers())
            .map_or_else(|| (route.request_id)(), str::to_string);
        log_request_start!(request_id, request.method(), request.path());

        let result = match self.execute(&request, &request_id).await {
            Ok(reply) => Ok(self.succeed(reply, &request_id, started).await),
            Err((stage, error)) => self.fail(error, stage, &request_id, started).await,
        };

        Outcome::Completed {
            request: Some(request),
            request_id,
            result,
        }
    }

    async fn execute(
        &self,
        request: &Arc<Request>,
        request_id: &str,
    ) -> Result<Reply, (Stage, PipelineError)> {
        let route = &self.inner.route;

        let meta = RequestMeta {
            timestamp: Utc::now(),
            request_id: request_id.to_string(),
        };
        if let Some(reply) = route.hooks.request(request, meta).await {
            tracing::debug!(request_id, "on_request short-circuited the pipeline");
            return Ok(reply);
        }

        let mut ctx = ExecutionContext::new(request_id);
        route
            .run_stages(request, &mut ctx, StatusCode::BAD_REQUEST)
            .await
            .map_err(|(stage, e)| (stage, PipelineError::Route(e)))?;

        (self.inner.handler)(Arc::clone(request), ctx)
            .await
            .map_err(|e| (Stage::Handle, PipelineError::from_handler(e)))
    }

    async fn succeed(&self, reply: Reply, request_id: &str, started: Instant) -> Reply {
        let duration = started.elapsed();
        let meta = ResponseMeta {
            timestamp: Utc::now(),
            request_id: request_id.to_string(),
            duration,
        };
        self.inner.route.hooks.response(&reply, meta).await;

        let duration_ms = u64::try_from(duration.as_millis()).unwrap_or(u64::MAX);
        log_request_complete!(request_id, reply.status().as_u16(), duration_ms);
        reply
    }

    async fn fail(
        &self,
        error: PipelineError,
        stage: Stage,
        request_id: &str,
        started: Instant,
    ) -> Result<Reply, PipelineError> {
        log_request_error!(
            request_id,
            stage,
            error.code(),
            error.http_status().as_u16(),
            error
        );

        let meta = ErrorMeta {
            timestamp: Utc::now(),
            request_id: request_id.to_string(),
            stage,
        };
        match self.inner.route.hooks.error(&error, meta).await {
            Some(fallback) => Ok(self.succeed(fallback, request_id, started).await),
            None => Err(error),
        }
    }

    /// Runs the route in direct mode.
    ///
    /// # Errors
    ///
    /// Every failure is a [`RouteError`]. Prepare failures that are not
    /// already classified get status 500; parse failures keep their facet
    /// status; a handler error that is not a `RouteError` becomes
    /// `HANDLER_ERROR` (500).
    pub async fn invoke(&self, call: DirectCall) -> Result<Reply, RouteError> {
        let route = &self.inner.route;
        let DirectCall { request, context } = call;
        let request = Arc::new(request.unwrap_or_default());

        let mut ctx = match context {
            Some(fields) if ExecutionContext::is_complete(&fields) => {
                tracing::debug!("complete context supplied, skipping stages");
                let ctx = ExecutionContext::from_map(fields);
                let request_id = ctx.request_id().unwrap_or_default().to_string();
                return match (self.inner.handler)(request, ctx).await {
                    Ok(reply) => Ok(reply),
                    Err(e) => {
                        let error = RouteError::classify(e, RouteError::handler);
                        Err(self.fail_direct(error, Stage::Handle, &request_id).await)
                    }
                };
            }
            partial => {
                let mut ctx = ExecutionContext::new((route.request_id)());
                if let Some(fields) = partial {
                    ctx.merge_fields(fields);
                }
                ctx
            }
        };
        let request_id = ctx.request_id().unwrap_or_default().to_string();

        if let Err((stage, error)) = route
            .run_stages(&request, &mut ctx, StatusCode::INTERNAL_SERVER_ERROR)
            .await
        {
            return Err(self.fail_direct(error, stage, &request_id).await);
        }

        match (self.inner.handler)(request, ctx).await {
            Ok(reply) => Ok(reply),
            Err(e) => {
                let error = RouteError::classify(e, RouteError::handler);
                Err(self.fail_direct(error, Stage::Handle, &request_id).await)
            }
        }
    }

    async fn fail_direct(&self, error: RouteError, stage: Stage, request_id: &str) -> RouteError {
        tracing::debug!(
            request_id,
            stage = %stage,
            error.code = %error.code(),
            error = %error,
            "direct invocation failed"
        );

        let meta = ErrorMeta {
            timestamp: Utc::now(),
            request_id: request_id.to_string(),
            stage,
        };
        let reported = PipelineError::Route(error);
        if self.inner.route.hooks.error(&reported, meta).await.is_some() {
            tracing::debug!(request_id, "on_error fallback ignored in direct invocation");
        }
        reported.into_route_error()
    }
}
