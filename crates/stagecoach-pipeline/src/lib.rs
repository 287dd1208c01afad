//! # Stagecoach Pipeline
//!
//! Declarative request pipelines for route handlers.
//!
//! A route is built from an immutable [`RouteDefinition`]:
//!
//! 1. **Prepare stages** read the request and contribute top-level context
//!    fields (a user lookup, a tenant id).
//! 2. **Parse stages** extract named facets of the request (headers, body,
//!    query, cookies, auth, method, path, custom) and store their handlers'
//!    results under `parsed.<facet>`.
//! 3. The **terminal handler** receives the request and the completed
//!    [`ExecutionContext`].
//!
//! Lifecycle hooks observe every phase; see [`HookSet`].
//!
//! ## Example
//!
//! ```
//! use serde_json::{json, Value};
//! use stagecoach_pipeline::{DirectCall, ExecutionContext, ParseStage, Reply, RouteDefinition};
//!
//! # tokio_test::block_on(async {
//! let route = RouteDefinition::create()
//!     .prepare(|_req, _fields| async { Ok(json!({ "role": "admin" })) })
//!     .parse(ParseStage::new().custom("greeting", |_req, fields| async move {
//!         Ok(json!({ "text": format!("hello {}", fields["role"].as_str().unwrap_or("guest")) }))
//!     }))
//!     .handle(|_req, ctx: ExecutionContext| async move {
//!         Ok(ctx.parsed_facet("greeting").cloned().unwrap_or(Value::Null))
//!     });
//!
//! let reply = route.invoke(DirectCall::new()).await.unwrap();
//! assert!(matches!(reply, Reply::Json(v) if v == json!({ "text": "hello admin" })));
//! # });
//! ```
//!
//! ## Invocation modes
//!
//! - [`RouteHandler::call`] / [`RouteHandler::respond`]: bound mode, for a
//!   mounted route. All hooks fire and the handler's own error is returned
//!   untouched.
//! - [`RouteHandler::invoke`]: direct mode, for calling a route from code.
//!   Every failure is a [`RouteError`].

#![doc(html_root_url = "https://docs.rs/stagecoach-pipeline/0.1.0")]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

pub mod cors;
mod error;
mod handler;
mod hooks;
mod options;
mod parse;
mod prepare;
mod render;
mod route;
mod types;

pub use cors::{AllowedOrigins, CorsBuilder, CorsPolicy, PreflightResponder};
pub use error::{HandlerError, PipelineError};
pub use handler::{DirectCall, RouteHandler};
pub use hooks::{ErrorMeta, HookSet, RequestMeta, ResponseMeta, Stage};
pub use options::{PipelineOptions, RequestIdOptions};
pub use parse::ParseStage;
pub use prepare::PrepareStage;
pub use route::RouteDefinition;
pub use types::BoxFuture;

pub use stagecoach_core::{ErrorCode, ExecutionContext, Fields, Reply, Request, RouteError};
pub use stagecoach_extract::{CookieMap, Facet, MethodSet, QueryMap};
