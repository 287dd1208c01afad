//! # Stagecoach
//!
//! **Declarative request pipelines for async route handlers**
//!
//! Stagecoach builds a route out of ordered stages:
//!
//! - **Prepare stages** compute top-level context fields from the request
//! - **Parse stages** extract and validate request facets (headers, body,
//!   query, cookies, auth, method, path, or custom ones)
//! - **Lifecycle hooks** observe every phase without changing its outcome
//! - A **terminal handler** receives the request and the completed context
//!
//! ## Quick Start
//!
//! ```
//! use stagecoach::prelude::*;
//! use serde_json::json;
//!
//! # tokio_test::block_on(async {
//! let get_profile = RouteDefinition::create()
//!     .prepare(|_req, _fields| async { Ok(json!({ "role": "admin" })) })
//!     .parse(
//!         ParseStage::new()
//!             .method(Method::GET)
//!             .path("/profile")
//!             .auth(|raw: String| async move {
//!                 let token = raw.strip_prefix("Bearer ").unwrap_or(&raw).to_string();
//!                 Ok(json!({ "token": token }))
//!             }),
//!     )
//!     .handle(|_req, ctx: ExecutionContext| async move {
//!         Ok(json!({
//!             "role": ctx.field("role"),
//!             "token": ctx.parsed_facet("auth").map(|auth| &auth["token"]),
//!         }))
//!     });
//!
//! let request = Request::get("/profile")
//!     .unwrap()
//!     .header(http::header::AUTHORIZATION, "Bearer t1".parse().unwrap());
//!
//! let reply = get_profile.call(request).await.unwrap();
//! assert!(matches!(reply, Reply::Json(v) if v == json!({ "role": "admin", "token": "t1" })));
//! # });
//! ```
//!
//! ## Architecture
//!
//! ```text
//! Request → [preflight] → on_request → prepare* → parse* → Handler
//!                                                            ↓
//! Reply ←──────────────────────────── on_response ←──────────┘
//!            (failures: on_error → fallback reply or error)
//! ```

#![doc(html_root_url = "https://docs.rs/stagecoach/0.1.0")]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

// Re-export core types
pub use stagecoach_core as core;

// Re-export facet extraction
pub use stagecoach_extract as extract;

// Re-export the pipeline builder
pub use stagecoach_pipeline as pipeline;

// Re-export logging setup
pub use stagecoach_telemetry as telemetry;

// Re-export configuration
pub use stagecoach_config as config;

/// Prelude module for convenient imports.
///
/// ```
/// use stagecoach::prelude::*;
///
/// let route = RouteDefinition::create().parse(ParseStage::new().path("/health"));
/// # let _ = route;
/// ```
pub mod prelude {
    pub use stagecoach_core::{
        reply, ErrorCode, ExecutionContext, Fields, Reply, Request, Response, RouteError,
        RouteResult,
    };

    pub use stagecoach_extract::{CookieMap, Facet, MethodSet, QueryMap};

    pub use stagecoach_pipeline::{
        CorsPolicy, DirectCall, HookSet, ParseStage, PipelineError, PipelineOptions,
        PrepareStage, RouteDefinition, RouteHandler, Stage,
    };

    pub use stagecoach_config::{ConfigLoader, StagecoachConfig};
    pub use stagecoach_telemetry::{init_logging, LogConfig};

    pub use http::Method;
}
