//! End-to-end tests of bound-mode invocation.
//!
//! These tests drive routes the way a server would and verify:
//!
//! 1. Hook order and short-circuiting
//! 2. Hook failures never changing the outcome
//! 3. `on_error` fallbacks and raw handler errors
//! 4. Rendering of replies and error envelopes
//! 5. CORS preflights, request mapping and request ids
//! 6. Sharing definitions across branches and tasks

use bytes::Bytes;
use http::{header, HeaderValue, Method, StatusCode};
use http_body_util::{BodyExt, Full};
use serde_json::{json, Value};
use stagecoach_core::reply;
use stagecoach_pipeline::{
    CorsPolicy, DirectCall, ErrorCode, ExecutionContext, HookSet, ParseStage, PipelineError,
    PipelineOptions, QueryMap, Reply, Request, RouteDefinition, RouteHandler,
};
use std::sync::{Arc, Mutex};
use std::time::Duration;

type Log = Arc<Mutex<Vec<String>>>;

fn push(log: &Log, entry: impl Into<String>) {
    log.lock().unwrap().push(entry.into());
}

fn entries(log: &Log) -> Vec<String> {
    log.lock().unwrap().clone()
}

/// A hook set that records every hook it sees.
fn recording_hooks(log: &Log) -> HookSet {
    let (a, b, c, d, e, f, g) = (
        log.clone(),
        log.clone(),
        log.clone(),
        log.clone(),
        log.clone(),
        log.clone(),
        log.clone(),
    );
    HookSet::new()
        .on_request(move |_req, _meta| {
            push(&a, "on_request");
            async { Ok(None) }
        })
        .on_prepare_start(move |_req| {
            push(&b, "on_prepare_start");
            async { Ok(()) }
        })
        .on_prepare_completed(move |_req, _ctx| {
            push(&c, "on_prepare_completed");
            async { Ok(()) }
        })
        .on_parse_start(move |_req, _ctx| {
            push(&d, "on_parse_start");
            async { Ok(()) }
        })
        .on_parse_complete(move |_req, _ctx| {
            push(&e, "on_parse_complete");
            async { Ok(()) }
        })
        .on_response(move |_reply, _meta| {
            push(&f, "on_response");
            async { Ok(()) }
        })
        .on_error(move |err, meta| {
            push(&g, format!("on_error:{}:{}", meta.stage, err.code()));
            async { Ok(None) }
        })
}

fn ok_handler(route: &RouteDefinition) -> RouteHandler {
    route.handle(|_req, _ctx| async { Ok(json!({ "ok": true })) })
}

async fn body_json(response: stagecoach_core::Response) -> Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

// =============================================================================
// Hook order
// =============================================================================

#[tokio::test]
async fn test_hooks_fire_in_lifecycle_order() {
    let log = Log::default();
    let stage_log = log.clone();
    let parse_log = log.clone();

    let route = RouteDefinition::create()
        .hooks(recording_hooks(&log))
        .prepare(move |_req, _fields| {
            push(&stage_log, "prepare");
            async { Ok(()) }
        })
        .parse(ParseStage::new().custom("probe", move |_req, _fields| {
            push(&parse_log, "parse");
            async { Ok(json!(true)) }
        }));

    let reply = ok_handler(&route).call(Request::default()).await.unwrap();
    assert_eq!(reply.status(), StatusCode::OK);
    assert_eq!(
        entries(&log),
        [
            "on_request",
            "on_prepare_start",
            "prepare",
            "on_prepare_completed",
            "on_parse_start",
            "parse",
            "on_parse_complete",
            "on_response",
        ]
    );
}

#[tokio::test]
async fn test_hooks_see_context_snapshots() {
    let seen = Log::default();
    let after_prepare = seen.clone();
    let after_parse = seen.clone();

    let route = RouteDefinition::create()
        .on_prepare_completed(move |_req, ctx: ExecutionContext| {
            push(&after_prepare, format!("prepared:{}", ctx.field("user").is_some()));
            async { Ok(()) }
        })
        .on_parse_complete(move |_req, ctx: ExecutionContext| {
            push(&after_parse, format!("parsed:{}", ctx.parsed_facet("path").is_some()));
            async { Ok(()) }
        })
        .prepare(|_req, _fields| async { Ok(json!({ "user": "u1" })) })
        .parse(ParseStage::new().path("/"));

    ok_handler(&route).call(Request::default()).await.unwrap();
    assert_eq!(entries(&seen), ["prepared:true", "parsed:true"]);
}

#[tokio::test]
async fn test_on_request_reply_short_circuits() {
    let log = Log::default();
    let stage_log = log.clone();

    let route = RouteDefinition::create()
        .hooks(recording_hooks(&log).on_request(|_req, _meta| async {
            Ok(Some(Reply::Http(reply::text("maintenance"))))
        }))
        .prepare(move |_req, _fields| {
            push(&stage_log, "prepare");
            async { Ok(()) }
        });
    let handler = route.handle(|_req, _ctx| async {
        Err::<(), _>(anyhow::anyhow!("handler must not run after a short-circuit"))
    });

    let reply = handler.call(Request::default()).await.unwrap();
    let Reply::Http(response) = reply else {
        panic!("expected the hook's response");
    };
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(entries(&log), ["on_response"]);
}

#[tokio::test]
async fn test_failing_hooks_do_not_change_outcome() {
    let route = RouteDefinition::create()
        .on_request(|_req, _meta| async { Err(anyhow::anyhow!("request hook broke")) })
        .on_prepare_start(|_req| async { Err(anyhow::anyhow!("prepare hook broke")) })
        .on_parse_complete(|_req, _ctx| async { Err(anyhow::anyhow!("parse hook broke")) })
        .on_response(|_reply, _meta| async { Err(anyhow::anyhow!("response hook broke")) })
        .prepare(|_req, _fields| async { Ok(json!({ "n": 1 })) });
    let handler = route.handle(|_req, ctx: ExecutionContext| async move {
        Ok(json!({ "n": ctx.field("n").cloned() }))
    });

    let reply = handler.call(Request::default()).await.unwrap();
    assert!(matches!(reply, Reply::Json(v) if v == json!({ "n": 1 })));
}

#[tokio::test]
async fn test_failing_error_hook_keeps_error() {
    let route = RouteDefinition::create()
        .on_error(|_err, _meta| async { Err(anyhow::anyhow!("error hook broke")) })
        .parse(ParseStage::new().path("/only"));

    let err = ok_handler(&route).call(Request::default()).await.unwrap_err();
    assert_eq!(err.http_status(), StatusCode::NOT_FOUND);
}

// =============================================================================
// Errors
// =============================================================================

#[tokio::test]
async fn test_error_hook_reports_stage() {
    let log = Log::default();
    let route = RouteDefinition::create()
        .hooks(recording_hooks(&log))
        .parse(ParseStage::new().method(Method::POST));

    let err = ok_handler(&route).call(Request::default()).await.unwrap_err();
    assert_eq!(err.code(), ErrorCode::ParseError);
    assert_eq!(
        entries(&log),
        [
            "on_request",
            "on_prepare_start",
            "on_prepare_completed",
            "on_parse_start",
            "on_error:parse:PARSE_ERROR",
        ]
    );
}

#[tokio::test]
async fn test_error_fallback_replaces_error_and_reaches_on_response() {
    let log = Log::default();
    let response_log = log.clone();

    let route = RouteDefinition::create()
        .on_error(|err, meta| async move {
            Ok(Some(Reply::Json(json!({
                "fallback": err.code().as_str(),
                "stage": meta.stage,
            }))))
        })
        .on_response(move |reply, _meta| {
            push(&response_log, format!("on_response:{}", reply.status().as_u16()));
            async { Ok(()) }
        })
        .prepare(|_req, _fields| async { Err::<(), _>(anyhow::anyhow!("no user")) });

    let reply = ok_handler(&route).call(Request::default()).await.unwrap();
    assert!(matches!(
        reply,
        Reply::Json(v) if v == json!({ "fallback": "PREPARE_ERROR", "stage": "prepare" })
    ));
    assert_eq!(entries(&log), ["on_response:200"]);
}

#[tokio::test]
async fn test_error_fallback_ignored_in_direct_mode() {
    let route = RouteDefinition::create()
        .on_error(|_err, _meta| async { Ok(Some(Reply::Json(json!("fallback")))) })
        .prepare(|_req, _fields| async { Err::<(), _>(anyhow::anyhow!("no user")) });

    let err = ok_handler(&route).invoke(DirectCall::new()).await.unwrap_err();
    assert_eq!(err.code(), ErrorCode::PrepareError);
}

#[derive(Debug)]
struct Conflict(&'static str);

impl std::fmt::Display for Conflict {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "conflict on {}", self.0)
    }
}

impl std::error::Error for Conflict {}

#[tokio::test]
async fn test_bound_mode_returns_raw_handler_error() {
    let log = Log::default();
    let route = RouteDefinition::create().hooks(recording_hooks(&log));
    let handler = route.handle(|_req, _ctx| async {
        Err::<(), _>(anyhow::Error::new(Conflict("order 9")))
    });

    let err = handler.call(Request::default()).await.unwrap_err();
    let PipelineError::Handler(raw) = &err else {
        panic!("expected the raw handler error, got {err:?}");
    };
    assert!(raw.downcast_ref::<Conflict>().is_some());
    assert_eq!(err.code(), ErrorCode::HandlerError);
    assert_eq!(entries(&log).last().unwrap(), "on_error:handle:HANDLER_ERROR");

    let direct = handler.invoke(DirectCall::new()).await.unwrap_err();
    assert_eq!(direct.code(), ErrorCode::HandlerError);
    assert_eq!(direct.http_status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(direct.message(), "conflict on order 9");
}

// =============================================================================
// Rendering and request ids
// =============================================================================

#[tokio::test]
async fn test_respond_renders_reply_with_request_id() {
    let route = RouteDefinition::create().request_id_generator(|| "req-1".to_string());
    let handler = route.handle(|_req, ctx: ExecutionContext| async move {
        Ok(json!({ "id": ctx.request_id() }))
    });

    let response = handler.respond(Request::default()).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.headers()["x-request-id"], "req-1");
    assert_eq!(response.headers()[header::CONTENT_TYPE], "application/json");
    assert_eq!(body_json(response).await, json!({ "id": "req-1" }));
}

#[tokio::test]
async fn test_respond_renders_error_envelope() {
    let route = RouteDefinition::create()
        .request_id_generator(|| "req-2".to_string())
        .parse(ParseStage::new().auth(|raw: String| async move { Ok(raw) }));

    let response = ok_handler(&route).respond(Request::default()).await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(response.headers()["x-request-id"], "req-2");
    assert_eq!(
        body_json(response).await,
        json!({
            "error": {
                "code": "PARSE_ERROR",
                "message": "missing required Authorization header",
                "detail": "Error parsing `auth`",
                "request_id": "req-2"
            }
        })
    );
}

#[tokio::test]
async fn test_respond_hides_internal_messages_unless_exposed() {
    let route = RouteDefinition::create();
    let failing = |route: &RouteDefinition| {
        route.handle(|_req, _ctx| async { Err::<(), _>(anyhow::anyhow!("password=hunter2")) })
    };

    let hidden = failing(&route).respond(Request::default()).await;
    assert_eq!(hidden.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(
        body_json(hidden).await["error"]["message"],
        "An internal error occurred"
    );

    let exposed = failing(&route.options(PipelineOptions::new().expose_internal_errors(true)))
        .respond(Request::default())
        .await;
    assert_eq!(body_json(exposed).await["error"]["message"], "password=hunter2");
}

#[tokio::test]
async fn test_incoming_request_id_trusted_when_enabled() {
    let route = RouteDefinition::create()
        .request_id_generator(|| "generated".to_string())
        .options(PipelineOptions::new().trust_incoming_request_id(true));
    let handler = route.handle(|_req, ctx: ExecutionContext| async move {
        Ok(json!(ctx.request_id()))
    });

    let with_header = Request::default()
        .header(header::HeaderName::from_static("x-request-id"), HeaderValue::from_static("upstream-7"));
    let reply = handler.call(with_header).await.unwrap();
    assert!(matches!(reply, Reply::Json(v) if v == json!("upstream-7")));

    let reply = handler.call(Request::default()).await.unwrap();
    assert!(matches!(reply, Reply::Json(v) if v == json!("generated")));

    let untrusted = RouteDefinition::create()
        .request_id_generator(|| "generated".to_string())
        .handle(|_req, ctx: ExecutionContext| async move { Ok(json!(ctx.request_id())) });
    let with_header = Request::default()
        .header(header::HeaderName::from_static("x-request-id"), HeaderValue::from_static("upstream-7"));
    let reply = untrusted.call(with_header).await.unwrap();
    assert!(matches!(reply, Reply::Json(v) if v == json!("generated")));
}

#[tokio::test]
async fn test_response_meta_carries_request_id_and_duration() {
    let log = Log::default();
    let meta_log = log.clone();

    let route = RouteDefinition::create()
        .request_id_generator(|| "req-3".to_string())
        .on_response(move |_reply, meta| {
            push(&meta_log, format!("{}:{}", meta.request_id, meta.duration < Duration::from_secs(5)));
            async { Ok(()) }
        });

    ok_handler(&route).call(Request::default()).await.unwrap();
    assert_eq!(entries(&log), ["req-3:true"]);
}

// =============================================================================
// Request mapping
// =============================================================================

#[tokio::test]
async fn test_request_extractor_maps_framework_requests() {
    let route = RouteDefinition::create()
        .parse(ParseStage::new().method(Method::PUT).path("/items/1"))
        .request_extractor(|req: http::Request<Full<Bytes>>| Ok(Request::from_http(req)));
    let handler = route.handle(|req, _ctx| async move { Ok(json!({ "path": req.path() })) });

    let http_request = http::Request::builder()
        .method(Method::PUT)
        .uri("/items/1")
        .body(Full::new(Bytes::from_static(b"{}")))
        .unwrap();
    let reply = handler.call(http_request).await.unwrap();
    assert!(matches!(reply, Reply::Json(v) if v == json!({ "path": "/items/1" })));
}

#[tokio::test]
async fn test_extractor_failure_is_mapping_error() {
    let log = Log::default();
    let route = RouteDefinition::create()
        .hooks(recording_hooks(&log))
        .request_extractor(|raw: String| -> anyhow::Result<Request> {
            Ok(Request::get(&raw)?)
        });
    let handler = route.handle(|_req, _ctx| async { Ok(()) });

    let err = handler.call("not a uri".to_string()).await.unwrap_err();
    assert_eq!(err.code(), ErrorCode::RequestMappingError);
    assert_eq!(err.http_status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(entries(&log), ["on_error:mapping:REQUEST_MAPPING_ERROR"]);
}

// =============================================================================
// CORS
// =============================================================================

fn preflight(origin: &'static str) -> Request {
    Request::new(Method::OPTIONS, "/items".parse().unwrap())
        .header(header::ORIGIN, HeaderValue::from_static(origin))
        .header(
            header::ACCESS_CONTROL_REQUEST_METHOD,
            HeaderValue::from_static("POST"),
        )
}

#[tokio::test]
async fn test_preflight_answered_before_pipeline() {
    let log = Log::default();
    let route = RouteDefinition::create()
        .hooks(recording_hooks(&log))
        .cors(CorsPolicy::builder().allow_origin("https://app.example.com").build())
        .parse(ParseStage::new().method(Method::POST));
    let handler = ok_handler(&route);

    let allowed = handler.respond(preflight("https://app.example.com")).await;
    assert_eq!(allowed.status(), StatusCode::NO_CONTENT);
    assert_eq!(
        allowed.headers()[header::ACCESS_CONTROL_ALLOW_ORIGIN],
        "https://app.example.com"
    );

    let denied = handler.respond(preflight("https://other.example.com")).await;
    assert_eq!(denied.status(), StatusCode::FORBIDDEN);

    assert!(entries(&log).is_empty());
}

#[tokio::test]
async fn test_regular_response_gets_cors_headers() {
    let route = RouteDefinition::create()
        .cors(CorsPolicy::builder().allow_any_origin().build());
    let request = Request::default()
        .header(header::ORIGIN, HeaderValue::from_static("https://any.example.com"));

    let response = ok_handler(&route).respond(request).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.headers()[header::ACCESS_CONTROL_ALLOW_ORIGIN], "*");
}

// =============================================================================
// Sharing
// =============================================================================

#[tokio::test]
async fn test_branches_are_independent() {
    let base = RouteDefinition::create()
        .prepare(|_req, _fields| async { Ok(json!({ "tenant": "acme" })) });
    let admin = base.prepare(|_req, _fields| async { Ok(json!({ "role": "admin" })) });
    let guest = base.prepare(|_req, _fields| async { Ok(json!({ "role": "guest" })) });

    let roles = |route: &RouteDefinition| {
        route.handle(|_req, ctx: ExecutionContext| async move {
            Ok(json!([ctx.field("tenant").cloned(), ctx.field("role").cloned()]))
        })
    };

    let base_reply = roles(&base).invoke(DirectCall::new()).await.unwrap();
    let admin_reply = roles(&admin).invoke(DirectCall::new()).await.unwrap();
    let guest_reply = roles(&guest).invoke(DirectCall::new()).await.unwrap();

    assert!(matches!(base_reply, Reply::Json(v) if v == json!(["acme", null])));
    assert!(matches!(admin_reply, Reply::Json(v) if v == json!(["acme", "admin"])));
    assert!(matches!(guest_reply, Reply::Json(v) if v == json!(["acme", "guest"])));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_invocations_do_not_share_context() {
    let route = RouteDefinition::create()
        .parse(ParseStage::new().query(|q: QueryMap| async move { Ok(q) }));
    let handler = route.handle(|_req, ctx: ExecutionContext| async move {
        tokio::time::sleep(Duration::from_millis(5)).await;
        Ok(ctx.parsed_facet("query").cloned().unwrap_or(Value::Null))
    });

    let tasks: Vec<_> = (0..16)
        .map(|i| {
            let handler = handler.clone();
            tokio::spawn(async move {
                let request = Request::get(&format!("/?n={i}")).unwrap();
                (i, handler.call(request).await.unwrap())
            })
        })
        .collect();

    for task in tasks {
        let (i, reply) = task.await.unwrap();
        assert!(matches!(reply, Reply::Json(v) if v == json!({ "n": i.to_string() })));
    }
}
