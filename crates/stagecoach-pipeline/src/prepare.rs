//! Prepare stages.
//!
//! A prepare stage reads the request and the current context fields and may
//! contribute new top-level fields. Stages run in declaration order; each
//! result is shallow-merged over the fields, later keys winning.

use crate::types::{erase2_json, AsyncFn2};
use http::StatusCode;
use serde::Serialize;
use serde_json::Value;
use stagecoach_core::{ExecutionContext, Fields, PARSED_KEY, Request, RouteError};
use std::fmt;
use std::future::Future;
use std::sync::Arc;

/// One unit of prepare work.
///
/// The closure's output is serialized to JSON. An object is merged into the
/// context fields; `null` (from `()` or `None`) leaves the context
/// unchanged. Any other shape is a prepare failure, as is an object that
/// sets the reserved `parsed` key.
#[derive(Clone)]
pub struct PrepareStage {
    run: AsyncFn2<Arc<Request>, Fields, Value>,
}

impl PrepareStage {
    /// Creates a prepare stage from an async closure.
    pub fn new<F, Fut, T>(f: F) -> Self
    where
        F: Fn(Arc<Request>, Fields) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = anyhow::Result<T>> + Send + 'static,
        T: Serialize + 'static,
    {
        Self {
            run: erase2_json(f),
        }
    }

    /// Runs the stage and merges its output into `ctx`.
    ///
    /// Failures that are not already a `RouteError` become `PREPARE_ERROR`
    /// with `failure_status`.
    pub(crate) async fn run(
        &self,
        request: &Arc<Request>,
        ctx: &mut ExecutionContext,
        failure_status: StatusCode,
    ) -> Result<(), RouteError> {
        let output = (self.run)(Arc::clone(request), ctx.fields().clone())
            .await
            .and_then(into_patch)
            .map_err(|e| RouteError::classify(e, |e| RouteError::prepare(e, failure_status)))?;

        if let Some(patch) = output {
            ctx.merge_fields(patch);
        }
        Ok(())
    }
}

impl fmt::Debug for PrepareStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PrepareStage").finish_non_exhaustive()
    }
}

fn into_patch(value: Value) -> anyhow::Result<Option<Fields>> {
    match value {
        Value::Null => Ok(None),
        Value::Object(fields) => {
            anyhow::ensure!(
                !fields.contains_key(PARSED_KEY),
                "prepare stage must not set the reserved `{PARSED_KEY}` key"
            );
            Ok(Some(fields))
        }
        other => anyhow::bail!(
            "prepare stage must produce an object or nothing, got {}",
            kind(&other)
        ),
    }
}

const fn kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
