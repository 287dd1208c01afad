//! Boxed callable types shared by stages, hooks and handlers.
//!
//! User code registers plain closures returning futures. They are erased
//! into `Arc<dyn Fn(..) -> BoxFuture<..>>` values once, at registration, so
//! route definitions stay cheap to clone and share across tasks.

use serde::Serialize;
use serde_json::Value;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

/// A boxed, sendable future.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// An erased one-argument async function.
pub(crate) type AsyncFn1<I, T> = Arc<dyn Fn(I) -> BoxFuture<'static, anyhow::Result<T>> + Send + Sync>;

/// An erased two-argument async function.
pub(crate) type AsyncFn2<I, J, T> =
    Arc<dyn Fn(I, J) -> BoxFuture<'static, anyhow::Result<T>> + Send + Sync>;

/// Erases a one-argument async closure.
pub(crate) fn erase1<I, F, Fut, T>(f: F) -> AsyncFn1<I, T>
where
    I: 'static,
    F: Fn(I) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = anyhow::Result<T>> + Send + 'static,
    T: 'static,
{
    Arc::new(move |input: I| -> BoxFuture<'static, anyhow::Result<T>> {
        Box::pin(f(input))
    })
}

/// Erases a two-argument async closure.
pub(crate) fn erase2<I, J, F, Fut, T>(f: F) -> AsyncFn2<I, J, T>
where
    I: 'static,
    J: 'static,
    F: Fn(I, J) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = anyhow::Result<T>> + Send + 'static,
    T: 'static,
{
    Arc::new(move |a: I, b: J| -> BoxFuture<'static, anyhow::Result<T>> {
        Box::pin(f(a, b))
    })
}

/// Erases a one-argument async closure whose output is serialized to JSON.
pub(crate) fn erase1_json<I, F, Fut, T>(f: F) -> AsyncFn1<I, Value>
where
    I: 'static,
    F: Fn(I) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = anyhow::Result<T>> + Send + 'static,
    T: Serialize + 'static,
{
    Arc::new(move |input: I| -> BoxFuture<'static, anyhow::Result<Value>> {
        let fut = f(input);
        Box::pin(async move { Ok(serde_json::to_value(fut.await?)?) })
    })
}

/// Erases a two-argument async closure whose output is serialized to JSON.
pub(crate) fn erase2_json<I, J, F, Fut, T>(f: F) -> AsyncFn2<I, J, Value>
where
    I: 'static,
    J: 'static,
    F: Fn(I, J) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = anyhow::Result<T>> + Send + 'static,
    T: Serialize + 'static,
{
    Arc::new(move |a: I, b: J| -> BoxFuture<'static, anyhow::Result<Value>> {
        let fut = f(a, b);
        Box::pin(async move { Ok(serde_json::to_value(fut.await?)?) })
    })
}
