//! Actions: the terminal step of every pipeline.

use crate::config::RequestConfig;
use crate::context::ExecutionContext;
use crate::error::BoxError;
use crate::BoxFuture;
use serde_json::Value;
use std::future::Future;

/// Performs the underlying request.
///
/// The action receives the fully merged [`RequestConfig`] (with the parsed
/// input already placed in `params` or `data`) and read access to the
/// execution context.
pub trait Action: Send + Sync + 'static {
    /// Runs the action.
    fn call<'a>(
        &'a self,
        config: RequestConfig,
        ctx: &'a ExecutionContext,
    ) -> BoxFuture<'a, Result<Value, BoxError>>;
}

/// Action that ignores its config and produces `null`.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopAction;

impl Action for NoopAction {
    fn call<'a>(
        &'a self,
        _config: RequestConfig,
        _ctx: &'a ExecutionContext,
    ) -> BoxFuture<'a, Result<Value, BoxError>> {
        Box::pin(async { Ok(Value::Null) })
    }
}

/// Action backed by an async closure over the config.
pub struct FnAction<F>(F);

/// Wraps an async closure as an [`Action`].
///
/// # Example
///
/// ```
/// use courier_core::{action_fn, RequestConfig};
/// use serde_json::json;
///
/// let echo = action_fn(|config: RequestConfig| async move {
///     Ok::<_, std::io::Error>(json!({ "url": config.url }))
/// });
/// # let _ = echo;
/// ```
pub fn action_fn<F, Fut, E>(f: F) -> FnAction<F>
where
    F: Fn(RequestConfig) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<Value, E>> + Send + 'static,
    E: Into<BoxError>,
{
    FnAction(f)
}

impl<F, Fut, E> Action for FnAction<F>
where
    F: Fn(RequestConfig) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<Value, E>> + Send + 'static,
    E: Into<BoxError>,
{
    fn call<'a>(
        &'a self,
        config: RequestConfig,
        _ctx: &'a ExecutionContext,
    ) -> BoxFuture<'a, Result<Value, BoxError>> {
        let fut = (self.0)(config);
        Box::pin(async move { fut.await.map_err(Into::into) })
    }
}

/// Action backed by a closure that also reads the execution context.
pub struct ContextAction<F>(F);

/// Wraps a context-aware closure as an [`Action`].
pub fn context_action_fn<F>(f: F) -> ContextAction<F>
where
    F: for<'a> Fn(RequestConfig, &'a ExecutionContext) -> BoxFuture<'a, Result<Value, BoxError>>
        + Send
        + Sync
        + 'static,
{
    ContextAction(f)
}

impl<F> Action for ContextAction<F>
where
    F: for<'a> Fn(RequestConfig, &'a ExecutionContext) -> BoxFuture<'a, Result<Value, BoxError>>
        + Send
        + Sync
        + 'static,
{
    fn call<'a>(
        &'a self,
        config: RequestConfig,
        ctx: &'a ExecutionContext,
    ) -> BoxFuture<'a, Result<Value, BoxError>> {
        (self.0)(config, ctx)
    }
}
