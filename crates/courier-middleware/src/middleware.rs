//! Core middleware trait and types.
//!
//! This module defines the [`Middleware`] trait that all stages implement,
//! and [`Next`], the handle a stage uses to continue the chain.
//!
//! # Example
//!
//! ```
//! use courier_core::{ApiError, ExecutionContext};
//! use courier_middleware::{BoxFuture, Middleware, Next};
//!
//! struct Timing;
//!
//! impl Middleware for Timing {
//!     fn name(&self) -> &'static str {
//!         "timing"
//!     }
//!
//!     fn process<'a>(
//!         &'a self,
//!         ctx: &'a mut ExecutionContext,
//!         next: Next<'a>,
//!     ) -> BoxFuture<'a, Result<(), ApiError>> {
//!         Box::pin(async move {
//!             let result = next.run(ctx).await;
//!             println!("took {:?}", ctx.elapsed());
//!             result
//!         })
//!     }
//! }
//! ```

use crate::compose::Dispatch;
use courier_core::{ApiError, BoxFuture, ExecutionContext};
use std::sync::Arc;

/// A shared, type-erased middleware.
pub type BoxedMiddleware = Arc<dyn Middleware>;

/// The core middleware trait.
///
/// A middleware receives the mutable execution context and a [`Next`]
/// handle for the rest of the chain.
///
/// # Invariants
///
/// - `next.run()` may be awaited at most once; a second run fails with
///   "next() called multiple times"
/// - Not running `next` short-circuits the chain: no later stage and no
///   action executes
/// - Errors returned from `next.run()` may be handled, transformed or
///   propagated
pub trait Middleware: Send + Sync + 'static {
    /// Returns the name of this stage, used in logs.
    fn name(&self) -> &'static str;

    /// Processes the execution.
    fn process<'a>(
        &'a self,
        ctx: &'a mut ExecutionContext,
        next: Next<'a>,
    ) -> BoxFuture<'a, Result<(), ApiError>>;
}

/// Handle that continues the chain at the next position.
///
/// `Next` is `Clone` so that retrying stages can be expressed, but the
/// shared dispatch cursor only ever moves forward: running a stale clone
/// fails instead of re-running downstream stages.
#[derive(Clone)]
pub struct Next<'a> {
    dispatch: &'a Dispatch<'a>,
    index: usize,
}

impl<'a> Next<'a> {
    pub(crate) const fn new(dispatch: &'a Dispatch<'a>, index: usize) -> Self {
        Self { dispatch, index }
    }

    /// Returns the chain position this handle advances to.
    #[must_use]
    pub const fn index(&self) -> usize {
        self.index
    }

    /// Runs the rest of the chain.
    pub async fn run(self, ctx: &mut ExecutionContext) -> Result<(), ApiError> {
        self.dispatch.dispatch(self.index, ctx).await
    }
}

impl std::fmt::Debug for Next<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Next").field("index", &self.index).finish()
    }
}

/// A middleware built from a closure.
///
/// # Example
///
/// ```
/// use courier_middleware::FnMiddleware;
///
/// let passthrough = FnMiddleware::new("passthrough", |ctx, next| {
///     Box::pin(async move { next.run(ctx).await })
/// });
/// # let _ = passthrough;
/// ```
pub struct FnMiddleware<F> {
    name: &'static str,
    func: F,
}

impl<F> FnMiddleware<F>
where
    F: for<'a> Fn(&'a mut ExecutionContext, Next<'a>) -> BoxFuture<'a, Result<(), ApiError>>
        + Send
        + Sync
        + 'static,
{
    /// Creates a new function-based middleware.
    pub const fn new(name: &'static str, func: F) -> Self {
        Self { name, func }
    }
}

impl<F> Middleware for FnMiddleware<F>
where
    F: for<'a> Fn(&'a mut ExecutionContext, Next<'a>) -> BoxFuture<'a, Result<(), ApiError>>
        + Send
        + Sync
        + 'static,
{
    fn name(&self) -> &'static str {
        self.name
    }

    fn process<'a>(
        &'a self,
        ctx: &'a mut ExecutionContext,
        next: Next<'a>,
    ) -> BoxFuture<'a, Result<(), ApiError>> {
        (self.func)(ctx, next)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compose::compose;
    use courier_core::{NoopAction, RequestConfig};
    use http::Method;
    use serde_json::json;

    struct TagMiddleware {
        name: &'static str,
    }

    impl Middleware for TagMiddleware {
        fn name(&self) -> &'static str {
            self.name
        }

        fn process<'a>(
            &'a self,
            ctx: &'a mut ExecutionContext,
            next: Next<'a>,
        ) -> BoxFuture<'a, Result<(), ApiError>> {
            Box::pin(async move {
                ctx.config_mut().insert(self.name, json!(true));
                next.run(ctx).await
            })
        }
    }

    fn context() -> ExecutionContext {
        ExecutionContext::new(RequestConfig::new(Method::GET, "/"), Arc::new(NoopAction))
    }

    #[test]
    fn test_middleware_name() {
        let mw = TagMiddleware { name: "tag" };
        assert_eq!(mw.name(), "tag");
    }

    #[tokio::test]
    async fn test_trait_middleware_runs() {
        let composer = compose(vec![Arc::new(TagMiddleware { name: "tag" })], None);
        let mut ctx = context();
        composer.run(&mut ctx, None).await.unwrap();
        assert_eq!(ctx.config().get("tag"), Some(&json!(true)));
    }

    #[tokio::test]
    async fn test_fn_middleware_sets_output() {
        let mw = FnMiddleware::new("answer", |ctx, _next| {
            Box::pin(async move {
                ctx.set_output(json!(42));
                Ok(())
            })
        });
        assert_eq!(mw.name(), "answer");

        let composer = compose(vec![Arc::new(mw)], None);
        let mut ctx = context();
        composer.run(&mut ctx, None).await.unwrap();
        assert_eq!(ctx.output(), &json!(42));
    }
}
