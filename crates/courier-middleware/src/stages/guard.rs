//! Access guard.
//!
//! Evaluates a predicate before the rest of the chain runs. A `false`
//! answer fails with `ACCESS_DENIED` ("You don't have access to METHOD URL")
//! and nothing downstream executes.

use crate::middleware::{Middleware, Next};
use courier_core::{ApiError, BoxFuture, ExecutionContext, RequestConfig};
use std::future::Future;
use std::sync::Arc;

enum Predicate {
    Sync(Arc<dyn Fn(&ExecutionContext) -> bool + Send + Sync>),
    Async(Arc<dyn Fn(RequestConfig) -> BoxFuture<'static, bool> + Send + Sync>),
}

/// Guard middleware.
///
/// # Example
///
/// ```
/// use courier_middleware::stages::GuardMiddleware;
///
/// let admin_only = GuardMiddleware::new(|ctx| !ctx.config().url.starts_with("/admin"));
/// let remote = GuardMiddleware::new_async(|config| async move { config.url != "/blocked" });
/// # let _ = (admin_only, remote);
/// ```
pub struct GuardMiddleware {
    predicate: Predicate,
}

impl GuardMiddleware {
    /// Creates a guard from a synchronous predicate over the context.
    pub fn new<F>(predicate: F) -> Self
    where
        F: Fn(&ExecutionContext) -> bool + Send + Sync + 'static,
    {
        Self {
            predicate: Predicate::Sync(Arc::new(predicate)),
        }
    }

    /// Creates a guard from an async predicate over the request config.
    pub fn new_async<F, Fut>(predicate: F) -> Self
    where
        F: Fn(RequestConfig) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = bool> + Send + 'static,
    {
        Self {
            predicate: Predicate::Async(Arc::new(
                move |config: RequestConfig| -> BoxFuture<'static, bool> {
                    Box::pin(predicate(config))
                },
            )),
        }
    }

    async fn allows(&self, ctx: &ExecutionContext) -> bool {
        match &self.predicate {
            Predicate::Sync(check) => check(ctx),
            Predicate::Async(check) => check(ctx.config().clone()).await,
        }
    }
}

impl std::fmt::Debug for GuardMiddleware {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let kind = match self.predicate {
            Predicate::Sync(_) => "sync",
            Predicate::Async(_) => "async",
        };
        f.debug_struct("GuardMiddleware")
            .field("predicate", &kind)
            .finish()
    }
}

impl Middleware for GuardMiddleware {
    fn name(&self) -> &'static str {
        "guard"
    }

    fn process<'a>(
        &'a self,
        ctx: &'a mut ExecutionContext,
        next: Next<'a>,
    ) -> BoxFuture<'a, Result<(), ApiError>> {
        Box::pin(async move {
            if !self.allows(ctx).await {
                let config = ctx.config();
                tracing::debug!(
                    execution_id = %ctx.id(),
                    method = %config.method,
                    url = %config.url,
                    "access denied"
                );
                return Err(ApiError::access_denied(config.method.as_str(), &config.url));
            }
            next.run(ctx).await
        })
    }
}
