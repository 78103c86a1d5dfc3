//! Request logging middleware.
//!
//! Emits one event before the rest of the chain runs and one after:
//!
//! ```text
//! --> GET /users/7
//! <-- GET /users/7 12ms
//! ```
//!
//! Failures are logged at `warn` with the error code.

use crate::middleware::{Middleware, Next};
use courier_core::{ApiError, BoxFuture, ExecutionContext};

/// Logger middleware.
#[derive(Debug, Clone, Copy, Default)]
pub struct LoggerMiddleware;

impl LoggerMiddleware {
    /// Creates the stage.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }
}

impl Middleware for LoggerMiddleware {
    fn name(&self) -> &'static str {
        "logger"
    }

    fn process<'a>(
        &'a self,
        ctx: &'a mut ExecutionContext,
        next: Next<'a>,
    ) -> BoxFuture<'a, Result<(), ApiError>> {
        Box::pin(async move {
            let method = ctx.config().method.clone();
            let url = ctx.config().url.clone();
            tracing::info!(execution_id = %ctx.id(), %method, %url, "--> {method} {url}");

            let result = next.run(ctx).await;
            let elapsed_ms = u64::try_from(ctx.elapsed().as_millis()).unwrap_or(u64::MAX);

            match &result {
                Ok(()) => tracing::info!(
                    execution_id = %ctx.id(),
                    %method,
                    %url,
                    duration_ms = elapsed_ms,
                    "<-- {method} {url} {elapsed_ms}ms"
                ),
                Err(err) => tracing::warn!(
                    execution_id = %ctx.id(),
                    %method,
                    %url,
                    duration_ms = elapsed_ms,
                    code = ?err.code(),
                    error = %err,
                    "<-- {method} {url} {elapsed_ms}ms failed"
                ),
            }
            result
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compose::{compose, ExecuteAction};
    use courier_core::{NoopAction, RequestConfig};
    use http::Method;
    use std::sync::Arc;

    #[tokio::test]
    async fn test_logger_is_transparent() {
        let composer = compose(vec![Arc::new(LoggerMiddleware::new())], None);
        let mut ctx = ExecutionContext::new(
            RequestConfig::new(Method::GET, "/users"),
            Arc::new(NoopAction),
        );

        composer.run(&mut ctx, Some(&ExecuteAction)).await.unwrap();
        assert!(ctx.is_ok());
        assert_eq!(LoggerMiddleware::new().name(), "logger");
    }
}
