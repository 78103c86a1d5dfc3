//! Outcome callbacks.
//!
//! The observer stage reports how the rest of the chain went without
//! changing it: `on_success` sees the output, `on_failure` sees the error,
//! and `on_finished` runs after either one.

use crate::middleware::{Middleware, Next};
use courier_core::{ApiError, BoxFuture, ExecutionContext, RequestConfig};
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;

/// What an observer callback is told about one call.
#[derive(Debug)]
pub struct Observation<'a> {
    /// The request as sent, with the input in `params` or `data`.
    pub request: &'a RequestConfig,
    /// The output, when the call succeeded.
    pub response: Option<&'a Value>,
    /// The error, when the call failed.
    pub error: Option<&'a ApiError>,
    /// Time spent in the chain below the observer.
    pub elapsed: Duration,
}

impl Observation<'_> {
    /// Returns `true` if the call succeeded.
    #[must_use]
    pub const fn is_success(&self) -> bool {
        self.error.is_none()
    }
}

type Hook = Arc<dyn Fn(&Observation<'_>) + Send + Sync>;

/// Observer middleware.
///
/// # Example
///
/// ```
/// use courier_middleware::stages::ObserverMiddleware;
///
/// let observer = ObserverMiddleware::new()
///     .on_success(|seen| println!("ok {}", seen.request.url))
///     .on_failure(|seen| println!("failed {}", seen.request.url))
///     .on_finished(|seen| println!("took {:?}", seen.elapsed));
/// assert!(!observer.is_empty());
/// ```
#[derive(Clone, Default)]
pub struct ObserverMiddleware {
    on_success: Option<Hook>,
    on_failure: Option<Hook>,
    on_finished: Option<Hook>,
}

impl ObserverMiddleware {
    /// Creates an observer with no callbacks.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the callback for successful calls.
    #[must_use]
    pub fn on_success<F>(mut self, hook: F) -> Self
    where
        F: Fn(&Observation<'_>) + Send + Sync + 'static,
    {
        self.on_success = Some(Arc::new(hook));
        self
    }

    /// Sets the callback for failed calls.
    #[must_use]
    pub fn on_failure<F>(mut self, hook: F) -> Self
    where
        F: Fn(&Observation<'_>) + Send + Sync + 'static,
    {
        self.on_failure = Some(Arc::new(hook));
        self
    }

    /// Sets the callback that runs after every call.
    #[must_use]
    pub fn on_finished<F>(mut self, hook: F) -> Self
    where
        F: Fn(&Observation<'_>) + Send + Sync + 'static,
    {
        self.on_finished = Some(Arc::new(hook));
        self
    }

    /// Returns `true` if no callback is set.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.on_success.is_none() && self.on_failure.is_none() && self.on_finished.is_none()
    }
}

impl std::fmt::Debug for ObserverMiddleware {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ObserverMiddleware")
            .field("on_success", &self.on_success.is_some())
            .field("on_failure", &self.on_failure.is_some())
            .field("on_finished", &self.on_finished.is_some())
            .finish()
    }
}

impl Middleware for ObserverMiddleware {
    fn name(&self) -> &'static str {
        "observer"
    }

    fn process<'a>(
        &'a self,
        ctx: &'a mut ExecutionContext,
        next: Next<'a>,
    ) -> BoxFuture<'a, Result<(), ApiError>> {
        Box::pin(async move {
            let request = ctx.config().clone().with_input(ctx.parsed_input().clone());
            let started = ctx.elapsed();

            let result = next.run(ctx).await;

            let seen = Observation {
                request: &request,
                response: result.as_ref().ok().map(|_| ctx.output()),
                error: result.as_ref().err(),
                elapsed: ctx.elapsed().saturating_sub(started),
            };
            let hook = if seen.is_success() {
                &self.on_success
            } else {
                &self.on_failure
            };
            if let Some(hook) = hook {
                hook(&seen);
            }
            if let Some(hook) = &self.on_finished {
                hook(&seen);
            }
            result
        })
    }
}
