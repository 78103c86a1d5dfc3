//! Credential refresh with single-flight coalescing.
//!
//! When a downstream failure satisfies the `should_refresh` predicate, the
//! stage refreshes credentials, lets `before_retry` update the config with
//! the refreshed value, and re-runs the action.
//!
//! Concurrent failures share one refresh: the first failure starts it, every
//! other failure that arrives while it is pending waits for the same result.
//! Calls that start while a refresh is pending wait for it before being sent.
//!
//! ```text
//! call ─→ refresh pending? ── yes ─→ wait, before_retry, next
//!               │ no
//!               ↓
//!             next ── error & should_refresh ─→ start-or-join refresh ─→ before_retry ─→ action
//! ```

use crate::middleware::{Middleware, Next};
use courier_core::{ApiError, BoxError, BoxFuture, ErrorCode, ExecutionContext};
use futures_util::future::{FutureExt, Shared};
use parking_lot::Mutex;
use serde_json::Value;
use std::future::Future;
use std::sync::Arc;

type SharedFlight<T> = Shared<BoxFuture<'static, Result<T, Arc<ApiError>>>>;

/// Coalesces concurrent calls of an async operation into one in-flight call.
///
/// The slot is cleared once the flight completes, so the next call after
/// completion starts a fresh flight.
pub struct SingleFlight<T> {
    slot: Mutex<Option<SharedFlight<T>>>,
}

impl<T> Default for SingleFlight<T> {
    fn default() -> Self {
        Self {
            slot: Mutex::new(None),
        }
    }
}

impl<T> std::fmt::Debug for SingleFlight<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SingleFlight")
            .field("in_flight", &self.slot.lock().is_some())
            .finish()
    }
}

impl<T> SingleFlight<T>
where
    T: Clone + Send + Sync + 'static,
{
    /// Creates an idle coordinator.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns `true` while a flight is pending.
    #[must_use]
    pub fn is_in_flight(&self) -> bool {
        self.slot.lock().is_some()
    }

    /// Waits for the pending flight, if there is one.
    pub async fn wait(&self) -> Option<Result<T, ApiError>> {
        let flight = self.slot.lock().clone()?;
        Some(self.finish(flight).await)
    }

    /// Joins the pending flight, or starts one with `start`.
    ///
    /// `start` runs without the slot lock held, so it may inspect this
    /// coordinator. If another caller installs a flight in the meantime, the
    /// future `start` returned is dropped unpolled and that flight is joined.
    pub async fn run<F, Fut>(&self, start: F) -> Result<T, ApiError>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, BoxError>> + Send + 'static,
    {
        let pending = self.slot.lock().clone();
        if let Some(pending) = pending {
            tracing::debug!("joining in-flight refresh");
            return self.finish(pending).await;
        }

        let fut = start();
        let boxed: BoxFuture<'static, Result<T, Arc<ApiError>>> = Box::pin(async move {
            fut.await
                .map_err(|err| Arc::new(ApiError::from_error(err, ErrorCode::HttpError)))
        });
        let candidate = boxed.shared();

        let flight = {
            let mut slot = self.slot.lock();
            match slot.as_ref() {
                Some(pending) => {
                    tracing::debug!("joining in-flight refresh");
                    pending.clone()
                }
                None => {
                    tracing::debug!("starting refresh");
                    *slot = Some(candidate.clone());
                    candidate
                }
            }
        };
        self.finish(flight).await
    }

    async fn finish(&self, flight: SharedFlight<T>) -> Result<T, ApiError> {
        let result = flight.clone().await;
        {
            let mut slot = self.slot.lock();
            if slot.as_ref().is_some_and(|pending| pending.ptr_eq(&flight)) {
                *slot = None;
                tracing::debug!(ok = result.is_ok(), "refresh finished");
            }
        }
        result.map_err(ApiError::from_shared)
    }
}

type RefreshFn = Arc<dyn Fn() -> BoxFuture<'static, Result<Value, BoxError>> + Send + Sync>;
type ShouldRefreshFn = Arc<dyn Fn(&ApiError, &ExecutionContext) -> bool + Send + Sync>;
type BeforeRetryFn = Arc<dyn Fn(&Value, &mut ExecutionContext) + Send + Sync>;

/// Token refresh middleware.
///
/// # Example
///
/// ```
/// use courier_core::ErrorCode;
/// use courier_middleware::stages::RefreshTokenMiddleware;
/// use serde_json::{json, Value};
///
/// let refresh = RefreshTokenMiddleware::new(
///     || Box::pin(async { Ok(json!("fresh-token")) }),
///     |err, _ctx| err.code() == Some(ErrorCode::HttpError),
/// )
/// .before_retry(|token: &Value, ctx| {
///     if let Some(token) = token.as_str() {
///         ctx.config_mut().set_header("Authorization", format!("Bearer {token}"));
///     }
/// });
/// # let _ = refresh;
/// ```
pub struct RefreshTokenMiddleware {
    refresh: RefreshFn,
    should_refresh: ShouldRefreshFn,
    before_retry: Option<BeforeRetryFn>,
    flight: Arc<SingleFlight<Value>>,
}

impl RefreshTokenMiddleware {
    /// Creates the stage.
    ///
    /// `refresh` produces the new credential; `should_refresh` decides which
    /// failures warrant a refresh.
    pub fn new<R, S>(refresh: R, should_refresh: S) -> Self
    where
        R: Fn() -> BoxFuture<'static, Result<Value, BoxError>> + Send + Sync + 'static,
        S: Fn(&ApiError, &ExecutionContext) -> bool + Send + Sync + 'static,
    {
        Self {
            refresh: Arc::new(refresh),
            should_refresh: Arc::new(should_refresh),
            before_retry: None,
            flight: Arc::new(SingleFlight::new()),
        }
    }

    /// Sets the hook that applies the refreshed value to the config.
    #[must_use]
    pub fn before_retry<F>(mut self, hook: F) -> Self
    where
        F: Fn(&Value, &mut ExecutionContext) + Send + Sync + 'static,
    {
        self.before_retry = Some(Arc::new(hook));
        self
    }

    /// Returns the coordinator shared by all calls through this stage.
    #[must_use]
    pub fn flight(&self) -> &SingleFlight<Value> {
        &self.flight
    }

    fn apply(&self, refreshed: &Value, ctx: &mut ExecutionContext) {
        if let Some(hook) = &self.before_retry {
            hook(refreshed, ctx);
        }
    }
}

impl std::fmt::Debug for RefreshTokenMiddleware {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RefreshTokenMiddleware")
            .field("flight", &self.flight)
            .field("before_retry", &self.before_retry.is_some())
            .finish_non_exhaustive()
    }
}

impl Middleware for RefreshTokenMiddleware {
    fn name(&self) -> &'static str {
        "refresh_token"
    }

    fn process<'a>(
        &'a self,
        ctx: &'a mut ExecutionContext,
        next: Next<'a>,
    ) -> BoxFuture<'a, Result<(), ApiError>> {
        Box::pin(async move {
            if let Some(pending) = self.flight.wait().await {
                let refreshed = pending?;
                self.apply(&refreshed, ctx);
                return next.run(ctx).await;
            }

            let err = match next.run(ctx).await {
                Ok(()) => return Ok(()),
                Err(err) => err,
            };
            if err.is_integrity_violation() || !(self.should_refresh)(&err, ctx) {
                return Err(err);
            }

            tracing::debug!(execution_id = %ctx.id(), error = %err, "refreshing credentials");
            let refreshed = self.flight.run(|| (self.refresh)()).await?;
            self.apply(&refreshed, ctx);
            ctx.clear_output();
            ctx.execute().await
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    #[tokio::test]
    async fn test_single_flight_coalesces() {
        let flight = Arc::new(SingleFlight::<u32>::new());
        let calls = Arc::new(AtomicUsize::new(0));

        let tasks = (0..5).map(|_| {
            let flight = Arc::clone(&flight);
            let calls = Arc::clone(&calls);
            async move {
                flight
                    .run(|| {
                        calls.fetch_add(1, Ordering::SeqCst);
                        async {
                            tokio::time::sleep(Duration::from_millis(20)).await;
                            Ok::<_, BoxError>(7)
                        }
                    })
                    .await
            }
        });
        let results = futures_util::future::join_all(tasks).await;

        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert!(results.iter().all(|r| matches!(r, Ok(7))));
        assert!(!flight.is_in_flight());
    }

    #[tokio::test]
    async fn test_single_flight_restarts_after_completion() {
        let flight = SingleFlight::<u32>::new();
        let first = flight.run(|| async { Ok::<_, BoxError>(1) }).await.unwrap();
        let second = flight.run(|| async { Ok::<_, BoxError>(2) }).await.unwrap();
        assert_eq!((first, second), (1, 2));
    }

    #[tokio::test]
    async fn test_single_flight_shares_errors() {
        let flight = SingleFlight::<u32>::new();
        let err = flight
            .run(|| async { Err::<u32, BoxError>("refresh rejected".into()) })
            .await
            .unwrap_err();
        assert_eq!(err.code(), Some(ErrorCode::HttpError));
        assert_eq!(err.message(), "refresh rejected");
        assert!(flight.wait().await.is_none());
    }

    #[tokio::test]
    async fn test_start_may_inspect_flight() {
        let flight = Arc::new(SingleFlight::<bool>::new());
        let observer = Arc::clone(&flight);

        let seen_while_running = flight
            .run(|| {
                assert!(!observer.is_in_flight());
                async move { Ok::<_, BoxError>(observer.is_in_flight()) }
            })
            .await
            .unwrap();

        assert!(seen_while_running);
        assert!(!flight.is_in_flight());
    }
}
