//! Middleware composition.
//!
//! [`Composer`] sequences an ordered list of middleware around a terminal
//! step. Every execution gets its own dispatch cursor, initialized to `-1`;
//! dispatching position `i` requires `i` to be strictly greater than the
//! cursor, which makes running the same `Next` twice an error.
//!
//! Position `len` is the terminal step. Positions beyond it have no handler
//! and dispatch to them is a no-op.
//!
//! # Error Boundary
//!
//! With an [`ErrorHandler`] installed, any failure from any depth of the
//! chain (including the terminal step) is handed to the handler, whose
//! return value becomes the recovered output. Integrity violations are
//! never handed over.

use crate::middleware::{BoxedMiddleware, Next};
use courier_core::{ApiError, BoxFuture, ExecutionContext};
use serde_json::Value;
use std::sync::atomic::{AtomicIsize, Ordering};
use std::sync::Arc;

/// The innermost step of a composed chain.
pub trait Terminal: Send + Sync {
    /// Runs the terminal step.
    fn call<'a>(&'a self, ctx: &'a mut ExecutionContext) -> BoxFuture<'a, Result<(), ApiError>>;
}

/// Terminal step that runs the context's action and stores its output.
#[derive(Debug, Clone, Copy, Default)]
pub struct ExecuteAction;

impl Terminal for ExecuteAction {
    fn call<'a>(&'a self, ctx: &'a mut ExecutionContext) -> BoxFuture<'a, Result<(), ApiError>> {
        Box::pin(ctx.execute())
    }
}

/// Terminal step backed by a closure.
pub struct FnTerminal<F>(F);

/// Wraps a closure as a [`Terminal`].
pub fn terminal_fn<F>(f: F) -> FnTerminal<F>
where
    F: for<'a> Fn(&'a mut ExecutionContext) -> BoxFuture<'a, Result<(), ApiError>> + Send + Sync,
{
    FnTerminal(f)
}

impl<F> Terminal for FnTerminal<F>
where
    F: for<'a> Fn(&'a mut ExecutionContext) -> BoxFuture<'a, Result<(), ApiError>> + Send + Sync,
{
    fn call<'a>(&'a self, ctx: &'a mut ExecutionContext) -> BoxFuture<'a, Result<(), ApiError>> {
        (self.0)(ctx)
    }
}

/// Recovers from a failed chain.
pub trait ErrorHandler: Send + Sync + 'static {
    /// Produces the output that replaces the failed result, or a new error.
    fn handle<'a>(
        &'a self,
        error: &'a ApiError,
        ctx: &'a ExecutionContext,
    ) -> BoxFuture<'a, Result<Value, ApiError>>;
}

/// Error handler backed by a closure.
pub struct FnErrorHandler<F>(F);

/// Wraps a closure as an [`ErrorHandler`].
///
/// # Example
///
/// ```
/// use courier_middleware::error_handler_fn;
/// use serde_json::json;
///
/// let fallback = error_handler_fn(|err, _ctx| {
///     let message = err.message().to_string();
///     Box::pin(async move { Ok(json!({ "error": message })) })
/// });
/// # let _ = fallback;
/// ```
pub fn error_handler_fn<F>(f: F) -> FnErrorHandler<F>
where
    F: for<'a> Fn(&'a ApiError, &'a ExecutionContext) -> BoxFuture<'a, Result<Value, ApiError>>
        + Send
        + Sync
        + 'static,
{
    FnErrorHandler(f)
}

impl<F> ErrorHandler for FnErrorHandler<F>
where
    F: for<'a> Fn(&'a ApiError, &'a ExecutionContext) -> BoxFuture<'a, Result<Value, ApiError>>
        + Send
        + Sync
        + 'static,
{
    fn handle<'a>(
        &'a self,
        error: &'a ApiError,
        ctx: &'a ExecutionContext,
    ) -> BoxFuture<'a, Result<Value, ApiError>> {
        (self.0)(error, ctx)
    }
}

/// Per-execution dispatch state.
pub(crate) struct Dispatch<'a> {
    middlewares: &'a [BoxedMiddleware],
    terminal: Option<&'a dyn Terminal>,
    cursor: AtomicIsize,
}

impl<'a> Dispatch<'a> {
    fn new(middlewares: &'a [BoxedMiddleware], terminal: Option<&'a dyn Terminal>) -> Self {
        Self {
            middlewares,
            terminal,
            cursor: AtomicIsize::new(-1),
        }
    }

    pub(crate) fn dispatch<'b>(
        &'b self,
        index: usize,
        ctx: &'b mut ExecutionContext,
    ) -> BoxFuture<'b, Result<(), ApiError>> {
        Box::pin(async move {
            let position = isize::try_from(index).unwrap_or(isize::MAX);
            let previous = self.cursor.fetch_max(position, Ordering::SeqCst);
            if position <= previous {
                tracing::error!(
                    execution_id = %ctx.id(),
                    index,
                    "next() called multiple times"
                );
                return Err(ApiError::next_called_multiple_times());
            }

            if let Some(middleware) = self.middlewares.get(index) {
                tracing::trace!(
                    execution_id = %ctx.id(),
                    stage = middleware.name(),
                    index,
                    "dispatching middleware"
                );
                let next = Next::new(self, index + 1);
                return middleware.process(ctx, next).await;
            }

            match self.terminal {
                Some(terminal) if index == self.middlewares.len() => {
                    tracing::trace!(execution_id = %ctx.id(), "dispatching terminal step");
                    terminal.call(ctx).await
                }
                _ => Ok(()),
            }
        })
    }
}

/// An ordered middleware list with an optional error boundary.
///
/// Composers are cheap to clone and share; each [`Composer::run`] creates
/// fresh dispatch state, so concurrent runs never interfere.
#[derive(Clone, Default)]
pub struct Composer {
    middlewares: Arc<[BoxedMiddleware]>,
    on_error: Option<Arc<dyn ErrorHandler>>,
}

impl Composer {
    /// Creates a composer over `middlewares`, in order.
    #[must_use]
    pub fn new(middlewares: Vec<BoxedMiddleware>) -> Self {
        Self {
            middlewares: middlewares.into(),
            on_error: None,
        }
    }

    /// Installs the error boundary.
    #[must_use]
    pub fn with_error_handler(mut self, handler: Arc<dyn ErrorHandler>) -> Self {
        self.on_error = Some(handler);
        self
    }

    /// Returns a new composer with `middleware` appended. `self` is unchanged.
    #[must_use]
    pub fn with_middleware(&self, middleware: BoxedMiddleware) -> Self {
        let mut middlewares: Vec<BoxedMiddleware> = self.middlewares.to_vec();
        middlewares.push(middleware);
        Self {
            middlewares: middlewares.into(),
            on_error: self.on_error.clone(),
        }
    }

    /// Returns the error boundary, if installed.
    #[must_use]
    pub fn error_handler(&self) -> Option<&Arc<dyn ErrorHandler>> {
        self.on_error.as_ref()
    }

    /// Returns the middleware names, in order.
    #[must_use]
    pub fn names(&self) -> Vec<&'static str> {
        self.middlewares.iter().map(|m| m.name()).collect()
    }

    /// Returns the number of middleware.
    #[must_use]
    pub fn len(&self) -> usize {
        self.middlewares.len()
    }

    /// Returns `true` if there is no middleware.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.middlewares.is_empty()
    }

    /// Runs the chain against `ctx`, with `terminal` as the innermost step.
    ///
    /// When the error boundary recovers, the handler's value becomes the
    /// output, the error is recorded on the context and `Ok(())` is
    /// returned.
    pub async fn run(
        &self,
        ctx: &mut ExecutionContext,
        terminal: Option<&dyn Terminal>,
    ) -> Result<(), ApiError> {
        let dispatch = Dispatch::new(&self.middlewares, terminal);
        let err = match dispatch.dispatch(0, ctx).await {
            Ok(()) => return Ok(()),
            Err(err) => err,
        };

        if err.is_integrity_violation() {
            return Err(err);
        }

        let handler = match &self.on_error {
            Some(handler) => handler,
            None => return Err(err),
        };

        tracing::debug!(
            execution_id = %ctx.id(),
            code = ?err.code(),
            error = %err,
            "recovering through error handler"
        );
        match handler.handle(&err, ctx).await {
            Ok(output) => {
                ctx.recover(err, output);
                Ok(())
            }
            Err(handler_err) => {
                tracing::debug!(
                    execution_id = %ctx.id(),
                    error = %handler_err,
                    "error handler failed"
                );
                ctx.set_error(err);
                Err(handler_err)
            }
        }
    }
}

impl std::fmt::Debug for Composer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Composer")
            .field("middlewares", &self.names())
            .field("on_error", &self.on_error.is_some())
            .finish()
    }
}

/// Composes `middlewares` with an optional error boundary.
#[must_use]
pub fn compose(
    middlewares: Vec<BoxedMiddleware>,
    on_error: Option<Arc<dyn ErrorHandler>>,
) -> Composer {
    Composer {
        middlewares: middlewares.into(),
        on_error,
    }
}
