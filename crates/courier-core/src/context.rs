//! Execution context types.
//!
//! The [`ExecutionContext`] carries all per-call state through the middleware
//! chain and into the action: the merged config, the raw and parsed input,
//! the output slot and the success flag.

use crate::action::Action;
use crate::config::RequestConfig;
use crate::error::{ApiError, ErrorCode};
use http::StatusCode;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use uuid::Uuid;

/// A unique identifier for each execution, using UUID v7.
///
/// UUID v7 is time-ordered, which keeps log lines of concurrent calls easy
/// to correlate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ExecutionId(Uuid);

impl ExecutionId {
    /// Creates a new unique ID.
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::now_v7())
    }

    /// Returns the underlying UUID.
    #[must_use]
    pub const fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for ExecutionId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for ExecutionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// The route URL before path parameters were substituted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawUrl(pub String);

/// Per-call state that flows through the middleware chain.
///
/// # Example
///
/// ```
/// use courier_core::{ExecutionContext, NoopAction, RequestConfig};
/// use http::Method;
/// use serde_json::json;
/// use std::sync::Arc;
///
/// let ctx = ExecutionContext::builder(RequestConfig::new(Method::GET, "/users"), Arc::new(NoopAction))
///     .input(json!({"page": 2}))
///     .build();
///
/// assert_eq!(ctx.parsed_input(), &json!({"page": 2}));
/// assert!(!ctx.is_ok());
/// ```
pub struct ExecutionContext {
    id: ExecutionId,
    config: RequestConfig,
    input: Value,
    parsed_input: Value,
    output: Value,
    ok: bool,
    error: Option<ApiError>,
    recovered: bool,
    status: Option<StatusCode>,
    action: Arc<dyn Action>,
    started_at: Instant,
    extensions: HashMap<TypeId, Box<dyn Any + Send + Sync>>,
}

impl ExecutionContext {
    /// Creates a context with `null` input.
    #[must_use]
    pub fn new(config: RequestConfig, action: Arc<dyn Action>) -> Self {
        Self::builder(config, action).build()
    }

    /// Returns a builder.
    #[must_use]
    pub fn builder(config: RequestConfig, action: Arc<dyn Action>) -> ExecutionContextBuilder {
        ExecutionContextBuilder {
            config,
            action,
            input: Value::Null,
            parsed_input: None,
        }
    }

    /// Returns the execution ID.
    #[must_use]
    pub const fn id(&self) -> ExecutionId {
        self.id
    }

    /// Returns the request config.
    #[must_use]
    pub const fn config(&self) -> &RequestConfig {
        &self.config
    }

    /// Returns the request config mutably.
    pub fn config_mut(&mut self) -> &mut RequestConfig {
        &mut self.config
    }

    /// Returns the raw input, as passed by the caller.
    #[must_use]
    pub const fn input(&self) -> &Value {
        &self.input
    }

    /// Returns the validated input.
    #[must_use]
    pub const fn parsed_input(&self) -> &Value {
        &self.parsed_input
    }

    /// Returns the validated input mutably.
    pub fn parsed_input_mut(&mut self) -> &mut Value {
        &mut self.parsed_input
    }

    /// Replaces the validated input.
    pub fn set_parsed_input(&mut self, value: Value) {
        self.parsed_input = value;
    }

    /// Returns the output produced so far.
    #[must_use]
    pub const fn output(&self) -> &Value {
        &self.output
    }

    /// Sets the output and marks the execution successful.
    pub fn set_output(&mut self, output: Value) {
        self.output = output;
        self.ok = true;
    }

    /// Takes the output, leaving `null` behind.
    pub fn take_output(&mut self) -> Value {
        std::mem::take(&mut self.output)
    }

    /// Resets the output slot and the success flag.
    pub fn clear_output(&mut self) {
        self.output = Value::Null;
        self.ok = false;
    }

    /// Returns `true` once a valid output has been produced.
    #[must_use]
    pub const fn is_ok(&self) -> bool {
        self.ok
    }

    /// Records `error` as handled and installs `output` as the result.
    pub fn recover(&mut self, error: ApiError, output: Value) {
        self.error = Some(error);
        self.recovered = true;
        self.set_output(output);
    }

    /// Records `error` without producing an output.
    pub fn set_error(&mut self, error: ApiError) {
        self.error = Some(error);
    }

    /// Returns the error the chain failed with, if one was captured.
    #[must_use]
    pub const fn error(&self) -> Option<&ApiError> {
        self.error.as_ref()
    }

    /// Returns `true` if the result came from an error handler.
    #[must_use]
    pub const fn is_recovered(&self) -> bool {
        self.recovered
    }

    /// Returns the status set for an HTTP response, if any.
    #[must_use]
    pub const fn status(&self) -> Option<StatusCode> {
        self.status
    }

    /// Sets the status used when this execution answers an HTTP request.
    pub fn set_status(&mut self, status: StatusCode) {
        self.status = Some(status);
    }

    /// Returns the time elapsed since the context was created.
    #[must_use]
    pub fn elapsed(&self) -> Duration {
        self.started_at.elapsed()
    }

    /// Runs the action with the current config and parsed input.
    ///
    /// On success the result becomes the output and the execution is marked
    /// ok. Failures are normalized to `HTTP_ERROR` unless they already carry
    /// a code.
    pub async fn execute(&mut self) -> Result<(), ApiError> {
        let id = self.id;
        let action = Arc::clone(&self.action);
        let config = self.config.clone().with_input(self.parsed_input.clone());
        let output = action.call(config, self).await.map_err(|err| {
            let err = ApiError::from_error(err, ErrorCode::HttpError);
            tracing::debug!(
                execution_id = %id,
                code = ?err.code(),
                error = %err,
                "action failed"
            );
            err
        })?;
        self.set_output(output);
        Ok(())
    }

    /// Stores an extension value, keyed by its type.
    pub fn set_extension<T: Send + Sync + 'static>(&mut self, value: T) {
        self.extensions.insert(TypeId::of::<T>(), Box::new(value));
    }

    /// Returns an extension value.
    #[must_use]
    pub fn get_extension<T: Send + Sync + 'static>(&self) -> Option<&T> {
        self.extensions
            .get(&TypeId::of::<T>())
            .and_then(|boxed| boxed.downcast_ref())
    }

    /// Returns an extension value mutably.
    pub fn get_extension_mut<T: Send + Sync + 'static>(&mut self) -> Option<&mut T> {
        self.extensions
            .get_mut(&TypeId::of::<T>())
            .and_then(|boxed| boxed.downcast_mut())
    }

    /// Removes an extension value.
    pub fn remove_extension<T: Send + Sync + 'static>(&mut self) -> Option<T> {
        self.extensions
            .remove(&TypeId::of::<T>())
            .and_then(|boxed| boxed.downcast().ok())
            .map(|boxed| *boxed)
    }
}

impl std::fmt::Debug for ExecutionContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ExecutionContext")
            .field("id", &self.id)
            .field("config", &self.config)
            .field("input", &self.input)
            .field("parsed_input", &self.parsed_input)
            .field("output", &self.output)
            .field("ok", &self.ok)
            .field("error", &self.error)
            .field("recovered", &self.recovered)
            .field("status", &self.status)
            .field("extensions", &self.extensions.len())
            .finish_non_exhaustive()
    }
}

/// Builder for [`ExecutionContext`].
pub struct ExecutionContextBuilder {
    config: RequestConfig,
    action: Arc<dyn Action>,
    input: Value,
    parsed_input: Option<Value>,
}

impl ExecutionContextBuilder {
    /// Sets the raw input. The parsed input defaults to the same value.
    #[must_use]
    pub fn input(mut self, input: Value) -> Self {
        self.input = input;
        self
    }

    /// Sets the validated input.
    #[must_use]
    pub fn parsed_input(mut self, parsed: Value) -> Self {
        self.parsed_input = Some(parsed);
        self
    }

    /// Builds the context.
    #[must_use]
    pub fn build(self) -> ExecutionContext {
        let parsed_input = self.parsed_input.unwrap_or_else(|| self.input.clone());
        ExecutionContext {
            id: ExecutionId::new(),
            config: self.config,
            input: self.input,
            parsed_input,
            output: Value::Null,
            ok: false,
            error: None,
            recovered: false,
            status: None,
            action: self.action,
            started_at: Instant::now(),
            extensions: HashMap::new(),
        }
    }
}
