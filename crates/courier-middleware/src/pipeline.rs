//! Handler pipeline.
//!
//! A [`Pipeline`] is the complete flow every Courier handler runs:
//!
//! ```text
//! input → [input schema] → context → Composer(middleware…, action) → ok? → [output schema] → output
//! ```
//!
//! 1. **Input validation** - a rejected input fails with `BAD_INPUT` before
//!    any context exists, so no middleware and no action run
//! 2. **Composition** - the middleware chain runs with the action as its
//!    terminal step
//! 3. **Post-condition** - if nothing produced an output, `BAD_REQUEST`
//! 4. **Output validation** - a rejected output fails with `BAD_OUTPUT`;
//!    this never reaches the error boundary
//!
//! Pipelines are persistent values: every `with_*` method returns a new
//! pipeline and leaves the receiver untouched.

use crate::compose::{Composer, ErrorHandler, ExecuteAction};
use crate::middleware::{BoxedMiddleware, Middleware};
use courier_core::{ApiError, ExecutionContext, Schema};
use serde_json::Value;
use std::sync::Arc;

/// The complete handler flow.
///
/// # Example
///
/// ```
/// use courier_core::{action_fn, ExecutionContext, RequestConfig, Typed};
/// use courier_middleware::Pipeline;
/// use http::Method;
/// use serde_json::{json, Value};
/// use std::sync::Arc;
///
/// let pipeline = Pipeline::builder().input_schema(Typed::<u32>::new()).build();
/// let action = Arc::new(action_fn(|config: RequestConfig| async move {
///     Ok::<_, std::io::Error>(config.params.unwrap_or(Value::Null))
/// }));
///
/// # tokio::runtime::Builder::new_current_thread().build().unwrap().block_on(async {
/// let output = pipeline
///     .process(json!(7), |input, parsed| {
///         ExecutionContext::builder(RequestConfig::new(Method::GET, "/"), action)
///             .input(input)
///             .parsed_input(parsed)
///             .build()
///     })
///     .await
///     .unwrap();
/// assert_eq!(output, json!(7));
/// # });
/// ```
#[derive(Clone, Default)]
pub struct Pipeline {
    composer: Composer,
    input_schema: Option<Arc<dyn Schema>>,
    output_schema: Option<Arc<dyn Schema>>,
}

impl Pipeline {
    /// Creates a new pipeline builder.
    #[must_use]
    pub fn builder() -> PipelineBuilder {
        PipelineBuilder::new()
    }

    /// Returns the composer.
    #[must_use]
    pub const fn composer(&self) -> &Composer {
        &self.composer
    }

    /// Returns the input schema, if any.
    #[must_use]
    pub fn input_schema(&self) -> Option<&Arc<dyn Schema>> {
        self.input_schema.as_ref()
    }

    /// Returns the output schema, if any.
    #[must_use]
    pub fn output_schema(&self) -> Option<&Arc<dyn Schema>> {
        self.output_schema.as_ref()
    }

    /// Returns a new pipeline with the input schema replaced.
    #[must_use]
    pub fn with_input_schema(&self, schema: Arc<dyn Schema>) -> Self {
        Self {
            input_schema: Some(schema),
            ..self.clone()
        }
    }

    /// Returns a new pipeline with the output schema replaced.
    #[must_use]
    pub fn with_output_schema(&self, schema: Arc<dyn Schema>) -> Self {
        Self {
            output_schema: Some(schema),
            ..self.clone()
        }
    }

    /// Returns a new pipeline with `middleware` appended.
    #[must_use]
    pub fn with_middleware(&self, middleware: BoxedMiddleware) -> Self {
        Self {
            composer: self.composer.with_middleware(middleware),
            ..self.clone()
        }
    }

    /// Returns a new pipeline with the error boundary replaced.
    #[must_use]
    pub fn with_error_handler(&self, handler: Arc<dyn ErrorHandler>) -> Self {
        Self {
            composer: self.composer.clone().with_error_handler(handler),
            ..self.clone()
        }
    }

    /// Runs `input` through the pipeline.
    ///
    /// `prepare` receives the raw and the validated input and builds the
    /// execution context; it is only called once the input is accepted.
    pub async fn process<F>(&self, input: Value, prepare: F) -> Result<Value, ApiError>
    where
        F: FnOnce(Value, Value) -> ExecutionContext + Send,
    {
        self.process_with_context(input, prepare)
            .await
            .map(|(output, _ctx)| output)
    }

    /// Like [`process`](Self::process), but also hands back the finished
    /// context so callers can read its status and extensions.
    pub async fn process_with_context<F>(
        &self,
        input: Value,
        prepare: F,
    ) -> Result<(Value, ExecutionContext), ApiError>
    where
        F: FnOnce(Value, Value) -> ExecutionContext + Send,
    {
        let parsed = match &self.input_schema {
            Some(schema) => schema.validate(input.clone()).await.map_err(|err| {
                tracing::debug!(error = %err, "input rejected by schema");
                ApiError::bad_input(err)
            })?,
            None => input.clone(),
        };

        let mut ctx = prepare(input, parsed);
        self.composer.run(&mut ctx, Some(&ExecuteAction)).await?;

        if !ctx.is_ok() {
            tracing::debug!(execution_id = %ctx.id(), "pipeline produced no output");
            return Err(ApiError::no_output());
        }

        let output = ctx.take_output();
        let output = match &self.output_schema {
            Some(schema) => schema.validate(output).await.map_err(|err| {
                tracing::debug!(execution_id = %ctx.id(), error = %err, "output rejected by schema");
                ApiError::bad_output(err)
            })?,
            None => output,
        };
        Ok((output, ctx))
    }
}

impl std::fmt::Debug for Pipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Pipeline")
            .field("composer", &self.composer)
            .field("input_schema", &self.input_schema.is_some())
            .field("output_schema", &self.output_schema.is_some())
            .finish()
    }
}

/// Builder for constructing a [`Pipeline`].
#[derive(Default)]
pub struct PipelineBuilder {
    middlewares: Vec<BoxedMiddleware>,
    on_error: Option<Arc<dyn ErrorHandler>>,
    input_schema: Option<Arc<dyn Schema>>,
    output_schema: Option<Arc<dyn Schema>>,
}

impl PipelineBuilder {
    /// Creates an empty builder.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a middleware stage.
    #[must_use]
    pub fn middleware<M: Middleware>(mut self, middleware: M) -> Self {
        self.middlewares.push(Arc::new(middleware));
        self
    }

    /// Appends an already shared middleware stage.
    #[must_use]
    pub fn middleware_arc(mut self, middleware: BoxedMiddleware) -> Self {
        self.middlewares.push(middleware);
        self
    }

    /// Sets the error boundary.
    #[must_use]
    pub fn on_error<H: ErrorHandler>(mut self, handler: H) -> Self {
        self.on_error = Some(Arc::new(handler));
        self
    }

    /// Sets the input schema.
    #[must_use]
    pub fn input_schema<S: Schema>(mut self, schema: S) -> Self {
        self.input_schema = Some(Arc::new(schema));
        self
    }

    /// Sets the output schema.
    #[must_use]
    pub fn output_schema<S: Schema>(mut self, schema: S) -> Self {
        self.output_schema = Some(Arc::new(schema));
        self
    }

    /// Builds the pipeline.
    #[must_use]
    pub fn build(self) -> Pipeline {
        let composer = match self.on_error {
            Some(handler) => Composer::new(self.middlewares).with_error_handler(handler),
            None => Composer::new(self.middlewares),
        };
        Pipeline {
            composer,
            input_schema: self.input_schema,
            output_schema: self.output_schema,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compose::error_handler_fn;
    use crate::middleware::FnMiddleware;
    use courier_core::{action_fn, schema_fn, ErrorCode, RequestConfig};
    use http::Method;
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn counting_action(calls: &Arc<AtomicUsize>, result: Value) -> Arc<dyn courier_core::Action> {
        let calls = Arc::clone(calls);
        Arc::new(action_fn(move |_config: RequestConfig| {
            calls.fetch_add(1, Ordering::SeqCst);
            let result = result.clone();
            async move { Ok::<_, std::io::Error>(result) }
        }))
    }

    async fn run(pipeline: &Pipeline, action: Arc<dyn courier_core::Action>, input: Value) -> Result<Value, ApiError> {
        pipeline
            .process(input, move |input, parsed| {
                ExecutionContext::builder(RequestConfig::new(Method::POST, "/"), action)
                    .input(input)
                    .parsed_input(parsed)
                    .build()
            })
            .await
    }

    #[tokio::test]
    async fn test_rejected_input_skips_action() {
        let calls = Arc::new(AtomicUsize::new(0));
        let pipeline = Pipeline::builder()
            .input_schema(schema_fn(|_value: Value| Err::<Value, _>("rejected")))
            .build();

        let err = run(&pipeline, counting_action(&calls, json!(1)), json!({})).await.unwrap_err();
        assert_eq!(err.code(), Some(ErrorCode::BadInput));
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_swallowed_terminal_is_bad_request() {
        let calls = Arc::new(AtomicUsize::new(0));
        let pipeline = Pipeline::builder()
            .middleware(FnMiddleware::new("swallow", |_ctx, _next| {
                Box::pin(async { Ok(()) })
            }))
            .build();

        let err = run(&pipeline, counting_action(&calls, json!(1)), Value::Null).await.unwrap_err();
        assert_eq!(err.code(), Some(ErrorCode::BadRequest));
        assert_eq!(err.message(), "no valid output produced");
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_output_schema_failure_bypasses_error_handler() {
        let calls = Arc::new(AtomicUsize::new(0));
        let pipeline = Pipeline::builder()
            .output_schema(schema_fn(|_value: Value| Err::<Value, _>("bad output")))
            .on_error(error_handler_fn(|_err, _ctx| {
                Box::pin(async { Ok(json!("recovered")) })
            }))
            .build();

        let err = run(&pipeline, counting_action(&calls, json!(1)), Value::Null).await.unwrap_err();
        assert_eq!(err.code(), Some(ErrorCode::BadOutput));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_with_methods_do_not_mutate() {
        let base = Pipeline::default();
        let strict = base.with_input_schema(Arc::new(schema_fn(|_value: Value| {
            Err::<Value, _>("never")
        })));
        assert!(base.input_schema().is_none());
        assert!(strict.input_schema().is_some());

        let calls = Arc::new(AtomicUsize::new(0));
        let output = run(&base, counting_action(&calls, json!("ok")), json!(1)).await.unwrap();
        assert_eq!(output, json!("ok"));
    }
}
