//! Server actions.
//!
//! An action handler is invoked directly with form or JSON input rather
//! than through a route URL. It can additionally take positional *bound
//! arguments* validated by their own schemas, and can run in *state* mode
//! where it receives the previous state and returns the next one.
//!
//! Inside the action, bound arguments and the previous state are available
//! as the [`BoundArgs`] and [`PreviousState`] context extensions.

use std::fmt;
use std::sync::Arc;

use courier_core::{
    Action, ApiError, BoxError, BoxFuture, ExecutionContext, RequestConfig, Schema,
};
use courier_middleware::{ErrorHandler, Middleware, Pipeline};
use http::Method;
use serde_json::{Map, Value};

use crate::routes::Endpoint;

/// Validated bound arguments, in order.
#[derive(Debug, Clone, PartialEq)]
pub struct BoundArgs(pub Vec<Value>);

/// The state passed to a state-mode action.
#[derive(Debug, Clone, PartialEq)]
pub struct PreviousState(pub Value);

/// Input of a server action.
#[derive(Debug, Clone, PartialEq)]
pub enum ActionInput {
    /// Structured input.
    Json(Value),
    /// Form fields. Flattened into an object; a repeated key keeps its last value.
    Form(Vec<(String, String)>),
}

impl ActionInput {
    /// Converts the input into a JSON value.
    #[must_use]
    pub fn into_value(self) -> Value {
        match self {
            Self::Json(value) => value,
            Self::Form(fields) => Value::Object(
                fields
                    .into_iter()
                    .map(|(key, value)| (key, Value::String(value)))
                    .collect::<Map<String, Value>>(),
            ),
        }
    }
}

impl From<Value> for ActionInput {
    fn from(value: Value) -> Self {
        Self::Json(value)
    }
}

/// Builder for server actions.
///
/// Like request handlers, every method returns a new builder.
///
/// # Example
///
/// ```
/// use courier_client::{ActionBuilder, ActionInput};
/// use courier_core::{action_fn, RequestConfig};
/// use serde_json::json;
///
/// let rename = ActionBuilder::new("rename").action(action_fn(|config: RequestConfig| async move {
///     Ok::<_, std::io::Error>(config.data.unwrap_or_default())
/// }));
///
/// # tokio::runtime::Builder::new_current_thread().build().unwrap().block_on(async {
/// let output = rename
///     .invoke(vec![], ActionInput::Form(vec![("name".into(), "ada".into())]))
///     .await
///     .unwrap();
/// assert_eq!(output, json!({"name": "ada"}));
/// # });
/// ```
#[derive(Clone, Default)]
pub struct ActionBuilder {
    name: String,
    pipeline: Pipeline,
    bind_args: Vec<Arc<dyn Schema>>,
    stateful: bool,
}

impl ActionBuilder {
    /// Creates a builder for the action called `name`.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    /// Appends a middleware stage.
    #[must_use]
    pub fn middleware<M: Middleware>(&self, middleware: M) -> Self {
        Self {
            pipeline: self.pipeline.with_middleware(Arc::new(middleware)),
            ..self.clone()
        }
    }

    /// Sets the error boundary.
    #[must_use]
    pub fn on_error<H: ErrorHandler>(&self, handler: H) -> Self {
        Self {
            pipeline: self.pipeline.with_error_handler(Arc::new(handler)),
            ..self.clone()
        }
    }

    /// Sets the input schema.
    #[must_use]
    pub fn validator<S: Schema>(&self, schema: S) -> Self {
        Self {
            pipeline: self.pipeline.with_input_schema(Arc::new(schema)),
            ..self.clone()
        }
    }

    /// Sets the output schema.
    #[must_use]
    pub fn selector<S: Schema>(&self, schema: S) -> Self {
        Self {
            pipeline: self.pipeline.with_output_schema(Arc::new(schema)),
            ..self.clone()
        }
    }

    /// Declares positional bound arguments, one schema each.
    #[must_use]
    pub fn bind_args(&self, schemas: Vec<Arc<dyn Schema>>) -> Self {
        Self {
            bind_args: schemas,
            ..self.clone()
        }
    }

    /// Switches to state mode.
    #[must_use]
    pub fn state(&self) -> Self {
        Self {
            stateful: true,
            ..self.clone()
        }
    }

    /// Finishes the builder with `action` as the terminal step.
    #[must_use]
    pub fn action<A: Action>(&self, action: A) -> ActionHandler {
        ActionHandler {
            inner: Arc::new(ActionInner {
                name: self.name.clone(),
                pipeline: self.pipeline.clone(),
                bind_args: self.bind_args.clone(),
                stateful: self.stateful,
                action: Arc::new(action),
            }),
        }
    }
}

impl fmt::Debug for ActionBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ActionBuilder")
            .field("name", &self.name)
            .field("pipeline", &self.pipeline)
            .field("bind_args", &self.bind_args.len())
            .field("stateful", &self.stateful)
            .finish()
    }
}

struct ActionInner {
    name: String,
    pipeline: Pipeline,
    bind_args: Vec<Arc<dyn Schema>>,
    stateful: bool,
    action: Arc<dyn Action>,
}

/// A callable server action.
#[derive(Clone)]
pub struct ActionHandler {
    inner: Arc<ActionInner>,
}

impl ActionHandler {
    /// Returns the action name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.inner.name
    }

    /// Returns `true` in state mode.
    #[must_use]
    pub fn is_stateful(&self) -> bool {
        self.inner.stateful
    }

    /// Invokes the action.
    ///
    /// # Errors
    ///
    /// `BAD_INPUT` if the number of bound arguments is wrong or one of them
    /// is rejected, otherwise the same errors as a request handler.
    pub async fn invoke(
        &self,
        bind_args: Vec<Value>,
        input: ActionInput,
    ) -> Result<Value, ApiError> {
        self.run(bind_args, None, input).await
    }

    /// Invokes a state-mode action with the previous state. The result is
    /// the next state.
    ///
    /// # Errors
    ///
    /// See [`invoke`](Self::invoke).
    pub async fn invoke_with_state(
        &self,
        bind_args: Vec<Value>,
        previous: Value,
        input: ActionInput,
    ) -> Result<Value, ApiError> {
        self.run(bind_args, Some(previous), input).await
    }

    async fn run(
        &self,
        bind_args: Vec<Value>,
        previous: Option<Value>,
        input: ActionInput,
    ) -> Result<Value, ApiError> {
        let inner = &self.inner;
        let bound = validate_bind_args(&inner.bind_args, bind_args).await?;
        let previous = inner.stateful.then(|| previous.unwrap_or(Value::Null));

        tracing::debug!(action = %inner.name, stateful = inner.stateful, "invoking action");
        inner
            .pipeline
            .process(input.into_value(), |input, parsed| {
                let mut config = RequestConfig::new(Method::POST, "");
                config.insert("action", Value::String(inner.name.clone()));
                let mut ctx = ExecutionContext::builder(config, Arc::clone(&inner.action))
                    .input(input)
                    .parsed_input(parsed)
                    .build();
                ctx.set_extension(BoundArgs(bound));
                if let Some(previous) = previous {
                    ctx.set_extension(PreviousState(previous));
                }
                ctx
            })
            .await
    }
}

impl fmt::Debug for ActionHandler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ActionHandler")
            .field("name", &self.inner.name)
            .field("stateful", &self.inner.stateful)
            .finish_non_exhaustive()
    }
}

impl Endpoint for ActionHandler {
    fn invoke<'a>(&'a self, input: Value) -> BoxFuture<'a, Result<Value, ApiError>> {
        Box::pin(self.run(Vec::new(), None, ActionInput::Json(input)))
    }
}

async fn validate_bind_args(
    schemas: &[Arc<dyn Schema>],
    args: Vec<Value>,
) -> Result<Vec<Value>, ApiError> {
    if schemas.len() != args.len() {
        return Err(ApiError::bad_input(BoxError::from(format!(
            "Expected {} bind arguments, but got {}",
            schemas.len(),
            args.len()
        ))));
    }

    let mut validated = Vec::with_capacity(args.len());
    for (schema, arg) in schemas.iter().zip(args) {
        validated.push(schema.validate(arg).await.map_err(ApiError::bad_input)?);
    }
    Ok(validated)
}

#[cfg(test)]
mod tests {
    use super::*;
    use courier_core::{context_action_fn, schema_fn, ErrorCode, Typed};
    use serde_json::json;

    fn echo_bound() -> impl Action {
        context_action_fn(|config, ctx| {
            let bound = ctx.get_extension::<BoundArgs>().cloned();
            let previous = ctx.get_extension::<PreviousState>().cloned();
            Box::pin(async move {
                Ok(json!({
                    "data": config.data,
                    "bound": bound.map(|b| b.0),
                    "previous": previous.map(|p| p.0),
                    "action": config.get("action").cloned(),
                }))
            })
        })
    }

    #[tokio::test]
    async fn test_bind_args_count_mismatch() {
        let handler = ActionBuilder::new("save")
            .bind_args(vec![Arc::new(Typed::<u32>::new()), Arc::new(Typed::<String>::new())])
            .action(echo_bound());

        let err = handler
            .invoke(vec![json!(1)], json!({}).into())
            .await
            .unwrap_err();
        assert_eq!(err.code(), Some(ErrorCode::BadInput));
        let source = std::error::Error::source(&err).map(ToString::to_string);
        assert_eq!(source.as_deref(), Some("Expected 2 bind arguments, but got 1"));
    }

    #[tokio::test]
    async fn test_bind_args_validated_positionally() {
        let handler = ActionBuilder::new("save")
            .bind_args(vec![Arc::new(Typed::<u32>::new())])
            .action(echo_bound());

        let err = handler
            .invoke(vec![json!("seven")], json!({}).into())
            .await
            .unwrap_err();
        assert_eq!(err.code(), Some(ErrorCode::BadInput));

        let output = handler
            .invoke(vec![json!(7)], json!({"title": "x"}).into())
            .await
            .unwrap();
        assert_eq!(output["bound"], json!([7]));
        assert_eq!(output["data"], json!({"title": "x"}));
        assert_eq!(output["action"], json!("save"));
        assert_eq!(output["previous"], Value::Null);
    }

    #[tokio::test]
    async fn test_state_mode_receives_previous_state() {
        let counter = ActionBuilder::new("increment").state().action(context_action_fn(
            |config, ctx| {
                let previous = ctx
                    .get_extension::<PreviousState>()
                    .and_then(|p| p.0.as_i64())
                    .unwrap_or(0);
                let step = config
                    .data
                    .as_ref()
                    .and_then(|d| d.get("step"))
                    .and_then(Value::as_str)
                    .and_then(|s| s.parse::<i64>().ok())
                    .unwrap_or(1);
                Box::pin(async move { Ok(json!(previous + step)) })
            },
        ));

        assert!(counter.is_stateful());
        let next = counter
            .invoke_with_state(vec![], json!(41), ActionInput::Form(vec![("step".into(), "1".into())]))
            .await
            .unwrap();
        assert_eq!(next, json!(42));
    }

    #[test]
    fn test_form_input_flattens_last_wins() {
        let input = ActionInput::Form(vec![
            ("a".into(), "1".into()),
            ("b".into(), "2".into()),
            ("a".into(), "3".into()),
        ]);
        assert_eq!(input.into_value(), json!({"a": "3", "b": "2"}));
    }

    #[tokio::test]
    async fn test_builder_is_persistent() {
        let base = ActionBuilder::new("noop");
        let strict = base.validator(schema_fn(|_v: Value| Err::<Value, _>("never")));
        let loose = base.action(echo_bound());
        let strict = strict.action(echo_bound());

        assert!(loose.invoke(vec![], Value::Null.into()).await.is_ok());
        let err = strict.invoke(vec![], Value::Null.into()).await.unwrap_err();
        assert_eq!(err.code(), Some(ErrorCode::BadInput));
    }
}
