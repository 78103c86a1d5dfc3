//! Request handlers.
//!
//! A [`RequestHandler`] is an immutable descriptor plus a typed call
//! surface. Every mutator returns a new handler that shares the untouched
//! parts of its parent, so one base handler can be specialized many times:
//!
//! ```
//! use courier_client::ApiClient;
//! use courier_core::{schema_fn, NoopAction};
//! use serde_json::Value;
//!
//! let client = ApiClient::new(NoopAction);
//! let base = client.get("/users");
//! let paged = base.validator(schema_fn(|v: Value| Ok::<_, std::io::Error>(v)));
//!
//! assert!(base.descriptor().pipeline().input_schema().is_none());
//! assert!(paged.descriptor().pipeline().input_schema().is_some());
//! ```

use std::fmt;
use std::marker::PhantomData;
use std::sync::Arc;

use courier_core::{
    Action, ApiError, ConfigMap, ExecutionContext, MergeConfig, RequestConfig, Schema,
};
use courier_middleware::{Middleware, Pipeline};
use http::Method;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;

/// Everything a handler needs to run one request.
#[derive(Clone)]
pub struct RequestDescriptor {
    method: Method,
    url: String,
    initial_config: ConfigMap,
    action: Arc<dyn Action>,
    merge: Arc<dyn MergeConfig>,
    pipeline: Pipeline,
}

impl RequestDescriptor {
    pub(crate) fn new(
        method: Method,
        url: String,
        initial_config: ConfigMap,
        action: Arc<dyn Action>,
        merge: Arc<dyn MergeConfig>,
        pipeline: Pipeline,
    ) -> Self {
        Self {
            method,
            url,
            initial_config,
            action,
            merge,
            pipeline,
        }
    }

    /// Returns the HTTP method.
    #[must_use]
    pub const fn method(&self) -> &Method {
        &self.method
    }

    /// Returns the URL template.
    #[must_use]
    pub fn url(&self) -> &str {
        &self.url
    }

    /// Returns the initial request config.
    #[must_use]
    pub const fn initial_config(&self) -> &ConfigMap {
        &self.initial_config
    }

    /// Returns the pipeline.
    #[must_use]
    pub const fn pipeline(&self) -> &Pipeline {
        &self.pipeline
    }

    /// Runs one untyped request.
    pub(crate) async fn run(&self, input: Value, config: ConfigMap) -> Result<Value, ApiError> {
        tracing::debug!(method = %self.method, url = %self.url, "invoking handler");
        self.pipeline
            .process(input, |input, parsed| {
                let merged = self.merge.merge(self.initial_config.clone(), config);
                let request = RequestConfig::from_map(self.method.clone(), self.url.clone(), merged);
                ExecutionContext::builder(request, Arc::clone(&self.action))
                    .input(input)
                    .parsed_input(parsed)
                    .build()
            })
            .await
    }
}

impl fmt::Debug for RequestDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RequestDescriptor")
            .field("method", &self.method)
            .field("url", &self.url)
            .field("initial_config", &self.initial_config)
            .field("pipeline", &self.pipeline)
            .finish_non_exhaustive()
    }
}

/// A callable, typed request handler.
///
/// `I` is serialized to JSON before validation and the final output is
/// deserialized into `O`. Both default to [`Value`].
pub struct RequestHandler<I = Value, O = Value> {
    descriptor: Arc<RequestDescriptor>,
    _types: PhantomData<fn(I) -> O>,
}

impl<I, O> Clone for RequestHandler<I, O> {
    fn clone(&self) -> Self {
        Self {
            descriptor: Arc::clone(&self.descriptor),
            _types: PhantomData,
        }
    }
}

impl<I, O> fmt::Debug for RequestHandler<I, O> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("RequestHandler").field(&self.descriptor).finish()
    }
}

impl<I, O> RequestHandler<I, O> {
    pub(crate) fn from_descriptor(descriptor: RequestDescriptor) -> Self {
        Self {
            descriptor: Arc::new(descriptor),
            _types: PhantomData,
        }
    }

    fn derive(&self, update: impl FnOnce(&mut RequestDescriptor)) -> Self {
        let mut descriptor = RequestDescriptor::clone(&self.descriptor);
        update(&mut descriptor);
        Self::from_descriptor(descriptor)
    }

    /// Returns the descriptor.
    #[must_use]
    pub fn descriptor(&self) -> &RequestDescriptor {
        &self.descriptor
    }

    /// Returns a handler that validates its input with `schema`.
    #[must_use]
    pub fn validator<S: Schema>(&self, schema: S) -> Self {
        self.derive(|d| d.pipeline = d.pipeline.with_input_schema(Arc::new(schema)))
    }

    /// Returns a handler that validates and transforms its output with `schema`.
    #[must_use]
    pub fn selector<S: Schema>(&self, schema: S) -> Self {
        self.derive(|d| d.pipeline = d.pipeline.with_output_schema(Arc::new(schema)))
    }

    /// Returns a handler that runs `action` as its terminal step.
    #[must_use]
    pub fn action<A: Action>(&self, action: A) -> Self {
        self.derive(|d| d.action = Arc::new(action))
    }

    /// Returns a handler with `middleware` appended to its chain.
    #[must_use]
    pub fn middleware<M: Middleware>(&self, middleware: M) -> Self {
        self.derive(|d| d.pipeline = d.pipeline.with_middleware(Arc::new(middleware)))
    }

    /// Returns a handler whose initial config has `config` merged on top.
    #[must_use]
    pub fn with_config(&self, config: ConfigMap) -> Self {
        self.derive(|d| d.initial_config = d.merge.merge(d.initial_config.clone(), config))
    }

    /// Retypes the handler. The descriptor is shared, not copied.
    #[must_use]
    pub fn t<I2, O2>(&self) -> RequestHandler<I2, O2> {
        RequestHandler {
            descriptor: Arc::clone(&self.descriptor),
            _types: PhantomData,
        }
    }
}

impl<I, O> RequestHandler<I, O>
where
    I: Serialize,
    O: DeserializeOwned,
{
    /// Calls the handler with no per-call config.
    ///
    /// # Errors
    ///
    /// `BAD_INPUT` if the input is rejected, `BAD_REQUEST` if the chain
    /// produced no output, `BAD_OUTPUT` if the output is rejected or does not
    /// fit `O`, otherwise whatever the chain failed with.
    pub async fn call(&self, input: I) -> Result<O, ApiError> {
        self.call_with(input, ConfigMap::new()).await
    }

    /// Calls the handler, merging `config` over the initial config.
    ///
    /// # Errors
    ///
    /// See [`call`](Self::call).
    pub async fn call_with(&self, input: I, config: ConfigMap) -> Result<O, ApiError> {
        let input = serde_json::to_value(input).map_err(ApiError::bad_input)?;
        let output = self.descriptor.run(input, config).await?;
        serde_json::from_value(output).map_err(ApiError::bad_output)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use courier_core::{action_fn, schema_fn, BoxError, ErrorCode, ShallowMerge};
    use serde_json::json;

    fn echo_handler(method: Method, url: &str) -> RequestHandler {
        let action = action_fn(|config: RequestConfig| async move {
            Ok::<_, BoxError>(serde_json::to_value(config)?)
        });
        RequestHandler::from_descriptor(RequestDescriptor::new(
            method,
            url.to_string(),
            ConfigMap::new(),
            Arc::new(action),
            Arc::new(ShallowMerge),
            Pipeline::default(),
        ))
    }

    #[tokio::test]
    async fn test_get_input_goes_to_params() {
        let output = echo_handler(Method::GET, "/users")
            .call(json!({"page": 2}))
            .await
            .unwrap();
        assert_eq!(
            output,
            json!({"method": "GET", "url": "/users", "params": {"page": 2}})
        );
    }

    #[tokio::test]
    async fn test_post_input_goes_to_data() {
        let output = echo_handler(Method::POST, "/users")
            .call(json!({"name": "ada"}))
            .await
            .unwrap();
        assert_eq!(output["data"], json!({"name": "ada"}));
        assert!(output.get("params").is_none());
    }

    #[tokio::test]
    async fn test_call_config_cannot_override_route() {
        let mut config = ConfigMap::new();
        config.insert("url".to_string(), json!("/admin"));
        config.insert("timeout".to_string(), json!(10));

        let output = echo_handler(Method::GET, "/users")
            .call_with(Value::Null, config)
            .await
            .unwrap();
        assert_eq!(output["url"], json!("/users"));
        assert_eq!(output["timeout"], json!(10));
    }

    #[test]
    fn test_with_config_layers_initial_config() {
        let mut first = ConfigMap::new();
        first.insert("timeout".to_string(), json!(10));
        let mut second = ConfigMap::new();
        second.insert("retries".to_string(), json!(2));

        let base = echo_handler(Method::GET, "/");
        let layered = base.with_config(first).with_config(second);

        assert!(base.descriptor().initial_config().is_empty());
        assert_eq!(layered.descriptor().initial_config().len(), 2);
    }

    #[tokio::test]
    async fn test_typed_output_mismatch_is_bad_output() {
        let handler = echo_handler(Method::GET, "/").t::<Value, u32>();
        let err = handler.call(Value::Null).await.unwrap_err();
        assert_eq!(err.code(), Some(ErrorCode::BadOutput));
    }

    #[tokio::test]
    async fn test_selector_transforms_output() {
        let handler = echo_handler(Method::GET, "/items").selector(schema_fn(|value: Value| {
            Ok::<_, BoxError>(value["url"].clone())
        }));
        assert_eq!(handler.call(Value::Null).await.unwrap(), json!("/items"));
    }
}
