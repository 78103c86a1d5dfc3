//! The client factory.

use std::sync::Arc;

use courier_config::ClientConfig;
use courier_core::{Action, ConfigMap, MergeConfig, ShallowMerge};
use courier_middleware::stages::{Observation, ObserverMiddleware, PathParamsMiddleware};
use courier_middleware::{BoxedMiddleware, ErrorHandler, Middleware, Pipeline, PipelineBuilder};
use http::Method;

use crate::handler::{RequestDescriptor, RequestHandler};

/// Creates request handlers that share an action, a middleware chain, a
/// merge strategy and an initial config.
///
/// # Example
///
/// ```
/// use courier_client::ApiClient;
/// use courier_core::{action_fn, RequestConfig};
/// use courier_middleware::stages::PathParamsMiddleware;
/// use serde_json::json;
///
/// let client = ApiClient::builder(action_fn(|config: RequestConfig| async move {
///     Ok::<_, std::io::Error>(json!({ "url": config.url }))
/// }))
/// .middleware(PathParamsMiddleware::new())
/// .build();
///
/// let get_user = client.get("/users/:id");
/// # tokio::runtime::Builder::new_current_thread().build().unwrap().block_on(async {
/// let output = get_user.call(json!({"id": 7})).await.unwrap();
/// assert_eq!(output, json!({"url": "/users/7"}));
/// # });
/// ```
#[derive(Clone)]
pub struct ApiClient {
    action: Arc<dyn Action>,
    pipeline: Pipeline,
    merge: Arc<dyn MergeConfig>,
    initial_config: ConfigMap,
}

impl ApiClient {
    /// Creates a client with no middleware and shallow config merging.
    #[must_use]
    pub fn new<A: Action>(action: A) -> Self {
        Self::builder(action).build()
    }

    /// Returns a builder.
    #[must_use]
    pub fn builder<A: Action>(action: A) -> ApiClientBuilder {
        ApiClientBuilder::new(Arc::new(action))
    }

    /// Returns the pipeline shared by every handler.
    #[must_use]
    pub const fn pipeline(&self) -> &Pipeline {
        &self.pipeline
    }

    /// Returns the initial request config.
    #[must_use]
    pub const fn initial_config(&self) -> &ConfigMap {
        &self.initial_config
    }

    /// Returns a new client with `middleware` appended. `self` is unchanged.
    #[must_use]
    pub fn with_middleware<M: Middleware>(&self, middleware: M) -> Self {
        Self {
            pipeline: self.pipeline.with_middleware(Arc::new(middleware)),
            ..self.clone()
        }
    }

    /// Creates a handler for `method` and `url`.
    #[must_use]
    pub fn request(&self, method: Method, url: impl Into<String>) -> RequestHandler {
        RequestHandler::from_descriptor(RequestDescriptor::new(
            method,
            url.into(),
            self.initial_config.clone(),
            Arc::clone(&self.action),
            Arc::clone(&self.merge),
            self.pipeline.clone(),
        ))
    }

    /// Creates a `GET` handler.
    #[must_use]
    pub fn get(&self, url: impl Into<String>) -> RequestHandler {
        self.request(Method::GET, url)
    }

    /// Creates a `POST` handler.
    #[must_use]
    pub fn post(&self, url: impl Into<String>) -> RequestHandler {
        self.request(Method::POST, url)
    }

    /// Creates a `PUT` handler.
    #[must_use]
    pub fn put(&self, url: impl Into<String>) -> RequestHandler {
        self.request(Method::PUT, url)
    }

    /// Creates a `PATCH` handler.
    #[must_use]
    pub fn patch(&self, url: impl Into<String>) -> RequestHandler {
        self.request(Method::PATCH, url)
    }

    /// Creates a `DELETE` handler.
    #[must_use]
    pub fn delete(&self, url: impl Into<String>) -> RequestHandler {
        self.request(Method::DELETE, url)
    }

    /// Creates a `HEAD` handler.
    #[must_use]
    pub fn head(&self, url: impl Into<String>) -> RequestHandler {
        self.request(Method::HEAD, url)
    }

    /// Creates an `OPTIONS` handler.
    #[must_use]
    pub fn options(&self, url: impl Into<String>) -> RequestHandler {
        self.request(Method::OPTIONS, url)
    }
}

impl std::fmt::Debug for ApiClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApiClient")
            .field("pipeline", &self.pipeline)
            .field("initial_config", &self.initial_config)
            .finish_non_exhaustive()
    }
}

/// Builder for [`ApiClient`].
///
/// The outcome callbacks (`on_success`, `on_failure`, `on_finished`) are
/// installed as one observer stage after every other middleware, so they
/// see the resolved request and the action's own result. They never change
/// that result.
pub struct ApiClientBuilder {
    action: Arc<dyn Action>,
    pipeline: PipelineBuilder,
    observer: ObserverMiddleware,
    merge: Arc<dyn MergeConfig>,
    initial_config: ConfigMap,
}

impl ApiClientBuilder {
    fn new(action: Arc<dyn Action>) -> Self {
        Self {
            action,
            pipeline: PipelineBuilder::new(),
            observer: ObserverMiddleware::new(),
            merge: Arc::new(ShallowMerge),
            initial_config: ConfigMap::new(),
        }
    }

    /// Appends a middleware stage.
    #[must_use]
    pub fn middleware<M: Middleware>(mut self, middleware: M) -> Self {
        self.pipeline = self.pipeline.middleware(middleware);
        self
    }

    /// Appends an already shared middleware stage.
    #[must_use]
    pub fn middleware_arc(mut self, middleware: BoxedMiddleware) -> Self {
        self.pipeline = self.pipeline.middleware_arc(middleware);
        self
    }

    /// Sets the error boundary.
    #[must_use]
    pub fn on_error<H: ErrorHandler>(mut self, handler: H) -> Self {
        self.pipeline = self.pipeline.on_error(handler);
        self
    }

    /// Sets the callback for calls whose action succeeded.
    #[must_use]
    pub fn on_success<F>(mut self, hook: F) -> Self
    where
        F: Fn(&Observation<'_>) + Send + Sync + 'static,
    {
        self.observer = self.observer.on_success(hook);
        self
    }

    /// Sets the callback for calls that failed below the observer.
    #[must_use]
    pub fn on_failure<F>(mut self, hook: F) -> Self
    where
        F: Fn(&Observation<'_>) + Send + Sync + 'static,
    {
        self.observer = self.observer.on_failure(hook);
        self
    }

    /// Sets the callback that runs after every call, success or not.
    #[must_use]
    pub fn on_finished<F>(mut self, hook: F) -> Self
    where
        F: Fn(&Observation<'_>) + Send + Sync + 'static,
    {
        self.observer = self.observer.on_finished(hook);
        self
    }

    /// Sets the config merge strategy.
    #[must_use]
    pub fn merge_config<M: MergeConfig>(mut self, merge: M) -> Self {
        self.merge = Arc::new(merge);
        self
    }

    /// Sets the initial request config.
    #[must_use]
    pub fn initial_config(mut self, config: ConfigMap) -> Self {
        self.initial_config = config;
        self
    }

    /// Applies loaded client settings: appends a path parameter stage and
    /// adds `default_config` to the initial config.
    #[must_use]
    pub fn config(mut self, config: &ClientConfig) -> Self {
        let mut stage = PathParamsMiddleware::new()
            .style(config.path_param_style)
            .strip(config.strip_path_params);
        if let Some(base_url) = &config.base_url {
            stage = stage.base_url(base_url.clone());
        }
        self.pipeline = self.pipeline.middleware(stage);
        self.initial_config.extend(config.default_config.clone());
        self
    }

    /// Builds the client.
    #[must_use]
    pub fn build(self) -> ApiClient {
        let pipeline = if self.observer.is_empty() {
            self.pipeline
        } else {
            self.pipeline.middleware(self.observer)
        };
        ApiClient {
            action: self.action,
            pipeline: pipeline.build(),
            merge: self.merge,
            initial_config: self.initial_config,
        }
    }
}

impl std::fmt::Debug for ApiClientBuilder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApiClientBuilder")
            .field("observer", &self.observer)
            .field("initial_config", &self.initial_config)
            .finish_non_exhaustive()
    }
}
