//! Route handlers.
//!
//! A [`RouteHandler`] answers an `http::Request` with an `http::Response`:
//!
//! ```text
//! Request → input (query or body) → Pipeline → JSON response
//!                                       └─ error → JSON error envelope
//! ```
//!
//! The action sees a [`RequestConfig`] carrying the request method, the
//! request URI as `url` and the request headers under `headers`. Path
//! parameters extracted by the caller's router are available as the
//! [`RouteParams`] context extension.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use bytes::Bytes;
use courier_core::{Action, ApiError, ConfigMap, ExecutionContext, RequestConfig, Schema};
use courier_middleware::{ErrorHandler, Middleware, Pipeline};
use http::{HeaderMap, Request, Response, StatusCode};
use http_body_util::Full;
use serde_json::Value;

use crate::input::extract_input;
use crate::response::{error_response, json_response};

/// Path parameters matched by the router.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RouteParams(BTreeMap<String, String>);

impl RouteParams {
    /// Creates an empty set.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a parameter.
    #[must_use]
    pub fn with(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.0.insert(name.into(), value.into());
        self
    }

    /// Returns a parameter.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&str> {
        self.0.get(name).map(String::as_str)
    }

    /// Iterates over the parameters in name order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for RouteParams {
    fn from_iter<T: IntoIterator<Item = (K, V)>>(iter: T) -> Self {
        Self(
            iter.into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        )
    }
}

/// Builder for route handlers. Every method returns a new builder.
///
/// # Example
///
/// ```
/// use bytes::Bytes;
/// use courier_core::context_action_fn;
/// use courier_extract::{RouteBuilder, RouteParams};
/// use http::{Request, StatusCode};
/// use serde_json::json;
///
/// let show = RouteBuilder::new().action(context_action_fn(|_config, ctx| {
///     let id = ctx
///         .get_extension::<RouteParams>()
///         .and_then(|p| p.get("id"))
///         .map(str::to_string);
///     Box::pin(async move { Ok(json!({ "id": id })) })
/// }));
///
/// # tokio::runtime::Builder::new_current_thread().build().unwrap().block_on(async {
/// let request = Request::get("/users/7").body(Bytes::new()).unwrap();
/// let response = show.handle(request, RouteParams::new().with("id", "7")).await;
/// assert_eq!(response.status(), StatusCode::OK);
/// # });
/// ```
#[derive(Clone, Default)]
pub struct RouteBuilder {
    pipeline: Pipeline,
}

impl RouteBuilder {
    /// Creates an empty builder.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a middleware stage.
    #[must_use]
    pub fn middleware<M: Middleware>(&self, middleware: M) -> Self {
        Self {
            pipeline: self.pipeline.with_middleware(Arc::new(middleware)),
        }
    }

    /// Sets the error boundary.
    #[must_use]
    pub fn on_error<H: ErrorHandler>(&self, handler: H) -> Self {
        Self {
            pipeline: self.pipeline.with_error_handler(Arc::new(handler)),
        }
    }

    /// Sets the input schema.
    #[must_use]
    pub fn validator<S: Schema>(&self, schema: S) -> Self {
        Self {
            pipeline: self.pipeline.with_input_schema(Arc::new(schema)),
        }
    }

    /// Sets the output schema.
    #[must_use]
    pub fn selector<S: Schema>(&self, schema: S) -> Self {
        Self {
            pipeline: self.pipeline.with_output_schema(Arc::new(schema)),
        }
    }

    /// Finishes the builder with `action` as the terminal step.
    #[must_use]
    pub fn action<A: Action>(&self, action: A) -> RouteHandler {
        RouteHandler {
            pipeline: self.pipeline.clone(),
            action: Arc::new(action),
        }
    }
}

impl fmt::Debug for RouteBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RouteBuilder")
            .field("pipeline", &self.pipeline)
            .finish()
    }
}

/// A callable route handler.
#[derive(Clone)]
pub struct RouteHandler {
    pipeline: Pipeline,
    action: Arc<dyn Action>,
}

impl RouteHandler {
    /// Handles one request. Never fails: errors become error responses.
    pub async fn handle(
        &self,
        request: Request<Bytes>,
        params: RouteParams,
    ) -> Response<Full<Bytes>> {
        match self.run(request, params).await {
            Ok((status, output)) => json_response(status, &output),
            Err(err) => error_response(&err),
        }
    }

    async fn run(
        &self,
        request: Request<Bytes>,
        params: RouteParams,
    ) -> Result<(StatusCode, Value), ApiError> {
        let input = extract_input(&request)?;
        let mut extra = ConfigMap::new();
        extra.insert("headers".to_string(), headers_to_value(request.headers()));
        let config = RequestConfig::from_map(
            request.method().clone(),
            request.uri().to_string(),
            extra,
        );

        let (output, ctx) = self
            .pipeline
            .process_with_context(input, |input, parsed| {
                let mut ctx = ExecutionContext::builder(config, Arc::clone(&self.action))
                    .input(input)
                    .parsed_input(parsed)
                    .build();
                ctx.set_extension(params);
                ctx
            })
            .await?;

        Ok((ctx.status().unwrap_or(StatusCode::OK), output))
    }
}

impl fmt::Debug for RouteHandler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RouteHandler")
            .field("pipeline", &self.pipeline)
            .finish_non_exhaustive()
    }
}

fn headers_to_value(headers: &HeaderMap) -> Value {
    let mut map = ConfigMap::new();
    for (name, value) in headers {
        if let Ok(value) = value.to_str() {
            map.insert(name.as_str().to_string(), Value::String(value.to_string()));
        }
    }
    Value::Object(map)
}
