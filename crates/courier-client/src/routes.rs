//! Static routing tables.
//!
//! A [`Routes`] table maps dotted paths (`"users.list"`) to endpoints. The
//! table is built once and looked up by walking one segment at a time.

use std::collections::BTreeMap;
use std::sync::Arc;

use courier_core::{ApiError, BoxFuture, ConfigMap};
use serde_json::Value;

use crate::handler::RequestHandler;

/// Something a routing table can invoke with JSON input.
pub trait Endpoint: Send + Sync + 'static {
    /// Invokes the endpoint.
    fn invoke<'a>(&'a self, input: Value) -> BoxFuture<'a, Result<Value, ApiError>>;
}

impl<I: 'static, O: 'static> Endpoint for RequestHandler<I, O> {
    fn invoke<'a>(&'a self, input: Value) -> BoxFuture<'a, Result<Value, ApiError>> {
        Box::pin(self.descriptor().run(input, ConfigMap::new()))
    }
}

/// A node in a routing table.
#[derive(Clone)]
pub enum RouteNode {
    /// A callable endpoint.
    Endpoint(Arc<dyn Endpoint>),
    /// A nested table.
    Group(Routes),
}

/// A nested routing table.
///
/// # Example
///
/// ```
/// use courier_client::{ApiClient, Routes};
/// use courier_core::NoopAction;
///
/// let client = ApiClient::new(NoopAction);
/// let routes = Routes::new()
///     .route("users.list", client.get("/users"))
///     .route("users.create", client.post("/users"));
///
/// assert!(routes.lookup("users.list").is_some());
/// assert!(routes.lookup("users").is_none());
/// assert_eq!(routes.paths(), vec!["users.create", "users.list"]);
/// ```
#[derive(Clone, Default)]
pub struct Routes {
    entries: BTreeMap<String, RouteNode>,
}

impl Routes {
    /// Creates an empty table.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `endpoint` at a dotted `path`, creating groups as needed.
    ///
    /// A later registration at the same path replaces the earlier one.
    #[must_use]
    pub fn route<E: Endpoint>(mut self, path: &str, endpoint: E) -> Self {
        let segments: Vec<&str> = path.split('.').collect();
        self.insert(&segments, Arc::new(endpoint));
        self
    }

    /// Mounts `routes` under `name`.
    #[must_use]
    pub fn group(mut self, name: impl Into<String>, routes: Self) -> Self {
        self.entries.insert(name.into(), RouteNode::Group(routes));
        self
    }

    fn insert(&mut self, segments: &[&str], endpoint: Arc<dyn Endpoint>) {
        match segments {
            [] => {}
            [last] => {
                self.entries
                    .insert((*last).to_string(), RouteNode::Endpoint(endpoint));
            }
            [first, rest @ ..] => {
                let node = self
                    .entries
                    .entry((*first).to_string())
                    .or_insert_with(|| RouteNode::Group(Self::new()));
                if let RouteNode::Endpoint(_) = node {
                    *node = RouteNode::Group(Self::new());
                }
                if let RouteNode::Group(group) = node {
                    group.insert(rest, endpoint);
                }
            }
        }
    }

    /// Finds the endpoint at a dotted `path`.
    #[must_use]
    pub fn lookup(&self, path: &str) -> Option<&Arc<dyn Endpoint>> {
        let mut table = self;
        let mut segments = path.split('.').peekable();
        while let Some(segment) = segments.next() {
            match (table.entries.get(segment)?, segments.peek()) {
                (RouteNode::Endpoint(endpoint), None) => return Some(endpoint),
                (RouteNode::Group(group), Some(_)) => table = group,
                _ => return None,
            }
        }
        None
    }

    /// Invokes the endpoint at `path`.
    ///
    /// # Errors
    ///
    /// `BAD_ROUTE` if nothing is registered at `path`, otherwise whatever
    /// the endpoint fails with.
    pub async fn call(&self, path: &str, input: Value) -> Result<Value, ApiError> {
        let Some(endpoint) = self.lookup(path) else {
            tracing::debug!(route = path, "no route matches");
            return Err(ApiError::bad_route(path));
        };
        endpoint.invoke(input).await
    }

    /// Returns every endpoint path, sorted.
    #[must_use]
    pub fn paths(&self) -> Vec<String> {
        let mut paths = Vec::new();
        self.collect_paths("", &mut paths);
        paths
    }

    fn collect_paths(&self, prefix: &str, out: &mut Vec<String>) {
        for (name, node) in &self.entries {
            let path = if prefix.is_empty() {
                name.clone()
            } else {
                format!("{prefix}.{name}")
            };
            match node {
                RouteNode::Endpoint(_) => out.push(path),
                RouteNode::Group(group) => group.collect_paths(&path, out),
            }
        }
    }

    /// Returns the number of endpoints.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries
            .values()
            .map(|node| match node {
                RouteNode::Endpoint(_) => 1,
                RouteNode::Group(group) => group.len(),
            })
            .sum()
    }

    /// Returns `true` if the table has no endpoints.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl std::fmt::Debug for Routes {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Routes").field("paths", &self.paths()).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use courier_core::ErrorCode;
    use serde_json::json;

    struct Constant(Value);

    impl Endpoint for Constant {
        fn invoke<'a>(&'a self, _input: Value) -> BoxFuture<'a, Result<Value, ApiError>> {
            let value = self.0.clone();
            Box::pin(async move { Ok(value) })
        }
    }

    #[tokio::test]
    async fn test_nested_lookup() {
        let routes = Routes::new()
            .route("users.list", Constant(json!("list")))
            .route("users.admin.ban", Constant(json!("ban")))
            .route("health", Constant(json!("ok")));

        assert_eq!(routes.call("users.list", Value::Null).await.unwrap(), json!("list"));
        assert_eq!(routes.call("users.admin.ban", Value::Null).await.unwrap(), json!("ban"));
        assert_eq!(routes.call("health", Value::Null).await.unwrap(), json!("ok"));
        assert_eq!(routes.len(), 3);
    }

    #[tokio::test]
    async fn test_unknown_path_is_bad_route() {
        let routes = Routes::new().route("users.list", Constant(json!(1)));

        for path in ["users", "users.list.extra", "posts.list", ""] {
            let err = routes.call(path, Value::Null).await.unwrap_err();
            assert_eq!(err.code(), Some(ErrorCode::BadRoute));
        }
    }

    #[test]
    fn test_group_mounts_table() {
        let users = Routes::new().route("list", Constant(json!(1)));
        let routes = Routes::new().group("users", users);
        assert!(routes.lookup("users.list").is_some());
        assert_eq!(routes.paths(), vec!["users.list"]);
    }

    #[test]
    fn test_later_route_replaces_earlier() {
        let routes = Routes::new()
            .route("users", Constant(json!(1)))
            .route("users.list", Constant(json!(2)));
        assert!(routes.lookup("users").is_none());
        assert!(routes.lookup("users.list").is_some());
    }
}
