//! Request configuration and merge strategies.
//!
//! A handler carries an *initial* configuration; each call may pass a
//! *per-call* configuration. The two are merged through a [`MergeConfig`]
//! strategy into a free-form [`ConfigMap`], then the route's method and URL
//! are forced on top to produce the [`RequestConfig`] handed to the action.

use http::Method;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Free-form configuration map.
pub type ConfigMap = serde_json::Map<String, Value>;

/// Syntax used for path placeholders in route URLs.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PathParamStyle {
    /// `/users/:id`
    #[default]
    Colon,
    /// `/users/[id]`
    Bracket,
}

/// Returns `true` if input for `method` travels in the request body.
#[must_use]
pub fn is_body_method(method: &Method) -> bool {
    matches!(*method, Method::POST | Method::PUT | Method::PATCH)
}

/// The configuration an action receives.
///
/// `method` and `url` always come from the route. `params` carries the input
/// of body-less methods, `data` the input of POST/PUT/PATCH. Everything else
/// lives in `extra`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RequestConfig {
    /// HTTP method.
    #[serde(with = "method_serde")]
    pub method: Method,
    /// Request URL or URL template.
    pub url: String,
    /// Query parameters.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub params: Option<Value>,
    /// Request body.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
    /// Remaining configuration keys.
    #[serde(flatten)]
    pub extra: ConfigMap,
}

impl RequestConfig {
    /// Creates a config with no extra keys.
    #[must_use]
    pub fn new(method: Method, url: impl Into<String>) -> Self {
        Self {
            method,
            url: url.into(),
            params: None,
            data: None,
            extra: ConfigMap::new(),
        }
    }

    /// Builds a config from a merged map, forcing `method` and `url`.
    #[must_use]
    pub fn from_map(method: Method, url: impl Into<String>, mut map: ConfigMap) -> Self {
        map.remove("method");
        map.remove("url");
        let params = map.remove("params");
        let data = map.remove("data");
        Self {
            method,
            url: url.into(),
            params,
            data,
            extra: map,
        }
    }

    /// Places `input` in `data` or `params` depending on the method.
    #[must_use]
    pub fn with_input(mut self, input: Value) -> Self {
        if is_body_method(&self.method) {
            self.data = Some(input);
        } else {
            self.params = Some(input);
        }
        self
    }

    /// Returns an extra key.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.extra.get(key)
    }

    /// Sets an extra key.
    pub fn insert(&mut self, key: impl Into<String>, value: Value) {
        self.extra.insert(key.into(), value);
    }

    /// Returns a header from the `headers` object, if it is a string.
    #[must_use]
    pub fn header(&self, name: &str) -> Option<&str> {
        self.extra
            .get("headers")
            .and_then(|headers| headers.get(name))
            .and_then(Value::as_str)
    }

    /// Sets a header in the `headers` object, creating it if needed.
    pub fn set_header(&mut self, name: impl Into<String>, value: impl Into<String>) {
        let headers = self
            .extra
            .entry("headers")
            .or_insert_with(|| Value::Object(ConfigMap::new()));
        if !headers.is_object() {
            *headers = Value::Object(ConfigMap::new());
        }
        if let Value::Object(map) = headers {
            map.insert(name.into(), Value::String(value.into()));
        }
    }
}

/// Strategy for merging the initial config with a per-call config.
pub trait MergeConfig: Send + Sync + 'static {
    /// Merges `source` on top of `target`.
    fn merge(&self, target: ConfigMap, source: ConfigMap) -> ConfigMap;
}

/// Top-level key overwrite. This is the default strategy.
///
/// # Example
///
/// ```
/// use courier_core::{ConfigMap, MergeConfig, ShallowMerge};
/// use serde_json::json;
///
/// let target: ConfigMap = serde_json::from_value(json!({"a": 1, "h": {"x": 1}})).unwrap();
/// let source: ConfigMap = serde_json::from_value(json!({"h": {"y": 2}})).unwrap();
/// let merged = ShallowMerge.merge(target, source);
/// assert_eq!(serde_json::Value::Object(merged), json!({"a": 1, "h": {"y": 2}}));
/// ```
#[derive(Debug, Clone, Copy, Default)]
pub struct ShallowMerge;

impl MergeConfig for ShallowMerge {
    fn merge(&self, mut target: ConfigMap, source: ConfigMap) -> ConfigMap {
        target.extend(source);
        target
    }
}

/// Recursive merge of nested objects; non-object values overwrite.
#[derive(Debug, Clone, Copy, Default)]
pub struct DeepMerge;

impl MergeConfig for DeepMerge {
    fn merge(&self, mut target: ConfigMap, source: ConfigMap) -> ConfigMap {
        for (key, value) in source {
            match (target.remove(&key), value) {
                (Some(Value::Object(existing)), Value::Object(incoming)) => {
                    target.insert(key, Value::Object(self.merge(existing, incoming)));
                }
                (_, value) => {
                    target.insert(key, value);
                }
            }
        }
        target
    }
}

/// Merge strategy backed by a closure.
pub struct FnMerge<F>(F);

impl<F> std::fmt::Debug for FnMerge<F> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FnMerge").finish_non_exhaustive()
    }
}

/// Wraps a closure as a [`MergeConfig`].
pub fn merge_fn<F>(f: F) -> FnMerge<F>
where
    F: Fn(ConfigMap, ConfigMap) -> ConfigMap + Send + Sync + 'static,
{
    FnMerge(f)
}

impl<F> MergeConfig for FnMerge<F>
where
    F: Fn(ConfigMap, ConfigMap) -> ConfigMap + Send + Sync + 'static,
{
    fn merge(&self, target: ConfigMap, source: ConfigMap) -> ConfigMap {
        (self.0)(target, source)
    }
}

mod method_serde {
    use http::Method;
    use serde::{de, Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(method: &Method, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(method.as_str())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Method, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Method::from_bytes(raw.to_ascii_uppercase().as_bytes()).map_err(de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn map(value: Value) -> ConfigMap {
        match value {
            Value::Object(map) => map,
            _ => panic!("expected object"),
        }
    }

    #[test]
    fn test_from_map_forces_method_and_url() {
        let config = RequestConfig::from_map(
            Method::GET,
            "/users",
            map(json!({"method": "DELETE", "url": "/other", "timeout": 5})),
        );
        assert_eq!(config.method, Method::GET);
        assert_eq!(config.url, "/users");
        assert_eq!(config.get("timeout"), Some(&json!(5)));
        assert!(config.get("method").is_none());
    }

    #[test]
    fn test_with_input_placement() {
        let get = RequestConfig::new(Method::GET, "/q").with_input(json!({"a": 1}));
        assert_eq!(get.params, Some(json!({"a": 1})));
        assert_eq!(get.data, None);

        let post = RequestConfig::new(Method::POST, "/q").with_input(json!({"a": 1}));
        assert_eq!(post.data, Some(json!({"a": 1})));
        assert_eq!(post.params, None);
    }

    #[test]
    fn test_headers() {
        let mut config = RequestConfig::new(Method::GET, "/");
        assert_eq!(config.header("Authorization"), None);
        config.set_header("Authorization", "Bearer t");
        assert_eq!(config.header("Authorization"), Some("Bearer t"));
    }

    #[test]
    fn test_shallow_merge_overwrites_top_level() {
        let merged = ShallowMerge.merge(
            map(json!({"a": 1, "nested": {"x": 1}})),
            map(json!({"b": 2, "nested": {"y": 2}})),
        );
        assert_eq!(
            Value::Object(merged),
            json!({"a": 1, "b": 2, "nested": {"y": 2}})
        );
    }

    #[test]
    fn test_deep_merge_recurses() {
        let merged = DeepMerge.merge(
            map(json!({"headers": {"x": "1"}, "timeout": 5})),
            map(json!({"headers": {"y": "2"}, "timeout": 10})),
        );
        assert_eq!(
            Value::Object(merged),
            json!({"headers": {"x": "1", "y": "2"}, "timeout": 10})
        );
    }

    #[test]
    fn test_merge_fn() {
        let keep_target = merge_fn(|target, _source| target);
        let merged = keep_target.merge(map(json!({"a": 1})), map(json!({"a": 2})));
        assert_eq!(Value::Object(merged), json!({"a": 1}));
    }

    #[test]
    fn test_serde_shape() {
        let mut config = RequestConfig::new(Method::POST, "/users");
        config.insert("timeout", json!(3));
        let json = serde_json::to_value(&config).unwrap();
        assert_eq!(json, json!({"method": "POST", "url": "/users", "timeout": 3}));

        let back: RequestConfig = serde_json::from_value(json).unwrap();
        assert_eq!(back, config);
    }

    #[test]
    fn test_path_param_style_default() {
        assert_eq!(PathParamStyle::default(), PathParamStyle::Colon);
        let style: PathParamStyle = serde_json::from_value(json!("bracket")).unwrap();
        assert_eq!(style, PathParamStyle::Bracket);
    }
}
