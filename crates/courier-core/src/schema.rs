//! Validation schemas.
//!
//! A [`Schema`] validates a JSON value and may transform it. Schemas are used
//! for handler input, handler output and bound action arguments.

use crate::error::BoxError;
use crate::BoxFuture;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use std::future::Future;
use std::marker::PhantomData;

/// Validates and optionally transforms a value.
///
/// # Example
///
/// ```
/// use courier_core::{schema_fn, Schema};
/// use serde_json::json;
///
/// let positive = schema_fn(|value: serde_json::Value| match value.as_i64() {
///     Some(n) if n > 0 => Ok(value),
///     _ => Err("expected a positive integer"),
/// });
///
/// # tokio_test_block(async {
/// assert!(positive.validate(json!(3)).await.is_ok());
/// assert!(positive.validate(json!(-1)).await.is_err());
/// # });
/// # fn tokio_test_block<F: std::future::Future>(f: F) {
/// #     tokio::runtime::Builder::new_current_thread().build().unwrap().block_on(f);
/// # }
/// ```
pub trait Schema: Send + Sync + 'static {
    /// Validates `data`, returning the (possibly transformed) value.
    fn validate<'a>(&'a self, data: Value) -> BoxFuture<'a, Result<Value, BoxError>>;
}

/// Schema backed by a synchronous closure.
pub struct FnSchema<F>(F);

/// Wraps a synchronous closure as a [`Schema`].
pub fn schema_fn<F, E>(f: F) -> FnSchema<F>
where
    F: Fn(Value) -> Result<Value, E> + Send + Sync + 'static,
    E: Into<BoxError>,
{
    FnSchema(f)
}

impl<F, E> Schema for FnSchema<F>
where
    F: Fn(Value) -> Result<Value, E> + Send + Sync + 'static,
    E: Into<BoxError>,
{
    fn validate<'a>(&'a self, data: Value) -> BoxFuture<'a, Result<Value, BoxError>> {
        let result = (self.0)(data).map_err(Into::into);
        Box::pin(async move { result })
    }
}

/// Schema backed by an async closure.
pub struct AsyncFnSchema<F>(F);

/// Wraps an async closure as a [`Schema`].
pub fn async_schema_fn<F, Fut, E>(f: F) -> AsyncFnSchema<F>
where
    F: Fn(Value) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<Value, E>> + Send + 'static,
    E: Into<BoxError>,
{
    AsyncFnSchema(f)
}

impl<F, Fut, E> Schema for AsyncFnSchema<F>
where
    F: Fn(Value) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<Value, E>> + Send + 'static,
    E: Into<BoxError>,
{
    fn validate<'a>(&'a self, data: Value) -> BoxFuture<'a, Result<Value, BoxError>> {
        let fut = (self.0)(data);
        Box::pin(async move { fut.await.map_err(Into::into) })
    }
}

/// Schema that accepts values deserializable into `T`.
///
/// The value is round-tripped through `T`, so defaults and renames declared
/// with serde attributes are applied to the result.
pub struct Typed<T>(PhantomData<fn() -> T>);

impl<T> Typed<T> {
    /// Creates the schema.
    #[must_use]
    pub const fn new() -> Self {
        Self(PhantomData)
    }
}

impl<T> Default for Typed<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> std::fmt::Debug for Typed<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("Typed")
            .field(&std::any::type_name::<T>())
            .finish()
    }
}

impl<T> Schema for Typed<T>
where
    T: DeserializeOwned + Serialize + 'static,
{
    fn validate<'a>(&'a self, data: Value) -> BoxFuture<'a, Result<Value, BoxError>> {
        let result = serde_json::from_value::<T>(data)
            .and_then(|typed| serde_json::to_value(typed))
            .map_err(Into::into);
        Box::pin(async move { result })
    }
}
