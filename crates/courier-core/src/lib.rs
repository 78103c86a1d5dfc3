//! # Courier Core
//!
//! Core types and traits for the Courier request builder.
//!
//! This crate provides the foundational types shared by every Courier crate:
//!
//! - [`ApiError`] / [`ErrorCode`] - The error taxonomy every failure normalizes to
//! - [`RequestConfig`] - The merged request configuration handed to actions
//! - [`MergeConfig`] - Strategy for merging initial and per-call configuration
//! - [`Schema`] - Async validation/transformation of input and output values
//! - [`Action`] - The terminal operation that actually performs a request
//! - [`ExecutionContext`] - Per-execution state flowing through middleware

#![doc(html_root_url = "https://docs.rs/courier-core/0.1.0")]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

mod action;
mod config;
mod context;
mod error;
mod schema;

use std::future::Future;
use std::pin::Pin;

pub use action::{action_fn, context_action_fn, Action, ContextAction, FnAction, NoopAction};
pub use config::{
    is_body_method, merge_fn, ConfigMap, DeepMerge, FnMerge, MergeConfig, PathParamStyle,
    RequestConfig, ShallowMerge,
};
pub use context::{ExecutionContext, ExecutionContextBuilder, ExecutionId, RawUrl};
pub use error::{ApiError, ApiResult, BoxError, ErrorCode, ErrorEnvelope};
pub use schema::{async_schema_fn, schema_fn, AsyncFnSchema, FnSchema, Schema, Typed};

/// A boxed, sendable future.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;
