//! # Courier Client
//!
//! Typed request handlers built on the Courier middleware pipeline.
//!
//! - [`ApiClient`] - A factory with one method per HTTP verb, sharing an
//!   action, a middleware chain and an initial config
//! - [`RequestHandler`] - An immutable, callable handler with fluent
//!   mutators (`validator`, `selector`, `t`, `action`, `with_config`)
//! - [`ActionBuilder`] / [`ActionHandler`] - Server actions with bound
//!   arguments and state mode
//! - [`Routes`] - A static routing table keyed by dotted paths
//!
//! # Example
//!
//! ```
//! use courier_client::ApiClient;
//! use courier_core::{action_fn, schema_fn, ErrorCode, RequestConfig};
//! use serde_json::{json, Value};
//!
//! let client = ApiClient::new(action_fn(|_config: RequestConfig| async {
//!     Ok::<_, std::io::Error>(json!({"success": true}))
//! }));
//!
//! let create = client.post("/users").validator(schema_fn(|input: Value| {
//!     if input.get("name").is_some() { Ok(input) } else { Err("name is required") }
//! }));
//!
//! # tokio::runtime::Builder::new_current_thread().build().unwrap().block_on(async {
//! let err = create.call(json!({})).await.unwrap_err();
//! assert_eq!(err.code(), Some(ErrorCode::BadInput));
//!
//! let ok = create.call(json!({"name": "ada"})).await.unwrap();
//! assert_eq!(ok, json!({"success": true}));
//! # });
//! ```

#![doc(html_root_url = "https://docs.rs/courier-client/0.1.0")]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

mod action;
mod client;
mod handler;
mod routes;

pub use action::{ActionBuilder, ActionHandler, ActionInput, BoundArgs, PreviousState};
pub use client::{ApiClient, ApiClientBuilder};
pub use handler::{RequestDescriptor, RequestHandler};
pub use routes::{Endpoint, RouteNode, Routes};
