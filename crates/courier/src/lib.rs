//! # Courier
//!
//! A typed request builder with composable async middleware.
//!
//! Build a client around an action (the function that actually performs a
//! request), derive handlers from it with fluent, non-mutating methods and
//! call them. Every call runs the same pipeline:
//!
//! ```text
//! input → validator → middleware … → action → middleware … → selector → output
//! ```
//!
//! # Crates
//!
//! | Module | Crate | Contents |
//! |--------|-------|----------|
//! | [`core`] | `courier-core` | Errors, request config, schemas, actions, execution context |
//! | [`middleware`] | `courier-middleware` | Composer, pipeline, built-in stages |
//! | [`client`] | `courier-client` | `ApiClient`, request handlers, server actions, routing tables |
//! | [`extract`] | `courier-extract` | `http` request/response adapters |
//! | [`config`] | `courier-config` | TOML/JSON/env configuration |
//! | [`telemetry`] | `courier-telemetry` | Logging setup |
//!
//! # Example
//!
//! ```
//! use courier::prelude::*;
//! use serde_json::json;
//!
//! let client = ApiClient::builder(action_fn(|config: RequestConfig| async move {
//!     Ok::<_, BoxError>(json!({ "fetched": config.url }))
//! }))
//! .middleware(PathParamsMiddleware::new())
//! .build();
//!
//! let get_user = client.get("/users/:id");
//!
//! # tokio::runtime::Builder::new_current_thread().build().unwrap().block_on(async {
//! let user = get_user.call(json!({ "id": 42 })).await?;
//! assert_eq!(user, json!({ "fetched": "/users/42" }));
//! # Ok::<_, ApiError>(())
//! # }).unwrap();
//! ```

#![doc(html_root_url = "https://docs.rs/courier/0.1.0")]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

pub use courier_client as client;
pub use courier_config as config;
pub use courier_core as core;
pub use courier_extract as extract;
pub use courier_middleware as middleware;
pub use courier_telemetry as telemetry;

/// Prelude module for convenient imports.
///
/// ```rust
/// use courier::prelude::*;
/// ```
pub mod prelude {
    pub use courier_core::{
        action_fn, async_schema_fn, context_action_fn, schema_fn, Action, ApiError, ApiResult,
        BoxError, ConfigMap, DeepMerge, ErrorCode, ExecutionContext, MergeConfig, RequestConfig,
        Schema, ShallowMerge, Typed,
    };

    pub use courier_middleware::stages::{
        GuardMiddleware, LoggerMiddleware, Observation, ObserverMiddleware, PathParamsMiddleware,
        RefreshTokenMiddleware,
    };
    pub use courier_middleware::{
        compose, error_handler_fn, Composer, ErrorHandler, FnMiddleware, Middleware, Next,
        Pipeline,
    };

    pub use courier_client::{
        ActionBuilder, ActionHandler, ActionInput, ApiClient, RequestHandler, Routes,
    };

    pub use courier_extract::{RouteBuilder, RouteHandler, RouteParams};

    pub use courier_config::{ConfigLoader, CourierConfig};
}
