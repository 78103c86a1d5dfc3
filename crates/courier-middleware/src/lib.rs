//! # Courier Middleware
//!
//! Middleware composition for Courier handlers.
//!
//! Middleware wraps the terminal action in onion order: code before
//! `next.run()` executes outer to inner, code after it executes inner to
//! outer.
//!
//! ```text
//! call → [A] → [B] → action
//!                       ↓
//! result ← [A] ← [B] ←──┘
//! ```
//!
//! ## Building Blocks
//!
//! | Type | Purpose |
//! |------|---------|
//! | [`Middleware`] | A stage with access to the context and the rest of the chain |
//! | [`Next`] | Continues the chain; may be run at most once per stage |
//! | [`Composer`] | Runs a list of middleware around a terminal step, with an optional error boundary |
//! | [`Pipeline`] | Composer plus input/output schemas: the full handler flow |
//!
//! ## Built-in Stages
//!
//! - [`stages::PathParamsMiddleware`] - substitute `:name` / `[name]` placeholders
//! - [`stages::RefreshTokenMiddleware`] - single-flight credential refresh and retry
//! - [`stages::GuardMiddleware`] - refuse requests with `ACCESS_DENIED`
//! - [`stages::LoggerMiddleware`] - request/response log lines
//!
//! ## Example
//!
//! ```
//! use courier_middleware::{compose, FnMiddleware, Middleware};
//! use std::sync::Arc;
//!
//! let logging: Arc<dyn Middleware> = Arc::new(FnMiddleware::new("noop", |ctx, next| {
//!     Box::pin(async move { next.run(ctx).await })
//! }));
//!
//! let composer = compose(vec![logging], None);
//! assert_eq!(composer.names(), vec!["noop"]);
//! ```

#![doc(html_root_url = "https://docs.rs/courier-middleware/0.1.0")]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

pub mod compose;
pub mod middleware;
pub mod pipeline;
pub mod stages;

pub use compose::{
    compose, error_handler_fn, terminal_fn, Composer, ErrorHandler, ExecuteAction,
    FnErrorHandler, FnTerminal, Terminal,
};
pub use courier_core::BoxFuture;
pub use middleware::{BoxedMiddleware, FnMiddleware, Middleware, Next};
pub use pipeline::{Pipeline, PipelineBuilder};
