//! Structured logging for Courier.
//!
//! Every Courier crate emits events through `tracing`. This crate installs
//! a subscriber for them:
//!
//! - **JSON** output for production, one object per event
//! - **Pretty** output for local development
//! - `EnvFilter` directives (`"info"`, `"courier_middleware=trace"`, ...)
//!
//! # Example
//!
//! ```rust,ignore
//! use courier_telemetry::{init_logging, LogConfig};
//!
//! init_logging(&LogConfig::development())?;
//! tracing::info!(url = "/users", "ready");
//! ```

#![doc(html_root_url = "https://docs.rs/courier-telemetry/0.1.0")]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

pub mod error;
pub mod logging;

pub use error::TelemetryError;
pub use logging::{create_env_filter, fields, init_logging, LogConfig};

/// Result type for telemetry operations.
pub type TelemetryResult<T> = Result<T, TelemetryError>;
