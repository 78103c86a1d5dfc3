//! Typed configuration for Courier.
//!
//! This crate provides a strongly-typed configuration for Courier clients
//! with support for:
//! - TOML and JSON configuration files
//! - Environment variable overrides
//! - Strict validation (fails on unknown fields)
//! - Layered configuration (defaults → file → env)
//!
//! # Example
//!
//! ```no_run
//! use courier_config::ConfigLoader;
//!
//! # fn main() -> Result<(), courier_config::ConfigError> {
//! let config = ConfigLoader::new()
//!     .with_defaults()
//!     .with_file("courier.toml")?
//!     .with_env_prefix("COURIER")
//!     .load()?;
//!
//! println!("strip path params: {}", config.client.strip_path_params);
//! # Ok(())
//! # }
//! ```
//!
//! # Configuration File Format
//!
//! ```toml
//! [client]
//! path_param_style = "colon"
//! strip_path_params = true
//! base_url = "https://api.example.com"
//!
//! [client.default_config]
//! timeout = 5000
//! headers = { Accept = "application/json" }
//!
//! [logging]
//! level = "info"
//! format = "json"
//! ```
//!
//! # Environment Variables
//!
//! | Variable | Field |
//! |----------|-------|
//! | `COURIER__CLIENT__PATH_PARAM_STYLE` | `client.path_param_style` |
//! | `COURIER__CLIENT__STRIP_PATH_PARAMS` | `client.strip_path_params` |
//! | `COURIER__CLIENT__BASE_URL` | `client.base_url` |
//! | `COURIER__LOGGING__ENABLED` | `logging.enabled` |
//! | `COURIER__LOGGING__LEVEL` | `logging.level` |
//! | `COURIER__LOGGING__FORMAT` | `logging.format` |
//! | `COURIER__LOGGING__ANSI_ENABLED` | `logging.ansi_enabled` |

#![doc(html_root_url = "https://docs.rs/courier-config/0.1.0")]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

mod config;
mod error;
mod loader;

pub use config::{ClientConfig, CourierConfig, LogFormat, LoggingConfig};
pub use error::ConfigError;
pub use loader::ConfigLoader;
