//! Built-in middleware stages.
//!
//! None of these stages is installed by default; add them to a client or
//! pipeline in the order they should wrap each other.
//!
//! - [`path_params`] - substitute URL placeholders from the parsed input
//! - [`refresh_token`] - refresh credentials once and retry failed calls
//! - [`guard`] - refuse calls with `ACCESS_DENIED`
//! - [`logger`] - request/response log lines
//! - [`observer`] - success, failure and completion callbacks

pub mod guard;
pub mod logger;
pub mod observer;
pub mod path_params;
pub mod refresh_token;

// Re-export main types
pub use guard::GuardMiddleware;
pub use logger::LoggerMiddleware;
pub use observer::{Observation, ObserverMiddleware};
pub use path_params::PathParamsMiddleware;
pub use refresh_token::{RefreshTokenMiddleware, SingleFlight};
