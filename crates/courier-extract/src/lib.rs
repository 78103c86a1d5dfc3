//! # Courier Extract
//!
//! HTTP adapters for Courier route handlers.
//!
//! - [`extract_input`] - Turns an `http::Request<Bytes>` into handler input
//! - [`json_response`] / [`error_response`] - Turn outputs and errors into
//!   `http::Response<Full<Bytes>>`
//! - [`RouteBuilder`] / [`RouteHandler`] - A pipeline answering HTTP requests
//!
//! Routing itself is left to the caller: whatever matched the request
//! passes its path parameters as [`RouteParams`].

#![doc(html_root_url = "https://docs.rs/courier-extract/0.1.0")]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

mod input;
mod response;
mod route;

pub use input::{extract_input, from_body, from_query};
pub use response::{error_response, json_response};
pub use route::{RouteBuilder, RouteHandler, RouteParams};
