//! Error types for Courier.
//!
//! Every failure surfaced by a handler is an [`ApiError`]. Errors carry an
//! optional [`ErrorCode`], a human-readable message and an optional `cause`
//! chain exposed through [`std::error::Error::source`].
//!
//! | `ErrorCode`     | Raised when                                    | Status |
//! |-----------------|------------------------------------------------|--------|
//! | `BadInput`      | input schema rejects the input                 | 400    |
//! | `BadOutput`     | output schema rejects the output               | 500    |
//! | `BadRequest`    | the pipeline finished without a valid output   | 400    |
//! | `BadRoute`      | a dotted route path does not resolve           | 404    |
//! | `AccessDenied`  | a guard refused the request                    | 403    |
//! | `HttpError`     | the action itself failed                       | 502    |

use http::StatusCode;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use thiserror::Error;

/// Boxed error type accepted from actions and schemas.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Result type alias using [`ApiError`].
pub type ApiResult<T> = Result<T, ApiError>;

/// Classification codes for [`ApiError`].
///
/// Codes serialize as `SCREAMING_SNAKE_CASE` (`"BAD_INPUT"`, `"ACCESS_DENIED"`, ...).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    /// Input failed validation.
    BadInput,
    /// Output failed validation.
    BadOutput,
    /// The pipeline completed without producing a valid output.
    BadRequest,
    /// A route path did not resolve to a handler.
    BadRoute,
    /// A guard refused the request.
    AccessDenied,
    /// The underlying action failed.
    HttpError,
}

impl ErrorCode {
    /// Returns the wire name of this code.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::BadInput => "BAD_INPUT",
            Self::BadOutput => "BAD_OUTPUT",
            Self::BadRequest => "BAD_REQUEST",
            Self::BadRoute => "BAD_ROUTE",
            Self::AccessDenied => "ACCESS_DENIED",
            Self::HttpError => "HTTP_ERROR",
        }
    }

    /// Returns the HTTP status code used when this error crosses an HTTP boundary.
    #[must_use]
    pub const fn status_code(self) -> StatusCode {
        match self {
            Self::BadInput | Self::BadRequest => StatusCode::BAD_REQUEST,
            Self::BadRoute => StatusCode::NOT_FOUND,
            Self::AccessDenied => StatusCode::FORBIDDEN,
            Self::BadOutput => StatusCode::INTERNAL_SERVER_ERROR,
            Self::HttpError => StatusCode::BAD_GATEWAY,
        }
    }
}

impl std::fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The error type returned by every Courier handler.
///
/// # Example
///
/// ```
/// use courier_core::{ApiError, ErrorCode};
///
/// let err = ApiError::access_denied("GET", "/admin");
/// assert_eq!(err.code(), Some(ErrorCode::AccessDenied));
/// assert_eq!(err.message(), "You don't have access to GET /admin");
/// ```
#[derive(Error, Debug)]
#[error("{message}")]
pub struct ApiError {
    code: Option<ErrorCode>,
    message: String,
    #[source]
    source: Option<BoxError>,
    integrity: bool,
}

impl ApiError {
    /// Creates an error with a code and message.
    #[must_use]
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code: Some(code),
            message: message.into(),
            source: None,
            integrity: false,
        }
    }

    /// Creates an error without a code.
    #[must_use]
    pub fn from_message(message: impl Into<String>) -> Self {
        Self {
            code: None,
            message: message.into(),
            source: None,
            integrity: false,
        }
    }

    /// Normalizes an arbitrary error into an `ApiError`.
    ///
    /// An `ApiError` passes through unchanged, except that a missing code is
    /// filled with `code`. Any other error is wrapped and kept as the cause.
    #[must_use]
    pub fn from_error(err: BoxError, code: ErrorCode) -> Self {
        match err.downcast::<Self>() {
            Ok(api) => {
                let mut api = *api;
                if api.code.is_none() && !api.integrity {
                    api.code = Some(code);
                }
                api
            }
            Err(other) => Self {
                code: Some(code),
                message: other.to_string(),
                source: Some(other),
                integrity: false,
            },
        }
    }

    /// Rebuilds an owned error from one shared between several waiters.
    #[must_use]
    pub fn from_shared(shared: Arc<Self>) -> Self {
        Self {
            code: shared.code,
            message: shared.message.clone(),
            integrity: shared.integrity,
            source: Some(Box::new(shared)),
        }
    }

    /// Attaches a cause.
    #[must_use]
    pub fn with_source(mut self, source: impl Into<BoxError>) -> Self {
        self.source = Some(source.into());
        self
    }

    /// Input failed validation.
    #[must_use]
    pub fn bad_input(source: impl Into<BoxError>) -> Self {
        Self::new(ErrorCode::BadInput, "input is not valid").with_source(source)
    }

    /// A path parameter was missing or not a primitive.
    #[must_use]
    pub fn bad_path_param(name: &str) -> Self {
        Self::new(ErrorCode::BadInput, format!("bad path parameter `{name}`"))
    }

    /// Output failed validation.
    #[must_use]
    pub fn bad_output(source: impl Into<BoxError>) -> Self {
        Self::new(ErrorCode::BadOutput, "output is not valid").with_source(source)
    }

    /// The pipeline finished without producing a valid output.
    #[must_use]
    pub fn no_output() -> Self {
        Self::new(ErrorCode::BadRequest, "no valid output produced")
    }

    /// A dotted route path did not resolve.
    #[must_use]
    pub fn bad_route(path: &str) -> Self {
        Self::new(ErrorCode::BadRoute, format!("no route matches `{path}`"))
    }

    /// A guard refused the request.
    #[must_use]
    pub fn access_denied(method: &str, url: &str) -> Self {
        Self::new(
            ErrorCode::AccessDenied,
            format!("You don't have access to {method} {url}"),
        )
    }

    /// The action failed.
    #[must_use]
    pub fn http_error(source: impl Into<BoxError>) -> Self {
        Self::from_error(source.into(), ErrorCode::HttpError)
    }

    /// A middleware invoked `next` more than once.
    ///
    /// This is an integrity violation: it bypasses any error handler.
    #[must_use]
    pub fn next_called_multiple_times() -> Self {
        Self {
            code: None,
            message: "next() called multiple times".to_string(),
            source: None,
            integrity: true,
        }
    }

    /// Returns the error code, if any.
    #[must_use]
    pub const fn code(&self) -> Option<ErrorCode> {
        self.code
    }

    /// Returns the message.
    #[must_use]
    pub fn message(&self) -> &str {
        &self.message
    }

    /// Returns `true` for composition integrity violations.
    #[must_use]
    pub const fn is_integrity_violation(&self) -> bool {
        self.integrity
    }

    /// Returns the HTTP status code for this error.
    #[must_use]
    pub const fn status_code(&self) -> StatusCode {
        match self.code {
            Some(code) => code.status_code(),
            None => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Converts this error into its serializable envelope.
    #[must_use]
    pub fn to_envelope(&self) -> ErrorEnvelope {
        ErrorEnvelope {
            code: self.code,
            message: self.message.clone(),
        }
    }
}

/// Wire form of an [`ApiError`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorEnvelope {
    /// The error code, if any.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub code: Option<ErrorCode>,
    /// Human-readable message.
    pub message: String,
}
