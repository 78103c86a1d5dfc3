//! Response builders.
//!
//! Successful outputs become a JSON body with the execution's status (or
//! `200 OK`). Errors become an [`ErrorEnvelope`](courier_core::ErrorEnvelope)
//! with the status of their code.

use bytes::Bytes;
use courier_core::ApiError;
use http::{header, HeaderValue, Response, StatusCode};
use http_body_util::Full;
use serde_json::Value;

/// Builds a JSON response.
///
/// # Example
///
/// ```
/// use courier_extract::json_response;
/// use http::StatusCode;
/// use serde_json::json;
///
/// let response = json_response(StatusCode::CREATED, &json!({"id": 1}));
/// assert_eq!(response.status(), StatusCode::CREATED);
/// assert_eq!(response.headers()["content-type"], "application/json");
/// ```
#[must_use]
pub fn json_response(status: StatusCode, body: &Value) -> Response<Full<Bytes>> {
    let mut response = Response::new(Full::new(Bytes::from(body.to_string())));
    *response.status_mut() = status;
    response.headers_mut().insert(
        header::CONTENT_TYPE,
        HeaderValue::from_static("application/json"),
    );
    response
}

/// Builds the error response for `err`.
///
/// # Example
///
/// ```
/// use courier_core::ApiError;
/// use courier_extract::error_response;
/// use http::StatusCode;
///
/// let response = error_response(&ApiError::bad_route("users.delete"));
/// assert_eq!(response.status(), StatusCode::NOT_FOUND);
/// ```
#[must_use]
pub fn error_response(err: &ApiError) -> Response<Full<Bytes>> {
    let status = err.status_code();
    if status.is_server_error() {
        tracing::warn!(code = ?err.code(), error = %err, "request failed");
    } else {
        tracing::debug!(code = ?err.code(), error = %err, "request rejected");
    }
    let envelope = serde_json::to_value(err.to_envelope()).unwrap_or_else(|_| {
        serde_json::json!({ "message": err.message() })
    });
    json_response(status, &envelope)
}
