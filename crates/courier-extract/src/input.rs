//! Request input extraction.
//!
//! Body-less methods (`GET`, `HEAD`, `DELETE`, `OPTIONS`, ...) take their
//! input from the query string. `POST`, `PUT` and `PATCH` take it from the
//! body, decoded by `Content-Type`:
//!
//! | Content-Type | Input |
//! |--------------|-------|
//! | `application/json`, `*/*+json` | parsed JSON, `null` for an empty body |
//! | `application/x-www-form-urlencoded` | flat object of string fields |
//! | `multipart/*` | rejected with `BAD_INPUT` |
//! | missing or other | JSON if the body parses, `null` if it is empty |
//!
//! Query strings and forms are flattened the same way: every field becomes a
//! string and a repeated key keeps its last value.

use bytes::Bytes;
use courier_core::{is_body_method, ApiError, BoxError};
use http::{header, HeaderMap, Request};
use serde_json::{Map, Value};

/// Extracts the handler input from a request.
///
/// # Errors
///
/// `BAD_INPUT` if the query or body cannot be decoded.
///
/// # Example
///
/// ```
/// use bytes::Bytes;
/// use courier_extract::extract_input;
/// use http::Request;
/// use serde_json::json;
///
/// let request = Request::get("/users?page=2&sort=name").body(Bytes::new()).unwrap();
/// assert_eq!(extract_input(&request).unwrap(), json!({"page": "2", "sort": "name"}));
/// ```
pub fn extract_input(request: &Request<Bytes>) -> Result<Value, ApiError> {
    if is_body_method(request.method()) {
        from_body(request.headers(), request.body())
    } else {
        from_query(request.uri().query().unwrap_or_default())
    }
}

/// Flattens a query string into an object.
///
/// # Errors
///
/// `BAD_INPUT` if the query is not valid `application/x-www-form-urlencoded`.
pub fn from_query(query: &str) -> Result<Value, ApiError> {
    flatten_urlencoded(query.as_bytes())
}

/// Decodes a request body according to its `Content-Type`.
///
/// # Errors
///
/// `BAD_INPUT` for undecodable or multipart bodies.
pub fn from_body(headers: &HeaderMap, body: &Bytes) -> Result<Value, ApiError> {
    let content_type = headers
        .get(header::CONTENT_TYPE)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.parse::<mime::Mime>().ok());

    match content_type {
        Some(ct) if is_json(&ct) => parse_json(body),
        Some(ct) if ct.type_() == mime::APPLICATION && ct.subtype() == mime::WWW_FORM_URLENCODED => {
            flatten_urlencoded(body)
        }
        Some(ct) if ct.type_() == mime::MULTIPART => Err(ApiError::bad_input(BoxError::from(
            format!("unsupported content type `{ct}`"),
        ))),
        _ => parse_json(body),
    }
}

fn is_json(ct: &mime::Mime) -> bool {
    (ct.type_() == mime::APPLICATION && ct.subtype() == mime::JSON)
        || ct.suffix().is_some_and(|suffix| suffix == mime::JSON)
}

fn parse_json(body: &Bytes) -> Result<Value, ApiError> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Ok(Value::Null);
    }
    serde_json::from_slice(body).map_err(|err| {
        tracing::debug!(error = %err, "request body is not valid JSON");
        ApiError::bad_input(err)
    })
}

fn flatten_urlencoded(raw: &[u8]) -> Result<Value, ApiError> {
    let pairs: Vec<(String, String)> =
        serde_urlencoded::from_bytes(raw).map_err(ApiError::bad_input)?;
    Ok(Value::Object(
        pairs
            .into_iter()
            .map(|(key, value)| (key, Value::String(value)))
            .collect::<Map<String, Value>>(),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use courier_core::ErrorCode;
    use http::HeaderValue;
    use serde_json::json;

    fn post(content_type: Option<&'static str>, body: &'static str) -> Request<Bytes> {
        let mut request = Request::post("/submit")
            .body(Bytes::from_static(body.as_bytes()))
            .unwrap();
        if let Some(ct) = content_type {
            request
                .headers_mut()
                .insert(header::CONTENT_TYPE, HeaderValue::from_static(ct));
        }
        request
    }

    #[test]
    fn test_query_without_string_is_empty_object() {
        let request = Request::delete("/users/1").body(Bytes::new()).unwrap();
        assert_eq!(extract_input(&request).unwrap(), json!({}));
    }

    #[test]
    fn test_query_repeated_key_keeps_last() {
        assert_eq!(from_query("tag=a&tag=b").unwrap(), json!({"tag": "b"}));
    }

    #[test]
    fn test_query_percent_decoding() {
        assert_eq!(
            from_query("q=hello+world&path=%2Fhome").unwrap(),
            json!({"q": "hello world", "path": "/home"})
        );
    }

    #[test]
    fn test_json_body() {
        let request = post(Some("application/json; charset=utf-8"), r#"{"id": 1}"#);
        assert_eq!(extract_input(&request).unwrap(), json!({"id": 1}));
    }

    #[test]
    fn test_json_suffix_body() {
        let request = post(Some("application/merge-patch+json"), r#"{"id": 1}"#);
        assert_eq!(extract_input(&request).unwrap(), json!({"id": 1}));
    }

    #[test]
    fn test_form_body() {
        let request = post(Some("application/x-www-form-urlencoded"), "name=ada&age=36");
        assert_eq!(
            extract_input(&request).unwrap(),
            json!({"name": "ada", "age": "36"})
        );
    }

    #[test]
    fn test_empty_body_is_null() {
        assert_eq!(extract_input(&post(None, "")).unwrap(), Value::Null);
        assert_eq!(
            extract_input(&post(Some("application/json"), "  ")).unwrap(),
            Value::Null
        );
    }

    #[test]
    fn test_invalid_json_is_bad_input() {
        let err = extract_input(&post(Some("application/json"), "{oops")).unwrap_err();
        assert_eq!(err.code(), Some(ErrorCode::BadInput));
    }

    #[test]
    fn test_multipart_is_rejected() {
        let err = extract_input(&post(Some("multipart/form-data; boundary=x"), "--x--"))
            .unwrap_err();
        assert_eq!(err.code(), Some(ErrorCode::BadInput));
    }
}
