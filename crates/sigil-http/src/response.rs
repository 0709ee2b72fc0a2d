//! JSON response helpers.

use crate::body::SigilResponseBody;

/// Content type for JSON responses.
pub const CONTENT_TYPE: &str = "application/json";

/// Header carrying the request id on every response.
pub const REQUEST_ID_HEADER: &str = "x-request-id";

/// Build an error body.
///
/// ```json
/// { "error": "unauthorized", "reason": "request is too old" }
/// ```
///
/// `reason` is omitted when `None`.
#[must_use]
pub fn error_to_json(error: &str, reason: Option<&str>) -> serde_json::Value {
    let mut value = serde_json::json!({ "error": error });
    if let Some(reason) = reason {
        value["reason"] = serde_json::Value::from(reason);
    }
    value
}

/// Build a JSON error response.
#[must_use]
pub fn error_response(
    status: http::StatusCode,
    error: &str,
    reason: Option<&str>,
    request_id: &str,
) -> http::Response<SigilResponseBody> {
    json_response(status, &error_to_json(error, reason), request_id)
}

/// Build a JSON response.
#[must_use]
pub fn json_response(
    status: http::StatusCode,
    json: &serde_json::Value,
    request_id: &str,
) -> http::Response<SigilResponseBody> {
    http::Response::builder()
        .status(status)
        .header("content-type", CONTENT_TYPE)
        .header(REQUEST_ID_HEADER, request_id)
        .body(SigilResponseBody::from_json(json))
        .expect("valid JSON response")
}
