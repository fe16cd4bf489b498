//! Response interpretation shared by every endpoint.

use crate::{ApiError, ApiResult};
use serde_json::Value;

/// Message used when an error body carries neither `message` nor `error`.
pub const DEFAULT_ERROR_MESSAGE: &str = "Something went wrong";

/// Turn a raw HTTP response into a JSON payload.
///
/// - 204, `Content-Length: 0`, or a successful non-JSON/non-text body yield `Ok(None)`
/// - an empty successful body yields `Ok(None)`
/// - a non-2xx status yields an error whose message comes from the body's
///   `message` or `error` field; 401 maps to [`ApiError::Unauthorized`]
///
/// Token deletion on 401 is done by the caller, which owns the token source.
pub fn interpret_response(
    status: u16,
    content_type: Option<&str>,
    content_length: Option<&str>,
    body: &str,
) -> ApiResult<Option<Value>> {
    let ok = (200..300).contains(&status);

    if status == 204 {
        return Ok(None);
    }

    let textual = content_type
        .map(|ct| ct.contains("application/json") || ct.contains("text"))
        .unwrap_or(false);
    if ok && (content_length == Some("0") || !textual) {
        return Ok(None);
    }

    let trimmed = body.trim();
    let data = if trimmed.is_empty() {
        if ok {
            return Ok(None);
        }
        serde_json::json!({ "message": "Empty response" })
    } else {
        match serde_json::from_str::<Value>(trimmed) {
            Ok(value) => value,
            Err(e) if ok => return Err(ApiError::Decode(e.to_string())),
            Err(_) => serde_json::json!({ "message": "Invalid response format" }),
        }
    };

    if !ok {
        let message = error_message(&data);
        if status == 401 {
            return Err(ApiError::Unauthorized(message));
        }
        return Err(ApiError::Status { status, message });
    }

    Ok(Some(data))
}

fn error_message(data: &Value) -> String {
    ["message", "error"]
        .iter()
        .filter_map(|key| data.get(*key).and_then(Value::as_str))
        .find(|msg| !msg.is_empty())
        .unwrap_or(DEFAULT_ERROR_MESSAGE)
        .to_string()
}
