//! Human-readable error extraction for non-success responses.

use serde_json::Value;

/// Static description of an HTTP status code.
pub fn status_description(status: u16) -> String {
    let text = match status {
        400 => "Bad request - the API rejected the submitted data",
        401 => "Unauthorized - check your API credentials",
        403 => "Forbidden - the credentials lack permission for this action",
        404 => "Not found - the requested resource does not exist",
        405 => "Method not allowed",
        408 => "Request timeout",
        409 => "Conflict - the resource already exists",
        410 => "Gone - the resource is no longer available",
        413 => "Payload too large",
        415 => "Unsupported media type",
        422 => "Unprocessable entity - validation failed",
        429 => "Too many requests - rate limit exceeded",
        500 => "Internal server error",
        501 => "Not implemented",
        502 => "Bad gateway",
        503 => "Service unavailable",
        504 => "Gateway timeout",
        _ => return format!("HTTP error {}", status),
    };
    text.to_string()
}

/// Best-effort error message from a decoded response body.
///
/// Checked in order: `error` (string), `error.message`, `message`, `detail`,
/// `title`, `errors[0].message`.
pub fn extract_error(body: &Value) -> Option<String> {
    let candidates = [
        body.get("error"),
        body.get("error").and_then(|e| e.get("message")),
        body.get("message"),
        body.get("detail"),
        body.get("title"),
        body.get("errors")
            .and_then(|e| e.get(0))
            .and_then(|e| e.get("message")),
    ];

    candidates
        .into_iter()
        .flatten()
        .filter_map(Value::as_str)
        .map(str::trim)
        .find(|s| !s.is_empty())
        .map(str::to_string)
}
