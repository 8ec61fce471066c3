//! Error handling utilities for HTTP responses and error context formatting.

use crate::errors::GatewayError;
use reqwest::Response;
use serde::Deserialize;

/// Maximum characters to include from error body in context messages
const ERROR_BODY_PREVIEW_LENGTH: usize = 200;

/// Google's request ID header name.
///
/// Uniquely identifies each request; useful when contacting Google support or
/// correlating with server logs.
const REQUEST_ID_HEADER: &str = "x-goog-request-id";

/// Google's JSON error envelope: `{"error": {"code", "message", "status"}}`.
#[derive(Deserialize)]
struct ErrorEnvelope {
    error: ErrorBody,
}

#[derive(Deserialize)]
struct ErrorBody {
    message: String,
}

/// Checks if an HTTP response is successful, returning it if so or an error otherwise.
///
/// # Errors
///
/// Returns [`GatewayError::Api`] with status code and message on non-success status.
pub async fn check_response(response: Response) -> Result<Response, GatewayError> {
    if response.status().is_success() {
        Ok(response)
    } else {
        Err(read_error_with_context(response).await)
    }
}

/// Reads an error response and builds a [`GatewayError::Api`].
///
/// The message is Google's `error.message` when the body is the standard JSON
/// envelope, otherwise the first 200 characters of the raw body.
pub async fn read_error_with_context(response: Response) -> GatewayError {
    let status_code = response.status().as_u16();

    // Headers must be read before the body consumes the response.
    let request_id = response
        .headers()
        .get(REQUEST_ID_HEADER)
        .and_then(|v| v.to_str().ok())
        .map(String::from);

    let error_body = response
        .text()
        .await
        .unwrap_or_else(|e| format!("Failed to read error body: {}", e));

    GatewayError::Api {
        status_code,
        message: extract_error_message(&error_body),
        request_id,
    }
}

/// Pulls `error.message` out of a Google error body, falling back to a preview.
pub fn extract_error_message(body: &str) -> String {
    match serde_json::from_str::<ErrorEnvelope>(body) {
        Ok(envelope) => envelope.error.message,
        Err(_) => truncate_for_context(body, ERROR_BODY_PREVIEW_LENGTH),
    }
}

/// Deserializes `text` as `T`, reporting a preview of the payload on failure.
pub fn deserialize_with_context<T: serde::de::DeserializeOwned>(
    text: &str,
    what: &str,
) -> Result<T, GatewayError> {
    serde_json::from_str(text).map_err(|e| {
        GatewayError::MalformedResponse(format!(
            "{what}: {}",
            format_json_parse_error(text, e)
        ))
    })
}

/// Formats JSON parsing context by including a preview of the raw JSON.
pub fn format_json_parse_error(json_str: &str, error: serde_json::Error) -> String {
    let preview = truncate_for_context(json_str, ERROR_BODY_PREVIEW_LENGTH);
    format!("JSON parse error: {} | Context: {}", error, preview)
}

/// Truncates a string to specified length, adding "..." if truncated.
///
/// Cuts on a character boundary so multi-byte UTF-8 input cannot panic.
fn truncate_for_context(s: &str, max_len: usize) -> String {
    if s.len() <= max_len {
        s.to_string()
    } else {
        let truncate_at = s
            .char_indices()
            .take_while(|(i, c)| i + c.len_utf8() <= max_len)
            .last()
            .map(|(i, c)| i + c.len_utf8())
            .unwrap_or(0);
        format!("{}...", &s[..truncate_at])
    }
}
