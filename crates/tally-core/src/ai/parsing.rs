//! JSON parsing helpers for AI backend responses
//!
//! Models are told to answer with a bare JSON object but often wrap it in a
//! markdown code fence anyway. The fence is stripped; anything else is decoded
//! as-is so that a prompt contract break shows up as `MalformedResponse`.

use serde_json::Value;
use tracing::debug;

use crate::error::{Error, Result, UNREADABLE_MESSAGE};

use super::types::ExtractionCandidate;

/// Value of the `error` field the model uses to say it could not read the input
const UNREADABLE_SENTINEL: &str = "unreadable";

/// Longest raw response echoed back inside an error
const MAX_RAW_IN_ERROR: usize = 500;

/// Remove a surrounding markdown code fence, with or without a language label
pub fn strip_code_fence(response: &str) -> &str {
    let trimmed = response.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };

    // Skip the language label (```json, ```JSON, ```javascript)
    let label_len = rest
        .find(|c: char| !c.is_ascii_alphanumeric())
        .unwrap_or(rest.len());
    let body = &rest[label_len..];
    let body = body.strip_suffix("```").unwrap_or(body);

    body.trim()
}

/// Decode a model response into an extraction candidate
///
/// Fails with `MalformedResponse` when the text is not a JSON object and with
/// `UnreadableInput` when the model returned the `{"error": "unreadable"}`
/// sentinel. No plausibility checks happen here.
pub fn parse_extraction_response(response: &str) -> Result<ExtractionCandidate> {
    let cleaned = strip_code_fence(response);

    let value: Value = serde_json::from_str(cleaned).map_err(|e| malformed(response, e))?;

    let Value::Object(ref object) = value else {
        return Err(malformed(response, "expected a JSON object"));
    };

    if object.get("error").and_then(Value::as_str) == Some(UNREADABLE_SENTINEL) {
        let message = object
            .get("message")
            .and_then(Value::as_str)
            .filter(|m| !m.trim().is_empty())
            .unwrap_or(UNREADABLE_MESSAGE);
        debug!(message = %message, "Model reported unreadable input");
        return Err(Error::UnreadableInput(message.to_string()));
    }

    serde_json::from_value(value).map_err(|e| malformed(response, e))
}

fn malformed(raw: &str, cause: impl std::fmt::Display) -> Error {
    // Truncate long responses for the error message
    let raw = if raw.len() > MAX_RAW_IN_ERROR {
        let mut end = MAX_RAW_IN_ERROR;
        while !raw.is_char_boundary(end) {
            end -= 1;
        }
        format!("{}...", &raw[..end])
    } else {
        raw.to_string()
    };
    Error::MalformedResponse {
        raw,
        cause: cause.to_string(),
    }
}
