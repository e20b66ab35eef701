use serde_json::Value;

use super::types::ValidationResult;
use crate::pipeline::screening::ScreeningStatus;

pub const UNPARSEABLE_REASON: &str =
    "Could not parse the AI judgment; manual review recommended";
pub const UNKNOWN_STATUS_REASON: &str =
    "AI returned an unrecognized judgment; manual review recommended";

/// Interpret the judgment service's reply. Never fails.
///
/// The reply should be a bare JSON object `{status, reason}`; a ```json
/// fence around it is tolerated. Anything unparseable becomes "warning",
/// and an object whose status is not pass/warning/fail keeps its reason but
/// is downgraded to "warning".
pub fn parse_judgment(raw: &str) -> ValidationResult {
    let body = strip_code_fence(raw.trim());

    let Ok(Value::Object(obj)) = serde_json::from_str::<Value>(body) else {
        tracing::warn!(response_len = raw.len(), "Unparseable judgment response");
        return ValidationResult::warning(UNPARSEABLE_REASON);
    };

    let reason = obj
        .get("reason")
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|r| !r.is_empty())
        .map(str::to_string);

    match obj
        .get("status")
        .and_then(Value::as_str)
        .and_then(ScreeningStatus::parse)
    {
        Some(status) => ValidationResult {
            status,
            reason: reason.unwrap_or_else(|| format!("AI judged this field as {status}")),
        },
        None => {
            tracing::warn!(status = ?obj.get("status"), "Judgment status not recognized");
            ValidationResult::warning(reason.unwrap_or_else(|| UNKNOWN_STATUS_REASON.into()))
        }
    }
}

/// Contents of the first fenced block, or the input unchanged.
fn strip_code_fence(text: &str) -> &str {
    let Some(start) = text.find("```") else {
        return text;
    };
    let after_fence = &text[start + 3..];
    // Skip the info string (e.g. "json") up to the end of the fence line.
    let content_start = after_fence.find('\n').map(|i| i + 1).unwrap_or(0);
    let content = &after_fence[content_start..];
    match content.find("```") {
        Some(end) => content[..end].trim(),
        None => content.trim(),
    }
}
