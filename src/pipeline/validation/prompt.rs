use super::types::JudgmentRequest;

pub const JUDGMENT_SYSTEM_PROMPT: &str =
    "You are a medical screening expert. Always respond with valid JSON only.";

/// Build the user prompt for one field judgment.
pub fn build_judgment_prompt(request: &JudgmentRequest) -> String {
    let context_block = match request.context.as_deref() {
        Some(context) if !context.is_empty() => {
            format!("\nOriginal Text Context (from document):\n\"{context}\"\n")
        }
        _ => String::new(),
    };
    let confidence = match request.confidence {
        Some(c) => format!("{}%", (c * 100.0).round() as i64),
        None => "unknown".to_string(),
    };

    format!(
        r#"You are a medical screening expert.

Field: {display_name} ({field_name})
Rule: {rule}
Extracted Value: "{value}"
{context_block}
Confidence Score: {confidence}

Please evaluate if the extracted value meets the rule. Consider:
1. Does the extracted value satisfy the rule requirements?
2. If context is provided, does the surrounding text support or contradict the extracted value?
3. Should this be flagged for manual review (e.g., ambiguous text, low confidence)?

Respond in JSON format:
{{
  "status": "pass|warning|fail",
  "reason": "Brief explanation"
}}

Status explanation:
- pass: The extracted value clearly meets the rule
- warning: The extracted value might need manual review (e.g., low confidence, ambiguous value, context conflicts)
- fail: The extracted value does not meet the rule

Respond ONLY with valid JSON, no other text."#,
        display_name = request.display_name,
        field_name = request.field_name,
        rule = request.rule,
        value = request.extracted_value,
    )
}
