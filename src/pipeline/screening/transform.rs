use std::collections::HashMap;

use super::context::extract_context;
use super::geometry::{normalize_sources_scaled, GeometryScale};
use super::payload::ExtractionPayload;
use super::rules::RuleBook;
use super::types::*;

/// Stable indicator id: lowercase, whitespace runs collapsed to `_`.
///
/// This id joins validations, feedback and manual decisions to their
/// indicator. "Patient Age" becomes "patient_age"; "patient_age" is
/// already normalized and maps to itself.
pub fn indicator_id(field_name: &str) -> String {
    let lower = field_name.to_lowercase();
    let mut id = String::with_capacity(lower.len());
    let mut in_whitespace = false;
    for c in lower.chars() {
        if c.is_whitespace() {
            if !in_whitespace {
                id.push('_');
            }
            in_whitespace = true;
        } else {
            id.push(c);
            in_whitespace = false;
        }
    }
    id
}

/// Percentage label for a confidence, e.g. "confidence 87%".
pub fn confidence_label(confidence: Option<f64>) -> String {
    match confidence {
        Some(c) => format!("confidence {}%", (c * 100.0).round() as i64),
        None => "confidence unknown".to_string(),
    }
}

/// Map an extraction payload to one provisional indicator per field.
///
/// Never fails: an empty or unrecognized payload yields an empty result.
pub fn transform_payload(payload: &ExtractionPayload, rules: &RuleBook) -> ScreeningResult {
    let fields = payload.fields();
    let markdown = payload.markdown();
    let pages = payload.pages();
    let scale = geometry_scale(&pages);

    tracing::debug!(
        fields = fields.len(),
        markdown_len = markdown.map(str::len).unwrap_or(0),
        "Transforming extraction payload"
    );

    let mapped = fields.iter().map(|(field_name, field)| {
        let confidence = field.confidence;
        let value = field
            .resolved_value()
            .unwrap_or_else(|| NOT_DETECTED.to_string());

        let low_confidence = confidence.is_some_and(|c| c < LOW_CONFIDENCE);
        let status = if value == NOT_DETECTED || low_confidence {
            ScreeningStatus::Warning
        } else {
            ScreeningStatus::Pass
        };

        let source_locations = normalize_sources_scaled(field.source.as_ref(), scale);
        let rule = rules.lookup(field_name).map(|r| r.rule.clone());
        let context = extract_context(&field.spans, markdown);

        tracing::debug!(
            field = field_name.as_str(),
            has_rule = rule.is_some(),
            has_context = context.is_some(),
            "Mapped field"
        );

        ScreeningIndicator {
            id: indicator_id(field_name),
            field_name: field_name.clone(),
            display_name: rules.display_name(field_name),
            value,
            status,
            confidence,
            rule,
            context,
            criteria: format!("Extracted from document: {field_name}"),
            note: source_locations
                .first()
                .map(|loc| format!("Detected on page {}", loc.page)),
            source_locations,
        }
    });
    let indicators = dedupe_by_id(mapped);

    let summary = summarize(&indicators);
    ScreeningResult {
        indicators,
        summary,
        pages,
    }
}

fn summarize(indicators: &[ScreeningIndicator]) -> ScreeningSummary {
    let pass_count = indicators
        .iter()
        .filter(|i| i.status == ScreeningStatus::Pass)
        .count();
    let total_count = indicators.len();

    let concerns: Vec<String> = indicators
        .iter()
        .filter(|i| i.status == ScreeningStatus::Warning)
        .map(|i| {
            format!(
                "{}: {} ({})",
                i.display_name,
                i.note.as_deref().unwrap_or("not detected or low confidence"),
                confidence_label(i.confidence)
            )
        })
        .collect();

    ScreeningSummary {
        pass_count,
        total_count,
        recommendation: format!(
            "Extracted {total_count} fields from the document. \
             Select an indicator to view its source location."
        ),
        needs_review: !concerns.is_empty(),
        concerns,
    }
}

/// One indicator per id. A later field whose name normalizes to an
/// existing id replaces it in place.
fn dedupe_by_id(indicators: impl Iterator<Item = ScreeningIndicator>) -> Vec<ScreeningIndicator> {
    let mut slots: HashMap<String, usize> = HashMap::new();
    let mut unique: Vec<ScreeningIndicator> = Vec::new();
    for indicator in indicators {
        match slots.get(&indicator.id) {
            Some(&slot) => {
                tracing::warn!(
                    id = indicator.id.as_str(),
                    "Duplicate indicator id; keeping the later field"
                );
                unique[slot] = indicator;
            }
            None => {
                slots.insert(indicator.id.clone(), unique.len());
                unique.push(indicator);
            }
        }
    }
    unique
}

/// Scale implied by the page units. Any page in an unknown unit disables
/// bounding boxes for the whole document.
fn geometry_scale(pages: &[PageInfo]) -> Option<GeometryScale> {
    for page in pages {
        if GeometryScale::for_unit(page.unit.as_deref()).is_none() {
            tracing::warn!(
                page = page.page_number,
                unit = page.unit.as_deref().unwrap_or_default(),
                "Unrecognized page unit; source locations will carry no bounding boxes"
            );
            return None;
        }
    }
    Some(GeometryScale::INCH)
}
