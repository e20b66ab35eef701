//! Extraction payload access.
//!
//! The extraction service's result shape is unstable: the same data has
//! been observed under several nesting paths. Each datum is therefore
//! resolved through an explicit, ordered list of lookup strategies, and
//! every field record is read leniently (a mistyped member is treated as
//! absent rather than failing the whole payload).

use serde_json::Value;

use super::types::{BoundingBox, PageInfo};

/// One lookup strategy: a human label and the JSON pointer it resolves.
#[derive(Debug, Clone, Copy)]
pub struct Lookup {
    pub label: &'static str,
    pub pointer: &'static str,
}

/// Field dictionary locations, highest priority first.
pub const FIELD_LOOKUPS: &[Lookup] = &[
    Lookup { label: "contents[0].fields", pointer: "/contents/0/fields" },
    Lookup { label: "result.contents[0].fields", pointer: "/result/contents/0/fields" },
    Lookup { label: "analyzedDocument.fields", pointer: "/analyzedDocument/fields" },
    Lookup { label: "fields", pointer: "/fields" },
];

/// Document markdown locations, highest priority first.
pub const MARKDOWN_LOOKUPS: &[Lookup] = &[
    Lookup { label: "result.contents[0].markdown", pointer: "/result/contents/0/markdown" },
    Lookup { label: "contents[0].markdown", pointer: "/contents/0/markdown" },
    Lookup { label: "analyzedDocument.markdown", pointer: "/analyzedDocument/markdown" },
];

/// Page metadata locations, highest priority first.
pub const PAGE_LOOKUPS: &[Lookup] = &[
    Lookup { label: "contents[0].pages", pointer: "/contents/0/pages" },
    Lookup { label: "result.contents[0].pages", pointer: "/result/contents/0/pages" },
];

/// Raw result received from the extraction service. Immutable once received.
#[derive(Debug, Clone, PartialEq)]
pub struct ExtractionPayload {
    raw: Value,
}

impl ExtractionPayload {
    pub fn new(raw: Value) -> Self {
        Self { raw }
    }

    pub fn raw(&self) -> &Value {
        &self.raw
    }

    /// Field records in payload order, from the first strategy that yields an object.
    pub fn fields(&self) -> Vec<(String, AnalyzerField)> {
        for lookup in FIELD_LOOKUPS {
            if let Some(Value::Object(map)) = self.raw.pointer(lookup.pointer) {
                tracing::debug!(
                    lookup = lookup.label,
                    count = map.len(),
                    "Resolved extraction fields"
                );
                return map
                    .iter()
                    .map(|(name, data)| (name.clone(), AnalyzerField::from_value(data)))
                    .collect();
            }
        }
        Vec::new()
    }

    /// Full document markdown, from the first strategy that yields a non-empty string.
    pub fn markdown(&self) -> Option<&str> {
        MARKDOWN_LOOKUPS.iter().find_map(|lookup| {
            self.raw
                .pointer(lookup.pointer)
                .and_then(Value::as_str)
                .filter(|s| !s.is_empty())
        })
    }

    pub fn pages(&self) -> Vec<PageInfo> {
        let Some(items) = PAGE_LOOKUPS
            .iter()
            .find_map(|lookup| self.raw.pointer(lookup.pointer).and_then(Value::as_array))
        else {
            return Vec::new();
        };

        items
            .iter()
            .filter_map(|page| {
                let page_number = page.get("pageNumber").and_then(Value::as_u64)?;
                Some(PageInfo {
                    page_number: u32::try_from(page_number).ok()?,
                    width: page.get("width").and_then(Value::as_f64).unwrap_or(0.0),
                    height: page.get("height").and_then(Value::as_f64).unwrap_or(0.0),
                    unit: page.get("unit").and_then(Value::as_str).map(str::to_string),
                })
            })
            .collect()
    }
}

/// Character span of a field's match within the document markdown.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TextSpan {
    pub offset: usize,
    pub length: usize,
}

/// Source-location encoding as delivered by the extraction service.
#[derive(Debug, Clone, PartialEq)]
pub enum RawSource {
    /// Packed polygon segments, e.g. `D(1,0.63,5.39,...);D(2,...)`.
    Encoded(String),
    Records(Vec<SourceRecord>),
}

/// A pre-structured source location record.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct SourceRecord {
    pub page: Option<u32>,
    pub bounding_box: Option<BoundingBox>,
    pub text: Option<String>,
}

/// One field of the extraction payload, read leniently.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct AnalyzerField {
    pub value_string: Option<String>,
    pub value_number: Option<f64>,
    pub value_boolean: Option<bool>,
    pub field_value: Option<String>,
    pub confidence: Option<f64>,
    pub spans: Vec<TextSpan>,
    pub source: Option<RawSource>,
}

impl AnalyzerField {
    pub fn from_value(data: &Value) -> Self {
        Self {
            value_string: data
                .get("valueString")
                .and_then(Value::as_str)
                .map(str::to_string),
            value_number: data
                .get("valueNumber")
                .and_then(Value::as_f64)
                .filter(|n| n.is_finite()),
            value_boolean: data.get("valueBoolean").and_then(Value::as_bool),
            field_value: data.get("fieldValue").and_then(scalar_to_string),
            confidence: data
                .get("confidence")
                .and_then(Value::as_f64)
                .filter(|c| c.is_finite()),
            spans: data
                .get("spans")
                .and_then(Value::as_array)
                .map(|spans| spans.iter().filter_map(parse_span).collect())
                .unwrap_or_default(),
            source: data.get("source").and_then(parse_source),
        }
    }

    /// Value resolution order: string, number, boolean, generic fallback.
    pub fn resolved_value(&self) -> Option<String> {
        self.value_string
            .clone()
            .or_else(|| self.value_number.map(|n| n.to_string()))
            .or_else(|| self.value_boolean.map(|b| b.to_string()))
            .or_else(|| self.field_value.clone())
    }
}

fn scalar_to_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

fn parse_span(span: &Value) -> Option<TextSpan> {
    Some(TextSpan {
        offset: usize::try_from(span.get("offset")?.as_u64()?).ok()?,
        length: usize::try_from(span.get("length")?.as_u64()?).ok()?,
    })
}

fn parse_source(source: &Value) -> Option<RawSource> {
    match source {
        Value::String(s) if !s.is_empty() => Some(RawSource::Encoded(s.clone())),
        Value::Array(items) => Some(RawSource::Records(
            items
                .iter()
                .filter(|item| item.is_object())
                .map(|item| SourceRecord {
                    page: item
                        .get("page")
                        .and_then(Value::as_u64)
                        .and_then(|p| u32::try_from(p).ok()),
                    bounding_box: item
                        .get("boundingBox")
                        .and_then(|b| serde_json::from_value(b.clone()).ok()),
                    text: item.get("text").and_then(Value::as_str).map(str::to_string),
                })
                .collect(),
        )),
        _ => None,
    }
}
