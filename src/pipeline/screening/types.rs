use serde::{Deserialize, Serialize};

/// Value shown for a field the extraction service returned without any value.
pub const NOT_DETECTED: &str = "not detected";

/// Below this confidence an extracted field is only ever provisional.
pub const LOW_CONFIDENCE: f64 = 0.5;

/// Three-valued judgment shared by provisional indicator status and
/// rule validation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScreeningStatus {
    Pass,
    Warning,
    Fail,
}

impl ScreeningStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pass => "pass",
            Self::Warning => "warning",
            Self::Fail => "fail",
        }
    }

    /// Exact parse of a lowercase judgment label.
    pub fn parse(label: &str) -> Option<Self> {
        match label {
            "pass" => Some(Self::Pass),
            "warning" => Some(Self::Warning),
            "fail" => Some(Self::Fail),
            _ => None,
        }
    }
}

impl std::fmt::Display for ScreeningStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Enclosing box of a source region, in points from the page's top-left.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub x: f64,
    pub y: f64,
    pub w: f64,
    pub h: f64,
}

/// Anchor of an indicator's value in the source document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SourceLocation {
    /// 1-indexed page number.
    pub page: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bounding_box: Option<BoundingBox>,
    pub text: String,
}

/// Page dimensions as reported by the extraction service.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageInfo {
    pub page_number: u32,
    pub width: f64,
    pub height: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub unit: Option<String>,
}

/// One extracted field, screened.
///
/// `status` is the provisional extraction-quality judgment assigned at
/// transform time. It is never rewritten: rule validation, feedback and
/// manual decisions live in separate maps keyed by `id`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScreeningIndicator {
    pub id: String,
    pub field_name: String,
    pub display_name: String,
    pub value: String,
    pub status: ScreeningStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub confidence: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rule: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub context: Option<String>,
    pub criteria: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
    pub source_locations: Vec<SourceLocation>,
}

impl ScreeningIndicator {
    pub fn is_detected(&self) -> bool {
        self.value != NOT_DETECTED
    }

    /// Confidence is known and below the review threshold.
    pub fn is_low_confidence(&self) -> bool {
        self.confidence.is_some_and(|c| c < LOW_CONFIDENCE)
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScreeningSummary {
    pub pass_count: usize,
    pub total_count: usize,
    pub recommendation: String,
    pub concerns: Vec<String>,
    /// At least one indicator is provisionally "warning".
    pub needs_review: bool,
}

/// Output of one transform pass over an extraction payload.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScreeningResult {
    pub indicators: Vec<ScreeningIndicator>,
    pub summary: ScreeningSummary,
    pub pages: Vec<PageInfo>,
}

impl ScreeningResult {
    pub fn indicator(&self, id: &str) -> Option<&ScreeningIndicator> {
        self.indicators.iter().find(|i| i.id == id)
    }
}
