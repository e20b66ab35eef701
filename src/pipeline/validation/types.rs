use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use super::ValidationError;
use crate::pipeline::screening::{ScreeningIndicator, ScreeningStatus};

/// Judgment of one indicator against its rule.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationResult {
    pub status: ScreeningStatus,
    pub reason: String,
}

impl ValidationResult {
    pub fn warning(reason: impl Into<String>) -> Self {
        Self {
            status: ScreeningStatus::Warning,
            reason: reason.into(),
        }
    }
}

/// Everything the judgment service is told about one field.
#[derive(Debug, Clone, PartialEq)]
pub struct JudgmentRequest {
    pub field_name: String,
    pub display_name: String,
    pub extracted_value: String,
    pub rule: String,
    pub confidence: Option<f64>,
    pub context: Option<String>,
}

impl JudgmentRequest {
    /// Request for an indicator, or `None` when it has no rule.
    pub fn for_indicator(indicator: &ScreeningIndicator) -> Option<Self> {
        Some(Self {
            field_name: indicator.id.clone(),
            display_name: indicator.display_name.clone(),
            extracted_value: indicator.value.clone(),
            rule: indicator.rule.clone()?,
            confidence: indicator.confidence,
            context: indicator.context.clone(),
        })
    }
}

/// External judgment service abstraction (allows mocking).
///
/// Returns the raw text the model produced; interpretation is the
/// validator's job.
#[async_trait]
pub trait JudgmentService: Send + Sync {
    async fn judge(&self, request: &JudgmentRequest) -> Result<String, ValidationError>;
}
