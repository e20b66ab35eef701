use std::collections::HashMap;
use std::sync::Arc;

use futures_util::future::join_all;

use super::parser::parse_judgment;
use super::types::{JudgmentRequest, JudgmentService, ValidationResult};
use crate::pipeline::screening::{ScreeningIndicator, LOW_CONFIDENCE};

pub const LOW_CONFIDENCE_REASON: &str = "low confidence, needs manual review";

/// Only indicators with a rule and a detected value are judged.
pub fn needs_validation(indicator: &ScreeningIndicator) -> bool {
    indicator.rule.is_some() && indicator.is_detected()
}

/// Judges indicators against their screening rules.
pub struct RuleValidator {
    service: Arc<dyn JudgmentService>,
}

impl RuleValidator {
    pub fn new(service: Arc<dyn JudgmentService>) -> Self {
        Self { service }
    }

    /// Judge one field. Never fails.
    ///
    /// Known confidence below 0.5 short-circuits to "warning" without
    /// calling the service. Service errors become "warning" with the error
    /// as the reason.
    pub async fn validate(&self, request: &JudgmentRequest) -> ValidationResult {
        if request.confidence.is_some_and(|c| c < LOW_CONFIDENCE) {
            tracing::debug!(
                field = request.field_name.as_str(),
                "Low confidence, skipping judgment service"
            );
            return ValidationResult::warning(LOW_CONFIDENCE_REASON);
        }

        match self.service.judge(request).await {
            Ok(raw) => {
                let result = parse_judgment(&raw);
                tracing::info!(
                    field = request.field_name.as_str(),
                    status = %result.status,
                    "Field judged"
                );
                result
            }
            Err(e) => {
                tracing::warn!(
                    field = request.field_name.as_str(),
                    error = %e,
                    "Judgment failed, defaulting to manual review"
                );
                ValidationResult::warning(format!(
                    "Validation error: {e}; manual review recommended"
                ))
            }
        }
    }

    /// Judge every eligible indicator concurrently and return the complete
    /// set keyed by indicator id. One failure never affects the others.
    pub async fn validate_all(
        &self,
        indicators: &[ScreeningIndicator],
    ) -> HashMap<String, ValidationResult> {
        let requests: Vec<(String, JudgmentRequest)> = indicators
            .iter()
            .filter(|i| needs_validation(i))
            .filter_map(|i| Some((i.id.clone(), JudgmentRequest::for_indicator(i)?)))
            .collect();

        tracing::info!(count = requests.len(), "Validating indicators");

        let results = join_all(requests.iter().map(|(id, request)| async move {
            (id.clone(), self.validate(request).await)
        }))
        .await;

        results.into_iter().collect()
    }
}
