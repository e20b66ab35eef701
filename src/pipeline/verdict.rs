//! Verdict reconciliation.
//!
//! Combines each indicator's AI validation with optional human feedback
//! and, for "warning" validations, a mandatory manual decision. The AI
//! judgment stands unless a human actively overrides it. Nothing here
//! writes back to indicators or validations.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::pipeline::screening::{ScreeningIndicator, ScreeningStatus};
use crate::pipeline::validation::ValidationResult;

/// Human judgment of the AI validation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Feedback {
    Agree,
    Disagree,
}

/// Human override for indicators the AI left at "warning".
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ManualDecision {
    Pass,
    Fail,
}

/// Choosing the current value again clears it.
pub fn toggle<T: PartialEq + Copy>(current: Option<T>, chosen: T) -> Option<T> {
    if current == Some(chosen) {
        None
    } else {
        Some(chosen)
    }
}

/// Reconciled outcome of one indicator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum FinalOutcome {
    Pass,
    Fail,
    Undecided,
}

pub fn final_outcome(
    status: ScreeningStatus,
    feedback: Option<Feedback>,
    decision: Option<ManualDecision>,
) -> FinalOutcome {
    match status {
        ScreeningStatus::Warning => match decision {
            Some(ManualDecision::Pass) => FinalOutcome::Pass,
            Some(ManualDecision::Fail) => FinalOutcome::Fail,
            None => FinalOutcome::Undecided,
        },
        ScreeningStatus::Pass => match feedback {
            Some(Feedback::Disagree) => FinalOutcome::Fail,
            _ => FinalOutcome::Pass,
        },
        ScreeningStatus::Fail => match feedback {
            Some(Feedback::Agree) => FinalOutcome::Pass,
            _ => FinalOutcome::Fail,
        },
    }
}

/// Final pass/fail counts over every validated indicator.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Verdict {
    pub final_pass: usize,
    pub final_fail: usize,
    /// "warning" validations still waiting for a manual decision.
    pub undecided: usize,
}

pub fn reconcile(
    validations: &HashMap<String, ValidationResult>,
    feedback: &HashMap<String, Feedback>,
    decisions: &HashMap<String, ManualDecision>,
) -> Verdict {
    validations
        .iter()
        .map(|(id, validation)| {
            final_outcome(
                validation.status,
                feedback.get(id).copied(),
                decisions.get(id).copied(),
            )
        })
        .fold(Verdict::default(), |mut verdict, outcome| {
            match outcome {
                FinalOutcome::Pass => verdict.final_pass += 1,
                FinalOutcome::Fail => verdict.final_fail += 1,
                FinalOutcome::Undecided => verdict.undecided += 1,
            }
            verdict
        })
}

/// Indicators in one AI validation bucket.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Bucket {
    pub count: usize,
    /// Display names, in indicator order.
    pub names: Vec<String>,
}

/// AI validation results by status.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct AiTally {
    pub pass: Bucket,
    pub warning: Bucket,
    pub fail: Bucket,
}

impl AiTally {
    pub fn collect(
        indicators: &[ScreeningIndicator],
        validations: &HashMap<String, ValidationResult>,
    ) -> Self {
        let mut tally = Self::default();
        for indicator in indicators {
            if let Some(validation) = validations.get(&indicator.id) {
                let bucket = tally.bucket_mut(validation.status);
                bucket.count += 1;
                bucket.names.push(indicator.display_name.clone());
            }
        }
        tally
    }

    fn bucket_mut(&mut self, status: ScreeningStatus) -> &mut Bucket {
        match status {
            ScreeningStatus::Pass => &mut self.pass,
            ScreeningStatus::Warning => &mut self.warning,
            ScreeningStatus::Fail => &mut self.fail,
        }
    }
}

/// Human feedback counts.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct FeedbackTally {
    pub agree: usize,
    pub disagree: usize,
}

impl FeedbackTally {
    pub fn collect(feedback: &HashMap<String, Feedback>) -> Self {
        feedback.values().fold(Self::default(), |mut tally, f| {
            match f {
                Feedback::Agree => tally.agree += 1,
                Feedback::Disagree => tally.disagree += 1,
            }
            tally
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn validation(status: ScreeningStatus) -> ValidationResult {
        ValidationResult {
            status,
            reason: String::new(),
        }
    }

    fn indicator(id: &str, name: &str) -> ScreeningIndicator {
        ScreeningIndicator {
            id: id.into(),
            field_name: id.into(),
            display_name: name.into(),
            value: "x".into(),
            status: ScreeningStatus::Pass,
            confidence: None,
            rule: None,
            context: None,
            criteria: String::new(),
            note: None,
            source_locations: vec![],
        }
    }

    #[test]
    fn three_indicator_example() {
        let validations = HashMap::from([
            ("a".to_string(), validation(ScreeningStatus::Pass)),
            ("b".to_string(), validation(ScreeningStatus::Warning)),
            ("c".to_string(), validation(ScreeningStatus::Fail)),
        ]);
        let feedback = HashMap::from([("a".to_string(), Feedback::Disagree)]);
        let decisions = HashMap::from([("b".to_string(), ManualDecision::Pass)]);

        let verdict = reconcile(&validations, &feedback, &decisions);

        assert_eq!(verdict.final_pass, 1);
        assert_eq!(verdict.final_fail, 2);
        assert_eq!(verdict.undecided, 0);
    }

    #[test]
    fn warning_needs_manual_decision() {
        assert_eq!(
            final_outcome(ScreeningStatus::Warning, Some(Feedback::Agree), None),
            FinalOutcome::Undecided
        );
        assert_eq!(
            final_outcome(ScreeningStatus::Warning, None, Some(ManualDecision::Fail)),
            FinalOutcome::Fail
        );
    }

    #[test]
    fn pass_stands_unless_disagreed() {
        assert_eq!(final_outcome(ScreeningStatus::Pass, None, None), FinalOutcome::Pass);
        assert_eq!(
            final_outcome(ScreeningStatus::Pass, Some(Feedback::Agree), None),
            FinalOutcome::Pass
        );
        assert_eq!(
            final_outcome(ScreeningStatus::Pass, Some(Feedback::Disagree), None),
            FinalOutcome::Fail
        );
    }

    #[test]
    fn fail_stands_unless_agreed() {
        assert_eq!(final_outcome(ScreeningStatus::Fail, None, None), FinalOutcome::Fail);
        assert_eq!(
            final_outcome(ScreeningStatus::Fail, Some(Feedback::Disagree), None),
            FinalOutcome::Fail
        );
        assert_eq!(
            final_outcome(ScreeningStatus::Fail, Some(Feedback::Agree), None),
            FinalOutcome::Pass
        );
    }

    #[test]
    fn manual_decision_ignored_outside_warning() {
        assert_eq!(
            final_outcome(ScreeningStatus::Pass, None, Some(ManualDecision::Fail)),
            FinalOutcome::Pass
        );
    }

    #[test]
    fn toggle_sets_switches_and_clears() {
        assert_eq!(toggle(None, Feedback::Agree), Some(Feedback::Agree));
        assert_eq!(toggle(Some(Feedback::Agree), Feedback::Disagree), Some(Feedback::Disagree));
        assert_eq!(toggle(Some(Feedback::Agree), Feedback::Agree), None);
    }

    #[test]
    fn empty_inputs_give_empty_verdict() {
        let verdict = reconcile(&HashMap::new(), &HashMap::new(), &HashMap::new());
        assert_eq!(verdict, Verdict::default());
    }

    #[test]
    fn ai_tally_lists_names_in_indicator_order() {
        let indicators = vec![
            indicator("a", "Gender"),
            indicator("b", "HIV positive"),
            indicator("c", "Body temperature"),
            indicator("d", "Patient age"),
        ];
        let validations = HashMap::from([
            ("c".to_string(), validation(ScreeningStatus::Pass)),
            ("a".to_string(), validation(ScreeningStatus::Pass)),
            ("b".to_string(), validation(ScreeningStatus::Fail)),
        ]);

        let tally = AiTally::collect(&indicators, &validations);

        assert_eq!(tally.pass.count, 2);
        assert_eq!(tally.pass.names, vec!["Gender", "Body temperature"]);
        assert_eq!(tally.fail.names, vec!["HIV positive"]);
        assert_eq!(tally.warning, Bucket::default());
    }

    #[test]
    fn feedback_tally_counts() {
        let feedback = HashMap::from([
            ("a".to_string(), Feedback::Agree),
            ("b".to_string(), Feedback::Agree),
            ("c".to_string(), Feedback::Disagree),
        ]);
        assert_eq!(
            FeedbackTally::collect(&feedback),
            FeedbackTally { agree: 2, disagree: 1 }
        );
    }

    #[test]
    fn colliding_field_names_tally_once() {
        use crate::pipeline::screening::{transform_payload, ExtractionPayload, RuleBook};

        let result = transform_payload(
            &ExtractionPayload::new(serde_json::json!({
                "fields": {
                    "Gender": { "valueString": "female", "confidence": 0.9 },
                    "gender": { "valueString": "male", "confidence": 0.9 }
                }
            })),
            &RuleBook::builtin(),
        );
        let validations =
            HashMap::from([("gender".to_string(), validation(ScreeningStatus::Fail))]);

        let tally = AiTally::collect(&result.indicators, &validations);
        let verdict = reconcile(&validations, &HashMap::new(), &HashMap::new());
        assert_eq!(tally.fail.count, 1);
        assert_eq!(verdict.final_fail, tally.fail.count);
        assert_eq!(result.indicators[0].value, "male");
    }
}
