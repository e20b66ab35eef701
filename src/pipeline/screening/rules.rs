//! Screening rule book.
//!
//! Each rule is keyed by the field name the extraction analyzer emits.
//! Lookup is an exact, case-insensitive name match; a field without a rule
//! is display-only and never sent to validation.

use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum RuleBookError {
    #[error("Cannot read rule book {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid rule book: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("Rule book entry {index} has an empty {member}")]
    EmptyMember { index: usize, member: &'static str },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScreeningRule {
    /// Field name as emitted by the extraction analyzer.
    pub field_name: String,
    pub display_name: String,
    /// Requirement the field's value must satisfy, in plain language.
    pub rule: String,
}

impl ScreeningRule {
    fn new(field_name: &str, display_name: &str, rule: &str) -> Self {
        Self {
            field_name: field_name.into(),
            display_name: display_name.into(),
            rule: rule.into(),
        }
    }
}

/// Readable names for common clinical fields that have no rule.
const DISPLAY_NAMES: &[(&str, &str)] = &[
    ("patient_age", "Patient age"),
    ("patient_name", "Patient name"),
    ("patient_id", "Patient ID"),
    ("diagnosis", "Diagnosis"),
    ("diagnosis_date", "Diagnosis date"),
    ("symptoms", "Symptoms"),
    ("medical_history", "Medical history"),
    ("current_medications", "Current medications"),
    ("allergies", "Allergies"),
    ("lab_results", "Lab results"),
    ("vital_signs", "Vital signs"),
    ("physical_examination", "Physical examination"),
];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuleBook {
    rules: Vec<ScreeningRule>,
}

impl RuleBook {
    /// Inclusion/exclusion rules of the default screening protocol. Field
    /// names match the `prefilter` analyzer schema.
    pub fn builtin() -> Self {
        Self {
            rules: vec![
                ScreeningRule::new("性别", "Gender", "Patient must be male"),
                ScreeningRule::new(
                    "患病时长",
                    "Disease duration",
                    "Disease duration must exceed 2 years",
                ),
                ScreeningRule::new(
                    "HIV阳性",
                    "HIV positive",
                    "Must not be HIV positive; a missing record also fails",
                ),
                ScreeningRule::new(
                    "药物过敏史",
                    "Drug allergy history",
                    "No history of drug allergy",
                ),
                ScreeningRule::new(
                    "体温",
                    "Body temperature",
                    "No recent fever (above 37 °C)",
                ),
            ],
        }
    }

    pub fn new(rules: Vec<ScreeningRule>) -> Self {
        Self { rules }
    }

    /// Parse a JSON array of rules, rejecting blank members.
    pub fn from_json(json: &str) -> Result<Self, RuleBookError> {
        let rules: Vec<ScreeningRule> = serde_json::from_str(json)?;
        for (index, rule) in rules.iter().enumerate() {
            if rule.field_name.trim().is_empty() {
                return Err(RuleBookError::EmptyMember { index, member: "fieldName" });
            }
            if rule.rule.trim().is_empty() {
                return Err(RuleBookError::EmptyMember { index, member: "rule" });
            }
        }
        Ok(Self { rules })
    }

    pub fn from_file(path: &Path) -> Result<Self, RuleBookError> {
        let json = std::fs::read_to_string(path).map_err(|source| RuleBookError::Read {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_json(&json)
    }

    pub fn rules(&self) -> &[ScreeningRule] {
        &self.rules
    }

    pub fn lookup(&self, field_name: &str) -> Option<&ScreeningRule> {
        let wanted = field_name.to_lowercase();
        self.rules
            .iter()
            .find(|r| r.field_name.to_lowercase() == wanted)
    }

    /// Rule display name, then the common-field table, then the raw name.
    pub fn display_name(&self, field_name: &str) -> String {
        if let Some(rule) = self.lookup(field_name) {
            if !rule.display_name.trim().is_empty() {
                return rule.display_name.clone();
            }
        }
        let wanted = field_name.to_lowercase();
        DISPLAY_NAMES
            .iter()
            .find(|(key, _)| *key == wanted)
            .map(|(_, name)| name.to_string())
            .unwrap_or_else(|| field_name.to_string())
    }
}

impl Default for RuleBook {
    fn default() -> Self {
        Self::builtin()
    }
}
