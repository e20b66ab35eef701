use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Progress state of one step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StepStatus {
    Pending,
    Loading,
    Success,
    Error,
}

/// One progress record rendered by the caller.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AgentStep {
    pub agent: String,
    pub status: StepStatus,
    pub message: String,
    pub updated_at: DateTime<Utc>,
}

/// Ordered step log of one analysis job.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StepLog {
    steps: Vec<AgentStep>,
}

impl StepLog {
    /// Log with every step pending, in order.
    pub fn planned(steps: &[(&str, &str)]) -> Self {
        let now = Utc::now();
        Self {
            steps: steps
                .iter()
                .map(|(agent, message)| AgentStep {
                    agent: agent.to_string(),
                    status: StepStatus::Pending,
                    message: message.to_string(),
                    updated_at: now,
                })
                .collect(),
        }
    }

    pub fn steps(&self) -> &[AgentStep] {
        &self.steps
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    /// Set status and, if given, message of the step at `index`.
    /// Out-of-range indices are ignored.
    pub fn set(&mut self, index: usize, status: StepStatus, message: Option<&str>) {
        if let Some(step) = self.steps.get_mut(index) {
            step.status = status;
            if let Some(message) = message {
                step.message = message.to_string();
            }
            step.updated_at = Utc::now();
        }
    }

    /// Mark the last step of the log as failed. Earlier steps keep their
    /// last status.
    pub fn fail_last(&mut self, message: &str) {
        if let Some(last) = self.steps.len().checked_sub(1) {
            self.set(last, StepStatus::Error, Some(message));
        }
    }
}
