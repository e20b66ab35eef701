//! Screening session: the single owner of all per-document state.
//!
//! Job, indicators, validations, feedback and manual decisions live in one
//! `RwLock`. Every write coming from a background cycle carries the
//! generation it was started with; writes from any generation other than
//! the current one are rejected with `SessionError::Superseded`, so a
//! cancelled or replaced cycle can never mutate state after the fact.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use serde::Serialize;
use tokio::task::AbortHandle;
use uuid::Uuid;

use crate::pipeline::analysis::{AnalysisError, AnalysisJob};
use crate::pipeline::screening::{ScreeningResult, ScreeningStatus, SourceLocation};
use crate::pipeline::validation::ValidationResult;
use crate::pipeline::verdict::{
    reconcile, toggle, AiTally, Feedback, FeedbackTally, ManualDecision, Verdict,
};

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum SessionError {
    #[error("Internal lock error")]
    LockPoisoned,
    #[error("Superseded by a newer analysis")]
    Superseded,
    #[error("No screening result available yet")]
    NoResult,
    #[error("Unknown indicator: {0}")]
    UnknownIndicator(String),
    #[error("Manual decisions apply only to indicators validated as warning ({id} is {status})")]
    DecisionNotApplicable { id: String, status: String },
}

impl From<SessionError> for AnalysisError {
    fn from(err: SessionError) -> Self {
        match err {
            SessionError::Superseded => AnalysisError::Superseded,
            other => AnalysisError::State(other.to_string()),
        }
    }
}

/// Progress of the validation pass over the current result.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ValidationPhase {
    #[default]
    Idle,
    Running,
    Complete,
}

#[derive(Default)]
struct SessionState {
    job: AnalysisJob,
    result: Option<ScreeningResult>,
    validations: HashMap<String, ValidationResult>,
    validation_phase: ValidationPhase,
    feedback: HashMap<String, Feedback>,
    decisions: HashMap<String, ManualDecision>,
    task: Option<AbortHandle>,
}

impl SessionState {
    /// Stop the in-flight cycle, if any, and clear everything.
    fn clear(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
        }
        *self = Self::default();
    }

    fn indicator_exists(&self, id: &str) -> Result<(), SessionError> {
        let result = self.result.as_ref().ok_or(SessionError::NoResult)?;
        result
            .indicator(id)
            .map(|_| ())
            .ok_or_else(|| SessionError::UnknownIndicator(id.to_string()))
    }
}

/// Everything a viewer renders for the current result.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ScreeningSnapshot {
    pub generation: u64,
    pub result: Option<ScreeningResult>,
    pub validations: HashMap<String, ValidationResult>,
    pub validation_phase: ValidationPhase,
    pub feedback: HashMap<String, Feedback>,
    pub decisions: HashMap<String, ManualDecision>,
    pub ai_tally: AiTally,
    pub feedback_tally: FeedbackTally,
    pub verdict: Verdict,
}

/// Where the viewer should navigate for one indicator.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct IndicatorFocus {
    pub id: String,
    pub display_name: String,
    /// Page of the first source location.
    pub page: Option<u32>,
    pub locations: Vec<SourceLocation>,
}

pub struct ScreeningSession {
    id: Uuid,
    generation: AtomicU64,
    state: RwLock<SessionState>,
}

impl ScreeningSession {
    pub fn new() -> Self {
        Self {
            id: Uuid::new_v4(),
            generation: AtomicU64::new(0),
            state: RwLock::new(SessionState::default()),
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn generation(&self) -> u64 {
        self.generation.load(Ordering::SeqCst)
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, SessionState>, SessionError> {
        self.state.read().map_err(|_| SessionError::LockPoisoned)
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, SessionState>, SessionError> {
        self.state.write().map_err(|_| SessionError::LockPoisoned)
    }

    /// Write access for the cycle started with `generation` only.
    fn write_current(
        &self,
        generation: u64,
    ) -> Result<RwLockWriteGuard<'_, SessionState>, SessionError> {
        let guard = self.write()?;
        if self.generation() != generation {
            tracing::debug!(
                generation,
                current = self.generation(),
                "Discarding stale cycle update"
            );
            return Err(SessionError::Superseded);
        }
        Ok(guard)
    }

    // ── Cycle lifecycle ─────────────────────────────────────

    /// Start a new cycle: cancel the previous one, clear all state and
    /// return the new generation.
    pub fn begin(&self, document_url: &str) -> Result<u64, SessionError> {
        let mut state = self.write()?;
        state.clear();
        state.job.document_url = document_url.to_string();
        let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
        tracing::info!(session = %self.id, generation, "Screening cycle started");
        Ok(generation)
    }

    /// Cancel any in-flight cycle and clear all state.
    pub fn reset(&self) -> Result<(), SessionError> {
        let mut state = self.write()?;
        state.clear();
        let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
        tracing::info!(session = %self.id, generation, "Screening session reset");
        Ok(())
    }

    /// Keep the abort handle of the task running `generation`. A handle
    /// for an already replaced generation is aborted immediately.
    pub fn attach_task(&self, generation: u64, task: AbortHandle) -> Result<(), SessionError> {
        match self.write_current(generation) {
            Ok(mut state) => {
                state.task = Some(task);
                Ok(())
            }
            Err(SessionError::Superseded) => {
                task.abort();
                Ok(())
            }
            Err(e) => Err(e),
        }
    }

    pub fn update_job(&self, generation: u64, job: &AnalysisJob) -> Result<(), SessionError> {
        let mut state = self.write_current(generation)?;
        state.job = job.clone();
        Ok(())
    }

    pub fn store_result(&self, generation: u64, result: ScreeningResult) -> Result<(), SessionError> {
        let mut state = self.write_current(generation)?;
        state.result = Some(result);
        Ok(())
    }

    pub fn begin_validation(&self, generation: u64) -> Result<(), SessionError> {
        let mut state = self.write_current(generation)?;
        state.validations.clear();
        state.validation_phase = ValidationPhase::Running;
        Ok(())
    }

    /// Replace all validations at once and finish the cycle.
    pub fn store_validations(
        &self,
        generation: u64,
        validations: HashMap<String, ValidationResult>,
    ) -> Result<(), SessionError> {
        let mut state = self.write_current(generation)?;
        state.validations = validations;
        state.validation_phase = ValidationPhase::Complete;
        state.task = None;
        Ok(())
    }

    // ── User input ──────────────────────────────────────────

    /// Set or clear (same value twice) feedback on an indicator.
    pub fn toggle_feedback(
        &self,
        id: &str,
        feedback: Feedback,
    ) -> Result<Option<Feedback>, SessionError> {
        let mut state = self.write()?;
        state.indicator_exists(id)?;
        let next = toggle(state.feedback.get(id).copied(), feedback);
        match next {
            Some(f) => state.feedback.insert(id.to_string(), f),
            None => state.feedback.remove(id),
        };
        Ok(next)
    }

    /// Set or clear (same value twice) a manual decision. Only indicators
    /// whose validation is "warning" accept one.
    pub fn toggle_decision(
        &self,
        id: &str,
        decision: ManualDecision,
    ) -> Result<Option<ManualDecision>, SessionError> {
        let mut state = self.write()?;
        state.indicator_exists(id)?;
        match state.validations.get(id).map(|v| v.status) {
            Some(ScreeningStatus::Warning) => {}
            status => {
                return Err(SessionError::DecisionNotApplicable {
                    id: id.to_string(),
                    status: status.map_or("not validated", |s| s.as_str()).to_string(),
                })
            }
        }
        let next = toggle(state.decisions.get(id).copied(), decision);
        match next {
            Some(d) => state.decisions.insert(id.to_string(), d),
            None => state.decisions.remove(id),
        };
        Ok(next)
    }

    // ── Reads ───────────────────────────────────────────────

    pub fn job(&self) -> Result<AnalysisJob, SessionError> {
        Ok(self.read()?.job.clone())
    }

    pub fn snapshot(&self) -> Result<ScreeningSnapshot, SessionError> {
        let state = self.read()?;
        let indicators = state
            .result
            .as_ref()
            .map(|r| r.indicators.as_slice())
            .unwrap_or_default();
        Ok(ScreeningSnapshot {
            generation: self.generation(),
            ai_tally: AiTally::collect(indicators, &state.validations),
            feedback_tally: FeedbackTally::collect(&state.feedback),
            verdict: reconcile(&state.validations, &state.feedback, &state.decisions),
            result: state.result.clone(),
            validations: state.validations.clone(),
            validation_phase: state.validation_phase,
            feedback: state.feedback.clone(),
            decisions: state.decisions.clone(),
        })
    }

    pub fn verdict(&self) -> Result<Verdict, SessionError> {
        let state = self.read()?;
        Ok(reconcile(&state.validations, &state.feedback, &state.decisions))
    }

    pub fn focus(&self, id: &str) -> Result<IndicatorFocus, SessionError> {
        let state = self.read()?;
        let result = state.result.as_ref().ok_or(SessionError::NoResult)?;
        let indicator = result
            .indicator(id)
            .ok_or_else(|| SessionError::UnknownIndicator(id.to_string()))?;
        Ok(IndicatorFocus {
            id: indicator.id.clone(),
            display_name: indicator.display_name.clone(),
            page: indicator.source_locations.first().map(|l| l.page),
            locations: indicator.source_locations.clone(),
        })
    }
}

impl Default for ScreeningSession {
    fn default() -> Self {
        Self::new()
    }
}
