//! One screening cycle: analysis → transform → validation.
//!
//! `start` registers a new generation with the session and spawns the
//! cycle as an abortable task. Each stage writes back through the session
//! with that generation, so a cycle replaced by a newer one stops at its
//! next write.

use std::sync::Arc;

use crate::pipeline::analysis::{AnalysisError, AnalysisJob, AnalysisOrchestrator, JobObserver};
use crate::pipeline::screening::{transform_payload, RuleBook};
use crate::pipeline::validation::RuleValidator;
use crate::session::{ScreeningSession, SessionError};

/// Publishes job transitions of one generation into the session.
struct CycleObserver<'a> {
    session: &'a ScreeningSession,
    generation: u64,
}

impl JobObserver for CycleObserver<'_> {
    fn job_updated(&self, job: &AnalysisJob) -> Result<(), AnalysisError> {
        self.session
            .update_job(self.generation, job)
            .map_err(AnalysisError::from)
    }
}

pub struct ScreeningRunner {
    session: Arc<ScreeningSession>,
    orchestrator: AnalysisOrchestrator,
    validator: RuleValidator,
    rules: Arc<RuleBook>,
}

impl ScreeningRunner {
    pub fn new(
        session: Arc<ScreeningSession>,
        orchestrator: AnalysisOrchestrator,
        validator: RuleValidator,
        rules: Arc<RuleBook>,
    ) -> Self {
        Self {
            session,
            orchestrator,
            validator,
            rules,
        }
    }

    pub fn session(&self) -> &Arc<ScreeningSession> {
        &self.session
    }

    /// Start a cycle in the background, cancelling any previous one.
    /// Returns the cycle's generation.
    pub fn start(self: &Arc<Self>, document_url: &str) -> Result<u64, SessionError> {
        let generation = self.session.begin(document_url)?;
        let runner = Arc::clone(self);
        let url = document_url.to_string();
        let handle = tokio::spawn(async move {
            runner.run_cycle(generation, &url).await;
        });
        self.session.attach_task(generation, handle.abort_handle())?;
        Ok(generation)
    }

    /// Run one cycle to completion. Failures end up in the session's job
    /// state; superseded cycles stop silently.
    pub async fn run_cycle(&self, generation: u64, document_url: &str) {
        match self.cycle(generation, document_url).await {
            Ok(()) => tracing::info!(generation, "Screening cycle finished"),
            Err(SessionError::Superseded) => {
                tracing::debug!(generation, "Screening cycle superseded")
            }
            Err(e) => tracing::error!(generation, error = %e, "Screening cycle aborted"),
        }
    }

    async fn cycle(&self, generation: u64, document_url: &str) -> Result<(), SessionError> {
        let observer = CycleObserver {
            session: &self.session,
            generation,
        };

        let payload = match self.orchestrator.run(document_url, &observer).await {
            Ok(payload) => payload,
            Err(AnalysisError::Superseded) => return Err(SessionError::Superseded),
            // Already recorded as the job's terminal state.
            Err(_) => return Ok(()),
        };

        let result = transform_payload(&payload, &self.rules);
        tracing::info!(
            generation,
            indicators = result.indicators.len(),
            passed = result.summary.pass_count,
            "Payload transformed"
        );
        let indicators = result.indicators.clone();
        self.session.store_result(generation, result)?;

        self.session.begin_validation(generation)?;
        let validations = self.validator.validate_all(&indicators).await;
        self.session.store_validations(generation, validations)
    }
}
