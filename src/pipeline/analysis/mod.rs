//! Analysis orchestration against the extraction service.
//!
//! Drives one submit/poll job to completion and reports progress as an
//! ordered step log. The service is reached through `ExtractionService`
//! so the state machine is testable with a mock.

pub mod client;
pub mod steps;
pub mod orchestrator;

pub use client::{ContentUnderstandingClient, ExtractionService};
pub use orchestrator::{find_job_id, AnalysisJob, AnalysisOrchestrator, JobObserver, JobStatus};
pub use steps::{AgentStep, StepLog, StepStatus};

use thiserror::Error;

use crate::config::ConfigError;

#[derive(Error, Debug)]
pub enum AnalysisError {
    #[error("{0}")]
    Config(#[from] ConfigError),

    #[error("Extraction service request failed: {0}")]
    Transport(String),

    #[error("Extraction service returned error (status {status}): {body}")]
    Service { status: u16, body: String },

    #[error("Could not find an analysis job id in the submission response (top-level keys: {keys})")]
    MissingJobId { keys: String },

    #[error("Analysis job failed: {0}")]
    JobFailed(String),

    #[error("Analysis timed out after {attempts} polls, please retry")]
    TimedOut { attempts: u32 },

    /// A newer submission or a reset replaced this job.
    #[error("Analysis superseded by a newer submission")]
    Superseded,

    #[error("Malformed extraction service response: {0}")]
    MalformedResponse(String),

    #[error("Session state error: {0}")]
    State(String),
}
