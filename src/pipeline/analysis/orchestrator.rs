//! Submit/poll state machine for one analysis job.
//!
//! `idle → submitting → polling → succeeded | failed | timed-out`. Every
//! transition is published to a `JobObserver`; an observer that no longer
//! accepts updates (a newer submission took over) aborts the run with
//! `AnalysisError::Superseded` before any further request is issued.

use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::client::ExtractionService;
use super::steps::{StepLog, StepStatus};
use super::AnalysisError;
use crate::config::ExtractionSettings;
use crate::pipeline::screening::ExtractionPayload;

const STEP_INITIALIZE: usize = 0;
const STEP_SUBMIT: usize = 1;
const STEP_AWAIT: usize = 2;

const PLANNED_STEPS: &[(&str, &str)] = &[
    ("Initialize analyzer", "Preparing document analysis..."),
    ("Submit analysis job", "Sending document to the extraction service..."),
    ("Await processing", "Processing, please wait..."),
];

/// Where a job identifier may appear in a submission response, in priority order.
const JOB_ID_POINTERS: &[&str] = &[
    "/id",
    "/jobId",
    "/result/id",
    "/result/jobId",
    "/result/0/id",
    "/result/0/jobId",
];

/// Job lifecycle state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum JobStatus {
    #[default]
    Idle,
    Submitting,
    Polling,
    Succeeded,
    Failed,
    TimedOut,
}

impl JobStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Succeeded | Self::Failed | Self::TimedOut)
    }

    pub fn is_running(&self) -> bool {
        matches!(self, Self::Submitting | Self::Polling)
    }
}

/// Snapshot of one analysis job.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisJob {
    pub document_url: String,
    pub job_id: Option<String>,
    pub status: JobStatus,
    pub steps: StepLog,
    pub poll_attempts: u32,
    pub error: Option<String>,
}

impl AnalysisJob {
    fn submitting(document_url: &str) -> Self {
        Self {
            document_url: document_url.to_string(),
            status: JobStatus::Submitting,
            steps: StepLog::planned(PLANNED_STEPS),
            ..Self::default()
        }
    }

    fn fail(&mut self, error: &AnalysisError) {
        let message = error.to_string();
        self.status = match error {
            AnalysisError::TimedOut { .. } => JobStatus::TimedOut,
            _ => JobStatus::Failed,
        };
        self.steps.fail_last(&message);
        self.error = Some(message);
    }
}

/// Receives every job transition.
///
/// Returning `Err(AnalysisError::Superseded)` stops the run.
pub trait JobObserver: Send + Sync {
    fn job_updated(&self, job: &AnalysisJob) -> Result<(), AnalysisError>;
}

/// First job identifier found in a submission response.
pub fn find_job_id(response: &Value) -> Result<String, AnalysisError> {
    JOB_ID_POINTERS
        .iter()
        .filter_map(|pointer| response.pointer(pointer))
        .find_map(|value| match value {
            Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
            Value::Number(n) => Some(n.to_string()),
            _ => None,
        })
        .ok_or_else(|| AnalysisError::MissingJobId {
            keys: top_level_keys(response),
        })
}

fn top_level_keys(response: &Value) -> String {
    match response.as_object() {
        Some(obj) if !obj.is_empty() => obj.keys().cloned().collect::<Vec<_>>().join(", "),
        _ => "empty response".to_string(),
    }
}

/// Content presence is the completion signal, whatever the status string says.
fn has_contents(result: &Value) -> bool {
    ["/result/contents", "/contents"]
        .iter()
        .filter_map(|pointer| result.pointer(pointer))
        .any(|contents| contents.as_array().is_some_and(|a| !a.is_empty()))
}

fn reports_failure(result: &Value) -> bool {
    result
        .get("status")
        .and_then(Value::as_str)
        .is_some_and(|s| s.trim().eq_ignore_ascii_case("failed"))
}

fn failure_detail(result: &Value) -> String {
    result
        .pointer("/error/message")
        .and_then(Value::as_str)
        .map(str::to_string)
        .unwrap_or_else(|| "the extraction service reported status \"failed\"".to_string())
}

/// Drives analysis jobs through the extraction service.
pub struct AnalysisOrchestrator {
    service: Arc<dyn ExtractionService>,
    poll_interval: Duration,
    max_polls: u32,
}

impl AnalysisOrchestrator {
    pub fn new(service: Arc<dyn ExtractionService>, settings: &ExtractionSettings) -> Self {
        Self::with_polling(service, settings.poll_interval, settings.max_polls)
    }

    pub fn with_polling(
        service: Arc<dyn ExtractionService>,
        poll_interval: Duration,
        max_polls: u32,
    ) -> Self {
        Self {
            service,
            poll_interval,
            max_polls,
        }
    }

    /// Run one job to a terminal state.
    ///
    /// On failure the job's last step is marked as error and the terminal
    /// snapshot is published before the error is returned.
    pub async fn run(
        &self,
        document_url: &str,
        observer: &dyn JobObserver,
    ) -> Result<ExtractionPayload, AnalysisError> {
        let mut job = AnalysisJob::submitting(document_url);

        match self.drive(&mut job, observer).await {
            Ok(payload) => Ok(payload),
            Err(AnalysisError::Superseded) => Err(AnalysisError::Superseded),
            Err(e) => {
                tracing::warn!(
                    job_id = job.job_id.as_deref().unwrap_or("-"),
                    error = %e,
                    "Analysis failed"
                );
                job.fail(&e);
                observer.job_updated(&job)?;
                Err(e)
            }
        }
    }

    async fn drive(
        &self,
        job: &mut AnalysisJob,
        observer: &dyn JobObserver,
    ) -> Result<ExtractionPayload, AnalysisError> {
        // Initialize
        job.steps.set(STEP_INITIALIZE, StepStatus::Loading, None);
        observer.job_updated(job)?;
        self.service.check_configured()?;
        let ready = format!("Analyzer \"{}\" ready", self.service.analyzer_id());
        job.steps.set(STEP_INITIALIZE, StepStatus::Success, Some(&ready));

        // Submit
        job.steps.set(STEP_SUBMIT, StepStatus::Loading, None);
        observer.job_updated(job)?;
        let response = self.service.submit(&job.document_url).await?;
        let job_id = find_job_id(&response)?;
        tracing::info!(job_id = job_id.as_str(), "Analysis job submitted");
        let submitted = format!("Job {job_id} submitted");
        job.job_id = Some(job_id.clone());
        job.steps.set(STEP_SUBMIT, StepStatus::Success, Some(&submitted));

        // Poll
        job.status = JobStatus::Polling;
        job.steps.set(STEP_AWAIT, StepStatus::Loading, None);
        observer.job_updated(job)?;

        for attempt in 1..=self.max_polls {
            let result = self.service.fetch_result(&job_id).await?;
            job.poll_attempts = attempt;

            let reported = result.get("status").and_then(Value::as_str).unwrap_or("-");
            tracing::debug!(
                job_id = job_id.as_str(),
                attempt,
                status = reported,
                "Poll attempt"
            );

            if has_contents(&result) {
                tracing::info!(job_id = job_id.as_str(), attempts = attempt, "Analysis complete");
                job.status = JobStatus::Succeeded;
                job.steps.set(STEP_AWAIT, StepStatus::Success, Some("Analysis complete"));
                observer.job_updated(job)?;
                return Ok(ExtractionPayload::new(result));
            }

            if reports_failure(&result) {
                return Err(AnalysisError::JobFailed(failure_detail(&result)));
            }

            let progress = format!("Processing, please wait... (poll {attempt}/{})", self.max_polls);
            job.steps.set(STEP_AWAIT, StepStatus::Loading, Some(&progress));
            observer.job_updated(job)?;

            tokio::time::sleep(self.poll_interval).await;
        }

        Err(AnalysisError::TimedOut {
            attempts: self.max_polls,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::VecDeque;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    use async_trait::async_trait;
    use serde_json::json;

    use crate::config::ConfigError;

    struct MockService {
        configured: bool,
        submit_response: Value,
        poll_responses: Mutex<VecDeque<Result<Value, AnalysisError>>>,
        submits: AtomicUsize,
        polls: AtomicUsize,
    }

    impl MockService {
        fn new(submit_response: Value, polls: Vec<Result<Value, AnalysisError>>) -> Arc<Self> {
            Arc::new(Self {
                configured: true,
                submit_response,
                poll_responses: Mutex::new(polls.into()),
                submits: AtomicUsize::new(0),
                polls: AtomicUsize::new(0),
            })
        }

        fn unconfigured() -> Arc<Self> {
            Arc::new(Self {
                configured: false,
                submit_response: json!({}),
                poll_responses: Mutex::new(VecDeque::new()),
                submits: AtomicUsize::new(0),
                polls: AtomicUsize::new(0),
            })
        }
    }

    #[async_trait]
    impl ExtractionService for MockService {
        fn check_configured(&self) -> Result<(), AnalysisError> {
            if self.configured {
                Ok(())
            } else {
                Err(ConfigError::Missing {
                    service: "Extraction service",
                    name: "CU_ENDPOINT",
                }
                .into())
            }
        }

        fn analyzer_id(&self) -> &str {
            "prefilter"
        }

        async fn submit(&self, _document_url: &str) -> Result<Value, AnalysisError> {
            self.submits.fetch_add(1, Ordering::SeqCst);
            Ok(self.submit_response.clone())
        }

        async fn fetch_result(&self, _job_id: &str) -> Result<Value, AnalysisError> {
            self.polls.fetch_add(1, Ordering::SeqCst);
            self.poll_responses
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or_else(|| Ok(json!({"status": "running"})))
        }
    }

    /// Records every published snapshot; refuses updates after `accept` of them.
    struct Recorder {
        updates: Mutex<Vec<AnalysisJob>>,
        accept: usize,
    }

    impl Recorder {
        fn new() -> Self {
            Self::accepting(usize::MAX)
        }

        fn accepting(accept: usize) -> Self {
            Self {
                updates: Mutex::new(Vec::new()),
                accept,
            }
        }

        fn last(&self) -> AnalysisJob {
            self.updates.lock().unwrap().last().cloned().unwrap()
        }

        fn statuses(&self) -> Vec<JobStatus> {
            self.updates.lock().unwrap().iter().map(|j| j.status).collect()
        }
    }

    impl JobObserver for Recorder {
        fn job_updated(&self, job: &AnalysisJob) -> Result<(), AnalysisError> {
            let mut updates = self.updates.lock().unwrap();
            if updates.len() >= self.accept {
                return Err(AnalysisError::Superseded);
            }
            updates.push(job.clone());
            Ok(())
        }
    }

    fn orchestrator(service: Arc<MockService>, max_polls: u32) -> AnalysisOrchestrator {
        AnalysisOrchestrator::with_polling(service, Duration::from_millis(1), max_polls)
    }

    fn content_result(status: &str) -> Value {
        json!({
            "status": status,
            "result": {"contents": [{"markdown": "text", "fields": {}}]}
        })
    }

    #[test]
    fn job_id_found_in_priority_order() {
        assert_eq!(find_job_id(&json!({"id": "a", "jobId": "b"})).unwrap(), "a");
        assert_eq!(find_job_id(&json!({"jobId": "b"})).unwrap(), "b");
        assert_eq!(find_job_id(&json!({"result": {"id": "c"}})).unwrap(), "c");
        assert_eq!(find_job_id(&json!({"result": {"jobId": "d"}})).unwrap(), "d");
        assert_eq!(find_job_id(&json!({"result": [{"jobId": "e"}]})).unwrap(), "e");
    }

    #[test]
    fn blank_job_id_is_skipped() {
        assert_eq!(find_job_id(&json!({"id": "  ", "jobId": "b"})).unwrap(), "b");
    }

    #[test]
    fn missing_job_id_lists_top_level_keys() {
        let err = find_job_id(&json!({"status": "ok", "operation": {}})).unwrap_err();
        match err {
            AnalysisError::MissingJobId { keys } => assert_eq!(keys, "status, operation"),
            other => panic!("unexpected error: {other:?}"),
        }
        let err = find_job_id(&json!({})).unwrap_err();
        assert!(err.to_string().contains("empty response"));
    }

    #[tokio::test]
    async fn missing_job_id_fails_without_polling() {
        let service = MockService::new(json!({"status": "accepted"}), vec![]);
        let recorder = Recorder::new();

        let err = orchestrator(service.clone(), 5)
            .run("https://docs/a.pdf", &recorder)
            .await
            .unwrap_err();

        assert!(matches!(err, AnalysisError::MissingJobId { .. }));
        assert_eq!(service.polls.load(Ordering::SeqCst), 0);
        assert!(!recorder.statuses().contains(&JobStatus::Polling));
        let last = recorder.last();
        assert_eq!(last.status, JobStatus::Failed);
        assert!(last.error.unwrap().contains("status"));
        assert_eq!(last.steps.steps()[2].status, StepStatus::Error);
    }

    #[tokio::test]
    async fn content_presence_wins_over_status_string() {
        let service = MockService::new(json!({"id": "job-1"}), vec![Ok(content_result("running"))]);
        let recorder = Recorder::new();

        let payload = orchestrator(service.clone(), 5)
            .run("https://docs/a.pdf", &recorder)
            .await
            .unwrap();

        assert_eq!(payload.markdown(), Some("text"));
        let last = recorder.last();
        assert_eq!(last.status, JobStatus::Succeeded);
        assert_eq!(last.job_id.as_deref(), Some("job-1"));
        assert_eq!(last.poll_attempts, 1);
        assert!(last.steps.steps().iter().all(|s| s.status == StepStatus::Success));
    }

    #[tokio::test]
    async fn polls_until_contents_appear() {
        let service = MockService::new(
            json!({"id": "job-1"}),
            vec![
                Ok(json!({"status": "Running"})),
                Ok(json!({"status": "Running", "result": {"contents": []}})),
                Ok(json!({"status": "Succeeded", "contents": [{"fields": {}}]})),
            ],
        );
        let recorder = Recorder::new();

        orchestrator(service.clone(), 10)
            .run("https://docs/a.pdf", &recorder)
            .await
            .unwrap();

        assert_eq!(service.polls.load(Ordering::SeqCst), 3);
        assert_eq!(recorder.last().poll_attempts, 3);
    }

    #[tokio::test]
    async fn explicit_failure_status_fails_job() {
        let service = MockService::new(
            json!({"id": "job-1"}),
            vec![Ok(json!({"status": "Failed", "error": {"message": "bad pdf"}}))],
        );
        let recorder = Recorder::new();

        let err = orchestrator(service, 5)
            .run("https://docs/a.pdf", &recorder)
            .await
            .unwrap_err();

        assert!(matches!(err, AnalysisError::JobFailed(ref m) if m == "bad pdf"));
        let last = recorder.last();
        assert_eq!(last.status, JobStatus::Failed);
        assert_eq!(last.steps.steps()[0].status, StepStatus::Success);
        assert_eq!(last.steps.steps()[1].status, StepStatus::Success);
        assert_eq!(last.steps.steps()[2].status, StepStatus::Error);
    }

    #[tokio::test]
    async fn exhausted_poll_budget_times_out() {
        let service = MockService::new(json!({"jobId": "job-1"}), vec![]);
        let recorder = Recorder::new();

        let err = orchestrator(service.clone(), 3)
            .run("https://docs/a.pdf", &recorder)
            .await
            .unwrap_err();

        assert!(matches!(err, AnalysisError::TimedOut { attempts: 3 }));
        assert_eq!(service.polls.load(Ordering::SeqCst), 3);
        let last = recorder.last();
        assert_eq!(last.status, JobStatus::TimedOut);
        assert!(last.error.unwrap().contains("timed out"));
    }

    #[tokio::test]
    async fn poll_transport_error_fails_job() {
        let service = MockService::new(
            json!({"id": "job-1"}),
            vec![Err(AnalysisError::Service {
                status: 503,
                body: "unavailable".into(),
            })],
        );
        let recorder = Recorder::new();

        let err = orchestrator(service, 5)
            .run("https://docs/a.pdf", &recorder)
            .await
            .unwrap_err();

        assert!(matches!(err, AnalysisError::Service { status: 503, .. }));
        assert_eq!(recorder.last().status, JobStatus::Failed);
    }

    #[tokio::test]
    async fn unconfigured_service_fails_before_submission() {
        let service = MockService::unconfigured();
        let recorder = Recorder::new();

        let err = orchestrator(service.clone(), 5)
            .run("https://docs/a.pdf", &recorder)
            .await
            .unwrap_err();

        assert!(matches!(err, AnalysisError::Config(_)));
        assert_eq!(service.submits.load(Ordering::SeqCst), 0);
        assert!(recorder.last().error.unwrap().contains("CU_ENDPOINT"));
    }

    #[tokio::test]
    async fn superseded_observer_stops_run_silently() {
        let service = MockService::new(json!({"id": "job-1"}), vec![]);
        // Accepts the initialize and submit updates, refuses the polling one.
        let recorder = Recorder::accepting(2);

        let err = orchestrator(service.clone(), 30)
            .run("https://docs/a.pdf", &recorder)
            .await
            .unwrap_err();

        assert!(matches!(err, AnalysisError::Superseded));
        assert_eq!(service.polls.load(Ordering::SeqCst), 0);
        assert_eq!(recorder.updates.lock().unwrap().len(), 2);
        assert!(recorder.statuses().iter().all(|s| !s.is_terminal()));
    }
}
