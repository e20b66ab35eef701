use std::time::Duration;

use async_trait::async_trait;
use serde_json::{json, Value};

use super::AnalysisError;
use crate::config::ExtractionSettings;

const REQUEST_TIMEOUT_SECS: u64 = 30;
const SUBSCRIPTION_KEY_HEADER: &str = "Ocp-Apim-Subscription-Key";
const SERVICE_PATH: &str = "contentunderstanding";

/// External extraction service abstraction (allows mocking).
#[async_trait]
pub trait ExtractionService: Send + Sync {
    /// Fail fast when endpoint or key are missing.
    fn check_configured(&self) -> Result<(), AnalysisError>;

    /// Analyzer the jobs are submitted to, for progress messages.
    fn analyzer_id(&self) -> &str;

    /// Submit a document URL; returns the raw submission response.
    async fn submit(&self, document_url: &str) -> Result<Value, AnalysisError>;

    /// Fetch the current state of a job; returns the raw result response.
    async fn fetch_result(&self, job_id: &str) -> Result<Value, AnalysisError>;
}

/// HTTP client for the Azure Content Understanding analyzer API.
pub struct ContentUnderstandingClient {
    settings: ExtractionSettings,
    client: reqwest::Client,
}

impl ContentUnderstandingClient {
    pub fn new(settings: ExtractionSettings) -> Result<Self, AnalysisError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()
            .map_err(|e| AnalysisError::Transport(e.to_string()))?;
        Ok(Self { settings, client })
    }

    /// `{endpoint}/contentunderstanding/analyzers/{analyzerId}:analyze?api-version={v}`
    fn analyze_url(&self, endpoint: &str) -> Result<reqwest::Url, AnalysisError> {
        let action = format!("{}:analyze", self.settings.analyzer_id);
        self.service_url(endpoint, &["analyzers", &action])
    }

    /// `{endpoint}/contentunderstanding/analyzerResults/{jobId}?api-version={v}`
    fn result_url(&self, endpoint: &str, job_id: &str) -> Result<reqwest::Url, AnalysisError> {
        self.service_url(endpoint, &["analyzerResults", job_id])
    }

    fn service_url(&self, endpoint: &str, segments: &[&str]) -> Result<reqwest::Url, AnalysisError> {
        let mut url = reqwest::Url::parse(endpoint)
            .map_err(|e| AnalysisError::Transport(format!("invalid endpoint: {e}")))?;
        url.path_segments_mut()
            .map_err(|_| AnalysisError::Transport("endpoint cannot be a base URL".into()))?
            .pop_if_empty()
            .push(SERVICE_PATH)
            .extend(segments);
        url.query_pairs_mut()
            .append_pair("api-version", &self.settings.api_version);
        Ok(url)
    }

    async fn read_json(response: reqwest::Response) -> Result<Value, AnalysisError> {
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let body = if body.trim().is_empty() {
                status.canonical_reason().unwrap_or("unknown error").to_string()
            } else {
                body
            };
            return Err(AnalysisError::Service {
                status: status.as_u16(),
                body,
            });
        }
        response
            .json()
            .await
            .map_err(|e| AnalysisError::MalformedResponse(e.to_string()))
    }
}

fn transport_error(e: reqwest::Error) -> AnalysisError {
    if e.is_timeout() {
        AnalysisError::Transport(format!("request timed out after {REQUEST_TIMEOUT_SECS}s"))
    } else {
        AnalysisError::Transport(e.to_string())
    }
}

#[async_trait]
impl ExtractionService for ContentUnderstandingClient {
    fn check_configured(&self) -> Result<(), AnalysisError> {
        self.settings.credentials()?;
        Ok(())
    }

    fn analyzer_id(&self) -> &str {
        &self.settings.analyzer_id
    }

    async fn submit(&self, document_url: &str) -> Result<Value, AnalysisError> {
        let (endpoint, key) = self.settings.credentials()?;
        let url = self.analyze_url(endpoint)?;

        tracing::info!(analyzer = self.settings.analyzer_id.as_str(), "Submitting analysis job");

        let response = self
            .client
            .post(url)
            .header(SUBSCRIPTION_KEY_HEADER, key)
            .json(&json!({ "inputs": [{ "url": document_url }] }))
            .send()
            .await
            .map_err(transport_error)?;

        Self::read_json(response).await
    }

    async fn fetch_result(&self, job_id: &str) -> Result<Value, AnalysisError> {
        let (endpoint, key) = self.settings.credentials()?;
        let url = self.result_url(endpoint, job_id)?;

        let response = self
            .client
            .get(url)
            .header(SUBSCRIPTION_KEY_HEADER, key)
            .send()
            .await
            .map_err(transport_error)?;

        Self::read_json(response).await
    }
}
