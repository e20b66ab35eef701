use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use super::prompt::{build_judgment_prompt, JUDGMENT_SYSTEM_PROMPT};
use super::types::{JudgmentRequest, JudgmentService};
use super::ValidationError;
use crate::config::JudgmentSettings;

const REQUEST_TIMEOUT_SECS: u64 = 60;
const TEMPERATURE: f32 = 0.5;
const MAX_TOKENS: u32 = 500;

/// Azure OpenAI chat-completions client for rule judgments.
pub struct AzureOpenAiClient {
    settings: JudgmentSettings,
    client: reqwest::Client,
}

impl AzureOpenAiClient {
    pub fn new(settings: JudgmentSettings) -> Result<Self, ValidationError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()
            .map_err(|e| ValidationError::Transport(e.to_string()))?;
        Ok(Self { settings, client })
    }

    /// `{endpoint}/openai/deployments/{deployment}/chat/completions?api-version={v}`
    fn completions_url(&self, endpoint: &str) -> Result<reqwest::Url, ValidationError> {
        let mut url = reqwest::Url::parse(endpoint)
            .map_err(|e| ValidationError::Transport(format!("invalid endpoint: {e}")))?;
        url.path_segments_mut()
            .map_err(|_| ValidationError::Transport("endpoint cannot be a base URL".into()))?
            .pop_if_empty()
            .extend(["openai", "deployments", self.settings.deployment.as_str(), "chat", "completions"]);
        url.query_pairs_mut()
            .append_pair("api-version", &self.settings.api_version);
        Ok(url)
    }
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Serialize)]
struct ChatCompletionRequest<'a> {
    messages: Vec<ChatMessage<'a>>,
    temperature: f32,
    max_tokens: u32,
}

#[derive(Deserialize)]
struct ChatCompletionResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatResponseMessage,
}

#[derive(Deserialize)]
struct ChatResponseMessage {
    content: Option<String>,
}

#[derive(Deserialize)]
struct ServiceErrorBody {
    error: ServiceErrorDetail,
}

#[derive(Deserialize)]
struct ServiceErrorDetail {
    message: String,
}

#[async_trait]
impl JudgmentService for AzureOpenAiClient {
    async fn judge(&self, request: &JudgmentRequest) -> Result<String, ValidationError> {
        let (endpoint, api_key) = self.settings.credentials()?;
        let url = self.completions_url(endpoint)?;

        let prompt = build_judgment_prompt(request);
        let body = ChatCompletionRequest {
            messages: vec![
                ChatMessage { role: "system", content: JUDGMENT_SYSTEM_PROMPT },
                ChatMessage { role: "user", content: &prompt },
            ],
            temperature: TEMPERATURE,
            max_tokens: MAX_TOKENS,
        };

        let response = self
            .client
            .post(url)
            .header("api-key", api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    ValidationError::Transport(format!(
                        "request timed out after {REQUEST_TIMEOUT_SECS}s"
                    ))
                } else {
                    ValidationError::Transport(e.to_string())
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            let message = serde_json::from_str::<ServiceErrorBody>(&text)
                .map(|b| b.error.message)
                .unwrap_or_else(|_| {
                    status.canonical_reason().unwrap_or("unknown error").to_string()
                });
            return Err(ValidationError::Service {
                status: status.as_u16(),
                message,
            });
        }

        let parsed: ChatCompletionResponse = response
            .json()
            .await
            .map_err(|e| ValidationError::MalformedResponse(e.to_string()))?;

        parsed
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .map(|content| content.trim().to_string())
            .ok_or_else(|| ValidationError::MalformedResponse("no message content".into()))
    }
}
