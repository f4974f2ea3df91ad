use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use chatrelay_core::{ChatMessage, ChatModel, GenerationParams};

/// OpenAI-style chat completion client.
///
/// One endpoint serves both capabilities: `generate` asks for a real
/// completion, `count_tokens` asks for a single token and reads the prompt
/// size off the response's usage accounting.
pub struct OpenAiModel {
    client: Client,
    api_key: String,
    base_url: String,
    model: String,
}

impl OpenAiModel {
    /// Build a client with a per-request timeout. A hung remote call must
    /// not stall the whole request pipeline.
    pub fn new(
        api_key: impl Into<String>,
        model: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .context("Failed to build HTTP client")?;

        Ok(Self {
            client,
            api_key: api_key.into(),
            base_url: "https://api.openai.com/v1".to_string(),
            model: model.into(),
        })
    }

    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into();
        self
    }

    async fn send(&self, body: &ChatCompletionRequest<'_>) -> Result<ChatCompletionResponse> {
        let response = self
            .client
            .post(format!("{}/chat/completions", self.base_url))
            .header("Authorization", format!("Bearer {}", self.api_key))
            .json(body)
            .send()
            .await
            .context("Chat completion HTTP request failed")?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ServiceStatusError { status, body }.into());
        }

        response
            .json()
            .await
            .context("Failed to parse chat completion response")
    }

    /// Send with a single retry on transient failures (timeout, connect,
    /// 429, 5xx).
    async fn send_with_retry(
        &self,
        body: &ChatCompletionRequest<'_>,
    ) -> Result<ChatCompletionResponse> {
        match self.send(body).await {
            Ok(response) => Ok(response),
            Err(e) if is_transient(&e) => {
                warn!(error = %e, "Transient model service failure; retrying once");
                self.send(body).await
            }
            Err(e) => Err(e),
        }
    }
}

fn is_transient(err: &anyhow::Error) -> bool {
    if let Some(e) = err.downcast_ref::<reqwest::Error>() {
        return e.is_timeout() || e.is_connect();
    }
    if let Some(e) = err.downcast_ref::<ServiceStatusError>() {
        return e.status == StatusCode::TOO_MANY_REQUESTS || e.status.is_server_error();
    }
    false
}

/// Non-success HTTP status from the model service.
#[derive(Debug, thiserror::Error)]
#[error("model service returned {status}: {body}")]
struct ServiceStatusError {
    status: StatusCode,
    body: String,
}

#[derive(Serialize)]
struct ChatCompletionRequest<'a> {
    model: &'a str,
    messages: &'a [ChatMessage],
    max_tokens: u32,
    temperature: f32,
    top_p: f32,
    n: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    stop: Option<&'a [String]>,
    presence_penalty: f32,
    frequency_penalty: f32,
}

#[derive(Deserialize)]
struct ChatCompletionResponse {
    choices: Vec<Choice>,
    usage: Option<Usage>,
}

#[derive(Deserialize)]
struct Choice {
    message: WireMessage,
}

#[derive(Deserialize)]
struct WireMessage {
    content: String,
}

#[derive(Deserialize)]
struct Usage {
    total_tokens: Option<u64>,
}

#[async_trait]
impl ChatModel for OpenAiModel {
    fn name(&self) -> &str {
        "openai"
    }

    async fn generate(
        &self,
        messages: &[ChatMessage],
        params: &GenerationParams,
    ) -> Result<String> {
        debug!(
            model = %self.model,
            messages = messages.len(),
            "Requesting chat completion"
        );

        let body = ChatCompletionRequest {
            model: &self.model,
            messages,
            max_tokens: params.max_tokens,
            temperature: params.temperature,
            top_p: params.top_p,
            n: params.candidate_count,
            stop: params.stop.as_deref(),
            presence_penalty: params.presence_penalty,
            frequency_penalty: params.frequency_penalty,
        };

        let response = self.send_with_retry(&body).await?;
        let content = response
            .choices
            .first()
            .map(|c| c.message.content.trim().to_string())
            .context("Chat completion response contained no choices")?;

        Ok(content)
    }

    async fn count_tokens(&self, messages: &[ChatMessage]) -> Result<usize> {
        // Minimal one-token completion; the usage block reports how many
        // tokens the prompt occupies. No retry here: the trim loop already
        // fails open on oracle errors.
        let body = ChatCompletionRequest {
            model: &self.model,
            messages,
            max_tokens: 1,
            temperature: 0.0,
            top_p: 1.0,
            n: 1,
            stop: None,
            presence_penalty: 0.0,
            frequency_penalty: 0.0,
        };

        let response = self.send(&body).await?;
        let total = response
            .usage
            .and_then(|u| u.total_tokens)
            .context("Chat completion response carried no usage accounting")?;

        Ok(total as usize)
    }
}
