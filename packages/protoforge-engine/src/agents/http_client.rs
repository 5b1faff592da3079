use super::{ChatMessage, CompletionClient, ResponseFormat};
use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;

pub const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";

/// OpenAI-compatible chat completions backend.
#[derive(Clone)]
pub struct HttpCompletionClient {
    base_url: String,
    api_key: String,
    temperature: Option<f64>,
    max_tokens: Option<u32>,
    client: Client,
}

impl HttpCompletionClient {
    pub fn new(base_url: &str, api_key: String, timeout: Duration) -> Result<Self> {
        if api_key.trim().is_empty() {
            anyhow::bail!("API key is empty");
        }
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .context("Failed to create HTTP client")?;
        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key,
            temperature: None,
            max_tokens: None,
            client,
        })
    }

    pub fn with_temperature(mut self, temperature: Option<f64>) -> Self {
        self.temperature = temperature;
        self
    }

    pub fn with_max_tokens(mut self, max_tokens: Option<u32>) -> Self {
        self.max_tokens = max_tokens;
        self
    }

    pub fn endpoint(&self) -> String {
        format!("{}/chat/completions", self.base_url)
    }
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: &'a [ChatMessage],
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    response_format: Option<ResponseFormatBody>,
}

#[derive(Serialize)]
struct ResponseFormatBody {
    #[serde(rename = "type")]
    kind: &'static str,
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChoiceMessage,
}

#[derive(Deserialize)]
struct ChoiceMessage {
    #[serde(default)]
    content: Option<String>,
}

#[async_trait]
impl CompletionClient for HttpCompletionClient {
    fn name(&self) -> &str {
        "http"
    }

    async fn complete(
        &self,
        model: &str,
        messages: &[ChatMessage],
        format: ResponseFormat,
    ) -> Result<String> {
        let body = ChatRequest {
            model,
            messages,
            temperature: self.temperature,
            max_tokens: self.max_tokens,
            response_format: (format == ResponseFormat::Json).then_some(ResponseFormatBody {
                kind: "json_object",
            }),
        };

        let response = self
            .client
            .post(self.endpoint())
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await
            .context("HTTP request failed")?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            anyhow::bail!("Backend returned {}: {}", status, text);
        }

        let parsed: ChatResponse = response
            .json()
            .await
            .context("Failed to decode chat completion response")?;
        let content = parsed
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .ok_or_else(|| anyhow::anyhow!("Chat completion contained no message content"))?;

        debug!("Model {} returned {} bytes", model, content.len());
        Ok(content)
    }
}
