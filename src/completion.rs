//! Text-completion provider abstraction.
//!
//! The pipeline treats generation as an opaque prompt-in/text-out call
//! behind [`CompletionClient`]. The shipped implementation targets
//! OpenAI-compatible chat-completions endpoints; tests substitute stubs.
//!
//! Retry strategy for the HTTP provider:
//! - HTTP 429 and 5xx → retry with exponential backoff (1s, 2s, 4s, ...)
//! - other 4xx → fail immediately
//! - network errors → retry

use std::time::Duration;

use anyhow::{bail, Result};
use async_trait::async_trait;

use crate::config::CompletionConfig;

const DEFAULT_API_URL: &str = "https://api.openai.com/v1/chat/completions";

/// Opaque text-completion collaborator.
#[async_trait]
pub trait CompletionClient: Send + Sync {
    /// Generate a completion for the fully assembled prompt.
    async fn complete(&self, prompt: &str) -> Result<String>;
}

/// Provider used when `[completion] provider = "disabled"`; any call errors.
pub struct DisabledCompletion;

#[async_trait]
impl CompletionClient for DisabledCompletion {
    async fn complete(&self, _prompt: &str) -> Result<String> {
        bail!("completion provider is disabled")
    }
}

/// OpenAI-compatible chat-completions client.
pub struct OpenAiCompletion {
    model: String,
    url: String,
    api_key: String,
    timeout: Duration,
    max_retries: u32,
}

impl OpenAiCompletion {
    /// Build a client from configuration; requires `completion.model` and
    /// the `OPENAI_API_KEY` environment variable.
    pub fn new(config: &CompletionConfig) -> Result<Self> {
        let model = config
            .model
            .clone()
            .ok_or_else(|| anyhow::anyhow!("completion.model required for OpenAI provider"))?;
        let api_key = std::env::var("OPENAI_API_KEY")
            .map_err(|_| anyhow::anyhow!("OPENAI_API_KEY environment variable not set"))?;

        Ok(Self {
            model,
            url: config
                .url
                .clone()
                .unwrap_or_else(|| DEFAULT_API_URL.to_string()),
            api_key,
            timeout: Duration::from_secs(config.timeout_secs),
            max_retries: config.max_retries,
        })
    }
}

#[async_trait]
impl CompletionClient for OpenAiCompletion {
    async fn complete(&self, prompt: &str) -> Result<String> {
        let client = reqwest::Client::builder().timeout(self.timeout).build()?;

        let body = serde_json::json!({
            "model": self.model,
            "messages": [{ "role": "user", "content": prompt }],
        });

        let mut last_err = None;

        for attempt in 0..=self.max_retries {
            if attempt > 0 {
                let delay = Duration::from_secs(1 << (attempt - 1).min(5));
                tokio::time::sleep(delay).await;
            }

            let resp = client
                .post(&self.url)
                .header("Authorization", format!("Bearer {}", self.api_key))
                .header("Content-Type", "application/json")
                .json(&body)
                .send()
                .await;

            match resp {
                Ok(response) => {
                    let status = response.status();

                    if status.is_success() {
                        let json: serde_json::Value = response.json().await?;
                        return parse_completion_response(&json);
                    }

                    if status.as_u16() == 429 || status.is_server_error() {
                        let body_text = response.text().await.unwrap_or_default();
                        last_err = Some(anyhow::anyhow!(
                            "completion API error {}: {}",
                            status,
                            body_text
                        ));
                        continue;
                    }

                    let body_text = response.text().await.unwrap_or_default();
                    bail!("completion API error {}: {}", status, body_text);
                }
                Err(e) => {
                    last_err = Some(e.into());
                    continue;
                }
            }
        }

        Err(last_err.unwrap_or_else(|| anyhow::anyhow!("completion failed after retries")))
    }
}

/// Pull `choices[0].message.content` out of a chat-completions response.
fn parse_completion_response(json: &serde_json::Value) -> Result<String> {
    json.get("choices")
        .and_then(|c| c.as_array())
        .and_then(|c| c.first())
        .and_then(|c| c.get("message"))
        .and_then(|m| m.get("content"))
        .and_then(|t| t.as_str())
        .map(|t| t.to_string())
        .ok_or_else(|| anyhow::anyhow!("Invalid completion response: missing choices[0].message.content"))
}

/// Instantiate the provider selected by configuration.
pub fn create_client(config: &CompletionConfig) -> Result<Box<dyn CompletionClient>> {
    match config.provider.as_str() {
        "openai" => Ok(Box::new(OpenAiCompletion::new(config)?)),
        "disabled" => Ok(Box::new(DisabledCompletion)),
        other => bail!("Unknown completion provider: {}", other),
    }
}
