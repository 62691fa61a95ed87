//! Text-generation seam and its OpenAI chat-completions implementation.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde_json::json;
use thiserror::Error;

use crate::config::OpenAiConfig;

#[derive(Error, Debug)]
pub enum GenError {
    #[error("no API key configured")]
    MissingKey,

    #[error("provider error: {0}")]
    Provider(String),

    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),
}

/// Accepts a prompt, returns free-form text. No structural contract; the
/// insight parser treats the output as untrusted.
#[async_trait]
pub trait TextGenerator: Send + Sync {
    async fn generate(&self, prompt: &str) -> Result<String, GenError>;
}

pub struct OpenAiText {
    client: Client,
    config: OpenAiConfig,
}

impl OpenAiText {
    pub fn new(config: OpenAiConfig) -> Self {
        let client = Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .expect("failed to build HTTP client");
        Self { client, config }
    }
}

#[async_trait]
impl TextGenerator for OpenAiText {
    async fn generate(&self, prompt: &str) -> Result<String, GenError> {
        let key = self.config.api_key.as_deref().ok_or(GenError::MissingKey)?;

        let url = format!("{}/chat/completions", self.config.base_url);
        let response = self
            .client
            .post(&url)
            .bearer_auth(key)
            .json(&json!({
                "model": self.config.model,
                "messages": [{ "role": "user", "content": prompt }],
                "temperature": 0.7,
                "max_tokens": 1000,
            }))
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let detail = response.text().await.unwrap_or_default();
            return Err(GenError::Provider(format!("{status}: {detail}")));
        }

        let payload: serde_json::Value = response.json().await?;
        payload["choices"][0]["message"]["content"]
            .as_str()
            .map(str::to_string)
            .ok_or_else(|| GenError::Provider("response missing message content".into()))
    }
}
