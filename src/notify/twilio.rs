//! SMS provider seam and its Twilio REST implementation.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use thiserror::Error;

use crate::config::TwilioConfig;

#[derive(Error, Debug)]
pub enum SmsError {
    #[error("provider error: {0}")]
    Provider(String),

    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),
}

/// Accepts (destination, body) and returns a delivery id. Any error is a
/// per-recipient failure; the dispatcher never lets it abort a batch.
#[async_trait]
pub trait SmsSender: Send + Sync {
    async fn send(&self, to: &str, body: &str) -> Result<String, SmsError>;
}

pub struct TwilioSms {
    client: Client,
    config: TwilioConfig,
}

impl TwilioSms {
    pub fn new(config: TwilioConfig) -> Self {
        if config.enabled() {
            tracing::info!("Twilio SMS sender initialized");
        } else {
            tracing::warn!("Twilio credentials missing or invalid, SMS runs in dev mode");
        }
        let client = Client::builder()
            .timeout(Duration::from_secs(10))
            .build()
            .expect("failed to build HTTP client");
        Self { client, config }
    }
}

#[async_trait]
impl SmsSender for TwilioSms {
    async fn send(&self, to: &str, body: &str) -> Result<String, SmsError> {
        if !self.config.enabled() {
            tracing::info!("SMS to {to} suppressed (dev mode): {body}");
            return Ok("dev-mode".to_string());
        }

        // enabled() guarantees these are present
        let sid = self.config.account_sid.as_deref().unwrap_or_default();
        let token = self.config.auth_token.as_deref().unwrap_or_default();
        let from = self.config.from_number.as_deref().unwrap_or_default();

        let url = format!("https://api.twilio.com/2010-04-01/Accounts/{sid}/Messages.json");
        let response = self
            .client
            .post(&url)
            .basic_auth(sid, Some(token))
            .form(&[("To", to), ("From", from), ("Body", body)])
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let detail = response.text().await.unwrap_or_default();
            return Err(SmsError::Provider(format!("{status}: {detail}")));
        }

        let payload: serde_json::Value = response.json().await?;
        payload
            .get("sid")
            .and_then(|v| v.as_str())
            .map(str::to_string)
            .ok_or_else(|| SmsError::Provider("response missing message sid".into()))
    }
}
