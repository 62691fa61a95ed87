use std::{env, fmt::Display, str::FromStr};

use tracing::{info, warn};

#[derive(Debug, Clone)]
pub struct Config {
    pub port: u16,
    pub database_url: String,
    pub jwt_secret: String,
    /// Token lifetime in seconds.
    pub jwt_expiration: i64,
    pub twilio: TwilioConfig,
    pub openai: OpenAiConfig,
}

#[derive(Debug, Clone)]
pub struct TwilioConfig {
    pub account_sid: Option<String>,
    pub auth_token: Option<String>,
    pub from_number: Option<String>,
}

impl TwilioConfig {
    /// SMS sending is only enabled with a complete, plausible credential
    /// set; otherwise the sender runs in dev mode and just logs.
    pub fn enabled(&self) -> bool {
        matches!(
            (&self.account_sid, &self.auth_token, &self.from_number),
            (Some(sid), Some(_), Some(_)) if sid.starts_with("AC")
        )
    }
}

#[derive(Debug, Clone)]
pub struct OpenAiConfig {
    pub api_key: Option<String>,
    pub base_url: String,
    pub model: String,
}

impl Config {
    pub fn load() -> Self {
        Self {
            port: try_load("PORT", "5000"),
            database_url: env::var("DATABASE_URL").unwrap_or_else(|_| {
                warn!("DATABASE_URL not set, using local default");
                "postgres://localhost/cycleconnect".to_string()
            }),
            jwt_secret: try_load("JWT_SECRET", "cycleconnect-secret-key"),
            jwt_expiration: try_load("JWT_EXPIRATION_SECS", "86400"),
            twilio: TwilioConfig {
                account_sid: var("TWILIO_ACCOUNT_SID").ok(),
                auth_token: var("TWILIO_AUTH_TOKEN").ok(),
                from_number: var("TWILIO_PHONE_NUMBER").ok(),
            },
            openai: OpenAiConfig {
                api_key: var("OPENAI_API_KEY").ok(),
                base_url: try_load("OPENAI_BASE_URL", "https://api.openai.com/v1"),
                model: try_load("OPENAI_MODEL", "gpt-4o-mini"),
            },
        }
    }
}

fn var(key: &str) -> Result<String, ()> {
    env::var(key).map_err(|_| {
        warn!("Environment variable {key} not found");
    })
}

fn try_load<T: FromStr>(key: &str, default: &str) -> T
where
    T::Err: Display,
{
    env::var(key)
        .unwrap_or_else(|_| {
            info!("{key} not set, using default: {default}");
            default.to_string()
        })
        .parse()
        .map_err(|e| {
            warn!("Invalid {key} value: {e}");
        })
        .expect("Environment misconfigured!")
}
