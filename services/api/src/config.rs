//! Process configuration, read from the environment (and an optional `.env`).

use secrecy::SecretString;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;
use tracing::Level;

const DEFAULT_PORT: u16 = 3001;

/// A custom error type for configuration loading failures.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing environment variable: {0}")]
    MissingVar(String),
    #[error("Invalid value for environment variable {0}: {1}")]
    InvalidValue(String, String),
}

/// Holds all configuration loaded from the environment at startup.
pub struct Config {
    pub bind_address: SocketAddr,
    pub openai_api_key: SecretString,
    pub openai_base_url: String,
    pub chat_model: String,
    pub topic: Option<String>,
    pub prompts_dir: Option<PathBuf>,
    pub web_dir: PathBuf,
    pub speech_timeout: Duration,
    pub log_level: Level,
}

impl Config {
    /// Loads configuration from environment variables:
    ///
    /// *   `BIND_ADDRESS`: Address to listen on. Defaults to `0.0.0.0:$PORT`.
    /// *   `PORT`: Port used when `BIND_ADDRESS` is unset. Defaults to 3001.
    /// *   `OPENAI_API_KEY`: Credential for the generation service. Required.
    /// *   `OPENAI_BASE_URL`: (Optional) OpenAI-compatible API root.
    /// *   `CHAT_MODEL`: (Optional) Model for both personas and summaries. Defaults to "gpt-5-nano".
    /// *   `DIALOGUE_TOPIC`: (Optional) Subject announced to viewers.
    /// *   `PROMPTS_DIR`: (Optional) Directory of markdown prompt overrides.
    /// *   `WEB_DIR`: (Optional) Static viewer assets. Defaults to "web".
    /// *   `SPEECH_TIMEOUT_SECS`: (Optional) Playback-done wait. Defaults to 120.
    /// *   `RUST_LOG`: (Optional) The logging level. Defaults to "INFO".
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds a config from any key lookup.
    pub fn from_lookup(var: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let bind_address = match var("BIND_ADDRESS") {
            Some(addr) => addr
                .parse::<SocketAddr>()
                .map_err(|e| ConfigError::InvalidValue("BIND_ADDRESS".to_string(), e.to_string()))?,
            None => {
                let port = match var("PORT") {
                    Some(p) => p
                        .parse::<u16>()
                        .map_err(|e| ConfigError::InvalidValue("PORT".to_string(), e.to_string()))?,
                    None => DEFAULT_PORT,
                };
                SocketAddr::from(([0, 0, 0, 0], port))
            }
        };

        let openai_api_key = var("OPENAI_API_KEY")
            .filter(|k| !k.trim().is_empty())
            .map(SecretString::from)
            .ok_or_else(|| ConfigError::MissingVar("OPENAI_API_KEY".to_string()))?;

        let openai_base_url = var("OPENAI_BASE_URL")
            .unwrap_or_else(|| dialogue_core::llm::DEFAULT_BASE_URL.to_string());
        let chat_model = var("CHAT_MODEL").unwrap_or_else(|| "gpt-5-nano".to_string());
        let topic = var("DIALOGUE_TOPIC").filter(|t| !t.trim().is_empty());
        let prompts_dir = var("PROMPTS_DIR").map(PathBuf::from);
        let web_dir = PathBuf::from(var("WEB_DIR").unwrap_or_else(|| "web".to_string()));

        let speech_timeout = match var("SPEECH_TIMEOUT_SECS") {
            Some(secs) => secs
                .parse::<u64>()
                .ok()
                .filter(|s| *s > 0)
                .map(Duration::from_secs)
                .ok_or_else(|| {
                    ConfigError::InvalidValue(
                        "SPEECH_TIMEOUT_SECS".to_string(),
                        format!("'{}' is not a positive number of seconds", secs),
                    )
                })?,
            None => Duration::from_secs(120),
        };

        let log_level_str = var("RUST_LOG").unwrap_or_else(|| "INFO".to_string());
        let log_level = log_level_str.parse::<Level>().map_err(|_| {
            ConfigError::InvalidValue(
                "RUST_LOG".to_string(),
                format!("'{}' is not a valid log level", log_level_str),
            )
        })?;

        Ok(Self {
            bind_address,
            openai_api_key,
            openai_base_url,
            chat_model,
            topic,
            prompts_dir,
            web_dir,
            speech_timeout,
            log_level,
        })
    }
}
