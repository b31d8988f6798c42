use std::net::SocketAddr;
use tracing::Level;

/// A custom error type for configuration loading failures.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing environment variable: {0}")]
    MissingVar(String),
    #[error("Invalid value for environment variable {0}: {1}")]
    InvalidValue(String, String),
}

/// Holds all configuration loaded from the environment at startup.
#[derive(Clone, Debug)]
pub struct Config {
    pub bind_address: SocketAddr,
    pub live_api_key: String,
    pub live_model: String,
    pub live_voice: String,
    pub transcribe_url: String,
    pub transcribe_api_key: String,
    pub transcribe_model: String,
    pub log_level: Level,
}

impl Config {
    /// Loads configuration from environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        // Only load from .env in non-test mode to avoid contamination
        if !cfg!(test) {
            dotenvy::dotenv().ok();
        }

        let bind_address_str =
            std::env::var("BIND_ADDRESS").unwrap_or_else(|_| "0.0.0.0:3000".to_string());
        let bind_address = bind_address_str
            .parse::<SocketAddr>()
            .map_err(|e| ConfigError::InvalidValue("BIND_ADDRESS".to_string(), e.to_string()))?;

        let live_api_key = std::env::var("GEMINI_API_KEY")
            .map_err(|_| ConfigError::MissingVar("GEMINI_API_KEY".to_string()))?;
        let live_model = std::env::var("LIVE_MODEL")
            .unwrap_or_else(|_| "models/gemini-2.0-flash-exp".to_string());
        let live_voice = std::env::var("LIVE_VOICE").unwrap_or_else(|_| "Puck".to_string());

        let transcribe_url = std::env::var("TRANSCRIBE_URL")
            .unwrap_or_else(|_| "https://api.openai.com/v1/audio/transcriptions".to_string());
        let transcribe_api_key = std::env::var("TRANSCRIBE_API_KEY")
            .map_err(|_| ConfigError::MissingVar("TRANSCRIBE_API_KEY".to_string()))?;
        let transcribe_model =
            std::env::var("TRANSCRIBE_MODEL").unwrap_or_else(|_| "whisper-1".to_string());

        let log_level_str = std::env::var("RUST_LOG").unwrap_or_else(|_| "INFO".to_string());
        let log_level = log_level_str.parse::<Level>().map_err(|_| {
            ConfigError::InvalidValue(
                "RUST_LOG".to_string(),
                format!("'{}' is not a valid log level", log_level_str),
            )
        })?;

        Ok(Self {
            bind_address,
            live_api_key,
            live_model,
            live_voice,
            transcribe_url,
            transcribe_api_key,
            transcribe_model,
            log_level,
        })
    }

    /// Builds the per-session live configuration from the service settings.
    pub fn live_config(&self) -> interview_live::LiveConfig {
        let mut live = interview_live::LiveConfig::new(
            self.live_api_key.clone(),
            self.transcribe_api_key.clone(),
        );
        live.model = self.live_model.clone();
        live.voice = self.live_voice.clone();
        live.transcribe_url = self.transcribe_url.clone();
        live.transcribe_model = self.transcribe_model.clone();
        live
    }
}
