//! Per-session configuration.

use std::time::Duration;

/// Error raised when an [`InterviewSession`](crate::session::InterviewSession)
/// cannot be constructed. This is the only error the session surfaces as a
/// `Result`; everything after construction arrives on the event channel.
#[derive(Debug, thiserror::Error)]
pub enum LiveError {
    #[error("missing required credential: {0}")]
    MissingCredential(&'static str),
}

/// Connection parameters for one live interview session.
///
/// The two credentials are required; everything else defaults to values
/// matching the hosted endpoints.
#[derive(Clone, Debug)]
pub struct LiveConfig {
    /// Base WebSocket URL of the bidirectional generation endpoint.
    pub live_url: String,
    /// Credential appended to the live URL.
    pub api_key: String,
    /// Model identifier sent in the setup handshake.
    pub model: String,
    /// Prebuilt voice used for synthesized interviewer speech.
    pub voice: String,
    /// HTTP endpoint of the transcription provider.
    pub transcribe_url: String,
    /// Credential for the transcription provider.
    pub transcribe_api_key: String,
    /// Model passed to the transcription provider.
    pub transcribe_model: String,
    /// Minimum spacing between sends of queued (non-audio) chunks.
    pub min_send_interval: Duration,
    /// Pause between the transport opening and the setup message.
    pub settle_delay: Duration,
    /// Pause between the setup acknowledgement and the ready notification.
    pub stabilize_delay: Duration,
    /// Delay before the reconnect attempt after an abnormal close.
    pub reconnect_backoff: Duration,
}

impl LiveConfig {
    pub fn new(api_key: impl Into<String>, transcribe_api_key: impl Into<String>) -> Self {
        Self {
            live_url: "wss://generativelanguage.googleapis.com/ws/google.ai.generativelanguage.v1beta.GenerativeService.BidiGenerateContent".to_string(),
            api_key: api_key.into(),
            model: "models/gemini-2.0-flash-exp".to_string(),
            voice: "Puck".to_string(),
            transcribe_url: "https://api.openai.com/v1/audio/transcriptions".to_string(),
            transcribe_api_key: transcribe_api_key.into(),
            transcribe_model: "whisper-1".to_string(),
            min_send_interval: Duration::from_millis(500),
            settle_delay: Duration::from_millis(150),
            stabilize_delay: Duration::from_millis(200),
            reconnect_backoff: Duration::from_secs(1),
        }
    }

    pub(crate) fn validate(&self) -> Result<(), LiveError> {
        if self.api_key.is_empty() {
            return Err(LiveError::MissingCredential("live API key"));
        }
        if self.transcribe_api_key.is_empty() {
            return Err(LiveError::MissingCredential("transcription API key"));
        }
        Ok(())
    }
}
