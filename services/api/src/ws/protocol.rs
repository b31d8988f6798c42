//! Defines the WebSocket message protocol between the app client and the
//! interview service.
//!
//! Microphone audio travels as binary frames carrying raw PCM16LE samples;
//! everything else is JSON text.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Messages sent from the client (app) to the server.
#[derive(Deserialize, Debug)]
#[serde(tag = "type")]
pub enum ClientMessage {
    /// Starts the interview. This must be the first message.
    #[serde(rename = "start")]
    Start {
        /// Interview style: "behavioral", "technical", or anything else for
        /// a general screen.
        interview_type: String,
        /// The role the candidate is practicing for.
        role: Option<String>,
        /// Optional target company.
        company: Option<String>,
        /// Optional synthesized voice override.
        voice: Option<String>,
    },
    /// One camera frame, base64-encoded JPEG.
    #[serde(rename = "frame")]
    Frame { data: String },
    /// Ends the interview.
    #[serde(rename = "end")]
    End,
}

/// Messages sent from the server to the client (app).
#[derive(Serialize, Debug, Clone)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerMessage {
    /// The live session finished its handshake; media may flow.
    Ready { session_id: Uuid, started_at: i64 },
    /// Transcript of the interviewer's last utterance.
    Transcription { text: String },
    /// A text fragment spoken by the interviewer.
    AssistantText { text: String },
    /// A chunk of interviewer speech (base64 PCM16 at 24 kHz).
    AudioChunk { data: String },
    /// Loudness of the chunk now playing, for the speaking indicator.
    AudioLevel { level: u8 },
    /// The interviewer's voice started playing.
    AiSpeakingStart,
    /// The interviewer's voice finished playing.
    AiSpeakingEnd,
    /// An advisory error; the session recovers on its own where it can.
    Error { message: String },
}
