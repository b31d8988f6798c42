//! Wire shapes of the bidirectional generation protocol.
//!
//! Field casing is uneven on the wire (`systemInstruction` next to
//! `generation_config`); the serde renames below reproduce it exactly
//! rather than normalizing it away.

use serde::{Deserialize, Serialize};

/// Messages sent to the live endpoint.
#[derive(Serialize, Debug)]
pub enum ClientMessage {
    #[serde(rename = "setup")]
    Setup(Setup),
    #[serde(rename = "realtime_input")]
    RealtimeInput(RealtimeInput),
}

/// Initial handshake payload: model, persona, and response configuration.
#[derive(Serialize, Debug)]
pub struct Setup {
    pub model: String,
    #[serde(rename = "systemInstruction")]
    pub system_instruction: SystemInstruction,
    pub generation_config: GenerationConfig,
}

#[derive(Serialize, Debug)]
pub struct SystemInstruction {
    pub parts: Vec<TextPart>,
}

#[derive(Serialize, Debug)]
pub struct TextPart {
    pub text: String,
}

#[derive(Serialize, Debug)]
pub struct GenerationConfig {
    pub response_modalities: Vec<ResponseModality>,
    #[serde(rename = "speechConfig")]
    pub speech_config: SpeechConfig,
}

#[derive(Serialize, Debug)]
#[serde(rename_all = "UPPERCASE")]
pub enum ResponseModality {
    Audio,
    Text,
}

#[derive(Serialize, Debug)]
pub struct SpeechConfig {
    #[serde(rename = "voiceConfig")]
    pub voice_config: VoiceConfig,
}

#[derive(Serialize, Debug)]
pub struct VoiceConfig {
    #[serde(rename = "prebuiltVoiceConfig")]
    pub prebuilt_voice_config: PrebuiltVoiceConfig,
}

#[derive(Serialize, Debug)]
pub struct PrebuiltVoiceConfig {
    #[serde(rename = "voiceName")]
    pub voice_name: String,
}

/// One batch of outbound media.
#[derive(Serialize, Debug)]
pub struct RealtimeInput {
    pub media_chunks: Vec<MediaChunk>,
}

#[derive(Serialize, Debug)]
pub struct MediaChunk {
    pub mime_type: String,
    pub data: String,
}

/// Messages received from the live endpoint. All fields are optional; the
/// populated one decides how the message is dispatched.
#[derive(Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct ServerMessage {
    pub setup_complete: Option<serde_json::Value>,
    pub server_content: Option<ServerContent>,
    pub error: Option<serde_json::Value>,
}

#[derive(Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct ServerContent {
    pub model_turn: Option<ModelTurn>,
    pub turn_complete: Option<bool>,
}

#[derive(Deserialize, Debug)]
pub struct ModelTurn {
    pub parts: Vec<ServerPart>,
}

#[derive(Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct ServerPart {
    pub text: Option<String>,
    pub inline_data: Option<InlineBlob>,
}

#[derive(Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct InlineBlob {
    pub mime_type: Option<String>,
    pub data: String,
}
