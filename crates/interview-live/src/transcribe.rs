//! Turn transcription.
//!
//! When the model signals the end of a turn, the session joins the turn's
//! PCM fragments, wraps them in a WAV container, and posts them to a
//! speech-to-text endpoint. The provider sits behind a trait so tests can
//! capture the request instead of talking to the network.

use crate::audio;
use anyhow::{Context, Result};
use base64::Engine;
use serde::Deserialize;

#[async_trait::async_trait]
pub trait Transcriber: Send + Sync {
    /// Transcribes one WAV-wrapped utterance, returning the recognized text.
    async fn transcribe(&self, wav: Vec<u8>) -> Result<String>;
}

#[derive(Deserialize)]
struct TranscriptionResponse {
    text: String,
}

/// Speech-to-text over a multipart HTTP endpoint (OpenAI-compatible shape:
/// `file` + `model` in, `{"text": ...}` out).
pub struct HttpTranscriber {
    client: reqwest::Client,
    url: String,
    api_key: String,
    model: String,
}

impl HttpTranscriber {
    pub fn new(
        url: impl Into<String>,
        api_key: impl Into<String>,
        model: impl Into<String>,
    ) -> Self {
        Self {
            client: reqwest::Client::new(),
            url: url.into(),
            api_key: api_key.into(),
            model: model.into(),
        }
    }
}

#[async_trait::async_trait]
impl Transcriber for HttpTranscriber {
    async fn transcribe(&self, wav: Vec<u8>) -> Result<String> {
        let part = reqwest::multipart::Part::bytes(wav)
            .file_name("utterance.wav")
            .mime_str("audio/wav")?;
        let form = reqwest::multipart::Form::new()
            .part("file", part)
            .text("model", self.model.clone());

        let response = self
            .client
            .post(&self.url)
            .bearer_auth(&self.api_key)
            .multipart(form)
            .send()
            .await
            .context("transcription request failed")?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            anyhow::bail!("transcription endpoint returned {status}: {body}");
        }
        let parsed: TranscriptionResponse = response
            .json()
            .await
            .context("malformed transcription response")?;
        Ok(parsed.text)
    }
}

/// Builds the WAV payload for one turn from its base64 fragments.
///
/// Fragments are decoded individually and joined as bytes; concatenating the
/// base64 text itself would break on padded fragments.
pub(crate) fn turn_wav(fragments: &[String]) -> Result<Vec<u8>> {
    let mut pcm = Vec::new();
    for fragment in fragments {
        let bytes = base64::engine::general_purpose::STANDARD
            .decode(fragment)
            .context("turn fragment is not valid base64")?;
        pcm.extend_from_slice(&bytes);
    }
    audio::wav_from_pcm16(&pcm)
}
