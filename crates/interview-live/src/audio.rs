//! PCM helpers for the live-session audio path.
//!
//! The remote model emits 16-bit little-endian PCM at a fixed 24 kHz mono
//! format, base64-encoded inside JSON frames. Everything here converts
//! between that wire form, the f32 sample buffers the playback sink
//! consumes, and the WAV container the transcription provider expects.

use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64;
use hound::{SampleFormat, WavSpec, WavWriter};
use std::io::Cursor;

/// Sample rate of model speech. Fixed by the remote output format; a
/// mismatch here is a configuration bug, not something negotiated at runtime.
pub const SAMPLE_RATE: u32 = 24_000;

/// Scale applied to the mean absolute sample when deriving a 0-100 level.
const LEVEL_SCALE: f32 = 300.0;

/// Decodes a base64 PCM16LE fragment into normalized f32 samples in [-1, 1].
///
/// Malformed base64 yields an empty buffer; a trailing odd byte is ignored.
pub fn decode_pcm16_base64(fragment: &str) -> Vec<f32> {
    let Ok(bytes) = BASE64.decode(fragment) else {
        tracing::warn!("discarding undecodable audio fragment");
        return Vec::new();
    };
    pcm16_bytes_to_f32(&bytes)
}

/// Reinterprets raw PCM16LE bytes as normalized f32 samples.
pub fn pcm16_bytes_to_f32(bytes: &[u8]) -> Vec<f32> {
    bytes
        .chunks_exact(2)
        .map(|chunk| i16::from_le_bytes([chunk[0], chunk[1]]) as f32 / 32768.0)
        .collect()
}

/// Converts f32 samples back to PCM16LE bytes, clamping out-of-range input.
pub fn f32_to_pcm16_bytes(samples: &[f32]) -> Vec<u8> {
    let mut bytes = Vec::with_capacity(samples.len() * 2);
    for &sample in samples {
        let value = (sample * 32768.0).clamp(i16::MIN as f32, i16::MAX as f32) as i16;
        bytes.extend_from_slice(&value.to_le_bytes());
    }
    bytes
}

/// Encodes f32 samples as a base64 PCM16LE string.
pub fn encode_pcm16_base64(samples: &[f32]) -> String {
    BASE64.encode(f32_to_pcm16_bytes(samples))
}

/// Coarse loudness of a buffer: mean absolute sample scaled into 0-100.
pub fn amplitude_level(samples: &[f32]) -> u8 {
    if samples.is_empty() {
        return 0;
    }
    let mean = samples.iter().map(|s| s.abs()).sum::<f32>() / samples.len() as f32;
    (mean * LEVEL_SCALE).clamp(0.0, 100.0) as u8
}

/// Wraps raw PCM16LE bytes in a mono WAV container at [`SAMPLE_RATE`].
pub fn wav_from_pcm16(pcm: &[u8]) -> anyhow::Result<Vec<u8>> {
    let spec = WavSpec {
        channels: 1,
        sample_rate: SAMPLE_RATE,
        bits_per_sample: 16,
        sample_format: SampleFormat::Int,
    };
    let mut cursor = Cursor::new(Vec::new());
    let mut writer = WavWriter::new(&mut cursor, spec)?;
    for chunk in pcm.chunks_exact(2) {
        writer.write_sample(i16::from_le_bytes([chunk[0], chunk[1]]))?;
    }
    writer.finalize()?;
    Ok(cursor.into_inner())
}
