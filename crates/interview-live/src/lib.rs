//! Realtime interview session bridge for JobGenie voice interviews.
//!
//! This crate owns the client side of one bidirectional streaming connection
//! to a generative voice model: connection lifecycle and handshake, outbound
//! media pacing, inbound message dispatch, ordered audio playback, and
//! per-turn transcription. It is structured into modules by concern:
//!
//! - `session`: the manager itself — state machine, driver loop, commands.
//! - `wire`: serde shapes of the duplex protocol.
//! - `pacer`: rate-limited FIFO for camera frames.
//! - `playback`: decode + strictly ordered rendering of model speech.
//! - `transcribe`: WAV assembly and the speech-to-text call.
//! - `audio`: PCM16/base64/level conversions shared by the above.
//! - `context`, `config`, `event`: the consumer-facing surface.

pub mod audio;
pub mod config;
pub mod context;
pub mod event;
mod pacer;
pub mod playback;
pub mod session;
pub mod transcribe;
pub mod wire;

pub use config::{LiveConfig, LiveError};
pub use context::{InterviewContext, InterviewType};
pub use event::SessionEvent;
pub use playback::AudioSink;
pub use session::{ConnectionState, InterviewSession};
pub use transcribe::{HttpTranscriber, Transcriber};
