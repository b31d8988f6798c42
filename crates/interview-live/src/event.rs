//! Events emitted by a running interview session.

/// A session-level notification, delivered on the event channel returned by
/// [`InterviewSession::spawn`](crate::session::InterviewSession::spawn).
///
/// The channel replaces a callback set: consumers run their own receive loop
/// and react to each variant, which keeps all re-entrancy on the caller's
/// side of the boundary.
#[derive(Clone, Debug, PartialEq)]
pub enum SessionEvent {
    /// The remote side acknowledged the setup handshake; media may flow.
    SetupComplete,
    /// A text fragment of the model's current turn.
    Message { text: String },
    /// Transcript of one completed model utterance.
    Transcription { text: String },
    /// Model speech playback started or stopped.
    PlayingStateChanged { playing: bool },
    /// Coarse loudness of the unit now playing, 0-100.
    AudioLevel { level: u8 },
    /// An advisory error; the session keeps running (or reconnects) on its
    /// own rather than requiring consumer intervention.
    ConnectionError { message: String },
}
