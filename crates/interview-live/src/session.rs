//! The realtime interview session manager.
//!
//! One [`InterviewSession`] owns one duplex streaming connection to the
//! voice-model endpoint and coordinates three flows: outbound media
//! (microphone audio sent immediately, camera frames paced through a FIFO),
//! inbound model output (audio fragments played back in order, text
//! forwarded), and per-turn transcription of the model's accumulated speech.
//! Consumers drive it through a small command surface and observe it through
//! the [`SessionEvent`] channel.

use crate::{
    config::{LiveConfig, LiveError},
    context::{self, InterviewContext},
    event::SessionEvent,
    pacer::FramePacer,
    playback::{AudioSink, PlaybackPipeline},
    transcribe::{self, Transcriber},
    wire,
};
use anyhow::Result;
use futures_util::{
    SinkExt, StreamExt,
    stream::{SplitSink, SplitStream},
};
use std::sync::Arc;
use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tokio_tungstenite::{
    MaybeTlsStream, WebSocketStream, connect_async,
    tungstenite::Error as WsError,
    tungstenite::protocol::{CloseFrame, Message as WsMessage, frame::coding::CloseCode},
};
use tracing::{info, warn};

type WsSink = SplitSink<WebSocketStream<MaybeTlsStream<TcpStream>>, WsMessage>;
type WsSource = SplitStream<WebSocketStream<MaybeTlsStream<TcpStream>>>;

/// Lifecycle of the duplex channel.
///
/// Outbound media is accepted and inbound content processed only in
/// `Ready`; while `AwaitingSetupAck` the only message honored is the setup
/// acknowledgement.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ConnectionState {
    Idle,
    Connecting,
    AwaitingSetupAck,
    Ready,
    Closing,
    Faulted,
}

enum Command {
    Connect,
    /// The delayed retry scheduled after a fault. Ignored unless the session
    /// is still faulted by the time it fires.
    Reconnect,
    SendMedia { data: String, mime: String },
    Disconnect,
}

/// Handle to a running session driver.
///
/// Command methods never fail: every runtime problem is reported through the
/// event channel instead. Only construction can error, on a missing
/// credential. Dropping the handle tears the driver down.
pub struct InterviewSession {
    commands: mpsc::Sender<Command>,
    started_at_ms: i64,
}

impl InterviewSession {
    /// Validates the configuration and spawns the session driver.
    ///
    /// Returns the command handle and the event stream. No network activity
    /// happens until [`connect`](Self::connect) is called.
    pub fn spawn(
        config: LiveConfig,
        context: Option<InterviewContext>,
        sink: Arc<dyn AudioSink>,
        transcriber: Arc<dyn Transcriber>,
    ) -> Result<(Self, mpsc::Receiver<SessionEvent>), LiveError> {
        config.validate()?;
        let (commands, commands_rx) = mpsc::channel(64);
        let (events, events_rx) = mpsc::channel(256);
        let driver = Driver {
            playback: PlaybackPipeline::new(sink, events.clone()),
            pacer: FramePacer::new(config.min_send_interval),
            config,
            context,
            state: ConnectionState::Idle,
            ws_tx: None,
            ws_rx: None,
            transcriber,
            turn_audio: Vec::new(),
            events,
            commands: commands.downgrade(),
            reconnect_pending: false,
        };
        tokio::spawn(driver.run(commands_rx));
        Ok((
            Self {
                commands,
                started_at_ms: chrono::Utc::now().timestamp_millis(),
            },
            events_rx,
        ))
    }

    /// Opens the duplex channel. No-op when already connecting or connected.
    pub async fn connect(&self) {
        let _ = self.commands.send(Command::Connect).await;
    }

    /// Submits one media chunk. `audio/pcm` goes out immediately,
    /// `image/jpeg` is queued and paced; anything else is rejected.
    pub async fn send_media_chunk(&self, data: impl Into<String>, mime: impl Into<String>) {
        let _ = self
            .commands
            .send(Command::SendMedia {
                data: data.into(),
                mime: mime.into(),
            })
            .await;
    }

    /// Tears the session down. Safe to call repeatedly or before `connect`.
    pub async fn disconnect(&self) {
        let _ = self.commands.send(Command::Disconnect).await;
    }

    /// Epoch milliseconds captured at construction. Consumers derive the
    /// elapsed interview duration from this.
    pub fn session_start_ms(&self) -> i64 {
        self.started_at_ms
    }
}

struct Driver {
    config: LiveConfig,
    context: Option<InterviewContext>,
    state: ConnectionState,
    ws_tx: Option<WsSink>,
    ws_rx: Option<WsSource>,
    pacer: FramePacer,
    playback: PlaybackPipeline,
    transcriber: Arc<dyn Transcriber>,
    /// Base64 fragments of the model's current turn, in arrival order.
    turn_audio: Vec<String>,
    events: mpsc::Sender<SessionEvent>,
    /// Weak so the driver exits when the consumer drops its handle.
    commands: mpsc::WeakSender<Command>,
    reconnect_pending: bool,
}

impl Driver {
    async fn run(mut self, mut commands_rx: mpsc::Receiver<Command>) {
        loop {
            tokio::select! {
                command = commands_rx.recv() => match command {
                    Some(Command::Connect) => self.open_channel().await,
                    Some(Command::Reconnect) => {
                        if self.state == ConnectionState::Faulted {
                            self.open_channel().await;
                        }
                    }
                    Some(Command::SendMedia { data, mime }) => self.submit_media(data, mime).await,
                    Some(Command::Disconnect) => self.teardown().await,
                    None => {
                        self.teardown().await;
                        break;
                    }
                },
                incoming = Self::next_frame(&mut self.ws_rx), if self.ws_rx.is_some() => {
                    self.handle_frame(incoming).await;
                }
                _ = self.pacer.tick(), if self.pacer.is_active() => {
                    self.drain_frame_queue().await;
                }
            }
        }
        info!("session driver stopped");
    }

    async fn next_frame(source: &mut Option<WsSource>) -> Option<Result<WsMessage, WsError>> {
        match source.as_mut() {
            Some(stream) => stream.next().await,
            None => std::future::pending().await,
        }
    }

    /// Opens the duplex channel and performs the setup handshake.
    async fn open_channel(&mut self) {
        match self.state {
            ConnectionState::Connecting
            | ConnectionState::AwaitingSetupAck
            | ConnectionState::Ready => return,
            _ => {}
        }
        self.reconnect_pending = false;
        self.state = ConnectionState::Connecting;

        let url = format!("{}?key={}", self.config.live_url, self.config.api_key);
        match connect_async(url.as_str()).await {
            Ok((stream, _)) => {
                info!("live channel connected");
                let (tx, rx) = stream.split();
                self.ws_tx = Some(tx);
                self.ws_rx = Some(rx);
                self.state = ConnectionState::AwaitingSetupAck;
                // Let the transport settle before the handshake.
                tokio::time::sleep(self.config.settle_delay).await;
                if let Err(e) = self.send_setup().await {
                    self.fault(format!("setup handshake failed: {e}")).await;
                }
            }
            Err(e) => {
                self.fault(format!("failed to open live channel: {e}")).await;
            }
        }
    }

    async fn send_setup(&mut self) -> Result<()> {
        let setup = wire::ClientMessage::Setup(wire::Setup {
            model: self.config.model.clone(),
            system_instruction: wire::SystemInstruction {
                parts: vec![wire::TextPart {
                    text: context::system_instruction(self.context.as_ref()),
                }],
            },
            generation_config: wire::GenerationConfig {
                response_modalities: vec![wire::ResponseModality::Audio],
                speech_config: wire::SpeechConfig {
                    voice_config: wire::VoiceConfig {
                        prebuilt_voice_config: wire::PrebuiltVoiceConfig {
                            voice_name: self.config.voice.clone(),
                        },
                    },
                },
            },
        });
        self.send_message(&setup).await
    }

    async fn send_message(&mut self, message: &wire::ClientMessage) -> Result<()> {
        let Some(tx) = self.ws_tx.as_mut() else {
            anyhow::bail!("channel is not open");
        };
        tx.send(WsMessage::Text(serde_json::to_string(message)?.into()))
            .await?;
        Ok(())
    }

    /// Routes one outbound chunk: audio straight out, frames to the pacer.
    /// Chunks submitted while the channel is not ready are dropped, never
    /// queued for later.
    async fn submit_media(&mut self, data: String, mime: String) {
        let essence = mime.split(';').next().unwrap_or_default().trim();
        match essence {
            "audio/pcm" | "image/jpeg" => {}
            other => {
                warn!(mime = %other, "rejecting unsupported media type");
                return;
            }
        }
        if self.state != ConnectionState::Ready {
            let _ = self
                .events
                .send(SessionEvent::ConnectionError {
                    message: format!("dropping {essence} chunk: channel not ready"),
                })
                .await;
            return;
        }
        if essence == "audio/pcm" {
            let message = Self::media_message(mime, data);
            if let Err(e) = self.send_message(&message).await {
                let _ = self
                    .events
                    .send(SessionEvent::ConnectionError {
                        message: format!("audio send failed: {e}"),
                    })
                    .await;
            }
        } else {
            self.pacer.enqueue(data);
        }
    }

    fn media_message(mime_type: String, data: String) -> wire::ClientMessage {
        wire::ClientMessage::RealtimeInput(wire::RealtimeInput {
            media_chunks: vec![wire::MediaChunk { mime_type, data }],
        })
    }

    /// One pacer tick: sends at most one queued frame, re-checking both the
    /// channel state and the elapsed-interval floor.
    async fn drain_frame_queue(&mut self) {
        if self.state == ConnectionState::Ready {
            if let Some(frame) = self.pacer.pop_due() {
                let message = Self::media_message("image/jpeg".to_string(), frame.clone());
                match self.send_message(&message).await {
                    Ok(()) => self.pacer.mark_sent(),
                    Err(e) => {
                        self.pacer.requeue_front(frame);
                        let _ = self
                            .events
                            .send(SessionEvent::ConnectionError {
                                message: format!("frame send failed: {e}"),
                            })
                            .await;
                    }
                }
            }
        }
        self.pacer.disarm_if_empty();
    }

    async fn handle_frame(&mut self, incoming: Option<Result<WsMessage, WsError>>) {
        match incoming {
            Some(Ok(WsMessage::Text(text))) => self.dispatch(text.as_str()).await,
            Some(Ok(WsMessage::Binary(payload))) => {
                // The wire payload is JSON regardless of framing.
                match String::from_utf8(payload.to_vec()) {
                    Ok(text) => self.dispatch(&text).await,
                    Err(_) => {
                        let _ = self
                            .events
                            .send(SessionEvent::ConnectionError {
                                message: "binary frame was not valid UTF-8".to_string(),
                            })
                            .await;
                    }
                }
            }
            Some(Ok(WsMessage::Close(frame))) => self.handle_close(frame).await,
            Some(Ok(_)) => {}
            Some(Err(e)) => self.fault(format!("transport error: {e}")).await,
            None => {
                // Stream ended without a close frame.
                if matches!(self.state, ConnectionState::Closing | ConnectionState::Idle) {
                    self.ws_tx = None;
                    self.ws_rx = None;
                    self.state = ConnectionState::Idle;
                } else {
                    self.fault("channel closed unexpectedly".to_string()).await;
                }
            }
        }
    }

    async fn handle_close(&mut self, frame: Option<CloseFrame>) {
        let clean = self.state == ConnectionState::Closing
            || matches!(&frame, Some(f) if f.code == CloseCode::Normal);
        if clean {
            info!("live channel closed");
            self.ws_tx = None;
            self.ws_rx = None;
            self.state = ConnectionState::Idle;
        } else {
            let detail = frame
                .map(|f| format!("code {}, reason: {}", u16::from(f.code), f.reason.as_str()))
                .unwrap_or_else(|| "no close frame".to_string());
            self.fault(format!("channel closed abnormally ({detail})"))
                .await;
        }
    }

    /// Parses one JSON message off the wire and routes it. Parse failures
    /// are reported and swallowed; later messages must not be affected.
    async fn dispatch(&mut self, raw: &str) {
        let message: wire::ServerMessage = match serde_json::from_str(raw) {
            Ok(message) => message,
            Err(e) => {
                warn!(error = %e, "undecodable message on live channel");
                let _ = self
                    .events
                    .send(SessionEvent::ConnectionError {
                        message: format!("undecodable server message: {e}"),
                    })
                    .await;
                return;
            }
        };

        if message.setup_complete.is_some() {
            self.on_setup_ack().await;
            return;
        }
        if self.state == ConnectionState::AwaitingSetupAck {
            warn!("ignoring content message before setup acknowledgement");
            return;
        }
        if let Some(content) = message.server_content {
            if let Some(model_turn) = content.model_turn {
                for part in model_turn.parts {
                    if let Some(blob) = part.inline_data {
                        // One fragment feeds both the turn accumulator and
                        // live playback.
                        self.playback.enqueue_fragment(&blob.data);
                        self.turn_audio.push(blob.data);
                    }
                    if let Some(text) = part.text {
                        let _ = self.events.send(SessionEvent::Message { text }).await;
                    }
                }
            }
            if content.turn_complete == Some(true) {
                self.finish_turn();
            }
            return;
        }
        if let Some(error) = message.error {
            let _ = self
                .events
                .send(SessionEvent::ConnectionError {
                    message: error.to_string(),
                })
                .await;
        }
    }

    async fn on_setup_ack(&mut self) {
        if self.state != ConnectionState::AwaitingSetupAck {
            warn!(state = ?self.state, "unexpected setup acknowledgement");
            return;
        }
        self.state = ConnectionState::Ready;
        // Let the remote side stabilize before the consumer starts streaming.
        tokio::time::sleep(self.config.stabilize_delay).await;
        let _ = self.events.send(SessionEvent::SetupComplete).await;
        info!("session ready");
    }

    /// Hands the completed turn's audio to the transcriber. Transcription of
    /// this turn runs concurrently with ingestion of the next one; the
    /// accumulator is surrendered up front, so a failed transcription never
    /// leaks fragments into later turns.
    fn finish_turn(&mut self) {
        if self.turn_audio.is_empty() {
            return;
        }
        let fragments = std::mem::take(&mut self.turn_audio);
        let transcriber = self.transcriber.clone();
        let events = self.events.clone();
        tokio::spawn(async move {
            let result = match transcribe::turn_wav(&fragments) {
                Ok(wav) => transcriber.transcribe(wav).await,
                Err(e) => Err(e),
            };
            match result {
                Ok(text) => {
                    let _ = events.send(SessionEvent::Transcription { text }).await;
                }
                Err(e) => {
                    let _ = events
                        .send(SessionEvent::ConnectionError {
                            message: format!("transcription failed: {e}"),
                        })
                        .await;
                }
            }
        });
    }

    /// Drops the channel, reports the failure, and schedules the single
    /// delayed reconnect attempt.
    async fn fault(&mut self, message: String) {
        warn!(%message, "live channel fault");
        self.ws_tx = None;
        self.ws_rx = None;
        self.pacer.clear();
        self.turn_audio.clear();
        self.state = ConnectionState::Faulted;
        let _ = self
            .events
            .send(SessionEvent::ConnectionError { message })
            .await;
        if !self.reconnect_pending {
            self.reconnect_pending = true;
            let commands = self.commands.clone();
            let backoff = self.config.reconnect_backoff;
            tokio::spawn(async move {
                tokio::time::sleep(backoff).await;
                if let Some(commands) = commands.upgrade() {
                    let _ = commands.send(Command::Reconnect).await;
                }
            });
        }
    }

    /// Idempotent disconnect: halts pacing and playback, closes the channel
    /// with a normal-closure code, and resets per-turn state.
    async fn teardown(&mut self) {
        self.pacer.clear();
        self.playback.stop();
        self.turn_audio.clear();
        if let Some(mut tx) = self.ws_tx.take() {
            self.state = ConnectionState::Closing;
            let frame = CloseFrame {
                code: CloseCode::Normal,
                reason: "session ended".into(),
            };
            if let Err(e) = tx.send(WsMessage::Close(Some(frame))).await {
                warn!(error = %e, "close frame send failed");
            }
        }
        self.ws_rx = None;
        self.state = ConnectionState::Idle;
    }
}
