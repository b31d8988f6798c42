//! Manages the WebSocket bridge between an app client and a live interview
//! session.

use super::protocol::{ClientMessage, ServerMessage};
use crate::state::AppState;
use anyhow::{Result, anyhow};
use axum::{
    extract::{
        State,
        ws::{Message, WebSocket, WebSocketUpgrade},
    },
    response::Response,
};
use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64;
use futures_util::{
    SinkExt, StreamExt,
    stream::{SplitSink, SplitStream},
};
use interview_live::{
    AudioSink, HttpTranscriber, InterviewContext, InterviewSession, InterviewType, SessionEvent,
    audio,
};
use std::sync::Arc;
use tokio::sync::{Mutex, mpsc};
use tracing::{error, info, instrument, warn};
use uuid::Uuid;

/// Axum handler to upgrade an HTTP connection to the interview WebSocket.
pub async fn ws_handler(ws: WebSocketUpgrade, State(state): State<Arc<AppState>>) -> Response {
    ws.on_upgrade(|socket| handle_socket(socket, state))
}

/// Forwards interviewer speech back to the app client as base64 chunks.
///
/// The service has no local speaker; the client's audio player is the
/// rendering device, so `play` resolves as soon as the chunk is relayed.
struct RelaySink {
    socket_tx: Arc<Mutex<SplitSink<WebSocket, Message>>>,
}

#[async_trait::async_trait]
impl AudioSink for RelaySink {
    async fn play(&self, samples: Vec<f32>) -> Result<()> {
        let data = audio::encode_pcm16_base64(&samples);
        let mut sink = self.socket_tx.lock().await;
        send_msg(&mut sink, ServerMessage::AudioChunk { data }).await
    }

    fn stop(&self) {}
}

/// Main handler for an individual client connection.
///
/// Performs the `start` handshake, spins up the live session, and runs the
/// bridge loop until either side goes away.
#[instrument(name = "interview_ws", skip_all, fields(session_id))]
async fn handle_socket(socket: WebSocket, state: Arc<AppState>) {
    let session_id = Uuid::new_v4();
    tracing::Span::current().record("session_id", tracing::field::display(session_id));
    info!("New interview connection. Awaiting start message...");

    let (socket_tx, mut socket_rx) = socket.split();
    let socket_tx = Arc::new(Mutex::new(socket_tx));

    // The first message from the client must be a `start` message.
    let (context, voice) = match read_start_message(&mut socket_rx).await {
        Ok(Some(start)) => start,
        Ok(None) => {
            info!("Client disconnected before starting the interview.");
            return;
        }
        Err(e) => {
            error!(error = ?e, "Interview start failed");
            let mut sink = socket_tx.lock().await;
            let _ = send_msg(
                &mut sink,
                ServerMessage::Error {
                    message: e.to_string(),
                },
            )
            .await;
            return;
        }
    };

    let mut live_config = state.config.live_config();
    if let Some(voice) = voice {
        live_config.voice = voice;
    }
    let sink = Arc::new(RelaySink {
        socket_tx: socket_tx.clone(),
    });
    let transcriber = Arc::new(HttpTranscriber::new(
        state.config.transcribe_url.clone(),
        state.config.transcribe_api_key.clone(),
        state.config.transcribe_model.clone(),
    ));

    let (session, events) =
        match InterviewSession::spawn(live_config, Some(context.clone()), sink, transcriber) {
            Ok(pair) => pair,
            Err(e) => {
                error!(error = ?e, "Could not construct the live session");
                let mut sink = socket_tx.lock().await;
                let _ = send_msg(
                    &mut sink,
                    ServerMessage::Error {
                        message: e.to_string(),
                    },
                )
                .await;
                return;
            }
        };
    session.connect().await;
    info!(role = %context.role, interview_type = %context.interview_type, "Interview session starting");

    run_bridge(session, events, socket_tx, socket_rx, session_id).await;
}

/// Parses the mandatory first `start` message into an interview context.
async fn read_start_message(
    socket_rx: &mut SplitStream<WebSocket>,
) -> Result<Option<(InterviewContext, Option<String>)>> {
    let Some(first) = socket_rx.next().await else {
        return Ok(None);
    };
    let Message::Text(text) = first? else {
        return Err(anyhow!("First message must be a text `start` message."));
    };
    let parsed: ClientMessage = serde_json::from_str(&text)?;
    let ClientMessage::Start {
        interview_type,
        role,
        company,
        voice,
    } = parsed
    else {
        return Err(anyhow!("First message must be `start`."));
    };

    let context = InterviewContext {
        interview_type: InterviewType::parse(&interview_type),
        role: role.unwrap_or_else(|| "the requested position".to_string()),
        company,
    };
    Ok(Some((context, voice)))
}

/// The main event loop for an active bridge: client media in, session
/// events out.
async fn run_bridge(
    session: InterviewSession,
    mut events: mpsc::Receiver<SessionEvent>,
    socket_tx: Arc<Mutex<SplitSink<WebSocket, Message>>>,
    mut socket_rx: SplitStream<WebSocket>,
    session_id: Uuid,
) {
    loop {
        tokio::select! {
            incoming = socket_rx.next() => {
                match incoming {
                    Some(Ok(Message::Binary(pcm))) => {
                        // Raw microphone PCM; the live protocol wants base64.
                        let data = BASE64.encode(&pcm);
                        session.send_media_chunk(data, "audio/pcm").await;
                    }
                    Some(Ok(Message::Text(text))) => {
                        match serde_json::from_str::<ClientMessage>(&text) {
                            Ok(ClientMessage::Frame { data }) => {
                                session.send_media_chunk(data, "image/jpeg").await;
                            }
                            Ok(ClientMessage::End) => {
                                info!("Client ended the interview.");
                                break;
                            }
                            Ok(ClientMessage::Start { .. }) => {
                                warn!("Ignoring duplicate start message.");
                            }
                            Err(e) => warn!(error = %e, "Undecodable client message."),
                        }
                    }
                    Some(Ok(Message::Close(_))) | None => {
                        info!("Client closed the interview socket.");
                        break;
                    }
                    Some(Ok(_)) => {}
                    Some(Err(e)) => {
                        error!(error = %e, "Error receiving from client socket.");
                        break;
                    }
                }
            }
            event = events.recv() => {
                let Some(event) = event else { break; };
                let message = match event {
                    SessionEvent::SetupComplete => ServerMessage::Ready {
                        session_id,
                        started_at: session.session_start_ms(),
                    },
                    SessionEvent::Message { text } => ServerMessage::AssistantText { text },
                    SessionEvent::Transcription { text } => ServerMessage::Transcription { text },
                    SessionEvent::PlayingStateChanged { playing: true } => ServerMessage::AiSpeakingStart,
                    SessionEvent::PlayingStateChanged { playing: false } => ServerMessage::AiSpeakingEnd,
                    SessionEvent::AudioLevel { level } => ServerMessage::AudioLevel { level },
                    SessionEvent::ConnectionError { message } => ServerMessage::Error { message },
                };
                let mut sink = socket_tx.lock().await;
                if send_msg(&mut sink, message).await.is_err() {
                    break;
                }
            }
        }
    }

    session.disconnect().await;
    info!("Interview connection closed.");
}

/// A helper function to serialize and send a `ServerMessage` to the client.
pub(crate) async fn send_msg(
    socket_tx: &mut SplitSink<WebSocket, Message>,
    msg: ServerMessage,
) -> Result<()> {
    let serialized = serde_json::to_string(&msg)?;
    socket_tx.send(Message::Text(serialized.into())).await?;
    Ok(())
}
