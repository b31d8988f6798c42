//! End-to-end tests for the session manager against an in-process live
//! endpoint speaking the duplex protocol.

use async_trait::async_trait;
use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64;
use futures_util::{SinkExt, StreamExt};
use interview_live::{
    AudioSink, InterviewContext, InterviewSession, InterviewType, LiveConfig, SessionEvent,
    Transcriber, audio,
};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::net::{TcpListener, TcpStream};
use tokio::time::timeout;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{WebSocketStream, accept_async};

struct NullSink;

#[async_trait]
impl AudioSink for NullSink {
    async fn play(&self, _samples: Vec<f32>) -> anyhow::Result<()> {
        Ok(())
    }

    fn stop(&self) {}
}

#[derive(Default)]
struct CapturingTranscriber {
    wavs: Mutex<Vec<Vec<u8>>>,
    reply: String,
}

#[async_trait]
impl Transcriber for CapturingTranscriber {
    async fn transcribe(&self, wav: Vec<u8>) -> anyhow::Result<String> {
        self.wavs.lock().unwrap().push(wav);
        Ok(self.reply.clone())
    }
}

fn test_config(port: u16) -> LiveConfig {
    let mut config = LiveConfig::new("test-live-key", "test-stt-key");
    config.live_url = format!("ws://127.0.0.1:{port}/");
    config.settle_delay = Duration::from_millis(5);
    config.stabilize_delay = Duration::from_millis(5);
    config.reconnect_backoff = Duration::from_millis(80);
    config.min_send_interval = Duration::from_millis(60);
    config
}

async fn bind() -> (TcpListener, u16) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();
    (listener, port)
}

async fn accept_ws(listener: &TcpListener) -> WebSocketStream<TcpStream> {
    let (stream, _) = listener.accept().await.unwrap();
    accept_async(stream).await.unwrap()
}

/// Reads the next text frame off the server side of the socket.
async fn next_text(ws: &mut WebSocketStream<TcpStream>) -> String {
    loop {
        match ws.next().await.expect("socket closed").unwrap() {
            Message::Text(text) => return text.as_str().to_owned(),
            Message::Close(_) => panic!("peer closed while a text frame was expected"),
            _ => continue,
        }
    }
}

async fn send_json(ws: &mut WebSocketStream<TcpStream>, raw: &str) {
    ws.send(Message::Text(raw.to_string().into())).await.unwrap();
}

async fn recv_event(events: &mut tokio::sync::mpsc::Receiver<SessionEvent>) -> SessionEvent {
    timeout(Duration::from_secs(2), events.recv())
        .await
        .expect("timed out waiting for a session event")
        .expect("event channel closed")
}

#[tokio::test]
async fn handshake_carries_interview_context() {
    let (listener, port) = bind().await;
    let server = tokio::spawn(async move {
        let mut ws = accept_ws(&listener).await;
        let setup = next_text(&mut ws).await;
        send_json(&mut ws, r#"{"setupComplete":{}}"#).await;
        // Hold the socket open until the client is done asserting.
        tokio::time::sleep(Duration::from_millis(500)).await;
        setup
    });

    let context = InterviewContext {
        interview_type: InterviewType::Technical,
        role: "Backend Engineer".to_string(),
        company: None,
    };
    let (session, mut events) = InterviewSession::spawn(
        test_config(port),
        Some(context),
        Arc::new(NullSink),
        Arc::new(CapturingTranscriber::default()),
    )
    .unwrap();
    session.connect().await;

    assert_eq!(recv_event(&mut events).await, SessionEvent::SetupComplete);
    // Exactly once: nothing else arrives on a quiet channel.
    assert!(
        timeout(Duration::from_millis(150), events.recv())
            .await
            .is_err()
    );

    let setup = server.await.unwrap();
    let parsed: serde_json::Value = serde_json::from_str(&setup).unwrap();
    let instruction = parsed["setup"]["systemInstruction"]["parts"][0]["text"]
        .as_str()
        .unwrap();
    assert!(instruction.contains("Backend Engineer"));
    assert!(instruction.contains("technical"));
    assert_eq!(parsed["setup"]["model"], "models/gemini-2.0-flash-exp");
    assert_eq!(
        parsed["setup"]["generation_config"]["speechConfig"]["voiceConfig"]
            ["prebuiltVoiceConfig"]["voiceName"],
        "Puck"
    );

    session.disconnect().await;
}

#[tokio::test]
async fn turn_complete_triggers_exactly_one_transcription() {
    let (listener, port) = bind().await;

    let pcm_a: Vec<u8> = (0..160u16).flat_map(|i| (i as i16).to_le_bytes()).collect();
    let pcm_b: Vec<u8> = (0..160u16)
        .flat_map(|i| (1000 + i as i16).to_le_bytes())
        .collect();
    let frag_a = BASE64.encode(&pcm_a);
    let frag_b = BASE64.encode(&pcm_b);

    let server = {
        let (frag_a, frag_b) = (frag_a.clone(), frag_b.clone());
        tokio::spawn(async move {
            let mut ws = accept_ws(&listener).await;
            let _setup = next_text(&mut ws).await;
            send_json(&mut ws, r#"{"setupComplete":{}}"#).await;
            let turn = format!(
                r#"{{"serverContent":{{"modelTurn":{{"parts":[
                    {{"inlineData":{{"mimeType":"audio/pcm;rate=24000","data":"{frag_a}"}}}},
                    {{"text":"Tell me about yourself."}},
                    {{"inlineData":{{"mimeType":"audio/pcm;rate=24000","data":"{frag_b}"}}}}
                ]}}}}}}"#
            );
            send_json(&mut ws, &turn).await;
            send_json(&mut ws, r#"{"serverContent":{"turnComplete":true}}"#).await;
            // A second completion marker with an empty accumulator must not
            // trigger another transcription.
            send_json(&mut ws, r#"{"serverContent":{"turnComplete":true}}"#).await;
            tokio::time::sleep(Duration::from_millis(800)).await;
        })
    };

    let transcriber = Arc::new(CapturingTranscriber {
        wavs: Mutex::new(Vec::new()),
        reply: "candidate introduction".to_string(),
    });
    let (session, mut events) = InterviewSession::spawn(
        test_config(port),
        None,
        Arc::new(NullSink),
        transcriber.clone(),
    )
    .unwrap();
    session.connect().await;

    let mut saw_text = false;
    let mut transcript = None;
    while transcript.is_none() {
        match recv_event(&mut events).await {
            SessionEvent::Message { text } => {
                assert_eq!(text, "Tell me about yourself.");
                saw_text = true;
            }
            SessionEvent::Transcription { text } => transcript = Some(text),
            _ => {}
        }
    }
    assert!(saw_text);
    assert_eq!(transcript.as_deref(), Some("candidate introduction"));

    // Give the duplicate turn-complete a chance to misbehave.
    tokio::time::sleep(Duration::from_millis(200)).await;
    let wavs = transcriber.wavs.lock().unwrap();
    assert_eq!(wavs.len(), 1, "expected exactly one transcription request");

    // The request must contain both fragments, joined in arrival order.
    let mut joined = pcm_a.clone();
    joined.extend_from_slice(&pcm_b);
    let expected = audio::wav_from_pcm16(&joined).unwrap();
    assert_eq!(wavs[0], expected);
    drop(wavs);

    session.disconnect().await;
    server.await.unwrap();
}

#[tokio::test]
async fn media_is_dropped_when_channel_is_not_ready() {
    // Never connected: supported chunks are dropped with an error event.
    let (session, mut events) = InterviewSession::spawn(
        test_config(1),
        None,
        Arc::new(NullSink),
        Arc::new(CapturingTranscriber::default()),
    )
    .unwrap();

    session.send_media_chunk("aGVsbG8=", "audio/pcm").await;
    match recv_event(&mut events).await {
        SessionEvent::ConnectionError { message } => {
            assert!(message.contains("not ready"), "got: {message}");
        }
        other => panic!("expected a drop notification, got {other:?}"),
    }

    session.send_media_chunk("aGVsbG8=", "image/jpeg").await;
    match recv_event(&mut events).await {
        SessionEvent::ConnectionError { message } => {
            assert!(message.contains("not ready"), "got: {message}");
        }
        other => panic!("expected a drop notification, got {other:?}"),
    }

    // Unsupported types are rejected silently: no traffic, no event.
    session.send_media_chunk("aGVsbG8=", "text/plain").await;
    assert!(
        timeout(Duration::from_millis(100), events.recv())
            .await
            .is_err()
    );

    // Disconnect is idempotent, including before any connect.
    session.disconnect().await;
    session.disconnect().await;
}

#[tokio::test]
async fn queued_frames_respect_the_minimum_send_interval() {
    let (listener, port) = bind().await;
    let server = tokio::spawn(async move {
        let mut ws = accept_ws(&listener).await;
        let _setup = next_text(&mut ws).await;
        send_json(&mut ws, r#"{"setupComplete":{}}"#).await;

        let mut arrivals = Vec::new();
        while arrivals.len() < 2 {
            let text = next_text(&mut ws).await;
            if text.contains("realtime_input") {
                arrivals.push(tokio::time::Instant::now());
                let parsed: serde_json::Value = serde_json::from_str(&text).unwrap();
                assert_eq!(
                    parsed["realtime_input"]["media_chunks"][0]["mime_type"],
                    "image/jpeg"
                );
            }
        }
        arrivals
    });

    let (session, mut events) = InterviewSession::spawn(
        test_config(port),
        None,
        Arc::new(NullSink),
        Arc::new(CapturingTranscriber::default()),
    )
    .unwrap();
    session.connect().await;
    assert_eq!(recv_event(&mut events).await, SessionEvent::SetupComplete);

    session.send_media_chunk(BASE64.encode(b"frame-one"), "image/jpeg").await;
    session.send_media_chunk(BASE64.encode(b"frame-two"), "image/jpeg").await;

    let arrivals = timeout(Duration::from_secs(2), server)
        .await
        .expect("frames never arrived")
        .unwrap();
    let gap = arrivals[1] - arrivals[0];
    assert!(
        gap >= Duration::from_millis(50),
        "frames arrived only {gap:?} apart"
    );

    session.disconnect().await;
}

#[tokio::test]
async fn abnormal_close_schedules_exactly_one_reconnect() {
    let (listener, port) = bind().await;

    let mut config = test_config(port);
    // Keep the second frame queued long enough to survive until the fault.
    config.min_send_interval = Duration::from_millis(400);

    let (session, mut events) = InterviewSession::spawn(
        config,
        None,
        Arc::new(NullSink),
        Arc::new(CapturingTranscriber::default()),
    )
    .unwrap();

    // First connection: handshake, then die abruptly.
    session.connect().await;
    let mut first = timeout(Duration::from_secs(2), accept_ws(&listener))
        .await
        .expect("client never dialed");
    let _setup = next_text(&mut first).await;
    send_json(&mut first, r#"{"setupComplete":{}}"#).await;
    assert_eq!(recv_event(&mut events).await, SessionEvent::SetupComplete);

    session.send_media_chunk(BASE64.encode(b"one"), "image/jpeg").await;
    session.send_media_chunk(BASE64.encode(b"two"), "image/jpeg").await;
    tokio::time::sleep(Duration::from_millis(50)).await;
    drop(first);

    match recv_event(&mut events).await {
        SessionEvent::ConnectionError { .. } => {}
        other => panic!("expected a fault notification, got {other:?}"),
    }

    // The single scheduled retry shows up as a fresh connection.
    let mut second = timeout(Duration::from_secs(2), accept_ws(&listener))
        .await
        .expect("no reconnect attempt arrived");
    let _setup = next_text(&mut second).await;
    send_json(&mut second, r#"{"setupComplete":{}}"#).await;
    // The dying first connection may surface extra advisory errors; wait
    // until the replacement channel reports ready.
    loop {
        match recv_event(&mut events).await {
            SessionEvent::SetupComplete => break,
            SessionEvent::ConnectionError { .. } => continue,
            other => panic!("unexpected event while reconnecting: {other:?}"),
        }
    }

    // The frame queue was cleared on fault: nothing left over arrives here.
    assert!(
        timeout(Duration::from_millis(200), next_text(&mut second))
            .await
            .is_err(),
        "stale frames leaked onto the new connection"
    );

    // And no second retry is ever scheduled.
    assert!(
        timeout(Duration::from_millis(300), listener.accept())
            .await
            .is_err(),
        "more than one reconnect attempt"
    );

    session.disconnect().await;
}
