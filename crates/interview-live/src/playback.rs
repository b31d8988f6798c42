//! Ordered playback of model speech.
//!
//! Fragments are decoded the moment they arrive and queued as ready-to-play
//! units; a single player task renders them through an [`AudioSink`] one at
//! a time, in arrival order. The task being the only consumer is what
//! guarantees units never overlap.

use crate::audio;
use crate::event::SessionEvent;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use tokio::sync::{Notify, mpsc};
use tokio::task::JoinHandle;

/// One decoded, ready-to-play buffer of model speech.
pub struct PlaybackUnit {
    pub samples: Vec<f32>,
    /// Coarse loudness, 0-100, precomputed at decode time.
    pub level: u8,
}

/// Destination for decoded model speech.
///
/// `play` must resolve when the buffer has finished rendering; the pipeline
/// relies on that to keep units strictly sequential.
#[async_trait::async_trait]
pub trait AudioSink: Send + Sync {
    /// Renders one mono buffer at [`audio::SAMPLE_RATE`].
    async fn play(&self, samples: Vec<f32>) -> anyhow::Result<()>;

    /// Cuts off whatever is rendering right now. Hard stop, no fade.
    fn stop(&self);
}

struct Shared {
    queue: Mutex<VecDeque<PlaybackUnit>>,
    playing: AtomicBool,
    wake: Notify,
}

pub(crate) struct PlaybackPipeline {
    shared: Arc<Shared>,
    sink: Arc<dyn AudioSink>,
    events: mpsc::Sender<SessionEvent>,
    player: JoinHandle<()>,
}

impl PlaybackPipeline {
    pub(crate) fn new(sink: Arc<dyn AudioSink>, events: mpsc::Sender<SessionEvent>) -> Self {
        let shared = Arc::new(Shared {
            queue: Mutex::new(VecDeque::new()),
            playing: AtomicBool::new(false),
            wake: Notify::new(),
        });
        let player = tokio::spawn(Self::run(shared.clone(), sink.clone(), events.clone()));
        Self {
            shared,
            sink,
            events,
            player,
        }
    }

    /// Decodes one base64 PCM fragment and queues it. Undecodable fragments
    /// are dropped here so one bad frame cannot stall the queue.
    pub(crate) fn enqueue_fragment(&self, fragment: &str) {
        let samples = audio::decode_pcm16_base64(fragment);
        if samples.is_empty() {
            return;
        }
        let level = audio::amplitude_level(&samples);
        self.shared
            .queue
            .lock()
            .unwrap()
            .push_back(PlaybackUnit { samples, level });
        self.shared.wake.notify_one();
    }

    /// Hard stop: clears the queue, cuts the in-flight unit, and resets the
    /// playing flag.
    pub(crate) fn stop(&self) {
        self.shared.queue.lock().unwrap().clear();
        self.sink.stop();
        if self.shared.playing.swap(false, Ordering::SeqCst) {
            let _ = self
                .events
                .try_send(SessionEvent::PlayingStateChanged { playing: false });
        }
    }

    async fn run(
        shared: Arc<Shared>,
        sink: Arc<dyn AudioSink>,
        events: mpsc::Sender<SessionEvent>,
    ) {
        loop {
            let unit = shared.queue.lock().unwrap().pop_front();
            let Some(unit) = unit else {
                shared.wake.notified().await;
                continue;
            };

            shared.playing.store(true, Ordering::SeqCst);
            let _ = events
                .send(SessionEvent::PlayingStateChanged { playing: true })
                .await;
            let _ = events
                .send(SessionEvent::AudioLevel { level: unit.level })
                .await;

            if let Err(e) = sink.play(unit.samples).await {
                tracing::warn!(error = %e, "audio sink failed to render a unit");
                let _ = events
                    .send(SessionEvent::ConnectionError {
                        message: format!("audio playback failed: {e}"),
                    })
                    .await;
            }

            let drained = shared.queue.lock().unwrap().is_empty();
            if drained && shared.playing.swap(false, Ordering::SeqCst) {
                let _ = events
                    .send(SessionEvent::PlayingStateChanged { playing: false })
                    .await;
            }
        }
    }
}

impl Drop for PlaybackPipeline {
    fn drop(&mut self) {
        self.player.abort();
    }
}
