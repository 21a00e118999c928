//! Mouth animation driver.
//!
//! Accepts base64 audio payloads, plays them through a sink, and exposes a
//! mouth openness value in [0, 1] derived from frequency analysis of the
//! samples around the play head. At most one payload plays at a time; a new
//! `present` supersedes the previous one. Exactly one `PlaybackComplete`
//! event is delivered per presented payload that was not superseded, whether
//! playback succeeded or failed.

use super::analyzer::{AnimatorTuning, FrequencyAnalyzer, openness_from_mean};
use super::decode;
use super::session::PlaybackSession;
use super::sink::SinkFactory;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use tokio::sync::mpsc;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AnimatorEvent {
    /// The current payload finished (naturally or by failure). Not sent when
    /// a payload is superseded or the animator is stopped.
    PlaybackComplete,
}

/// State shared with the decode and playback threads.
struct Shared {
    /// Bumped on every `present` and on `stop`; threads working for an older
    /// generation discard their results.
    generation: AtomicU64,
    speaking: AtomicBool,
    session: Mutex<Option<PlaybackSession>>,
}

pub struct MouthAnimator {
    inner: Arc<Shared>,
    tuning: AnimatorTuning,
    sink_factory: SinkFactory,
    period_size: usize,
    analyzer: FrequencyAnalyzer,
    seen_generation: u64,
    openness: f32,
    events_tx: mpsc::Sender<AnimatorEvent>,
}

impl MouthAnimator {
    pub fn new(
        tuning: AnimatorTuning,
        sink_factory: SinkFactory,
        period_size: usize,
        events_tx: mpsc::Sender<AnimatorEvent>,
    ) -> Self {
        let analyzer = FrequencyAnalyzer::new(tuning.fft_size);
        Self {
            inner: Arc::new(Shared {
                generation: AtomicU64::new(0),
                speaking: AtomicBool::new(false),
                session: Mutex::new(None),
            }),
            tuning,
            sink_factory,
            period_size,
            analyzer,
            seen_generation: 0,
            openness: 0.0,
            events_tx,
        }
    }

    /// Present a new payload. Any payload still playing is stopped first,
    /// then decoding proceeds off-thread so the UI never blocks on it.
    pub fn present(&mut self, payload: String) {
        let generation = self.inner.generation.fetch_add(1, Ordering::SeqCst) + 1;

        // Stop the superseded session before the new one can start, so two
        // sessions never overlap on the device.
        if let Some(mut old) = self.take_session() {
            old.stop();
        }

        let inner = self.inner.clone();
        let sink_factory = self.sink_factory.clone();
        let period_size = self.period_size;
        let events_tx = self.events_tx.clone();
        let spawned = std::thread::Builder::new()
            .name("mouth-decode".into())
            .spawn(move || {
                decode_and_start(
                    inner,
                    generation,
                    payload,
                    sink_factory,
                    period_size,
                    events_tx,
                );
            });
        if let Err(e) = spawned {
            log::error!("Failed to spawn decode thread: {}", e);
            let _ = self.events_tx.blocking_send(AnimatorEvent::PlaybackComplete);
        }
    }

    /// Caller-asserted speaking flag; while set and no payload is playing
    /// the mouth holds the fallback openness.
    pub fn set_speaking(&self, speaking: bool) {
        self.inner.speaking.store(speaking, Ordering::SeqCst);
    }

    /// Advance the animation one frame. Call once per render tick.
    pub fn tick(&mut self) {
        let generation = self.inner.generation.load(Ordering::SeqCst);
        if generation != self.seen_generation {
            self.seen_generation = generation;
            self.analyzer.reset();
        }

        let window = {
            let mut slot = match self.inner.session.lock() {
                Ok(slot) => slot,
                Err(_) => return,
            };
            match slot.as_ref() {
                Some(session) if session.is_active() => {
                    Some(session.analysis_window(self.tuning.fft_size))
                }
                Some(_) => {
                    // Ended or failed; reap it (joins the finished thread).
                    *slot = None;
                    None
                }
                None => None,
            }
        };

        self.openness = match window {
            Some(samples) => {
                let mean = self.analyzer.mean_byte_amplitude(&samples);
                openness_from_mean(mean, &self.tuning)
            }
            None if self.inner.speaking.load(Ordering::SeqCst) => self.tuning.fallback_openness,
            None => 0.0,
        };
    }

    /// Current mouth openness in [0, 1].
    pub fn openness(&self) -> f32 {
        self.openness
    }

    /// Stop playback and invalidate any in-flight decode. No completion
    /// event is delivered for the interrupted payload.
    pub fn stop(&mut self) {
        self.inner.generation.fetch_add(1, Ordering::SeqCst);
        if let Some(mut session) = self.take_session() {
            session.stop();
        }
        self.openness = 0.0;
    }

    fn take_session(&self) -> Option<PlaybackSession> {
        self.inner.session.lock().ok().and_then(|mut slot| slot.take())
    }
}

impl Drop for MouthAnimator {
    fn drop(&mut self) {
        self.stop();
    }
}

/// Runs on the decode thread. Every exit path for the current generation
/// either installs a session (which will send the completion itself) or
/// sends the completion directly.
fn decode_and_start(
    inner: Arc<Shared>,
    generation: u64,
    payload: String,
    sink_factory: SinkFactory,
    period_size: usize,
    events_tx: mpsc::Sender<AnimatorEvent>,
) {
    let current = |inner: &Shared| inner.generation.load(Ordering::SeqCst) == generation;
    let complete = |inner: &Shared, tx: &mpsc::Sender<AnimatorEvent>| {
        if current(inner) {
            let _ = tx.blocking_send(AnimatorEvent::PlaybackComplete);
        }
    };

    let buffer = match decode::decode_base64_payload(&payload) {
        Ok(buffer) => buffer,
        Err(e) => {
            log::error!("Audio payload decode failed: {:#}", e);
            complete(&inner, &events_tx);
            return;
        }
    };
    if !current(&inner) {
        return;
    }

    let sink = match sink_factory(buffer.sample_rate) {
        Ok(sink) => sink,
        Err(e) => {
            log::error!("Failed to open playback sink: {:#}", e);
            complete(&inner, &events_tx);
            return;
        }
    };

    let on_end = {
        let inner = inner.clone();
        let tx = events_tx.clone();
        move || {
            // Superseded sessions are stopped, not completed; the check
            // covers a failure racing with a new `present`.
            if inner.generation.load(Ordering::SeqCst) == generation {
                let _ = tx.blocking_send(AnimatorEvent::PlaybackComplete);
            }
        }
    };
    let mut session = PlaybackSession::start(buffer, sink, period_size, on_end);

    // Install under the lock, re-checking the generation: a newer `present`
    // may have arrived while we were decoding.
    match inner.session.lock() {
        Ok(mut slot) => {
            if current(&inner) {
                *slot = Some(session);
            } else {
                drop(slot);
                session.stop();
            }
        }
        Err(_) => session.stop(),
    }
}
