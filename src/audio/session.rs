//! One audio playback session: a single decoded payload streamed to a sink
//! on a dedicated OS thread, with a shared play head for the analyser.
//!
//! Lifecycle is an explicit state machine: Decoding → Playing → Ended |
//! Failed. `stop()` is idempotent and safe on a session in any state.

use super::decode::PcmBuffer;
use super::sink::PlaybackSink;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU8, AtomicUsize, Ordering};
use std::thread::JoinHandle;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum SessionState {
    Decoding = 0,
    Playing = 1,
    Ended = 2,
    Failed = 3,
}

/// Lock-free cell so the playback thread and the UI thread can both read
/// the state without contending.
pub struct StateCell(AtomicU8);

impl StateCell {
    pub fn new(state: SessionState) -> Self {
        Self(AtomicU8::new(state as u8))
    }

    pub fn store(&self, state: SessionState) {
        self.0.store(state as u8, Ordering::SeqCst);
    }

    pub fn load(&self) -> SessionState {
        match self.0.load(Ordering::SeqCst) {
            0 => SessionState::Decoding,
            1 => SessionState::Playing,
            2 => SessionState::Ended,
            _ => SessionState::Failed,
        }
    }
}

pub struct PlaybackSession {
    samples: Arc<[f32]>,
    position: Arc<AtomicUsize>,
    running: Arc<AtomicBool>,
    state: Arc<StateCell>,
    handle: Option<JoinHandle<()>>,
}

impl PlaybackSession {
    /// Start playback from sample zero on a dedicated thread.
    ///
    /// `on_end` fires exactly once, on natural completion or on a sink
    /// failure mid-stream — never when the session is stopped externally.
    /// It runs on the playback thread and must not block on locks the
    /// stopping thread may hold.
    pub fn start(
        buffer: PcmBuffer,
        mut sink: Box<dyn PlaybackSink>,
        period_size: usize,
        on_end: impl FnOnce() + Send + 'static,
    ) -> Self {
        let samples: Arc<[f32]> = buffer.samples.into();
        let position = Arc::new(AtomicUsize::new(0));
        let running = Arc::new(AtomicBool::new(true));
        let state = Arc::new(StateCell::new(SessionState::Playing));

        let handle = {
            let samples = samples.clone();
            let position = position.clone();
            let running = running.clone();
            let state = state.clone();
            std::thread::Builder::new()
                .name("mouth-playback".into())
                .spawn(move || {
                    let period = period_size.max(1);
                    let mut chunk = vec![0i16; period];
                    let total = samples.len();
                    let mut pos = 0;

                    while running.load(Ordering::Relaxed) && pos < total {
                        let end = (pos + period).min(total);
                        for (dst, src) in chunk.iter_mut().zip(&samples[pos..end]) {
                            *dst = (src.clamp(-1.0, 1.0) * i16::MAX as f32) as i16;
                        }
                        if let Err(e) = sink.write(&chunk[..end - pos]) {
                            log::error!("Playback sink error: {:#}", e);
                            state.store(SessionState::Failed);
                            break;
                        }
                        pos = end;
                        position.store(pos, Ordering::Relaxed);
                    }

                    // Only the natural end (or a sink failure) completes the
                    // session; an external stop already owns the teardown.
                    if running.swap(false, Ordering::SeqCst) {
                        if state.load() == SessionState::Playing {
                            state.store(SessionState::Ended);
                        }
                        on_end();
                    }
                })
                .expect("failed to spawn playback thread")
        };

        Self {
            samples,
            position: position.clone(),
            running,
            state,
            handle: Some(handle),
        }
    }

    /// Stop playback. No-op if the session already ended or was stopped.
    pub fn stop(&mut self) {
        self.running.store(false, Ordering::SeqCst);
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }

    /// True while the playback thread is still producing samples.
    pub fn is_active(&self) -> bool {
        self.running.load(Ordering::SeqCst) && self.state.load() == SessionState::Playing
    }

    pub fn state(&self) -> SessionState {
        self.state.load()
    }

    pub fn position(&self) -> usize {
        self.position.load(Ordering::Relaxed)
    }

    /// The `len` samples behind the play head, left-padded with silence
    /// when playback has not yet produced a full window.
    pub fn analysis_window(&self, len: usize) -> Vec<f32> {
        let pos = self.position().min(self.samples.len());
        let start = pos.saturating_sub(len);
        let mut window = vec![0.0f32; len - (pos - start)];
        window.extend_from_slice(&self.samples[start..pos]);
        window
    }
}

impl Drop for PlaybackSession {
    fn drop(&mut self) {
        self.stop();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::Result;
    use std::sync::Mutex;
    use std::sync::mpsc;
    use std::time::Duration;

    /// Sink that paces writes like a real device and counts samples.
    struct TimedSink {
        sample_rate: u32,
        written: Arc<AtomicUsize>,
    }

    impl PlaybackSink for TimedSink {
        fn write(&mut self, pcm: &[i16]) -> Result<()> {
            std::thread::sleep(Duration::from_micros(
                pcm.len() as u64 * 1_000_000 / self.sample_rate as u64,
            ));
            self.written.fetch_add(pcm.len(), Ordering::SeqCst);
            Ok(())
        }
    }

    struct FailingSink;

    impl PlaybackSink for FailingSink {
        fn write(&mut self, _pcm: &[i16]) -> Result<()> {
            anyhow::bail!("device gone")
        }
    }

    fn tone_buffer(len: usize, sample_rate: u32) -> PcmBuffer {
        PcmBuffer {
            samples: (0..len)
                .map(|i| 0.5 * (2.0 * std::f32::consts::PI * 440.0 * i as f32 / 8000.0).sin())
                .collect(),
            sample_rate,
        }
    }

    #[test]
    fn plays_to_completion_and_fires_on_end_once() {
        let written = Arc::new(AtomicUsize::new(0));
        let (tx, rx) = mpsc::channel();
        let sink = TimedSink {
            sample_rate: 8000,
            written: written.clone(),
        };
        let mut session = PlaybackSession::start(
            tone_buffer(800, 8000),
            Box::new(sink),
            256,
            move || {
                tx.send(()).unwrap();
            },
        );

        rx.recv_timeout(Duration::from_secs(2)).unwrap();
        assert!(rx.try_recv().is_err(), "on_end fired more than once");
        assert_eq!(written.load(Ordering::SeqCst), 800);
        assert_eq!(session.state(), SessionState::Ended);
        assert!(!session.is_active());
        // stop after natural end is a no-op
        session.stop();
        assert_eq!(session.state(), SessionState::Ended);
    }

    #[test]
    fn stop_interrupts_without_completion() {
        let written = Arc::new(AtomicUsize::new(0));
        let (tx, rx) = mpsc::channel();
        let sink = TimedSink {
            sample_rate: 8000,
            written: written.clone(),
        };
        // 2 seconds of audio, stopped almost immediately
        let mut session = PlaybackSession::start(
            tone_buffer(16000, 8000),
            Box::new(sink),
            256,
            move || {
                let _ = tx.send(());
            },
        );
        std::thread::sleep(Duration::from_millis(50));
        session.stop();
        let after_stop = written.load(Ordering::SeqCst);
        assert!(after_stop < 16000, "stop did not interrupt playback");
        assert!(!session.is_active());
        // no completion callback on external interruption
        assert!(rx.recv_timeout(Duration::from_millis(100)).is_err());
        // no residual writes after stop
        std::thread::sleep(Duration::from_millis(100));
        assert_eq!(written.load(Ordering::SeqCst), after_stop);
        // idempotent
        session.stop();
    }

    #[test]
    fn sink_failure_still_completes() {
        let (tx, rx) = mpsc::channel();
        let mut session = PlaybackSession::start(
            tone_buffer(800, 8000),
            Box::new(FailingSink),
            256,
            move || {
                tx.send(()).unwrap();
            },
        );
        rx.recv_timeout(Duration::from_secs(2)).unwrap();
        session.stop();
        assert_eq!(session.state(), SessionState::Failed);
    }

    #[test]
    fn analysis_window_is_left_padded_then_full() {
        let sink = TimedSink {
            sample_rate: 8000,
            written: Arc::new(AtomicUsize::new(0)),
        };
        let mut session =
            PlaybackSession::start(tone_buffer(4000, 8000), Box::new(sink), 256, || {});
        let window = session.analysis_window(256);
        assert_eq!(window.len(), 256);
        std::thread::sleep(Duration::from_millis(100));
        let window = session.analysis_window(256);
        assert_eq!(window.len(), 256);
        // Half a second in, the window should carry real signal
        assert!(window.iter().any(|s| s.abs() > 0.01));
        session.stop();
    }

    // Regression guard: on_end must not need any lock the stopping thread
    // holds; it only touches channels here, mirroring production.
    #[test]
    fn stop_does_not_deadlock_with_on_end() {
        let guard = Arc::new(Mutex::new(()));
        let sink = TimedSink {
            sample_rate: 8000,
            written: Arc::new(AtomicUsize::new(0)),
        };
        let mut session =
            PlaybackSession::start(tone_buffer(160, 8000), Box::new(sink), 64, || {});
        let _held = guard.lock().unwrap();
        session.stop();
    }
}
