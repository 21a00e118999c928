//! Playback sinks.
//!
//! A session writes interleaved S16LE PCM through the `PlaybackSink` trait.
//! Production uses ALSA; tests substitute a timed sink. The underlying ALSA
//! device is opened lazily on first use and reused across sessions, only
//! reopening when a payload arrives at a different sample rate.

use alsa::ValueOr;
use alsa::pcm::{Access, Format, HwParams, PCM};
use anyhow::{Context, Result};
use std::sync::{Arc, Mutex};

/// One audio output for one session. Writes block until the device has
/// accepted the samples, which paces playback in real time.
pub trait PlaybackSink: Send {
    fn write(&mut self, pcm: &[i16]) -> Result<()>;
}

/// Opens a sink for a session's sample rate.
pub type SinkFactory = Arc<dyn Fn(u32) -> Result<Box<dyn PlaybackSink>> + Send + Sync>;

struct OpenDevice {
    sample_rate: u32,
    pcm: PCM,
}

/// Process-wide playback device state shared by all sessions.
struct AlsaOutput {
    device: String,
    period_size: usize,
    open: Option<OpenDevice>,
}

impl AlsaOutput {
    fn ensure_open(&mut self, sample_rate: u32) -> Result<&PCM> {
        let stale = !matches!(&self.open, Some(dev) if dev.sample_rate == sample_rate);
        if stale {
            self.open = None;
            let pcm = open_playback_device(&self.device, sample_rate, self.period_size)?;
            return Ok(&self.open.insert(OpenDevice { sample_rate, pcm }).pcm);
        }
        match &self.open {
            Some(dev) => Ok(&dev.pcm),
            None => Err(anyhow::anyhow!("playback device not open")),
        }
    }

    fn write(&mut self, sample_rate: u32, data: &[i16]) -> Result<()> {
        let pcm = self.ensure_open(sample_rate)?;
        let io = pcm.io_i16()?;

        // Retry loop handles short writes and XRUN recovery.
        let mut written = 0;
        let mut retries = 0u32;
        while written < data.len() {
            match io.writei(&data[written..]) {
                Ok(frames) => {
                    written += frames;
                    retries = 0;
                }
                Err(e) => {
                    log::warn!("ALSA playback error: {}, recovering...", e);
                    retries += 1;
                    pcm.prepare().context("Failed to recover PCM playback")?;
                    if retries >= 3 {
                        log::error!(
                            "Max recovery retries reached, dropping {} samples",
                            data.len() - written
                        );
                        break;
                    }
                }
            }
        }
        Ok(())
    }
}

/// Open a mono S16LE playback device, letting ALSA negotiate the nearest
/// supported rate and period size.
fn open_playback_device(device: &str, sample_rate: u32, period_size: usize) -> Result<PCM> {
    let pcm = PCM::new(device, alsa::Direction::Playback, false)
        .with_context(|| format!("Failed to open PCM device '{}' for playback", device))?;
    {
        let hwp = HwParams::any(&pcm).context("Failed to initialize HwParams")?;
        hwp.set_access(Access::RWInterleaved)?;
        hwp.set_format(Format::S16LE)?;
        hwp.set_channels(1)?;
        hwp.set_rate_near(sample_rate, ValueOr::Nearest)?;
        hwp.set_period_size_near(period_size as alsa::pcm::Frames, ValueOr::Nearest)?;
        pcm.hw_params(&hwp)?;
    }
    let actual_rate = pcm.hw_params_current()?.get_rate()?;
    log::info!(
        "ALSA playback open: device={}, requested_rate={}, actual_rate={}",
        device,
        sample_rate,
        actual_rate,
    );
    Ok(pcm)
}

struct AlsaSink {
    output: Arc<Mutex<AlsaOutput>>,
    sample_rate: u32,
}

impl PlaybackSink for AlsaSink {
    fn write(&mut self, pcm: &[i16]) -> Result<()> {
        let mut output = self
            .output
            .lock()
            .map_err(|_| anyhow::anyhow!("playback device mutex poisoned"))?;
        output.write(self.sample_rate, pcm)
    }
}

/// Factory over one shared, lazily opened ALSA device. The device itself is
/// never torn down; sessions only borrow it.
pub fn alsa_sink_factory(device: String, period_size: usize) -> SinkFactory {
    let output = Arc::new(Mutex::new(AlsaOutput {
        device,
        period_size,
        open: None,
    }));
    Arc::new(move |sample_rate| {
        Ok(Box::new(AlsaSink {
            output: output.clone(),
            sample_rate,
        }) as Box<dyn PlaybackSink>)
    })
}
