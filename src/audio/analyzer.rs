//! Frequency analysis for the mouth animation.
//!
//! Reproduces the byte-frequency-data semantics the original avatar relied
//! on: a fixed transform window, Hann weighting, per-bin magnitudes mapped
//! through a decibel range onto 0-255 with temporal smoothing. The mean of
//! those byte bins drives the openness mapping.

use rustfft::num_complex::Complex;
use rustfft::{Fft, FftPlanner};
use std::sync::Arc;

/// Byte mapping range and smoothing factor, matching common platform
/// analyser defaults.
const MIN_DECIBELS: f32 = -100.0;
const MAX_DECIBELS: f32 = -30.0;
const SMOOTHING: f32 = 0.8;

/// Tunable animation constants. The divisor and gate have no derivation in
/// the source material and are therefore configuration, not constants.
#[derive(Debug, Clone)]
pub struct AnimatorTuning {
    /// Transform window size in samples (bin count is half of this).
    pub fft_size: usize,
    /// Mean byte amplitude that maps to a fully open mouth.
    pub sensitivity_divisor: f32,
    /// Openness below this snaps to exactly 0 to suppress idle jitter.
    pub noise_gate: f32,
    /// Pinned openness while the caller-asserted speaking flag is set.
    pub fallback_openness: f32,
}

impl Default for AnimatorTuning {
    fn default() -> Self {
        Self {
            fft_size: 256,
            sensitivity_divisor: 40.0,
            noise_gate: 0.1,
            fallback_openness: 0.5,
        }
    }
}

/// Map a mean byte amplitude (0-255) to mouth openness in [0, 1].
pub fn openness_from_mean(mean: f32, tuning: &AnimatorTuning) -> f32 {
    let open = (mean / tuning.sensitivity_divisor).clamp(0.0, 1.0);
    if open < tuning.noise_gate { 0.0 } else { open }
}

pub struct FrequencyAnalyzer {
    fft: Arc<dyn Fft<f32>>,
    fft_size: usize,
    window: Vec<f32>,
    /// Per-bin smoothed magnitudes carried across frames.
    smoothed: Vec<f32>,
    scratch: Vec<Complex<f32>>,
}

impl FrequencyAnalyzer {
    pub fn new(fft_size: usize) -> Self {
        let fft = FftPlanner::new().plan_fft_forward(fft_size);
        // Hann window
        let window = (0..fft_size)
            .map(|i| {
                let phase = 2.0 * std::f32::consts::PI * i as f32 / fft_size as f32;
                0.5 * (1.0 - phase.cos())
            })
            .collect();
        Self {
            fft,
            fft_size,
            window,
            smoothed: vec![0.0; fft_size / 2],
            scratch: vec![Complex::new(0.0, 0.0); fft_size],
        }
    }

    /// Forget smoothing state from the previous session.
    pub fn reset(&mut self) {
        self.smoothed.fill(0.0);
    }

    /// Compute byte-scale amplitudes (0-255) for each frequency bin from one
    /// window of time-domain samples. Shorter inputs are zero-padded on the
    /// left; longer inputs use their trailing `fft_size` samples.
    pub fn byte_frequency_data(&mut self, samples: &[f32]) -> Vec<u8> {
        let n = self.fft_size;
        let tail = if samples.len() > n {
            &samples[samples.len() - n..]
        } else {
            samples
        };
        let pad = n - tail.len();
        for slot in self.scratch[..pad].iter_mut() {
            *slot = Complex::new(0.0, 0.0);
        }
        for (i, s) in tail.iter().enumerate() {
            self.scratch[pad + i] = Complex::new(s * self.window[pad + i], 0.0);
        }

        self.fft.process(&mut self.scratch);

        let mut bytes = Vec::with_capacity(n / 2);
        for k in 0..n / 2 {
            let magnitude = self.scratch[k].norm() / n as f32;
            self.smoothed[k] = SMOOTHING * self.smoothed[k] + (1.0 - SMOOTHING) * magnitude;
            let db = 20.0 * self.smoothed[k].max(f32::MIN_POSITIVE).log10();
            let scaled = (db - MIN_DECIBELS) / (MAX_DECIBELS - MIN_DECIBELS);
            bytes.push((255.0 * scaled).clamp(0.0, 255.0) as u8);
        }
        bytes
    }

    /// Arithmetic mean amplitude across all bins.
    pub fn mean_byte_amplitude(&mut self, samples: &[f32]) -> f32 {
        let bytes = self.byte_frequency_data(samples);
        if bytes.is_empty() {
            return 0.0;
        }
        bytes.iter().map(|&b| b as f32).sum::<f32>() / bytes.len() as f32
    }
}
