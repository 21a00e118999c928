use crate::audio::AnimatorTuning;

#[derive(Debug, Clone)]
pub struct Config {
    // Backend
    pub backend_base_url: &'static str,
    pub health_interval_secs: u64,

    // Audio output
    pub playback_device: &'static str,
    pub playback_period_size: usize,

    // Mouth animation tuning
    pub animator_fft_size: usize,
    pub animator_sensitivity_divisor: f32,
    pub animator_noise_gate: f32,
    pub animator_fallback_openness: f32,

    // UI
    pub ui_tick_ms: u64,
}

impl Config {
    /// Build the configuration from the compile-time environment variables
    /// that build.rs exported from config.toml.
    pub fn new() -> Result<Self, &'static str> {
        Ok(Self {
            backend_base_url: env!("BACKEND_BASE_URL"),
            health_interval_secs: env!("HEALTH_INTERVAL_SECS")
                .parse()
                .map_err(|_| "Failed to parse HEALTH_INTERVAL_SECS")?,

            playback_device: env!("PLAYBACK_DEVICE"),
            playback_period_size: env!("PLAYBACK_PERIOD_SIZE")
                .parse()
                .map_err(|_| "Failed to parse PLAYBACK_PERIOD_SIZE")?,

            animator_fft_size: env!("ANIMATOR_FFT_SIZE")
                .parse()
                .map_err(|_| "Failed to parse ANIMATOR_FFT_SIZE")?,
            animator_sensitivity_divisor: env!("ANIMATOR_SENSITIVITY_DIVISOR")
                .parse()
                .map_err(|_| "Failed to parse ANIMATOR_SENSITIVITY_DIVISOR")?,
            animator_noise_gate: env!("ANIMATOR_NOISE_GATE")
                .parse()
                .map_err(|_| "Failed to parse ANIMATOR_NOISE_GATE")?,
            animator_fallback_openness: env!("ANIMATOR_FALLBACK_OPENNESS")
                .parse()
                .map_err(|_| "Failed to parse ANIMATOR_FALLBACK_OPENNESS")?,

            ui_tick_ms: env!("UI_TICK_MS")
                .parse()
                .map_err(|_| "Failed to parse UI_TICK_MS")?,
        })
    }

    pub fn animator_tuning(&self) -> AnimatorTuning {
        AnimatorTuning {
            fft_size: self.animator_fft_size,
            sensitivity_divisor: self.animator_sensitivity_divisor,
            noise_gate: self.animator_noise_gate,
            fallback_openness: self.animator_fallback_openness,
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::new().expect("Failed to create default Config from build-time environment variables")
    }
}
