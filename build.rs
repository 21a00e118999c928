use serde::Deserialize;
use std::fs;
use std::path::Path;

#[derive(Deserialize)]
struct Config {
    application: Application,
    backend: Backend,
    audio: Audio,
    animator: Animator,
    ui: Ui,
}

#[derive(Deserialize)]
struct Application {
    name: String,
    version: String,
}

#[derive(Deserialize)]
struct Backend {
    base_url: String,
    health_interval_secs: u64,
}

#[derive(Deserialize)]
struct Audio {
    playback_device: String,
    playback_period_size: usize,
}

#[derive(Deserialize)]
struct Animator {
    fft_size: usize,
    sensitivity_divisor: f32,
    noise_gate: f32,
    fallback_openness: f32,
}

#[derive(Deserialize)]
struct Ui {
    tick_ms: u64,
}

// Read config.toml at compile time and export everything as env vars.
fn main() {
    println!("cargo:rerun-if-changed=config.toml");

    let config_path = Path::new("config.toml");
    if !config_path.exists() {
        panic!("config.toml not found!");
    }

    let config_str = fs::read_to_string(config_path).expect("Failed to read config.toml");
    let config: Config = toml::from_str(&config_str).expect("Failed to parse config.toml");

    println!("cargo:rustc-env=APP_NAME={}", config.application.name);
    println!("cargo:rustc-env=APP_VERSION={}", config.application.version);

    println!("cargo:rustc-env=BACKEND_BASE_URL={}", config.backend.base_url);
    println!(
        "cargo:rustc-env=HEALTH_INTERVAL_SECS={}",
        config.backend.health_interval_secs
    );

    println!(
        "cargo:rustc-env=PLAYBACK_DEVICE={}",
        config.audio.playback_device
    );
    println!(
        "cargo:rustc-env=PLAYBACK_PERIOD_SIZE={}",
        config.audio.playback_period_size
    );

    println!("cargo:rustc-env=ANIMATOR_FFT_SIZE={}", config.animator.fft_size);
    println!(
        "cargo:rustc-env=ANIMATOR_SENSITIVITY_DIVISOR={}",
        config.animator.sensitivity_divisor
    );
    println!(
        "cargo:rustc-env=ANIMATOR_NOISE_GATE={}",
        config.animator.noise_gate
    );
    println!(
        "cargo:rustc-env=ANIMATOR_FALLBACK_OPENNESS={}",
        config.animator.fallback_openness
    );

    println!("cargo:rustc-env=UI_TICK_MS={}", config.ui.tick_ms);
}
