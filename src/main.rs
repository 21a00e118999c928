mod audio;
mod backend;
mod config;
mod controller;
mod face;
mod health;
mod protocol;
mod tui;

use crate::audio::{MouthAnimator, alsa_sink_factory};
use crate::backend::BackendClient;
use crate::config::Config;
use crate::controller::InterviewController;
use anyhow::Result;
use std::sync::Arc;
use tokio::sync::mpsc;
use uuid::Uuid;

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::init();

    let config = Config::new().map_err(|e| anyhow::anyhow!(e))?;
    log::info!(
        "Starting {} v{} against {}",
        env!("APP_NAME"),
        env!("APP_VERSION"),
        config.backend_base_url
    );

    let session_id = format!("session_{}", Uuid::new_v4().simple());
    let client = Arc::new(BackendClient::new(
        config.backend_base_url.to_string(),
        session_id,
    ));

    let (tx_cmd, rx_cmd) = mpsc::channel(8);
    let (tx_backend, rx_backend) = mpsc::channel(8);
    let (tx_health, rx_health) = mpsc::channel(8);
    let (tx_animator, rx_animator) = mpsc::channel(8);

    tokio::spawn(backend::run_worker(client.clone(), rx_cmd, tx_backend));
    tokio::spawn(health::run_poller(
        client.clone(),
        config.health_interval_secs,
        tx_health,
    ));

    let sink_factory = alsa_sink_factory(
        config.playback_device.to_string(),
        config.playback_period_size,
    );
    let animator = MouthAnimator::new(
        config.animator_tuning(),
        sink_factory,
        config.playback_period_size,
        tx_animator,
    );
    let controller = InterviewController::new(animator, tx_cmd);

    let tick_ms = config.ui_tick_ms;
    tokio::task::spawn_blocking(move || {
        tui::run(controller, tick_ms, rx_backend, rx_health, rx_animator)
    })
    .await??;

    log::info!("Shutting down");
    Ok(())
}
