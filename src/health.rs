//! Periodic backend health poller.
//!
//! Issues one GET /health per interval and maps the outcome to a two-valued
//! status (plus a degraded flag when the RAG index is still loading). Each
//! tick is independent; there is no retry or backoff.

use crate::backend::BackendClient;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HealthStatus {
    /// No probe has completed yet; the UI renders nothing.
    Checking,
    Online {
        rag_degraded: bool,
    },
    Offline,
}

pub fn status_from_result(result: anyhow::Result<Option<String>>) -> HealthStatus {
    match result {
        Ok(rag_status) => HealthStatus::Online {
            rag_degraded: rag_status.as_deref() == Some("loading_or_disabled"),
        },
        Err(_) => HealthStatus::Offline,
    }
}

/// Poll loop: immediate first check, then one probe per interval.
pub async fn run_poller(
    client: Arc<BackendClient>,
    interval_secs: u64,
    tx: mpsc::Sender<HealthStatus>,
) {
    let mut interval = tokio::time::interval(Duration::from_secs(interval_secs));
    loop {
        interval.tick().await;
        let status = status_from_result(client.health().await.map(|r| r.rag_status));
        if let HealthStatus::Offline = status {
            log::warn!("Backend health probe failed");
        }
        if tx.send(status).await.is_err() {
            break;
        }
    }
}
