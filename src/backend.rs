//! HTTP client for the interview backend plus the async worker task that
//! turns UI commands into backend calls.

use crate::protocol::{
    ChatRequest, ChatResponse, HealthResponse, OnboardingProfile, StartInterviewRequest,
    StartInterviewResponse,
};
use anyhow::{Context, Result};
use reqwest::Client;
use tokio::sync::mpsc;

/// Commands issued by the controller.
#[derive(Debug)]
pub enum BackendCommand {
    StartInterview(OnboardingProfile),
    Chat(String),
}

/// Which request a failure belongs to. The controller surfaces a different
/// in-chat message for each.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestKind {
    Start,
    Chat,
}

/// Events delivered back to the UI.
#[derive(Debug)]
pub enum BackendEvent {
    Started {
        reply: String,
        audio: Option<String>,
    },
    Reply {
        reply: String,
        audio: Option<String>,
        is_finished: bool,
    },
    Failed(RequestKind),
}

pub struct BackendClient {
    http: Client,
    base_url: String,
    session_id: String,
}

impl BackendClient {
    pub fn new(base_url: String, session_id: String) -> Self {
        Self {
            http: Client::new(),
            base_url,
            session_id,
        }
    }

    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    pub async fn start_interview(
        &self,
        profile: OnboardingProfile,
    ) -> Result<StartInterviewResponse> {
        let body = StartInterviewRequest::new(&self.session_id, profile);
        let resp = self
            .http
            .post(format!("{}/start_interview", self.base_url))
            .json(&body)
            .send()
            .await
            .context("start_interview request failed")?
            .error_for_status()
            .context("start_interview returned error status")?;
        Ok(resp.json().await.context("start_interview bad body")?)
    }

    pub async fn chat(&self, message: String) -> Result<ChatResponse> {
        let body = ChatRequest {
            session_id: self.session_id.clone(),
            message,
        };
        let resp = self
            .http
            .post(format!("{}/chat", self.base_url))
            .json(&body)
            .send()
            .await
            .context("chat request failed")?
            .error_for_status()
            .context("chat returned error status")?;
        Ok(resp.json().await.context("chat bad body")?)
    }

    pub async fn health(&self) -> Result<HealthResponse> {
        let resp = self
            .http
            .get(format!("{}/health", self.base_url))
            .send()
            .await
            .context("health request failed")?
            .error_for_status()
            .context("health returned error status")?;
        Ok(resp.json().await.context("health bad body")?)
    }
}

/// Worker loop: one in-flight request at a time, events back over mpsc.
/// Exits when the command channel closes.
pub async fn run_worker(
    client: std::sync::Arc<BackendClient>,
    mut rx_cmd: mpsc::Receiver<BackendCommand>,
    tx_event: mpsc::Sender<BackendEvent>,
) {
    while let Some(cmd) = rx_cmd.recv().await {
        let event = match cmd {
            BackendCommand::StartInterview(profile) => {
                match client.start_interview(profile).await {
                    Ok(resp) => BackendEvent::Started {
                        reply: resp.reply,
                        audio: resp.audio,
                    },
                    Err(e) => {
                        log::error!("Backend error: {:#}", e);
                        BackendEvent::Failed(RequestKind::Start)
                    }
                }
            }
            BackendCommand::Chat(message) => match client.chat(message).await {
                Ok(resp) => BackendEvent::Reply {
                    reply: resp.reply,
                    audio: resp.audio,
                    is_finished: resp.is_finished,
                },
                Err(e) => {
                    log::error!("Backend error: {:#}", e);
                    BackendEvent::Failed(RequestKind::Chat)
                }
            },
        };
        if tx_event.send(event).await.is_err() {
            break;
        }
    }
    log::info!("Backend worker stopped");
}
