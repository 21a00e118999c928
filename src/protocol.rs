//! Request/response bodies for the interview backend HTTP API.

use serde::{Deserialize, Serialize};

/// Candidate profile collected by the onboarding form. All fields are
/// required and the profile is immutable once submitted.
#[derive(Debug, Clone, Serialize)]
pub struct OnboardingProfile {
    pub name: String,
    pub domain: String,
    pub age: String,
    pub experience: String,
}

impl OnboardingProfile {
    pub fn is_complete(&self) -> bool {
        !self.name.trim().is_empty()
            && !self.domain.trim().is_empty()
            && !self.age.trim().is_empty()
            && !self.experience.trim().is_empty()
    }
}

/// POST /start_interview
#[derive(Debug, Serialize)]
pub struct StartInterviewRequest {
    pub session_id: String,
    pub name: String,
    pub domain: String,
    pub age: String,
    pub experience: String,
}

impl StartInterviewRequest {
    pub fn new(session_id: &str, profile: OnboardingProfile) -> Self {
        Self {
            session_id: session_id.to_string(),
            name: profile.name,
            domain: profile.domain,
            age: profile.age,
            experience: profile.experience,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct StartInterviewResponse {
    pub reply: String,
    /// Base64-encoded audio payload, absent when TTS failed server-side.
    pub audio: Option<String>,
}

/// POST /chat
#[derive(Debug, Serialize)]
pub struct ChatRequest {
    pub session_id: String,
    pub message: String,
}

#[derive(Debug, Deserialize)]
pub struct ChatResponse {
    pub reply: String,
    pub audio: Option<String>,
    #[serde(default)]
    pub is_finished: bool,
}

/// GET /health
#[derive(Debug, Deserialize)]
pub struct HealthResponse {
    pub rag_status: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn chat_response_without_is_finished_defaults_to_false() {
        let resp: ChatResponse =
            serde_json::from_str(r#"{"reply":"hello","audio":null}"#).unwrap();
        assert_eq!(resp.reply, "hello");
        assert!(resp.audio.is_none());
        assert!(!resp.is_finished);
    }

    #[test]
    fn chat_response_final_turn() {
        let resp: ChatResponse =
            serde_json::from_str(r#"{"reply":"bye","audio":"QUJD","is_finished":true}"#).unwrap();
        assert!(resp.is_finished);
        assert_eq!(resp.audio.as_deref(), Some("QUJD"));
    }

    #[test]
    fn start_interview_request_carries_profile() {
        let profile = OnboardingProfile {
            name: "Arun Kumar".into(),
            domain: "IT".into(),
            age: "25".into(),
            experience: "3".into(),
        };
        let req = StartInterviewRequest::new("session_abc", profile);
        let json = serde_json::to_value(&req).unwrap();
        assert_eq!(json["session_id"], "session_abc");
        assert_eq!(json["name"], "Arun Kumar");
        assert_eq!(json["experience"], "3");
    }

    #[test]
    fn incomplete_profile_is_rejected() {
        let profile = OnboardingProfile {
            name: "A".into(),
            domain: "".into(),
            age: "25".into(),
            experience: "3".into(),
        };
        assert!(!profile.is_complete());
    }

    #[test]
    fn health_response_rag_field_is_optional() {
        let resp: HealthResponse = serde_json::from_str(r#"{}"#).unwrap();
        assert!(resp.rag_status.is_none());

        let resp: HealthResponse =
            serde_json::from_str(r#"{"rag_status":"loading_or_disabled"}"#).unwrap();
        assert_eq!(resp.rag_status.as_deref(), Some("loading_or_disabled"));
    }
}
