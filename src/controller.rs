//! Interview flow state machine.
//!
//! Owns the chat transcript, the onboarding/interview screen switch, and the
//! mouth animator. Translates backend events into transcript entries and
//! speech, and UI actions into backend commands.

use crate::audio::{AnimatorEvent, MouthAnimator};
use crate::backend::{BackendCommand, BackendEvent, RequestKind};
use crate::health::HealthStatus;
use crate::protocol::OnboardingProfile;
use tokio::sync::mpsc;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Speaker {
    User,
    Shibu,
}

#[derive(Debug, Clone)]
pub struct Message {
    pub speaker: Speaker,
    pub text: String,
}

/// Which screen the UI renders. The transition is one-way: once the profile
/// is submitted there is no way back to the form.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Screen {
    Onboarding,
    Interview,
}

pub struct InterviewController {
    screen: Screen,
    messages: Vec<Message>,
    /// A request is in flight; input is held until the reply arrives.
    waiting: bool,
    finished: bool,
    health: HealthStatus,
    animator: MouthAnimator,
    tx_cmd: mpsc::Sender<BackendCommand>,
}

impl InterviewController {
    pub fn new(animator: MouthAnimator, tx_cmd: mpsc::Sender<BackendCommand>) -> Self {
        Self {
            screen: Screen::Onboarding,
            messages: Vec::new(),
            waiting: false,
            finished: false,
            health: HealthStatus::Checking,
            animator,
            tx_cmd,
        }
    }

    /// Submit the onboarding form. Returns false when the profile is
    /// incomplete or the interview has already started.
    pub fn submit_profile(&mut self, profile: OnboardingProfile) -> bool {
        if self.screen == Screen::Interview {
            return false;
        }
        if !profile.is_complete() {
            log::info!("Onboarding form incomplete, not submitting");
            return false;
        }
        self.screen = Screen::Interview;
        self.waiting = true;
        self.push_shibu(
            "Voice input is not available in the terminal, so we'll do this interview over text.",
        );
        if self
            .tx_cmd
            .try_send(BackendCommand::StartInterview(profile))
            .is_err()
        {
            log::error!("Backend command channel is closed");
            self.waiting = false;
            self.push_shibu("Connection to the server failed. Please check that the backend is running.");
        }
        true
    }

    /// Send a user chat message. Ignored while a request is in flight, after
    /// the interview finished, or before it started.
    pub fn send_user_message(&mut self, text: String) {
        let text = text.trim().to_string();
        if text.is_empty()
            || self.screen != Screen::Interview
            || self.waiting
            || self.finished
        {
            return;
        }
        self.messages.push(Message {
            speaker: Speaker::User,
            text: text.clone(),
        });
        self.waiting = true;
        if self.tx_cmd.try_send(BackendCommand::Chat(text)).is_err() {
            log::error!("Backend command channel is closed");
            self.waiting = false;
            self.push_shibu("I lost connection to the server. Please try again.");
        }
    }

    pub fn handle_backend_event(&mut self, event: BackendEvent) {
        self.waiting = false;
        match event {
            BackendEvent::Started { reply, audio } => {
                log::info!("Interview started");
                self.speak(reply, audio);
            }
            BackendEvent::Reply {
                reply,
                audio,
                is_finished,
            } => {
                self.speak(reply, audio);
                if is_finished {
                    self.finished = true;
                    self.push_shibu("Interview Completed.");
                }
            }
            BackendEvent::Failed(RequestKind::Start) => {
                self.push_shibu(
                    "Connection to the server failed. Please check that the backend is running.",
                );
            }
            BackendEvent::Failed(RequestKind::Chat) => {
                self.push_shibu("I lost connection to the server. Please try again.");
            }
        }
    }

    pub fn handle_animator_event(&mut self, event: AnimatorEvent) {
        match event {
            AnimatorEvent::PlaybackComplete => self.animator.set_speaking(false),
        }
    }

    /// Append a reply to the transcript and start speaking it if the backend
    /// attached audio.
    fn speak(&mut self, reply: String, audio: Option<String>) {
        self.push_shibu(&reply);
        match audio {
            Some(payload) => {
                self.animator.set_speaking(true);
                self.animator.present(payload);
            }
            None => log::warn!("Reply arrived without audio, mouth stays closed"),
        }
    }

    fn push_shibu(&mut self, text: &str) {
        self.messages.push(Message {
            speaker: Speaker::Shibu,
            text: text.to_string(),
        });
    }

    pub fn set_health(&mut self, health: HealthStatus) {
        self.health = health;
    }

    pub fn health(&self) -> HealthStatus {
        self.health
    }

    pub fn tick(&mut self) {
        self.animator.tick();
    }

    pub fn openness(&self) -> f32 {
        self.animator.openness()
    }

    pub fn screen(&self) -> Screen {
        self.screen
    }

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    pub fn waiting(&self) -> bool {
        self.waiting
    }

    pub fn finished(&self) -> bool {
        self.finished
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::{AnimatorTuning, PlaybackSink, SinkFactory};
    use std::sync::Arc;

    struct NullSink;

    impl PlaybackSink for NullSink {
        fn write(&mut self, _pcm: &[i16]) -> anyhow::Result<()> {
            Ok(())
        }
    }

    fn null_factory() -> SinkFactory {
        Arc::new(|_| Ok(Box::new(NullSink) as Box<dyn PlaybackSink>))
    }

    fn new_controller() -> (InterviewController, mpsc::Receiver<BackendCommand>) {
        let (tx_cmd, rx_cmd) = mpsc::channel(8);
        let (tx_evt, _rx_evt) = mpsc::channel(8);
        let animator = MouthAnimator::new(AnimatorTuning::default(), null_factory(), 256, tx_evt);
        (InterviewController::new(animator, tx_cmd), rx_cmd)
    }

    fn profile() -> OnboardingProfile {
        OnboardingProfile {
            name: "Arun Kumar".into(),
            domain: "IT".into(),
            age: "25".into(),
            experience: "3".into(),
        }
    }

    #[test]
    fn submit_is_one_way_and_one_shot() {
        let (mut ctl, mut rx) = new_controller();
        assert_eq!(ctl.screen(), Screen::Onboarding);
        assert!(ctl.submit_profile(profile()));
        assert_eq!(ctl.screen(), Screen::Interview);
        assert!(matches!(
            rx.try_recv(),
            Ok(BackendCommand::StartInterview(_))
        ));

        // A second submit sends nothing.
        assert!(!ctl.submit_profile(profile()));
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn incomplete_profile_is_rejected() {
        let (mut ctl, mut rx) = new_controller();
        let mut p = profile();
        p.age = "   ".into();
        assert!(!ctl.submit_profile(p));
        assert_eq!(ctl.screen(), Screen::Onboarding);
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn reply_appends_message_and_finishes() {
        let (mut ctl, _rx) = new_controller();
        ctl.submit_profile(profile());
        ctl.handle_backend_event(BackendEvent::Started {
            reply: "Welcome!".into(),
            audio: None,
        });
        // One info message from submit, then the greeting.
        assert_eq!(ctl.messages().len(), 2);
        assert_eq!(ctl.messages()[1].text, "Welcome!");
        assert!(!ctl.waiting());

        ctl.send_user_message("I worked on payment systems".into());
        assert!(ctl.waiting());
        ctl.handle_backend_event(BackendEvent::Reply {
            reply: "Thanks, that concludes the interview.".into(),
            audio: None,
            is_finished: true,
        });
        assert!(ctl.finished());
        let last = ctl.messages().last().unwrap();
        assert_eq!(last.text, "Interview Completed.");

        // No further messages go out after the interview ends.
        ctl.send_user_message("one more thing".into());
        assert!(!ctl.waiting());
    }

    #[test]
    fn messages_are_held_while_waiting() {
        let (mut ctl, mut rx) = new_controller();
        ctl.submit_profile(profile());
        ctl.handle_backend_event(BackendEvent::Started {
            reply: "Hi".into(),
            audio: None,
        });
        let _ = rx.try_recv();

        ctl.send_user_message("first".into());
        assert!(matches!(rx.try_recv(), Ok(BackendCommand::Chat(_))));
        // Second message while the first is in flight is dropped.
        ctl.send_user_message("second".into());
        assert!(rx.try_recv().is_err());
        assert_eq!(
            ctl.messages()
                .iter()
                .filter(|m| m.speaker == Speaker::User)
                .count(),
            1
        );
    }

    #[test]
    fn failures_surface_in_the_transcript() {
        let (mut ctl, _rx) = new_controller();
        ctl.submit_profile(profile());
        ctl.handle_backend_event(BackendEvent::Failed(RequestKind::Start));
        assert!(ctl.messages().last().unwrap().text.contains("backend"));

        ctl.handle_backend_event(BackendEvent::Failed(RequestKind::Chat));
        assert!(
            ctl.messages()
                .last()
                .unwrap()
                .text
                .contains("lost connection")
        );
        assert!(!ctl.waiting());
    }

    #[test]
    fn empty_input_is_ignored() {
        let (mut ctl, mut rx) = new_controller();
        ctl.submit_profile(profile());
        ctl.handle_backend_event(BackendEvent::Started {
            reply: "Hi".into(),
            audio: None,
        });
        let _ = rx.try_recv();
        ctl.send_user_message("   ".into());
        assert!(rx.try_recv().is_err());
    }
}
