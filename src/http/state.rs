use chrono::{DateTime, Utc};
use serde::Serialize;
use std::sync::Arc;
use tokio::sync::{mpsc, RwLock};
use tokio::task::JoinHandle;
use tracing::{info, warn};

use crate::chat::Conversation;
use crate::error::CompletionError;
use crate::speech::{SessionStatus, SpeechEvent, SpeechHandle};

/// Keep only the most recent notifications
const MAX_NOTIFICATIONS: usize = 20;

/// User-visible notice (the browser UI showed these as toasts)
#[derive(Debug, Clone, Serialize)]
pub struct Notification {
    pub title: String,
    pub description: String,
    pub timestamp: DateTime<Utc>,
}

/// Live voice-input state for display
#[derive(Debug, Clone, Serialize)]
pub struct ListeningView {
    pub status: SessionStatus,
    pub recording: bool,
    pub partial: String,
    /// Transcript surfaced by a trigger, waiting to be edited and sent
    pub draft: Option<String>,
    pub notifications: Vec<Notification>,
}

impl Default for ListeningView {
    fn default() -> Self {
        Self {
            status: SessionStatus::Idle,
            recording: false,
            partial: String::new(),
            draft: None,
            notifications: Vec::new(),
        }
    }
}

impl ListeningView {
    pub fn notify(&mut self, title: &str, description: impl Into<String>) {
        self.notifications.push(Notification {
            title: title.to_string(),
            description: description.into(),
            timestamp: Utc::now(),
        });
        if self.notifications.len() > MAX_NOTIFICATIONS {
            let excess = self.notifications.len() - MAX_NOTIFICATIONS;
            self.notifications.drain(..excess);
        }
    }
}

/// Shared application state for HTTP handlers
#[derive(Clone)]
pub struct AppState {
    pub speech: Arc<SpeechHandle>,
    pub conversation: Conversation,
    pub view: Arc<RwLock<ListeningView>>,
}

impl AppState {
    pub fn new(speech: SpeechHandle, conversation: Conversation) -> Self {
        Self {
            speech: Arc::new(speech),
            conversation,
            view: Arc::new(RwLock::new(ListeningView::default())),
        }
    }

    /// Fold speech events into the view; finished utterances are sent to the
    /// conversation when `auto_send` is set
    pub fn spawn_event_pump(&self, mut events: mpsc::Receiver<SpeechEvent>, auto_send: bool) -> JoinHandle<()> {
        let state = self.clone();

        tokio::spawn(async move {
            info!("Speech event pump started");

            while let Some(event) = events.recv().await {
                state.apply(event, auto_send).await;
            }

            info!("Speech event pump stopped");
        })
    }

    pub async fn apply(&self, event: SpeechEvent, auto_send: bool) {
        match event {
            SpeechEvent::StatusChanged(status) => {
                self.view.write().await.status = status;
            }
            SpeechEvent::TranscriptChanged(_) => {}
            SpeechEvent::RecordingChanged { recording, partial } => {
                let mut view = self.view.write().await;
                view.recording = recording;
                view.partial = partial;
            }
            SpeechEvent::TriggerDetected(text) => {
                self.view.write().await.draft = Some(text);
            }
            SpeechEvent::MessageReady(message) => {
                if !auto_send {
                    self.view.write().await.draft = Some(message);
                    return;
                }
                self.send_spoken(message);
            }
            SpeechEvent::CapabilityUnavailable(reason) => {
                self.view
                    .write()
                    .await
                    .notify("Speech Recognition Unavailable", reason);
            }
        }
    }

    fn send_spoken(&self, message: String) {
        // Completion runs on its own task so listening continues meanwhile.
        let state = self.clone();
        tokio::spawn(async move {
            match state.conversation.send(&message).await {
                Ok(_) => {}
                Err(CompletionError::MissingCredential) => {
                    warn!("Spoken message dropped: no API key");
                    state.view.write().await.notify(
                        "API Key Required",
                        "Please set your Azure OpenAI API key first.",
                    );
                }
                Err(e) => {
                    warn!("Spoken message failed: {}", e);
                    state.view.write().await.notify(
                        "Error",
                        "Failed to generate response. Please check your API key and try again.",
                    );
                }
            }
        });
    }
}
