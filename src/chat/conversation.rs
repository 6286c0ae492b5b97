use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{error, info};

use super::response::{extract_condition, section_text, Condition, SectionKind};
use crate::completion::{prompts, CompletionService};
use crate::error::CompletionError;

/// A chat bubble
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub id: u64,
    pub content: String,
    pub is_bot: bool,
    pub created_at: DateTime<Utc>,
}

/// Follow-up actions offered on a bot reply
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum FollowUp {
    Translate { language: String },
    NewSymptoms { symptoms: String },
    Prevention,
    NaturalAlternatives,
    Specialist,
}

impl FollowUp {
    fn prompt(&self, reply: &str) -> String {
        let condition = || section_text(reply, SectionKind::Condition).unwrap_or_else(|| reply.to_string());

        match self {
            Self::Translate { language } => prompts::translate(reply, language),
            Self::NewSymptoms { symptoms } => prompts::analyze_new_symptoms(&condition(), symptoms),
            Self::Prevention => prompts::more_prevention_details(&condition()),
            Self::NaturalAlternatives => {
                let ingredients = section_text(reply, SectionKind::ActiveIngredients)
                    .unwrap_or_else(|| reply.to_string());
                prompts::more_natural_alternatives(&ingredients)
            }
            Self::Specialist => prompts::find_specialist(&condition()),
        }
    }
}

#[derive(Debug)]
struct ConversationState {
    credential: Option<String>,
    messages: Vec<Message>,
    conditions: Vec<Condition>,
    next_id: u64,
}

impl ConversationState {
    fn push(&mut self, content: String, is_bot: bool) -> Message {
        let message = Message {
            id: self.next_id,
            content,
            is_bot,
            created_at: Utc::now(),
        };
        self.next_id += 1;
        self.messages.push(message.clone());
        message
    }
}

/// Message list plus the completion exchange behind it
///
/// Cheap to clone; clones share the same conversation. The lock is never
/// held across a completion request.
#[derive(Clone)]
pub struct Conversation {
    service: Arc<dyn CompletionService>,
    state: Arc<Mutex<ConversationState>>,
}

impl Conversation {
    pub fn new(service: Arc<dyn CompletionService>) -> Self {
        let mut state = ConversationState {
            credential: None,
            messages: Vec::new(),
            conditions: Vec::new(),
            next_id: 1,
        };
        state.push(prompts::GREETING.to_string(), true);

        Self {
            service,
            state: Arc::new(Mutex::new(state)),
        }
    }

    /// Store the API credential; blank keys are ignored
    pub async fn set_credential(&self, credential: &str) -> bool {
        let credential = credential.trim();
        if credential.is_empty() {
            return false;
        }
        self.state.lock().await.credential = Some(credential.to_string());
        info!("API credential saved");
        true
    }

    pub async fn has_credential(&self) -> bool {
        self.state.lock().await.credential.is_some()
    }

    pub async fn messages(&self) -> Vec<Message> {
        self.state.lock().await.messages.clone()
    }

    pub async fn conditions(&self) -> Vec<Condition> {
        self.state.lock().await.conditions.clone()
    }

    /// Send a user message and append the bot's reply
    ///
    /// On failure the user message stays in the list and the error is
    /// returned for the caller to show.
    pub async fn send(&self, content: &str) -> Result<Message, CompletionError> {
        if content.trim().is_empty() {
            return Err(CompletionError::EmptyMessage);
        }

        let credential = {
            let mut state = self.state.lock().await;
            let credential = state
                .credential
                .clone()
                .ok_or(CompletionError::MissingCredential)?;
            state.push(content.to_string(), false);
            credential
        };

        self.complete(content, &credential).await
    }

    /// Run a follow-up action against bot message `message_id`
    pub async fn follow_up(&self, message_id: u64, action: &FollowUp) -> Result<Message, CompletionError> {
        let (prompt, credential) = {
            let state = self.state.lock().await;
            let credential = state
                .credential
                .clone()
                .ok_or(CompletionError::MissingCredential)?;
            let reply = state
                .messages
                .iter()
                .find(|m| m.id == message_id && m.is_bot)
                .ok_or(CompletionError::MessageNotFound(message_id))?;
            (action.prompt(&reply.content), credential)
        };

        info!("Follow-up {:?} on message {}", action, message_id);
        self.complete(&prompt, &credential).await
    }

    async fn complete(&self, prompt: &str, credential: &str) -> Result<Message, CompletionError> {
        let reply = self
            .service
            .generate_medical_response(prompt, credential)
            .await
            .map_err(|e| {
                error!("Failed to generate response: {}", e);
                e
            })?;

        let mut state = self.state.lock().await;
        let message = state.push(reply, true);
        if let Some(condition) = extract_condition(&message.content, message.created_at) {
            info!("Condition noted: {}", condition.name);
            state.conditions.push(condition);
        }

        Ok(message)
    }
}
