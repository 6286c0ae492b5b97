use async_trait::async_trait;
use mediguide::completion::prompts;
use mediguide::{CompletionError, CompletionService, Conversation, FollowUp};
use std::sync::{Arc, Mutex};

const REPLY: &str = "🏥 Condition: Seasonal Allergies\n\n🧪 Active Ingredients:\n• Cetirizine - blocks histamine\n\nStay hydrated.";

/// Completion service that records prompts and replies from a fixed result
struct MockCompletion {
    reply: Result<String, CompletionError>,
    prompts: Mutex<Vec<(String, String)>>,
}

impl MockCompletion {
    fn replying(reply: &str) -> Arc<Self> {
        Arc::new(Self {
            reply: Ok(reply.to_string()),
            prompts: Mutex::new(Vec::new()),
        })
    }

    fn failing() -> Arc<Self> {
        Arc::new(Self {
            reply: Err(CompletionError::RequestFailed("503".to_string())),
            prompts: Mutex::new(Vec::new()),
        })
    }

    fn prompts(&self) -> Vec<(String, String)> {
        self.prompts.lock().unwrap().clone()
    }
}

#[async_trait]
impl CompletionService for MockCompletion {
    async fn generate_medical_response(
        &self,
        user_text: &str,
        credential: &str,
    ) -> Result<String, CompletionError> {
        self.prompts
            .lock()
            .unwrap()
            .push((user_text.to_string(), credential.to_string()));
        self.reply.clone()
    }

    fn name(&self) -> &str {
        "mock"
    }
}

#[tokio::test]
async fn test_conversation_opens_with_greeting() {
    let conversation = Conversation::new(MockCompletion::replying(REPLY));
    let messages = conversation.messages().await;

    assert_eq!(messages.len(), 1);
    assert_eq!(messages[0].id, 1);
    assert!(messages[0].is_bot);
    assert_eq!(messages[0].content, prompts::GREETING);
}

#[tokio::test]
async fn test_send_requires_credential() {
    let service = MockCompletion::replying(REPLY);
    let conversation = Conversation::new(service.clone());

    let err = conversation.send("I keep sneezing").await.unwrap_err();
    assert_eq!(err, CompletionError::MissingCredential);
    assert_eq!(conversation.messages().await.len(), 1);
    assert!(service.prompts().is_empty());
}

#[tokio::test]
async fn test_blank_credential_is_rejected() {
    let conversation = Conversation::new(MockCompletion::replying(REPLY));
    assert!(!conversation.set_credential("   ").await);
    assert!(!conversation.has_credential().await);
    assert!(conversation.set_credential(" key-123 ").await);
    assert!(conversation.has_credential().await);
}

#[tokio::test]
async fn test_send_appends_user_and_bot_messages() {
    let service = MockCompletion::replying(REPLY);
    let conversation = Conversation::new(service.clone());
    conversation.set_credential("key-123").await;

    let reply = conversation.send("I keep sneezing").await.unwrap();
    assert!(reply.is_bot);
    assert_eq!(reply.id, 3);
    assert_eq!(reply.content, REPLY);

    let messages = conversation.messages().await;
    assert_eq!(messages.len(), 3);
    assert_eq!(messages[1].content, "I keep sneezing");
    assert!(!messages[1].is_bot);

    assert_eq!(
        service.prompts(),
        vec![("I keep sneezing".to_string(), "key-123".to_string())]
    );

    let conditions = conversation.conditions().await;
    assert_eq!(conditions.len(), 1);
    assert_eq!(conditions[0].name, "Seasonal Allergies");
}

#[tokio::test]
async fn test_empty_message_is_rejected() {
    let conversation = Conversation::new(MockCompletion::replying(REPLY));
    conversation.set_credential("key-123").await;

    assert_eq!(
        conversation.send("  ").await.unwrap_err(),
        CompletionError::EmptyMessage
    );
}

#[tokio::test]
async fn test_failed_completion_keeps_user_message() {
    let conversation = Conversation::new(MockCompletion::failing());
    conversation.set_credential("key-123").await;

    let err = conversation.send("I feel dizzy").await.unwrap_err();
    assert!(matches!(err, CompletionError::RequestFailed(_)));

    let messages = conversation.messages().await;
    assert_eq!(messages.len(), 2);
    assert_eq!(messages[1].content, "I feel dizzy");
    assert!(conversation.conditions().await.is_empty());
}

#[tokio::test]
async fn test_translate_follow_up() {
    let service = MockCompletion::replying(REPLY);
    let conversation = Conversation::new(service.clone());
    conversation.set_credential("key-123").await;
    let reply = conversation.send("I keep sneezing").await.unwrap();

    let translated = conversation
        .follow_up(
            reply.id,
            &FollowUp::Translate {
                language: "French".to_string(),
            },
        )
        .await
        .unwrap();

    assert!(translated.is_bot);
    assert_eq!(conversation.messages().await.len(), 4);
    assert_eq!(service.prompts()[1].0, prompts::translate(REPLY, "French"));
}

#[tokio::test]
async fn test_follow_ups_use_reply_sections() {
    let service = MockCompletion::replying(REPLY);
    let conversation = Conversation::new(service.clone());
    conversation.set_credential("key-123").await;
    let reply = conversation.send("I keep sneezing").await.unwrap();

    conversation
        .follow_up(reply.id, &FollowUp::NaturalAlternatives)
        .await
        .unwrap();
    conversation
        .follow_up(reply.id, &FollowUp::Specialist)
        .await
        .unwrap();

    let sent = service.prompts();
    assert_eq!(
        sent[1].0,
        prompts::more_natural_alternatives("Cetirizine - blocks histamine")
    );
    assert_eq!(
        sent[2].0,
        prompts::find_specialist("🏥 Condition: Seasonal Allergies")
    );
}

#[tokio::test]
async fn test_follow_up_on_unknown_or_user_message() {
    let conversation = Conversation::new(MockCompletion::replying(REPLY));
    conversation.set_credential("key-123").await;
    conversation.send("I keep sneezing").await.unwrap();

    assert_eq!(
        conversation
            .follow_up(42, &FollowUp::Prevention)
            .await
            .unwrap_err(),
        CompletionError::MessageNotFound(42)
    );
    // Message 2 is the user's own message.
    assert_eq!(
        conversation
            .follow_up(2, &FollowUp::Prevention)
            .await
            .unwrap_err(),
        CompletionError::MessageNotFound(2)
    );
}

#[test]
fn test_follow_up_json_shape() {
    let action: FollowUp =
        serde_json::from_str(r#"{"action":"new_symptoms","symptoms":"itchy eyes"}"#).unwrap();
    assert_eq!(
        action,
        FollowUp::NewSymptoms {
            symptoms: "itchy eyes".to_string()
        }
    );

    let action: FollowUp = serde_json::from_str(r#"{"action":"prevention"}"#).unwrap();
    assert_eq!(action, FollowUp::Prevention);
}
