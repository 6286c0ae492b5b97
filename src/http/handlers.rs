use super::state::{AppState, ListeningView};
use crate::chat::{Condition, FollowUp, Message};
use crate::error::{CompletionError, SpeechError};
use crate::speech::TranscriptState;
use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use serde::{Deserialize, Serialize};
use tracing::{error, info};

// ============================================================================
// Request/Response Types
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct SendMessageRequest {
    pub content: String,
}

#[derive(Debug, Deserialize)]
pub struct CredentialRequest {
    pub api_key: String,
}

#[derive(Debug, Serialize)]
pub struct ListeningResponse {
    pub status: String,
    pub message: String,
}

#[derive(Debug, Serialize)]
pub struct StatusResponse {
    #[serde(flatten)]
    pub view: ListeningView,
    pub transcript: String,
}

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

fn error_response(status: StatusCode, error: impl ToString) -> Response {
    (
        status,
        Json(ErrorResponse {
            error: error.to_string(),
        }),
    )
        .into_response()
}

fn speech_error(e: SpeechError) -> Response {
    error!("Speech controller unavailable: {}", e);
    error_response(StatusCode::SERVICE_UNAVAILABLE, e)
}

fn completion_error(e: CompletionError) -> Response {
    let status = match e {
        CompletionError::MissingCredential | CompletionError::EmptyMessage => StatusCode::BAD_REQUEST,
        CompletionError::MessageNotFound(_) => StatusCode::NOT_FOUND,
        CompletionError::RequestFailed(_) => StatusCode::BAD_GATEWAY,
    };
    error_response(status, e)
}

// ============================================================================
// Handlers
// ============================================================================

/// POST /listening/start
/// Begin continuous voice input
pub async fn start_listening(State(state): State<AppState>) -> Response {
    info!("Start listening requested");

    match state.speech.start_listening() {
        Ok(()) => (
            StatusCode::ACCEPTED,
            Json(ListeningResponse {
                status: "starting".to_string(),
                message: "Listening requested".to_string(),
            }),
        )
            .into_response(),
        Err(e) => speech_error(e),
    }
}

/// POST /listening/stop
/// Stop voice input; no automatic restart follows
pub async fn stop_listening(State(state): State<AppState>) -> Response {
    info!("Stop listening requested");

    match state.speech.stop_listening() {
        Ok(()) => (
            StatusCode::ACCEPTED,
            Json(ListeningResponse {
                status: "stopping".to_string(),
                message: "Listening will stop".to_string(),
            }),
        )
            .into_response(),
        Err(e) => speech_error(e),
    }
}

/// GET /listening/status
/// Live voice-input state, pending draft and notifications
pub async fn listening_status(State(state): State<AppState>) -> Json<StatusResponse> {
    let mut view = state.view.read().await.clone();
    view.status = state.speech.status();
    let transcript = state.speech.transcript().borrow().full_text.clone();

    Json(StatusResponse { view, transcript })
}

/// GET /transcript
/// Latest whole-so-far transcript of the current session
pub async fn get_transcript(State(state): State<AppState>) -> Json<TranscriptState> {
    let transcript = state.speech.transcript().borrow().clone();
    Json(transcript)
}

/// GET /messages
pub async fn list_messages(State(state): State<AppState>) -> Json<Vec<Message>> {
    Json(state.conversation.messages().await)
}

/// POST /messages
/// Send a typed (or edited dictated) message and return the bot reply
pub async fn send_message(
    State(state): State<AppState>,
    Json(req): Json<SendMessageRequest>,
) -> Response {
    let result = state.conversation.send(&req.content).await;

    match result {
        Ok(reply) => {
            // The input box is cleared once its content was sent.
            state.view.write().await.draft = None;
            (StatusCode::OK, Json(reply)).into_response()
        }
        Err(e) => {
            if matches!(e, CompletionError::RequestFailed(_)) {
                state.view.write().await.notify(
                    "Error",
                    "Failed to generate response. Please check your API key and try again.",
                );
            }
            completion_error(e)
        }
    }
}

/// POST /messages/:id/follow-up
/// Translate, expand or refer on a bot reply
pub async fn follow_up(
    State(state): State<AppState>,
    Path(message_id): Path<u64>,
    Json(action): Json<FollowUp>,
) -> Response {
    match state.conversation.follow_up(message_id, &action).await {
        Ok(reply) => (StatusCode::OK, Json(reply)).into_response(),
        Err(e) => completion_error(e),
    }
}

/// PUT /credential
/// Store the completion-service API key
pub async fn put_credential(
    State(state): State<AppState>,
    Json(req): Json<CredentialRequest>,
) -> Response {
    if state.conversation.set_credential(&req.api_key).await {
        (StatusCode::NO_CONTENT, ()).into_response()
    } else {
        error_response(StatusCode::BAD_REQUEST, "API key must not be empty")
    }
}

/// GET /conditions
/// Conditions named by bot replies so far
pub async fn list_conditions(State(state): State<AppState>) -> Json<Vec<Condition>> {
    Json(state.conversation.conditions().await)
}

/// GET /health
/// Health check endpoint
pub async fn health_check() -> impl IntoResponse {
    (StatusCode::OK, "OK")
}
