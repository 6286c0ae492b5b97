use super::handlers;
use super::state::AppState;
use axum::{
    routing::{get, post, put},
    Router,
};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

/// Create the HTTP router with all routes
pub fn create_router(state: AppState) -> Router {
    Router::new()
        // Health check
        .route("/health", get(handlers::health_check))
        // Voice input control
        .route("/listening/start", post(handlers::start_listening))
        .route("/listening/stop", post(handlers::stop_listening))
        .route("/listening/status", get(handlers::listening_status))
        .route("/transcript", get(handlers::get_transcript))
        // Conversation
        .route(
            "/messages",
            get(handlers::list_messages).post(handlers::send_message),
        )
        .route("/messages/:message_id/follow-up", post(handlers::follow_up))
        .route("/conditions", get(handlers::list_conditions))
        .route("/credential", put(handlers::put_credential))
        // Browser clients call the API from another origin
        .layer(CorsLayer::permissive())
        // Add tracing middleware for request logging
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
