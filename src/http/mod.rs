//! HTTP API for the chat front end
//!
//! This module provides a REST API over the voice pipeline and conversation:
//! - POST /listening/start, /listening/stop - Control voice input
//! - GET /listening/status - Live status, partial capture, draft, notifications
//! - GET /transcript - Latest transcript
//! - GET/POST /messages - Conversation
//! - POST /messages/:id/follow-up - Translate, prevention, alternatives, specialist
//! - PUT /credential - Store the completion API key
//! - GET /conditions - Conditions noted so far
//! - GET /health - Health check

mod handlers;
mod routes;
mod state;

pub use routes::create_router;
pub use state::{AppState, ListeningView, Notification};
