pub mod chat;
pub mod completion;
pub mod config;
pub mod engine;
pub mod error;
pub mod http;
pub mod nats;
pub mod speech;

pub use chat::{Condition, Conversation, FollowUp, Message};
pub use completion::{AzureOpenAiClient, CompletionService, CompletionSettings};
pub use config::Config;
pub use engine::{
    EngineErrorReason, EngineEvent, ManualCapability, NatsCapability, ReplayCapability,
    ReplayScript, ResultSegment, SpeechCapability, SpeechEngine,
};
pub use error::{CompletionError, SpeechError};
pub use http::{create_router, AppState};
pub use nats::{NatsClient, TranscriptMessage};
pub use speech::{
    SessionStatus, SpeechConfig, SpeechController, SpeechEvent, SpeechHandle, TriggerPolicy,
    TriggerSegmenter,
};
