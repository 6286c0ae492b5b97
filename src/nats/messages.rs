use serde::{Deserialize, Serialize};

/// Session control published to the STT service
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionControlMessage {
    pub session_id: String,
    pub action: ControlAction,
    pub continuous: bool,
    pub interim_results: bool,
    pub timestamp: String, // RFC3339 timestamp
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ControlAction {
    Start,
    Stop,
}

/// Transcript message received from STT service
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TranscriptMessage {
    pub session_id: String,
    pub text: String,
    pub partial: bool,
    pub timestamp: String,
    #[serde(default)]
    pub confidence: Option<f32>,
}

/// Lifecycle notification from the STT service
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SttStatusMessage {
    pub session_id: String,
    pub state: SttState,
    /// Error reason when `state` is `error` (e.g. "network", "no-speech")
    #[serde(default)]
    pub reason: Option<String>,
    pub timestamp: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SttState {
    Started,
    Ended,
    Error,
}
