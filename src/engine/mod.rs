//! Speech-recognition engine seam
//!
//! The controller only talks to engines through [`SpeechCapability`] and
//! [`SpeechEngine`]. Engines report back through an [`EngineEventSink`] that
//! is bound to the session generation that started them.

pub mod nats;
pub mod scripted;

use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;

use crate::error::SpeechError;
use crate::speech::ControllerEvent;

pub use nats::NatsCapability;
pub use scripted::{ManualCapability, ReplayCapability, ReplayScript, ScriptedEngineHandle};

/// One recognized segment as delivered by the engine
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResultSegment {
    pub transcript: String,
    #[serde(default)]
    pub is_final: bool,
}

impl ResultSegment {
    pub fn final_text(text: impl Into<String>) -> Self {
        Self {
            transcript: text.into(),
            is_final: true,
        }
    }

    pub fn interim(text: impl Into<String>) -> Self {
        Self {
            transcript: text.into(),
            is_final: false,
        }
    }
}

/// Reason attached to an engine error event
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum EngineErrorReason {
    /// Recognition was cancelled on purpose
    Aborted,
    NoSpeech,
    AudioCapture,
    Network,
    NotAllowed,
    ServiceNotAllowed,
    BadGrammar,
    LanguageNotSupported,
    Other(String),
}

impl EngineErrorReason {
    pub fn as_str(&self) -> &str {
        match self {
            Self::Aborted => "aborted",
            Self::NoSpeech => "no-speech",
            Self::AudioCapture => "audio-capture",
            Self::Network => "network",
            Self::NotAllowed => "not-allowed",
            Self::ServiceNotAllowed => "service-not-allowed",
            Self::BadGrammar => "bad-grammar",
            Self::LanguageNotSupported => "language-not-supported",
            Self::Other(reason) => reason,
        }
    }

    /// Only a deliberate cancellation suppresses the automatic restart
    pub fn is_deliberate(&self) -> bool {
        matches!(self, Self::Aborted)
    }
}

impl From<&str> for EngineErrorReason {
    fn from(reason: &str) -> Self {
        match reason {
            "aborted" => Self::Aborted,
            "no-speech" => Self::NoSpeech,
            "audio-capture" => Self::AudioCapture,
            "network" => Self::Network,
            "not-allowed" => Self::NotAllowed,
            "service-not-allowed" => Self::ServiceNotAllowed,
            "bad-grammar" => Self::BadGrammar,
            "language-not-supported" => Self::LanguageNotSupported,
            other => Self::Other(other.to_string()),
        }
    }
}

impl From<String> for EngineErrorReason {
    fn from(reason: String) -> Self {
        Self::from(reason.as_str())
    }
}

impl From<EngineErrorReason> for String {
    fn from(reason: EngineErrorReason) -> Self {
        reason.as_str().to_string()
    }
}

/// Callback events fired by a speech engine
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum EngineEvent {
    Start,
    /// Complete ordered list of segments recognized so far
    Result { segments: Vec<ResultSegment> },
    Error { reason: EngineErrorReason },
    End,
}

/// Settings applied to every engine the capability creates
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EngineSettings {
    pub continuous: bool,
    pub interim_results: bool,
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            continuous: true,
            interim_results: true,
        }
    }
}

/// Where an engine delivers its callbacks
///
/// Every event is tagged with the generation of the session that started
/// the engine, so events from a replaced engine are recognised as stale.
#[derive(Debug, Clone)]
pub struct EngineEventSink {
    generation: u64,
    session_id: String,
    tx: mpsc::UnboundedSender<ControllerEvent>,
}

impl EngineEventSink {
    pub(crate) fn new(
        generation: u64,
        session_id: String,
        tx: mpsc::UnboundedSender<ControllerEvent>,
    ) -> Self {
        Self {
            generation,
            session_id,
            tx,
        }
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    /// Deliver an event; returns false once the controller is gone
    pub fn emit(&self, event: EngineEvent) -> bool {
        self.tx
            .send(ControllerEvent::Engine {
                generation: self.generation,
                event,
            })
            .is_ok()
    }
}

/// A single binding to a speech-recognition resource
///
/// Not reusable: once it has ended or failed, the controller creates a new
/// one through the capability.
#[async_trait::async_trait]
pub trait SpeechEngine: Send + Sync {
    /// Begin recognition, delivering callbacks to `sink`
    async fn start(&mut self, sink: EngineEventSink) -> Result<(), SpeechError>;

    /// Request recognition to stop
    async fn stop(&mut self) -> Result<(), SpeechError>;

    /// Engine name for logging
    fn name(&self) -> &str;
}

/// Feature-detected platform speech capability
pub trait SpeechCapability: Send + Sync {
    /// Create a fresh engine, or report that recognition is unavailable
    fn create(&self, settings: EngineSettings) -> Result<Box<dyn SpeechEngine>, SpeechError>;

    fn name(&self) -> &str;
}

/// Capability for platforms without speech recognition
pub struct UnavailableCapability;

impl SpeechCapability for UnavailableCapability {
    fn create(&self, _settings: EngineSettings) -> Result<Box<dyn SpeechEngine>, SpeechError> {
        Err(SpeechError::CapabilityUnavailable(
            "speech recognition not supported".to_string(),
        ))
    }

    fn name(&self) -> &str {
        "unavailable"
    }
}
