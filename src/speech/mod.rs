//! Continuous speech-to-intent pipeline
//!
//! This module provides:
//! - `SpeechController`: owns the recognition engine, restarts it after
//!   transient errors and natural ends, and never fights a deliberate stop
//! - `TranscriptAccumulator`: latest whole-so-far transcript for subscribers
//! - `TriggerSegmenter`: start/end marker detection and utterance extraction
//! - `Debouncer`: quiet-period completion of utterances

mod config;
mod controller;
pub mod debounce;
mod segmenter;
mod session;
pub mod transcript;

pub use config::{CaptureMode, SpeechConfig, TriggerPolicy, DEFAULT_QUIET_PERIOD, DEFAULT_RESTART_BACKOFF};
pub use controller::{ControllerEvent, SpeechController, SpeechEvent, SpeechHandle};
pub use debounce::{DebounceTicket, Debouncer};
pub use segmenter::{MessageCapture, SegmenterEvent, TriggerSegmenter};
pub use session::{RecognitionSession, SessionStatus};
pub use transcript::{TranscriptAccumulator, TranscriptState};
