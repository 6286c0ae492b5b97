use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::watch;

use crate::engine::ResultSegment;

/// The cumulative recognized text for the current session
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TranscriptState {
    /// Whole-so-far transcript, replaced on every result event
    pub full_text: String,

    /// When `full_text` last changed (None until the first result)
    pub last_updated: Option<DateTime<Utc>>,

    /// Session generation this transcript belongs to
    pub generation: u64,
}

/// Join every result segment the engine has delivered so far
///
/// Engines redeliver the complete ordered list on every event, so this is
/// the whole transcript rather than a delta.
pub fn full_text(segments: &[ResultSegment]) -> String {
    segments.iter().map(|s| s.transcript.as_str()).collect()
}

/// Holds the latest transcript and republishes it to subscribers
///
/// Subscribers always see the newest value but may skip intermediate ones
/// when they fall behind.
pub struct TranscriptAccumulator {
    tx: watch::Sender<TranscriptState>,
}

impl TranscriptAccumulator {
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(TranscriptState::default());
        Self { tx }
    }

    pub fn subscribe(&self) -> watch::Receiver<TranscriptState> {
        self.tx.subscribe()
    }

    pub fn current(&self) -> TranscriptState {
        self.tx.borrow().clone()
    }

    /// Replace the transcript for `generation`
    pub fn publish(&self, generation: u64, full_text: String) {
        self.tx.send_replace(TranscriptState {
            full_text,
            last_updated: Some(Utc::now()),
            generation,
        });
    }

    /// Start an empty transcript for a new session
    pub fn reset(&self, generation: u64) {
        self.tx.send_replace(TranscriptState {
            full_text: String::new(),
            last_updated: None,
            generation,
        });
    }
}

impl Default for TranscriptAccumulator {
    fn default() -> Self {
        Self::new()
    }
}
