use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Quiet interval observed before a debounced utterance is considered finished
pub const DEFAULT_QUIET_PERIOD: Duration = Duration::from_secs(10);

/// Delay before a failed or naturally ended session is restarted
pub const DEFAULT_RESTART_BACKOFF: Duration = Duration::from_secs(1);

/// How the trigger segmenter decides where an utterance starts and ends
///
/// One configuration covers all completion behaviors:
/// - `end_marker` set: the utterance is enclosed by the start and end markers
/// - no `end_marker`, `quiet_period` set: the utterance ends after silence
/// - neither: only report that the start marker was heard
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TriggerPolicy {
    /// Word or phrase that opens an utterance (matched case-insensitively)
    pub start_marker: String,

    /// Word or phrase that closes an utterance
    pub end_marker: Option<String>,

    /// Silence interval that closes an utterance when no end marker is used
    pub quiet_period: Option<Duration>,

    /// Forget transcript text that was already dispatched by the quiet-period
    /// policy, so the next cycle only sees newly spoken words
    #[serde(default)]
    pub discard_dispatched_text: bool,
}

/// The completion policy selected by a [`TriggerPolicy`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CaptureMode {
    MarkerPair { end_marker: String },
    Debounce { quiet_period: Duration },
    TriggerOnly,
}

impl TriggerPolicy {
    pub fn marker_pair(start_marker: impl Into<String>, end_marker: impl Into<String>) -> Self {
        Self {
            start_marker: start_marker.into(),
            end_marker: Some(end_marker.into()),
            quiet_period: None,
            discard_dispatched_text: false,
        }
    }

    pub fn debounce(start_marker: impl Into<String>, quiet_period: Duration) -> Self {
        Self {
            start_marker: start_marker.into(),
            end_marker: None,
            quiet_period: Some(quiet_period),
            discard_dispatched_text: false,
        }
    }

    pub fn trigger_only(start_marker: impl Into<String>) -> Self {
        Self {
            start_marker: start_marker.into(),
            end_marker: None,
            quiet_period: None,
            discard_dispatched_text: false,
        }
    }

    pub fn mode(&self) -> CaptureMode {
        match (&self.end_marker, self.quiet_period) {
            (Some(end_marker), _) => CaptureMode::MarkerPair {
                end_marker: end_marker.clone(),
            },
            (None, Some(quiet_period)) => CaptureMode::Debounce { quiet_period },
            (None, None) => CaptureMode::TriggerOnly,
        }
    }
}

impl Default for TriggerPolicy {
    fn default() -> Self {
        Self::marker_pair("jimmy", "finish")
    }
}

/// Configuration for a speech controller
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SpeechConfig {
    /// Utterance segmentation policy
    pub policy: TriggerPolicy,

    /// Delay before restarting after a transient error or a natural end
    /// Default: 1 second
    pub restart_backoff: Duration,

    /// Capacity of the outbound speech event channel
    pub event_buffer: usize,
}

impl Default for SpeechConfig {
    fn default() -> Self {
        Self {
            policy: TriggerPolicy::default(),
            restart_backoff: DEFAULT_RESTART_BACKOFF,
            event_buffer: 100,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn end_marker_wins_over_quiet_period() {
        let mut policy = TriggerPolicy::marker_pair("jimmy", "finish");
        policy.quiet_period = Some(DEFAULT_QUIET_PERIOD);
        assert_eq!(
            policy.mode(),
            CaptureMode::MarkerPair {
                end_marker: "finish".to_string()
            }
        );
    }

    #[test]
    fn quiet_period_selects_debounce() {
        let policy = TriggerPolicy::debounce("symptoms", DEFAULT_QUIET_PERIOD);
        assert_eq!(
            policy.mode(),
            CaptureMode::Debounce {
                quiet_period: DEFAULT_QUIET_PERIOD
            }
        );
        assert_eq!(TriggerPolicy::trigger_only("symptoms").mode(), CaptureMode::TriggerOnly);
    }
}
