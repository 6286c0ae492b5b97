//! Trigger-word segmentation of a live transcript
//!
//! The segmenter watches each new whole-so-far transcript for a start marker
//! and, depending on the [`CaptureMode`], either waits for an end marker,
//! leaves completion to a quiet-period timer, or only reports that the
//! trigger was heard.

use serde::Serialize;
use tracing::debug;

use super::config::{CaptureMode, TriggerPolicy};

/// In-progress or completed utterance capture
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct MessageCapture {
    pub is_recording: bool,

    /// Byte offset just past the last start marker (set while recording)
    pub start_marker_found_at: Option<usize>,

    /// Running capture from the start marker onward
    pub buffer_text: String,
}

/// Output of a single [`TriggerSegmenter::observe`] call
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SegmenterEvent {
    RecordingStarted,
    /// The running capture changed
    Partial(String),
    /// An enclosed utterance was extracted
    MessageCompleted(String),
    /// The transcript newly contains the start marker (trigger-only mode)
    TriggerDetected(String),
}

/// Lower-cased view of a transcript that maps each byte back to the
/// original text, so case folding never shifts slice offsets.
struct Folded {
    lower: String,
    origin: Vec<usize>,
}

impl Folded {
    fn new(text: &str) -> Self {
        let mut lower = String::with_capacity(text.len());
        let mut origin = Vec::with_capacity(text.len() + 1);

        for (idx, ch) in text.char_indices() {
            for lc in ch.to_lowercase() {
                let before = lower.len();
                lower.push(lc);
                origin.extend(std::iter::repeat(idx).take(lower.len() - before));
            }
        }
        origin.push(text.len());

        Self { lower, origin }
    }

    /// Last occurrence of `needle` at or after original offset `from`,
    /// returned as original `(start, end)` offsets
    fn rfind_from(&self, needle: &str, from: usize) -> Option<(usize, usize)> {
        let folded_from = self.origin.partition_point(|&o| o < from);
        let pos = self.lower[folded_from..].rfind(needle)? + folded_from;
        Some((self.origin[pos], self.origin[pos + needle.len()]))
    }
}

/// Largest char boundary of `text` at or before `at`
fn floor_char_boundary(text: &str, at: usize) -> usize {
    let mut at = at.min(text.len());
    while !text.is_char_boundary(at) {
        at -= 1;
    }
    at
}

/// Detects the start marker in a transcript and extracts utterances
pub struct TriggerSegmenter {
    start_marker: String,
    mode: CaptureMode,
    discard_dispatched_text: bool,
    capture: MessageCapture,
    /// Transcript prefix that already produced a message and is never rescanned
    consumed_to: usize,
    /// Transcript length seen by the last `observe`
    last_len: usize,
    /// Whether the previous transcript contained the start marker
    trigger_present: bool,
}

impl TriggerSegmenter {
    pub fn new(policy: &TriggerPolicy) -> Self {
        let mode = match policy.mode() {
            CaptureMode::MarkerPair { end_marker } => CaptureMode::MarkerPair {
                end_marker: end_marker.to_lowercase(),
            },
            other => other,
        };

        Self {
            start_marker: policy.start_marker.to_lowercase(),
            mode,
            discard_dispatched_text: policy.discard_dispatched_text,
            capture: MessageCapture::default(),
            consumed_to: 0,
            last_len: 0,
            trigger_present: false,
        }
    }

    pub fn mode(&self) -> &CaptureMode {
        &self.mode
    }

    pub fn capture(&self) -> &MessageCapture {
        &self.capture
    }

    /// Forget everything; called when a new recognition session starts
    pub fn reset(&mut self) {
        self.capture = MessageCapture::default();
        self.consumed_to = 0;
        self.last_len = 0;
        self.trigger_present = false;
    }

    /// Inspect the latest whole-so-far transcript
    pub fn observe(&mut self, transcript: &str) -> Vec<SegmenterEvent> {
        let mut events = Vec::new();

        // Engines may revise interim text downwards. Consumed text stays
        // consumed, so clamp instead of rescanning from the start.
        self.consumed_to = floor_char_boundary(transcript, self.consumed_to);
        self.last_len = transcript.len();

        let folded = Folded::new(transcript);

        if self.mode == CaptureMode::TriggerOnly {
            let present = folded.rfind_from(&self.start_marker, 0).is_some();
            if present && !self.trigger_present {
                debug!("Trigger marker '{}' detected", self.start_marker);
                events.push(SegmenterEvent::TriggerDetected(transcript.to_string()));
            }
            self.trigger_present = present;
            return events;
        }

        let last_start = folded
            .rfind_from(&self.start_marker, self.consumed_to)
            .map(|(_, end)| end);

        if !self.capture.is_recording {
            let Some(start_at) = last_start else {
                return events;
            };
            debug!("Started recording message after '{}'", self.start_marker);
            self.capture = MessageCapture {
                is_recording: true,
                start_marker_found_at: Some(start_at),
                buffer_text: String::new(),
            };
            events.push(SegmenterEvent::RecordingStarted);
        }

        // A repeated start marker moves the boundary to its last occurrence.
        let start_at = match last_start.or(self.capture.start_marker_found_at) {
            Some(at) if at <= transcript.len() && transcript.is_char_boundary(at) => at,
            _ => {
                debug!("Start marker vanished from transcript, abandoning capture");
                self.capture = MessageCapture::default();
                events.push(SegmenterEvent::Partial(String::new()));
                return events;
            }
        };
        self.capture.start_marker_found_at = Some(start_at);

        if let CaptureMode::MarkerPair { end_marker } = &self.mode {
            if let Some((end_start, end_end)) = folded.rfind_from(end_marker, self.consumed_to) {
                if end_start > start_at {
                    let message = transcript[start_at..end_start].trim().to_string();
                    self.capture = MessageCapture::default();
                    self.consumed_to = end_end;

                    if message.is_empty() {
                        debug!("End marker closed an empty message, nothing to emit");
                        events.push(SegmenterEvent::Partial(String::new()));
                    } else {
                        debug!("Message detected: {}", message);
                        events.push(SegmenterEvent::MessageCompleted(message));
                    }
                    return events;
                }
            }
        }

        let partial = transcript[start_at..].trim().to_string();
        if partial != self.capture.buffer_text {
            self.capture.buffer_text = partial.clone();
            events.push(SegmenterEvent::Partial(partial));
        }

        events
    }

    /// Close the running capture after a quiet period
    ///
    /// Returns the captured text if any was recorded since the trigger.
    pub fn complete_quiet(&mut self) -> Option<String> {
        if !self.capture.is_recording {
            return None;
        }

        let message = self.capture.buffer_text.trim().to_string();
        if message.is_empty() {
            return None;
        }

        self.capture = MessageCapture::default();
        if self.discard_dispatched_text {
            self.consumed_to = self.last_len;
        }

        Some(message)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn folded_offsets_survive_case_changes() {
        let folded = Folded::new("Ärger JIMMY hallo");
        let (start, end) = folded.rfind_from("jimmy", 0).unwrap();
        assert_eq!(&"Ärger JIMMY hallo"[start..end], "JIMMY");
    }

    #[test]
    fn rfind_respects_lower_bound() {
        let folded = Folded::new("jimmy one jimmy two");
        assert_eq!(folded.rfind_from("jimmy", 0), Some((10, 15)));
        assert_eq!(folded.rfind_from("jimmy", 16), None);
    }

    #[test]
    fn floor_char_boundary_steps_back_into_text() {
        assert_eq!(floor_char_boundary("café", 10), 5);
        assert_eq!(floor_char_boundary("café", 4), 3);
        assert_eq!(floor_char_boundary("", 3), 0);
    }

    #[test]
    fn complete_quiet_without_capture_is_none() {
        let mut segmenter = TriggerSegmenter::new(&TriggerPolicy::debounce(
            "symptoms",
            std::time::Duration::from_secs(10),
        ));
        segmenter.observe("hello there");
        assert_eq!(segmenter.complete_quiet(), None);
    }
}
