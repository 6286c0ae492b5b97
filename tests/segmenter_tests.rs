use mediguide::speech::{SegmenterEvent, TriggerPolicy, TriggerSegmenter};
use std::time::Duration;

fn completed(events: &[SegmenterEvent]) -> Vec<String> {
    events
        .iter()
        .filter_map(|e| match e {
            SegmenterEvent::MessageCompleted(m) => Some(m.clone()),
            _ => None,
        })
        .collect()
}

fn marker_pair() -> TriggerSegmenter {
    TriggerSegmenter::new(&TriggerPolicy::marker_pair("jimmy", "finish"))
}

#[test]
fn test_no_start_marker_stays_idle() {
    let mut segmenter = marker_pair();
    assert!(segmenter.observe("i have a headache").is_empty());
    assert!(!segmenter.capture().is_recording);
}

#[test]
fn test_start_marker_begins_recording() {
    let mut segmenter = marker_pair();
    let events = segmenter.observe("well jimmy my knee");

    assert_eq!(
        events,
        vec![
            SegmenterEvent::RecordingStarted,
            SegmenterEvent::Partial("my knee".to_string()),
        ]
    );
    let capture = segmenter.capture();
    assert!(capture.is_recording);
    assert_eq!(capture.start_marker_found_at, Some(10));
    assert_eq!(capture.buffer_text, "my knee");
}

#[test]
fn test_unchanged_partial_is_not_repeated() {
    let mut segmenter = marker_pair();
    segmenter.observe("jimmy my knee");
    assert!(segmenter.observe("jimmy my knee ").is_empty());
}

#[test]
fn test_enclosed_message_extracted_and_trimmed() {
    let mut segmenter = marker_pair();
    let events = segmenter.observe("jimmy   my knee hurts   finish");

    assert_eq!(completed(&events), vec!["my knee hurts".to_string()]);
    assert!(!segmenter.capture().is_recording);
    assert!(segmenter.capture().buffer_text.is_empty());
}

#[test]
fn test_completed_message_not_emitted_again() {
    let mut segmenter = marker_pair();
    segmenter.observe("jimmy hello there finish");

    assert!(completed(&segmenter.observe("jimmy hello there finish")).is_empty());
    assert!(completed(&segmenter.observe("jimmy hello there finish okay")).is_empty());
    assert!(!segmenter.capture().is_recording);
}

#[test]
fn test_revised_shorter_transcript_does_not_reemit() {
    let mut segmenter = marker_pair();
    let mut messages = completed(&segmenter.observe("jimmy hello there finish"));

    // The engine revises its guess to something shorter, then keeps going.
    messages.extend(completed(&segmenter.observe("jimmy hello the finish")));
    messages.extend(completed(&segmenter.observe("jimmy hello the finish and")));

    assert_eq!(messages, vec!["hello there".to_string()]);
    assert!(!segmenter.capture().is_recording);
}

#[test]
fn test_new_message_after_shorter_revision() {
    let mut segmenter = marker_pair();
    segmenter.observe("jimmy hello there finish");
    segmenter.observe("jimmy hello finish");

    let events = segmenter.observe("jimmy hello finish jimmy my ear finish");
    assert_eq!(completed(&events), vec!["my ear".to_string()]);
}

#[test]
fn test_last_start_marker_wins() {
    let mut segmenter = marker_pair();
    let events = segmenter.observe("jimmy wait jimmy hello finish");
    assert_eq!(completed(&events), vec!["hello".to_string()]);
}

#[test]
fn test_end_marker_must_follow_start_marker() {
    let mut segmenter = marker_pair();
    let events = segmenter.observe("finish then jimmy hello");

    assert!(completed(&events).is_empty());
    assert!(segmenter.capture().is_recording);
    assert_eq!(segmenter.capture().buffer_text, "hello");
}

#[test]
fn test_empty_enclosed_message_is_dropped() {
    let mut segmenter = marker_pair();
    let events = segmenter.observe("jimmy finish");

    assert!(completed(&events).is_empty());
    assert!(!segmenter.capture().is_recording);
}

#[test]
fn test_markers_match_case_insensitively() {
    let mut segmenter = marker_pair();
    let events = segmenter.observe("JIMMY Sore Throat Finish");
    assert_eq!(completed(&events), vec!["Sore Throat".to_string()]);
}

#[test]
fn test_multi_word_markers() {
    let mut segmenter = TriggerSegmenter::new(&TriggerPolicy::marker_pair("hey doc", "that's all"));
    let events = segmenter.observe("hey doc my back aches that's all");
    assert_eq!(completed(&events), vec!["my back aches".to_string()]);
}

#[test]
fn test_reset_forgets_capture() {
    let mut segmenter = marker_pair();
    segmenter.observe("jimmy one finish");
    segmenter.observe("jimmy one finish jimmy two");
    assert!(segmenter.capture().is_recording);

    segmenter.reset();
    assert!(!segmenter.capture().is_recording);

    // A fresh session starts scanning from the beginning again.
    let events = segmenter.observe("jimmy three finish");
    assert_eq!(completed(&events), vec!["three".to_string()]);
}

#[test]
fn test_shrinking_transcript_abandons_capture() {
    let mut segmenter = marker_pair();
    segmenter.observe("jimmy my head");

    let events = segmenter.observe("gym");
    assert_eq!(events, vec![SegmenterEvent::Partial(String::new())]);
    assert!(!segmenter.capture().is_recording);
}

#[test]
fn test_trigger_only_rising_edge() {
    let mut segmenter = TriggerSegmenter::new(&TriggerPolicy::trigger_only("jimmy"));

    assert!(segmenter.observe("hello").is_empty());
    assert_eq!(
        segmenter.observe("hello jimmy"),
        vec![SegmenterEvent::TriggerDetected("hello jimmy".to_string())]
    );
    assert!(segmenter.observe("hello jimmy there").is_empty());

    // Marker gone (engine revised), then heard again.
    assert!(segmenter.observe("hello gimme").is_empty());
    assert_eq!(
        segmenter.observe("hello jimmy"),
        vec![SegmenterEvent::TriggerDetected("hello jimmy".to_string())]
    );
}

#[test]
fn test_quiet_completion_returns_buffer() {
    let mut segmenter =
        TriggerSegmenter::new(&TriggerPolicy::debounce("symptoms", Duration::from_secs(10)));
    segmenter.observe("symptoms chills and fever");

    assert_eq!(
        segmenter.complete_quiet(),
        Some("chills and fever".to_string())
    );
    assert!(!segmenter.capture().is_recording);
    assert_eq!(segmenter.complete_quiet(), None);
}

#[test]
fn test_quiet_completion_keeps_text_by_default() {
    let mut segmenter =
        TriggerSegmenter::new(&TriggerPolicy::debounce("symptoms", Duration::from_secs(10)));
    segmenter.observe("symptoms chills");
    segmenter.complete_quiet();

    // The same transcript still contains the marker and is captured again.
    let events = segmenter.observe("symptoms chills and");
    assert_eq!(events[0], SegmenterEvent::RecordingStarted);
    assert_eq!(segmenter.capture().buffer_text, "chills and");
}

#[test]
fn test_quiet_completion_can_discard_dispatched_text() {
    let mut policy = TriggerPolicy::debounce("symptoms", Duration::from_secs(10));
    policy.discard_dispatched_text = true;
    let mut segmenter = TriggerSegmenter::new(&policy);

    segmenter.observe("symptoms chills");
    assert_eq!(segmenter.complete_quiet(), Some("chills".to_string()));

    assert!(segmenter.observe("symptoms chills and").is_empty());
    assert!(!segmenter.capture().is_recording);

    segmenter.observe("symptoms chills and symptoms rash");
    assert_eq!(segmenter.complete_quiet(), Some("rash".to_string()));
}

#[test]
fn test_quiet_completion_of_empty_capture() {
    let mut segmenter =
        TriggerSegmenter::new(&TriggerPolicy::debounce("symptoms", Duration::from_secs(10)));
    segmenter.observe("symptoms");

    assert!(segmenter.capture().is_recording);
    assert_eq!(segmenter.complete_quiet(), None);
}
