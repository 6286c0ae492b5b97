use mediguide::nats::{ControlAction, SessionControlMessage, SttState, SttStatusMessage, TranscriptMessage};

#[test]
fn test_session_control_serialization() {
    let msg = SessionControlMessage {
        session_id: "speech-1234".to_string(),
        action: ControlAction::Start,
        continuous: true,
        interim_results: true,
        timestamp: "2025-10-27T14:30:00Z".to_string(),
    };

    let json = serde_json::to_string(&msg).unwrap();
    assert!(json.contains("speech-1234"));
    assert!(json.contains("\"action\":\"start\""));
    assert!(json.contains("\"continuous\":true"));
    assert!(json.contains("\"interim_results\":true"));

    let deserialized: SessionControlMessage = serde_json::from_str(&json).unwrap();
    assert_eq!(deserialized, msg);
}

#[test]
fn test_session_stop_action() {
    let json = r#"{
        "session_id": "speech-1234",
        "action": "stop",
        "continuous": true,
        "interim_results": false,
        "timestamp": "2025-10-27T14:31:00Z"
    }"#;

    let msg: SessionControlMessage = serde_json::from_str(json).unwrap();
    assert_eq!(msg.action, ControlAction::Stop);
    assert!(!msg.interim_results);
}

#[test]
fn test_transcript_deserialization() {
    let json = r#"{
        "session_id": "speech-1234",
        "text": "jimmy my ear hurts",
        "partial": false,
        "timestamp": "2025-10-27T14:30:05Z",
        "confidence": 0.95
    }"#;

    let msg: TranscriptMessage = serde_json::from_str(json).unwrap();
    assert_eq!(msg.session_id, "speech-1234");
    assert_eq!(msg.text, "jimmy my ear hurts");
    assert!(!msg.partial);
    assert_eq!(msg.confidence, Some(0.95));
    assert_eq!(msg.timestamp, "2025-10-27T14:30:05Z");
}

#[test]
fn test_transcript_no_confidence() {
    let json = r#"{
        "session_id": "speech-1234",
        "text": "jimmy my",
        "partial": true,
        "timestamp": "2025-10-27T14:30:05Z"
    }"#;

    let msg: TranscriptMessage = serde_json::from_str(json).unwrap();
    assert!(msg.partial);
    assert_eq!(msg.confidence, None);
}

#[test]
fn test_status_error_with_reason() {
    let json = r#"{
        "session_id": "speech-1234",
        "state": "error",
        "reason": "network",
        "timestamp": "2025-10-27T14:32:00Z"
    }"#;

    let msg: SttStatusMessage = serde_json::from_str(json).unwrap();
    assert_eq!(msg.state, SttState::Error);
    assert_eq!(msg.reason.as_deref(), Some("network"));
}

#[test]
fn test_status_without_reason() {
    let json = r#"{
        "session_id": "speech-1234",
        "state": "ended",
        "timestamp": "2025-10-27T14:33:00Z"
    }"#;

    let msg: SttStatusMessage = serde_json::from_str(json).unwrap();
    assert_eq!(msg.state, SttState::Ended);
    assert_eq!(msg.reason, None);
}

#[test]
fn test_unknown_status_state_rejected() {
    let json = r#"{
        "session_id": "speech-1234",
        "state": "paused",
        "timestamp": "2025-10-27T14:33:00Z"
    }"#;

    assert!(serde_json::from_str::<SttStatusMessage>(json).is_err());
}
