use mediguide::{
    ReplayCapability, ReplayScript, SessionStatus, SpeechConfig, SpeechController, SpeechEvent,
};
use std::io::Write;
use std::sync::Arc;
use std::time::Duration;
use tempfile::NamedTempFile;

const SCRIPT: &str = r#"
# engine 0 hears one message, then the service closes the session
{"at_ms": 0, "event": {"type": "start"}}
{"at_ms": 100, "event": {"type": "result", "segments": [{"transcript": "jimmy I have ", "is_final": true}, {"transcript": "a rash"}]}}
{"at_ms": 200, "event": {"type": "result", "segments": [{"transcript": "jimmy I have ", "is_final": true}, {"transcript": "a rash finish", "is_final": true}]}}
{"at_ms": 300, "event": {"type": "end"}}
# engine 1 comes up after the restart
{"engine": 1, "at_ms": 0, "event": {"type": "start"}}
{"engine": 1, "at_ms": 50, "event": {"type": "result", "segments": [{"transcript": "jimmy"}]}}
"#;

#[test]
fn test_load_script_from_file() {
    let mut file = NamedTempFile::new().unwrap();
    file.write_all(SCRIPT.as_bytes()).unwrap();

    let script = ReplayScript::load(file.path()).unwrap();
    assert_eq!(script.engine_count(), 2);
    assert_eq!(script.duration(), Duration::from_millis(350));
}

#[test]
fn test_load_missing_script_fails() {
    let err = ReplayScript::load("/nonexistent/replay.jsonl").unwrap_err();
    assert!(err.to_string().contains("Failed to read replay script"));
}

#[tokio::test(start_paused = true)]
async fn test_replay_drives_full_pipeline() {
    let script = ReplayScript::parse(SCRIPT).unwrap();
    let (handle, mut events) =
        SpeechController::spawn(SpeechConfig::default(), Arc::new(ReplayCapability::new(script)));
    handle.start_listening().unwrap();

    let mut seen = Vec::new();
    let deadline = tokio::time::Instant::now() + Duration::from_secs(3);
    loop {
        tokio::select! {
            event = events.recv() => match event {
                Some(event) => seen.push(event),
                None => break,
            },
            _ = tokio::time::sleep_until(deadline) => break,
        }
    }

    let messages: Vec<_> = seen
        .iter()
        .filter_map(|e| match e {
            SpeechEvent::MessageReady(m) => Some(m.as_str()),
            _ => None,
        })
        .collect();
    assert_eq!(messages, vec!["I have a rash"]);

    let statuses: Vec<_> = seen
        .iter()
        .filter_map(|e| match e {
            SpeechEvent::StatusChanged(s) => Some(*s),
            _ => None,
        })
        .collect();
    assert_eq!(
        statuses,
        vec![
            SessionStatus::Starting,
            SessionStatus::Listening,
            SessionStatus::Stopped,
            SessionStatus::Starting,
            SessionStatus::Listening,
        ]
    );

    assert_eq!(handle.transcript().borrow().full_text, "jimmy");
    assert_eq!(handle.transcript().borrow().generation, 2);

    handle.shutdown().await.unwrap();
}
