//! Engines driven from outside the platform: by hand or from a replay script

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, VecDeque};
use std::path::Path;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use super::{EngineEvent, EngineEventSink, EngineSettings, SpeechCapability, SpeechEngine};
use crate::error::SpeechError;

#[derive(Debug, Default)]
struct EngineFlags {
    started: AtomicBool,
    stopped: AtomicBool,
    sink: Mutex<Option<EngineEventSink>>,
}

/// Test-side handle to an engine created by [`ManualCapability`]
#[derive(Debug, Clone)]
pub struct ScriptedEngineHandle {
    index: usize,
    settings: EngineSettings,
    flags: Arc<EngineFlags>,
}

impl ScriptedEngineHandle {
    /// Creation order of this engine (0 for the first)
    pub fn index(&self) -> usize {
        self.index
    }

    pub fn settings(&self) -> EngineSettings {
        self.settings
    }

    pub fn is_started(&self) -> bool {
        self.flags.started.load(Ordering::SeqCst)
    }

    pub fn is_stopped(&self) -> bool {
        self.flags.stopped.load(Ordering::SeqCst)
    }

    /// Fire an engine callback; false if the engine was never started or
    /// the controller is gone
    pub fn emit(&self, event: EngineEvent) -> bool {
        let sink = self.flags.sink.lock().ok().and_then(|s| s.clone());
        match sink {
            Some(sink) => sink.emit(event),
            None => false,
        }
    }
}

/// Capability whose engines are driven by hand
///
/// Every created engine's [`ScriptedEngineHandle`] is sent on the channel
/// returned by [`ManualCapability::new`].
pub struct ManualCapability {
    created: AtomicUsize,
    handles: mpsc::UnboundedSender<ScriptedEngineHandle>,
}

impl ManualCapability {
    pub fn new() -> (Self, mpsc::UnboundedReceiver<ScriptedEngineHandle>) {
        let (handles, rx) = mpsc::unbounded_channel();
        (
            Self {
                created: AtomicUsize::new(0),
                handles,
            },
            rx,
        )
    }

    /// Number of engines created so far
    pub fn created(&self) -> usize {
        self.created.load(Ordering::SeqCst)
    }
}

impl SpeechCapability for ManualCapability {
    fn create(&self, settings: EngineSettings) -> Result<Box<dyn SpeechEngine>, SpeechError> {
        let index = self.created.fetch_add(1, Ordering::SeqCst);
        let flags = Arc::new(EngineFlags::default());

        let handle = ScriptedEngineHandle {
            index,
            settings,
            flags: Arc::clone(&flags),
        };
        if self.handles.send(handle).is_err() {
            debug!("No one is driving manual engine {}", index);
        }

        Ok(Box::new(ManualEngine { flags }))
    }

    fn name(&self) -> &str {
        "manual"
    }
}

struct ManualEngine {
    flags: Arc<EngineFlags>,
}

#[async_trait::async_trait]
impl SpeechEngine for ManualEngine {
    async fn start(&mut self, sink: EngineEventSink) -> Result<(), SpeechError> {
        if let Ok(mut slot) = self.flags.sink.lock() {
            *slot = Some(sink);
        }
        self.flags.started.store(true, Ordering::SeqCst);
        Ok(())
    }

    async fn stop(&mut self) -> Result<(), SpeechError> {
        self.flags.stopped.store(true, Ordering::SeqCst);
        Ok(())
    }

    fn name(&self) -> &str {
        "manual"
    }
}

/// One line of a replay script
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReplayLine {
    /// Engine instance the event belongs to (0 = first engine created)
    #[serde(default)]
    pub engine: usize,

    /// Offset from the engine's start
    pub at_ms: u64,

    pub event: EngineEvent,
}

/// Timed engine events, grouped per engine instance
#[derive(Debug, Clone, Default)]
pub struct ReplayScript {
    engines: Vec<Vec<(Duration, EngineEvent)>>,
}

impl ReplayScript {
    /// Parse a JSON-lines script; blank lines and `#` comments are skipped
    pub fn parse(text: &str) -> Result<Self> {
        let mut grouped: BTreeMap<usize, Vec<(Duration, EngineEvent)>> = BTreeMap::new();

        for (lineno, line) in text.lines().enumerate() {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            let parsed: ReplayLine = serde_json::from_str(line)
                .with_context(|| format!("Invalid replay line {}", lineno + 1))?;
            grouped
                .entry(parsed.engine)
                .or_default()
                .push((Duration::from_millis(parsed.at_ms), parsed.event));
        }

        let count = grouped.keys().next_back().map(|last| last + 1).unwrap_or(0);
        let mut engines = vec![Vec::new(); count];
        for (index, mut events) in grouped {
            events.sort_by_key(|(at, _)| *at);
            engines[index] = events;
        }

        Ok(Self { engines })
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read replay script {}", path.display()))?;
        Self::parse(&text)
    }

    pub fn engine_count(&self) -> usize {
        self.engines.len()
    }

    /// Time from an engine's start to its last scripted event
    pub fn duration(&self) -> Duration {
        self.engines
            .iter()
            .map(|events| events.last().map(|(at, _)| *at).unwrap_or_default())
            .sum()
    }
}

/// Capability that plays back a [`ReplayScript`]
///
/// Engines created after the script is exhausted start but stay silent.
pub struct ReplayCapability {
    remaining: Mutex<VecDeque<Vec<(Duration, EngineEvent)>>>,
}

impl ReplayCapability {
    pub fn new(script: ReplayScript) -> Self {
        Self {
            remaining: Mutex::new(script.engines.into()),
        }
    }
}

impl SpeechCapability for ReplayCapability {
    fn create(&self, _settings: EngineSettings) -> Result<Box<dyn SpeechEngine>, SpeechError> {
        let events = self
            .remaining
            .lock()
            .map_err(|_| SpeechError::TransientEngine("replay script poisoned".to_string()))?
            .pop_front()
            .unwrap_or_default();

        Ok(Box::new(ReplayEngine {
            events: Some(events),
            sink: None,
            task: None,
        }))
    }

    fn name(&self) -> &str {
        "replay"
    }
}

struct ReplayEngine {
    events: Option<Vec<(Duration, EngineEvent)>>,
    sink: Option<EngineEventSink>,
    task: Option<JoinHandle<()>>,
}

#[async_trait::async_trait]
impl SpeechEngine for ReplayEngine {
    async fn start(&mut self, sink: EngineEventSink) -> Result<(), SpeechError> {
        let events = self.events.take().unwrap_or_default();
        info!(
            "Replaying {} engine events for session {}",
            events.len(),
            sink.session_id()
        );

        let task_sink = sink.clone();
        self.sink = Some(sink);
        self.task = Some(tokio::spawn(async move {
            let started = tokio::time::Instant::now();
            for (at, event) in events {
                tokio::time::sleep_until(started + at).await;
                if !task_sink.emit(event) {
                    break;
                }
            }
        }));

        Ok(())
    }

    async fn stop(&mut self) -> Result<(), SpeechError> {
        if let Some(task) = self.task.take() {
            task.abort();
        }
        // A stopped engine still reports its end, as a browser engine does.
        if let Some(sink) = self.sink.take() {
            if !sink.emit(EngineEvent::End) {
                warn!("Controller gone before replay engine ended");
            }
        }
        Ok(())
    }

    fn name(&self) -> &str {
        "replay"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn script_groups_and_orders_events_per_engine() {
        let script = ReplayScript::parse(
            r#"
# first engine
{"at_ms": 500, "event": {"type": "result", "segments": [{"transcript": "jimmy"}]}}
{"at_ms": 0, "event": {"type": "start"}}
{"engine": 1, "at_ms": 100, "event": {"type": "end"}}
"#,
        )
        .unwrap();

        assert_eq!(script.engine_count(), 2);
        assert_eq!(script.engines[0][0].1, EngineEvent::Start);
        assert_eq!(script.duration(), Duration::from_millis(600));
    }

    #[test]
    fn bad_line_reports_line_number() {
        let err = ReplayScript::parse("{\"at_ms\": 0, \"event\": {\"type\": \"start\"}}\nnot json")
            .unwrap_err();
        assert!(err.to_string().contains("line 2"));
    }
}
