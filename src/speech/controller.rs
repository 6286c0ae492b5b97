use anyhow::{Context, Result};
use serde::Serialize;
use std::collections::VecDeque;
use std::mem;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc::error::TrySendError;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use super::config::{CaptureMode, SpeechConfig};
use super::debounce::{DebounceTicket, Debouncer};
use super::segmenter::{SegmenterEvent, TriggerSegmenter};
use super::session::{RecognitionSession, SessionStatus};
use super::transcript::{self, TranscriptAccumulator, TranscriptState};
use crate::engine::{
    EngineErrorReason, EngineEvent, EngineEventSink, EngineSettings, ResultSegment,
    SpeechCapability, SpeechEngine,
};
use crate::error::SpeechError;

/// Everything the controller reacts to, in arrival order
#[derive(Debug)]
pub enum ControllerEvent {
    StartListening,
    StopListening,
    Engine { generation: u64, event: EngineEvent },
    RestartDue { generation: u64 },
    DebounceDue { ticket: DebounceTicket },
    Shutdown,
}

/// Notifications published to the owner of a [`SpeechHandle`]
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "event", content = "data", rename_all = "snake_case")]
pub enum SpeechEvent {
    StatusChanged(SessionStatus),
    TranscriptChanged(String),
    RecordingChanged { recording: bool, partial: String },
    /// The start marker was heard; carries the full transcript for editing
    TriggerDetected(String),
    /// A finished utterance ready for the completion service
    MessageReady(String),
    /// Speech recognition is not available (reported once)
    CapabilityUnavailable(String),
}

impl SpeechEvent {
    /// Snapshot events only describe current state; a newer one of the same
    /// kind replaces an undelivered older one
    fn is_snapshot(&self) -> bool {
        matches!(
            self,
            Self::StatusChanged(_) | Self::TranscriptChanged(_) | Self::RecordingChanged { .. }
        )
    }
}

/// Owner's handle to a running [`SpeechController`]
///
/// Dropping the handle stops listening and shuts the controller down, so the
/// engine is released on every exit path.
pub struct SpeechHandle {
    tx: mpsc::UnboundedSender<ControllerEvent>,
    status: watch::Receiver<SessionStatus>,
    transcript: watch::Receiver<TranscriptState>,
    task: Option<JoinHandle<()>>,
}

impl SpeechHandle {
    pub fn start_listening(&self) -> Result<(), SpeechError> {
        self.send(ControllerEvent::StartListening)
    }

    pub fn stop_listening(&self) -> Result<(), SpeechError> {
        self.send(ControllerEvent::StopListening)
    }

    pub fn status(&self) -> SessionStatus {
        *self.status.borrow()
    }

    pub fn watch_status(&self) -> watch::Receiver<SessionStatus> {
        self.status.clone()
    }

    /// Latest transcript (at-most-latest delivery)
    pub fn transcript(&self) -> watch::Receiver<TranscriptState> {
        self.transcript.clone()
    }

    /// Stop listening and end the controller without waiting for it
    ///
    /// For owners that share the handle and cannot consume it.
    pub fn close(&self) -> Result<(), SpeechError> {
        self.send(ControllerEvent::Shutdown)
    }

    /// Stop listening and wait for the controller to finish
    pub async fn shutdown(mut self) -> Result<()> {
        let _ = self.tx.send(ControllerEvent::Shutdown);
        if let Some(task) = self.task.take() {
            task.await.context("Speech controller task panicked")?;
        }
        Ok(())
    }

    fn send(&self, event: ControllerEvent) -> Result<(), SpeechError> {
        self.tx.send(event).map_err(|_| SpeechError::ControllerClosed)
    }
}

impl Drop for SpeechHandle {
    fn drop(&mut self) {
        if self.task.is_some() {
            let _ = self.tx.send(ControllerEvent::Shutdown);
        }
    }
}

/// Long-running, self-healing speech-recognition session
///
/// A single task consumes one event queue fed by the owner's handle, by the
/// current engine and by restart/debounce timers. Timers carry the
/// generation (or ticket) that scheduled them and are ignored once stale.
pub struct SpeechController {
    config: SpeechConfig,
    capability: Arc<dyn SpeechCapability>,
    tx: mpsc::UnboundedSender<ControllerEvent>,
    events: mpsc::Sender<SpeechEvent>,
    status: watch::Sender<SessionStatus>,
    transcript: TranscriptAccumulator,
    segmenter: TriggerSegmenter,
    debouncer: Option<Debouncer>,
    session: Option<RecognitionSession>,
    engine: Option<Box<dyn SpeechEngine>>,
    generation: u64,
    pending_restart: Option<u64>,
    restart_timer: Option<JoinHandle<()>>,
    debounce_timer: Option<JoinHandle<()>>,
    /// Outbound events the owner has not made room for yet, oldest first
    backlog: VecDeque<SpeechEvent>,
    unavailable: Option<String>,
}

impl SpeechController {
    /// Start the controller task
    ///
    /// Returns the owner's handle and the outbound event stream.
    pub fn spawn(
        config: SpeechConfig,
        capability: Arc<dyn SpeechCapability>,
    ) -> (SpeechHandle, mpsc::Receiver<SpeechEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let (events_tx, events_rx) = mpsc::channel(config.event_buffer.max(1));
        let (status_tx, status_rx) = watch::channel(SessionStatus::Idle);
        let transcript = TranscriptAccumulator::new();
        let transcript_rx = transcript.subscribe();

        let segmenter = TriggerSegmenter::new(&config.policy);
        let debouncer = match segmenter.mode() {
            CaptureMode::Debounce { quiet_period } => Some(Debouncer::new(*quiet_period)),
            _ => None,
        };

        info!(
            "Speech controller using {} engine, policy {:?}",
            capability.name(),
            segmenter.mode()
        );

        let controller = Self {
            config,
            capability,
            tx: tx.clone(),
            events: events_tx,
            status: status_tx,
            transcript,
            segmenter,
            debouncer,
            session: None,
            engine: None,
            generation: 0,
            pending_restart: None,
            restart_timer: None,
            debounce_timer: None,
            backlog: VecDeque::new(),
            unavailable: None,
        };

        let task = tokio::spawn(controller.run(rx));

        let handle = SpeechHandle {
            tx,
            status: status_rx,
            transcript: transcript_rx,
            task: Some(task),
        };

        (handle, events_rx)
    }

    async fn run(mut self, mut rx: mpsc::UnboundedReceiver<ControllerEvent>) {
        info!("Speech controller started");

        loop {
            // A slow owner never holds up control events; undelivered
            // outbound events are handed over whenever room appears.
            let events = self.events.clone();
            let event = tokio::select! {
                event = rx.recv() => match event {
                    Some(event) => event,
                    None => break,
                },
                permit = events.reserve(), if !self.backlog.is_empty() => {
                    match permit {
                        Ok(permit) => {
                            if let Some(event) = self.backlog.pop_front() {
                                permit.send(event);
                            }
                        }
                        Err(_) => self.backlog.clear(),
                    }
                    continue;
                }
            };

            match event {
                ControllerEvent::StartListening => self.start_listening().await,
                ControllerEvent::StopListening => self.stop_listening().await,
                ControllerEvent::Engine { generation, event } => {
                    self.on_engine_event(generation, event).await
                }
                ControllerEvent::RestartDue { generation } => self.on_restart_due(generation).await,
                ControllerEvent::DebounceDue { ticket } => self.on_debounce_due(ticket),
                ControllerEvent::Shutdown => break,
            }
        }

        self.stop_listening().await;
        info!("Speech controller stopped");
    }

    fn current_status(&self) -> SessionStatus {
        match (&self.session, &self.unavailable) {
            (Some(session), _) => session.status,
            (None, Some(_)) => SessionStatus::ErroredFatal,
            (None, None) => SessionStatus::Idle,
        }
    }

    fn publish_status(&mut self) {
        let status = self.current_status();
        let previous = self.status.send_replace(status);
        if previous != status {
            debug!("Session status {:?} -> {:?}", previous, status);
            self.emit(SpeechEvent::StatusChanged(status));
        }
    }

    /// Queue an outbound event without ever waiting on the owner
    fn emit(&mut self, event: SpeechEvent) {
        self.flush_backlog();

        if self.backlog.is_empty() {
            match self.events.try_send(event) {
                Ok(()) => return,
                Err(TrySendError::Closed(_)) => {
                    debug!("No speech event subscriber");
                    return;
                }
                Err(TrySendError::Full(event)) => self.defer(event),
            }
        } else {
            self.defer(event);
        }
    }

    fn defer(&mut self, event: SpeechEvent) {
        if event.is_snapshot() {
            // Within the trailing run of snapshots keep only the newest of each kind.
            let run_start = self
                .backlog
                .iter()
                .rposition(|e| !e.is_snapshot())
                .map_or(0, |i| i + 1);
            let kind = mem::discriminant(&event);
            if let Some(pos) =
                (run_start..self.backlog.len()).find(|&i| mem::discriminant(&self.backlog[i]) == kind)
            {
                self.backlog.remove(pos);
            }
        }
        debug!("Speech event channel full, {} event(s) waiting", self.backlog.len() + 1);
        self.backlog.push_back(event);
    }

    fn flush_backlog(&mut self) {
        while let Some(event) = self.backlog.pop_front() {
            match self.events.try_send(event) {
                Ok(()) => {}
                Err(TrySendError::Full(event)) => {
                    self.backlog.push_front(event);
                    return;
                }
                Err(TrySendError::Closed(_)) => {
                    self.backlog.clear();
                    return;
                }
            }
        }
    }

    /// Move the current session to `next`; false if there is no session or
    /// the transition is illegal
    fn transition(&mut self, next: SessionStatus) -> bool {
        let Some(session) = self.session.as_mut() else {
            return false;
        };
        if let Err(e) = session.transition(next) {
            warn!("Ignoring engine event: {}", e);
            return false;
        }
        self.publish_status();
        true
    }

    async fn start_listening(&mut self) {
        if let Some(session) = &self.session {
            if session.status.is_active() {
                debug!("Already listening (session {})", session.session_id);
                return;
            }
        }

        self.cancel_restart();
        self.cancel_debounce();

        // The previous engine is not reusable; release it unless it already ended.
        if let Some(mut old) = self.engine.take() {
            let ended = self
                .session
                .as_ref()
                .map(|s| s.status == SessionStatus::Stopped)
                .unwrap_or(true);
            if !ended {
                if let Err(e) = old.stop().await {
                    warn!("Failed to stop previous {} engine: {}", old.name(), e);
                }
            }
        }

        let settings = EngineSettings {
            continuous: true,
            interim_results: true,
        };

        let mut engine = match self.capability.create(settings) {
            Ok(engine) => engine,
            Err(SpeechError::CapabilityUnavailable(reason)) => {
                self.session = None;
                self.report_unavailable(reason);
                return;
            }
            Err(e) => {
                // Keep the old session as the owner of the retry.
                error!("Failed to create speech engine: {}", e);
                if let Some(session) = self.session.as_ref() {
                    if !session.suppress_restart {
                        let generation = session.generation;
                        self.schedule_restart(generation);
                    }
                }
                return;
            }
        };

        self.generation += 1;
        let session = RecognitionSession::new(self.generation);
        info!(
            "Starting speech recognition session {} (generation {}) on {}",
            session.session_id,
            session.generation,
            engine.name()
        );

        let sink = EngineEventSink::new(session.generation, session.session_id.clone(), self.tx.clone());
        self.transcript.reset(session.generation);
        self.segmenter.reset();
        self.session = Some(session);
        self.unavailable = None;
        self.publish_status();

        match engine.start(sink).await {
            Ok(()) => {}
            Err(SpeechError::CapabilityUnavailable(reason)) => {
                self.transition(SessionStatus::ErroredFatal);
                self.report_unavailable(reason);
            }
            Err(e) => {
                warn!("Speech engine failed to start: {}", e);
                self.transition(SessionStatus::ErroredTransient);
                self.schedule_restart(self.generation);
            }
        }

        self.engine = Some(engine);
    }

    fn report_unavailable(&mut self, reason: String) {
        if self.unavailable.is_some() {
            warn!("Speech recognition still unavailable: {}", reason);
            return;
        }
        error!("Speech recognition not supported: {}", reason);
        self.unavailable = Some(reason.clone());
        self.publish_status();
        self.emit(SpeechEvent::CapabilityUnavailable(reason));
    }

    async fn stop_listening(&mut self) {
        self.cancel_restart();
        self.cancel_debounce();

        let Some(session) = self.session.as_mut() else {
            return;
        };
        session.suppress_restart = true;

        if session.status != SessionStatus::Stopped {
            info!("Stopping speech recognition session {}", session.session_id);
            if let Some(engine) = self.engine.as_mut() {
                if let Err(e) = engine.stop().await {
                    error!("Failed to stop {} engine: {}", engine.name(), e);
                }
            }
            self.transition(SessionStatus::Stopped);
        }
    }

    async fn on_engine_event(&mut self, generation: u64, event: EngineEvent) {
        if generation != self.generation || self.session.is_none() {
            debug!("Dropping {:?} from stale generation {}", event, generation);
            return;
        }

        match event {
            EngineEvent::Start => {
                info!("Speech recognition started");
                self.transition(SessionStatus::Listening);
            }
            EngineEvent::Result { segments } => self.on_result(&segments),
            EngineEvent::Error { reason } => self.on_error(reason),
            EngineEvent::End => {
                info!("Speech recognition ended");
                let status = self.current_status();
                if status != SessionStatus::Stopped {
                    self.transition(SessionStatus::Stopped);
                }
                self.schedule_restart(generation);
            }
        }
    }

    fn on_result(&mut self, segments: &[ResultSegment]) {
        let status = self.current_status();
        if !status.is_active() {
            debug!("Ignoring result while {:?}", status);
            return;
        }
        if status == SessionStatus::Starting {
            // Some engines deliver results before their start callback.
            self.transition(SessionStatus::Listening);
        }

        let full_text = transcript::full_text(segments);
        debug!("Transcript updated: {}", full_text);
        self.transcript.publish(self.generation, full_text.clone());
        self.emit(SpeechEvent::TranscriptChanged(full_text.clone()));

        for event in self.segmenter.observe(&full_text) {
            match event {
                SegmenterEvent::RecordingStarted => {
                    self.emit(SpeechEvent::RecordingChanged {
                        recording: true,
                        partial: String::new(),
                    });
                }
                SegmenterEvent::Partial(partial) => {
                    let recording = self.segmenter.capture().is_recording;
                    self.emit(SpeechEvent::RecordingChanged { recording, partial });
                }
                SegmenterEvent::MessageCompleted(message) => {
                    info!("Message detected: {}", message);
                    self.emit(SpeechEvent::RecordingChanged {
                        recording: false,
                        partial: String::new(),
                    });
                    self.emit(SpeechEvent::MessageReady(message));
                }
                SegmenterEvent::TriggerDetected(text) => {
                    info!("Trigger detected");
                    self.emit(SpeechEvent::TriggerDetected(text));
                }
            }
        }

        if self.segmenter.capture().is_recording {
            let buffer = self.segmenter.capture().buffer_text.clone();
            if let Some(debouncer) = self.debouncer.as_mut() {
                let ticket = debouncer.notify(buffer);
                let quiet_period = debouncer.quiet_period();
                // Rearming replaces the running quiet-period timer.
                let timer = self.schedule(quiet_period, ControllerEvent::DebounceDue { ticket });
                if let Some(previous) = self.debounce_timer.replace(timer) {
                    previous.abort();
                }
            }
        }
    }

    fn on_error(&mut self, reason: EngineErrorReason) {
        if reason.is_deliberate() {
            info!("Speech recognition aborted");
            if let Some(session) = self.session.as_mut() {
                session.suppress_restart = true;
            }
            self.cancel_restart();
            self.transition(SessionStatus::Stopped);
            return;
        }

        warn!("Speech recognition error: {}", reason.as_str());
        if self.current_status() == SessionStatus::Stopped {
            // Late error after the session already ended; the end handles restarts.
            return;
        }
        self.transition(SessionStatus::ErroredTransient);
        self.schedule_restart(self.generation);
    }

    /// Arrange a restart for `generation` after the backoff, at most once
    fn schedule_restart(&mut self, generation: u64) {
        let Some(session) = self.session.as_ref() else {
            return;
        };
        if session.suppress_restart {
            debug!("Restart suppressed for session {}", session.session_id);
            return;
        }
        if self.pending_restart == Some(generation) {
            debug!("Restart already pending for generation {}", generation);
            return;
        }

        let backoff = self.config.restart_backoff;
        debug!("Restarting in {:?} (generation {})", backoff, generation);
        self.pending_restart = Some(generation);
        let timer = self.schedule(backoff, ControllerEvent::RestartDue { generation });
        if let Some(previous) = self.restart_timer.replace(timer) {
            previous.abort();
        }
    }

    fn cancel_restart(&mut self) {
        self.pending_restart = None;
        if let Some(timer) = self.restart_timer.take() {
            timer.abort();
        }
    }

    fn cancel_debounce(&mut self) {
        if let Some(debouncer) = self.debouncer.as_mut() {
            debouncer.cancel();
        }
        if let Some(timer) = self.debounce_timer.take() {
            timer.abort();
        }
    }

    fn schedule(&self, delay: Duration, event: ControllerEvent) -> JoinHandle<()> {
        let tx = self.tx.clone();
        tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            let _ = tx.send(event);
        })
    }

    async fn on_restart_due(&mut self, generation: u64) {
        if self.pending_restart != Some(generation) || generation != self.generation {
            debug!("Ignoring stale restart for generation {}", generation);
            return;
        }
        self.pending_restart = None;
        self.restart_timer = None;

        let suppressed = self.session.as_ref().map(|s| s.suppress_restart).unwrap_or(true);
        if suppressed {
            return;
        }

        info!("Restarting speech recognition");
        self.start_listening().await;
    }

    fn on_debounce_due(&mut self, ticket: DebounceTicket) {
        let Some(debouncer) = self.debouncer.as_mut() else {
            return;
        };
        if debouncer.elapsed(ticket).is_none() {
            return;
        }
        self.debounce_timer = None;

        if let Some(message) = self.segmenter.complete_quiet() {
            info!("Quiet period elapsed, message: {}", message);
            self.emit(SpeechEvent::RecordingChanged {
                recording: false,
                partial: String::new(),
            });
            self.emit(SpeechEvent::MessageReady(message));
        }
    }
}
