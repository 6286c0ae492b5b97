//! Speech engine backed by an external STT service reached over NATS

use futures::stream::StreamExt;
use tokio::task::JoinHandle;
use tracing::{error, info, warn};

use super::{
    EngineErrorReason, EngineEvent, EngineEventSink, EngineSettings, ResultSegment,
    SpeechCapability, SpeechEngine,
};
use crate::error::SpeechError;
use crate::nats::{ControlAction, NatsClient, SttState, SttStatusMessage, TranscriptMessage};

/// Capability that binds each session to the STT service at `url`
pub struct NatsCapability {
    url: String,
}

impl NatsCapability {
    pub fn new(url: impl Into<String>) -> Self {
        Self { url: url.into() }
    }
}

impl SpeechCapability for NatsCapability {
    fn create(&self, settings: EngineSettings) -> Result<Box<dyn SpeechEngine>, SpeechError> {
        Ok(Box::new(NatsEngine {
            url: self.url.clone(),
            settings,
            client: None,
            sink: None,
            task: None,
        }))
    }

    fn name(&self) -> &str {
        "nats"
    }
}

/// Rebuilds the engine-style cumulative segment list from STT messages
///
/// Final results accumulate; the latest partial result is the trailing
/// interim segment until a final result replaces it.
#[derive(Debug, Default)]
pub struct SegmentBuffer {
    finals: Vec<String>,
    interim: Option<String>,
}

impl SegmentBuffer {
    pub fn apply(&mut self, message: &TranscriptMessage) {
        if message.partial {
            self.interim = Some(message.text.clone());
        } else {
            self.finals.push(message.text.clone());
            self.interim = None;
        }
    }

    pub fn segments(&self) -> Vec<ResultSegment> {
        self.finals
            .iter()
            .map(|text| ResultSegment::final_text(text.clone()))
            .chain(self.interim.iter().map(|text| ResultSegment::interim(text.clone())))
            .collect()
    }
}

fn status_event(status: &SttStatusMessage) -> EngineEvent {
    match status.state {
        SttState::Started => EngineEvent::Start,
        SttState::Ended => EngineEvent::End,
        SttState::Error => EngineEvent::Error {
            reason: status
                .reason
                .as_deref()
                .map(EngineErrorReason::from)
                .unwrap_or_else(|| EngineErrorReason::Other("unknown".to_string())),
        },
    }
}

struct NatsEngine {
    url: String,
    settings: EngineSettings,
    client: Option<NatsClient>,
    sink: Option<EngineEventSink>,
    task: Option<JoinHandle<()>>,
}

#[async_trait::async_trait]
impl SpeechEngine for NatsEngine {
    async fn start(&mut self, sink: EngineEventSink) -> Result<(), SpeechError> {
        let session_id = sink.session_id().to_string();
        let transient = |e: anyhow::Error| SpeechError::TransientEngine(format!("{:#}", e));

        let client = NatsClient::connect(&self.url, session_id.clone())
            .await
            .map_err(transient)?;
        let mut transcripts = client.subscribe_transcripts().await.map_err(transient)?;
        let mut statuses = client.subscribe_status().await.map_err(transient)?;

        client
            .publish_control(ControlAction::Start, self.settings)
            .await
            .map_err(transient)?;

        let task_sink = sink.clone();
        let task = tokio::spawn(async move {
            info!("STT listener started for session {}", session_id);
            let mut buffer = SegmentBuffer::default();

            loop {
                tokio::select! {
                    msg = transcripts.next() => {
                        let Some(msg) = msg else {
                            warn!("Transcript subscription closed");
                            task_sink.emit(EngineEvent::Error { reason: EngineErrorReason::Network });
                            break;
                        };
                        match serde_json::from_slice::<TranscriptMessage>(&msg.payload) {
                            Ok(transcript) => {
                                // Filter by session_id
                                if transcript.session_id != session_id {
                                    continue;
                                }
                                buffer.apply(&transcript);
                                if !task_sink.emit(EngineEvent::Result { segments: buffer.segments() }) {
                                    break;
                                }
                            }
                            Err(e) => warn!("Failed to parse transcript message: {}", e),
                        }
                    }
                    msg = statuses.next() => {
                        let Some(msg) = msg else {
                            warn!("Status subscription closed");
                            task_sink.emit(EngineEvent::Error { reason: EngineErrorReason::Network });
                            break;
                        };
                        match serde_json::from_slice::<SttStatusMessage>(&msg.payload) {
                            Ok(status) => {
                                if status.session_id != session_id {
                                    continue;
                                }
                                let event = status_event(&status);
                                let ended = event == EngineEvent::End;
                                if !task_sink.emit(event) || ended {
                                    break;
                                }
                            }
                            Err(e) => warn!("Failed to parse status message: {}", e),
                        }
                    }
                }
            }

            info!("STT listener stopped for session {}", session_id);
        });

        self.client = Some(client);
        self.sink = Some(sink);
        self.task = Some(task);

        Ok(())
    }

    async fn stop(&mut self) -> Result<(), SpeechError> {
        if let Some(client) = self.client.take() {
            if let Err(e) = client.publish_control(ControlAction::Stop, self.settings).await {
                error!("Failed to publish stop control: {}", e);
            }
            if let Err(e) = client.close().await {
                warn!("Failed to close NATS connection: {}", e);
            }
        }

        let was_running = match self.task.take() {
            Some(task) => {
                let finished = task.is_finished();
                task.abort();
                !finished
            }
            None => false,
        };

        // The listener no longer reports the service's end; report it here.
        if let Some(sink) = self.sink.take() {
            if was_running {
                sink.emit(EngineEvent::End);
            }
        }

        Ok(())
    }

    fn name(&self) -> &str {
        "nats"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn transcript(text: &str, partial: bool) -> TranscriptMessage {
        TranscriptMessage {
            session_id: "s".to_string(),
            text: text.to_string(),
            partial,
            timestamp: "2025-10-27T14:30:05Z".to_string(),
            confidence: None,
        }
    }

    #[test]
    fn partial_replaces_previous_partial() {
        let mut buffer = SegmentBuffer::default();
        buffer.apply(&transcript("jimmy I", true));
        buffer.apply(&transcript("jimmy I have", true));
        assert_eq!(buffer.segments(), vec![ResultSegment::interim("jimmy I have")]);

        buffer.apply(&transcript("jimmy I have a cough ", false));
        buffer.apply(&transcript("finish", true));
        assert_eq!(
            buffer.segments(),
            vec![
                ResultSegment::final_text("jimmy I have a cough "),
                ResultSegment::interim("finish"),
            ]
        );
    }

    #[test]
    fn status_error_without_reason_is_other() {
        let status = SttStatusMessage {
            session_id: "s".to_string(),
            state: SttState::Error,
            reason: None,
            timestamp: String::new(),
        };
        assert_eq!(
            status_event(&status),
            EngineEvent::Error {
                reason: EngineErrorReason::Other("unknown".to_string())
            }
        );
    }
}
