use anyhow::{Context, Result};
use async_nats::Client;
use tracing::info;

use super::messages::{ControlAction, SessionControlMessage};
use crate::engine::EngineSettings;

pub const TRANSCRIPT_SUBJECT: &str = "stt.text.>";
pub const STATUS_SUBJECT: &str = "stt.status.>";

pub struct NatsClient {
    client: Client,
    session_id: String,
}

impl NatsClient {
    /// Connect to NATS server
    pub async fn connect(url: &str, session_id: String) -> Result<Self> {
        info!("Connecting to NATS at {}", url);

        let client = async_nats::connect(url)
            .await
            .context("Failed to connect to NATS")?;

        info!("Connected to NATS successfully");

        Ok(Self { client, session_id })
    }

    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    /// Ask the STT service to start or stop recognizing for this session
    pub async fn publish_control(&self, action: ControlAction, settings: EngineSettings) -> Result<()> {
        let subject = match action {
            ControlAction::Start => "stt.session.start",
            ControlAction::Stop => "stt.session.stop",
        };

        let message = SessionControlMessage {
            session_id: self.session_id.clone(),
            action,
            continuous: settings.continuous,
            interim_results: settings.interim_results,
            timestamp: chrono::Utc::now().to_rfc3339(),
        };

        let payload = serde_json::to_vec(&message)?;

        self.client
            .publish(subject.to_string(), payload.into())
            .await
            .context("Failed to publish session control")?;

        info!("Published {:?} for session {} to {}", action, self.session_id, subject);

        Ok(())
    }

    /// Subscribe to transcript messages
    pub async fn subscribe_transcripts(&self) -> Result<async_nats::Subscriber> {
        // The STT service publishes to stt.text.partial and stt.text.final;
        // we filter by session_id in the message payload
        self.subscribe(TRANSCRIPT_SUBJECT).await
    }

    /// Subscribe to STT lifecycle messages
    pub async fn subscribe_status(&self) -> Result<async_nats::Subscriber> {
        self.subscribe(STATUS_SUBJECT).await
    }

    async fn subscribe(&self, subject: &'static str) -> Result<async_nats::Subscriber> {
        info!("Subscribing to {}", subject);

        let subscriber = self
            .client
            .subscribe(subject.to_string())
            .await
            .with_context(|| format!("Failed to subscribe to {}", subject))?;

        Ok(subscriber)
    }

    /// Close NATS connection
    pub async fn close(self) -> Result<()> {
        info!("Closing NATS connection");
        self.client.flush().await.context("Failed to flush NATS")?;
        Ok(())
    }
}
