use anyhow::{bail, Context, Result};
use serde::Deserialize;
use std::time::Duration;

use crate::completion::CompletionSettings;
use crate::speech::{SpeechConfig, TriggerPolicy};

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub service: ServiceConfig,
    pub speech: SpeechSettings,
    pub nats: NatsConfig,
    pub completion: CompletionSettings,
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct ServiceConfig {
    pub name: String,
    pub http: HttpConfig,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            name: "mediguide".to_string(),
            http: HttpConfig::default(),
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct HttpConfig {
    pub bind: String,
    pub port: u16,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            bind: "127.0.0.1".to_string(),
            port: 8080,
        }
    }
}

/// Which speech capability backs the controller
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EngineKind {
    /// External STT service over NATS
    Nats,
    /// No speech recognition on this host
    Unavailable,
}

/// How captured utterances are completed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CompletionKind {
    MarkerPair,
    Debounce,
    TriggerOnly,
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct SpeechSettings {
    pub engine: EngineKind,
    pub completion: CompletionKind,
    pub start_marker: String,
    pub end_marker: String,
    pub quiet_period_ms: u64,
    pub restart_backoff_ms: u64,
    pub discard_dispatched_text: bool,
    /// Send finished utterances to the completion service automatically
    pub auto_send: bool,
}

impl Default for SpeechSettings {
    fn default() -> Self {
        Self {
            engine: EngineKind::Nats,
            completion: CompletionKind::MarkerPair,
            start_marker: "jimmy".to_string(),
            end_marker: "finish".to_string(),
            quiet_period_ms: 10_000,
            restart_backoff_ms: 1_000,
            discard_dispatched_text: false,
            auto_send: true,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct NatsConfig {
    pub url: String,
}

impl Default for NatsConfig {
    fn default() -> Self {
        Self {
            url: "nats://localhost:4222".to_string(),
        }
    }
}

impl Config {
    /// Load `path` (any format the `config` crate detects, optional) with
    /// `MEDIGUIDE__SECTION__KEY` environment overrides
    pub fn load(path: &str) -> Result<Self> {
        let settings = config::Config::builder()
            .add_source(config::File::with_name(path).required(false))
            .add_source(config::Environment::with_prefix("MEDIGUIDE").separator("__"))
            .build()?;

        let cfg: Self = settings
            .try_deserialize()
            .with_context(|| format!("Invalid configuration in {}", path))?;
        cfg.validate()?;

        Ok(cfg)
    }

    pub fn validate(&self) -> Result<()> {
        let speech = &self.speech;

        if speech.start_marker.trim().is_empty() {
            bail!("speech.start_marker must not be empty");
        }
        if speech.completion == CompletionKind::MarkerPair && speech.end_marker.trim().is_empty() {
            bail!("speech.end_marker must not be empty for marker_pair completion");
        }
        if speech.completion == CompletionKind::Debounce && speech.quiet_period_ms == 0 {
            bail!("speech.quiet_period_ms must be greater than zero");
        }
        if speech.restart_backoff_ms == 0 {
            bail!("speech.restart_backoff_ms must be greater than zero");
        }
        if self.completion.timeout_secs == 0 {
            bail!("completion.timeout_secs must be greater than zero");
        }

        Ok(())
    }

    pub fn trigger_policy(&self) -> TriggerPolicy {
        let speech = &self.speech;
        let start_marker = speech.start_marker.trim();

        let mut policy = match speech.completion {
            CompletionKind::MarkerPair => TriggerPolicy::marker_pair(start_marker, speech.end_marker.trim()),
            CompletionKind::Debounce => {
                TriggerPolicy::debounce(start_marker, Duration::from_millis(speech.quiet_period_ms))
            }
            CompletionKind::TriggerOnly => TriggerPolicy::trigger_only(start_marker),
        };
        policy.discard_dispatched_text = speech.discard_dispatched_text;
        policy
    }

    pub fn speech_config(&self) -> SpeechConfig {
        SpeechConfig {
            policy: self.trigger_policy(),
            restart_backoff: Duration::from_millis(self.speech.restart_backoff_ms),
            ..SpeechConfig::default()
        }
    }
}
