use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use mediguide::config::EngineKind;
use mediguide::engine::UnavailableCapability;
use mediguide::{
    create_router, AppState, AzureOpenAiClient, Config, Conversation, NatsCapability,
    ReplayCapability, ReplayScript, SpeechCapability, SpeechConfig, SpeechController, SpeechEvent,
    TriggerPolicy,
};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(name = "mediguide", version, about = "Voice-driven symptom assistant")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Run the HTTP API with continuous voice input
    Serve {
        /// Configuration file (extension optional)
        #[arg(short, long, default_value = "config/mediguide")]
        config: String,

        /// Start listening immediately
        #[arg(long)]
        listen: bool,
    },

    /// Replay a JSON-lines script of engine events and print what the
    /// pipeline produces
    Replay {
        script: PathBuf,

        #[arg(long, default_value = "jimmy")]
        start_marker: String,

        /// Close utterances on this word
        #[arg(long)]
        end_marker: Option<String>,

        /// Close utterances after this much silence (when no end marker)
        #[arg(long)]
        quiet_ms: Option<u64>,

        #[arg(long, default_value_t = 1000)]
        restart_backoff_ms: u64,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let cli = Cli::parse();

    match cli.command {
        Command::Serve { config, listen } => serve(&config, listen).await,
        Command::Replay {
            script,
            start_marker,
            end_marker,
            quiet_ms,
            restart_backoff_ms,
        } => {
            if start_marker.trim().is_empty() {
                bail!("--start-marker must not be empty");
            }
            let policy = TriggerPolicy {
                start_marker,
                end_marker,
                quiet_period: quiet_ms.map(Duration::from_millis),
                discard_dispatched_text: false,
            };
            let config = SpeechConfig {
                policy,
                restart_backoff: Duration::from_millis(restart_backoff_ms),
                ..SpeechConfig::default()
            };
            replay(script, config).await
        }
    }
}

async fn serve(path: &str, listen: bool) -> Result<()> {
    let cfg = Config::load(path)?;

    info!("MediGuide v{}", env!("CARGO_PKG_VERSION"));
    info!("Loaded config: {}", cfg.service.name);

    let capability: Arc<dyn SpeechCapability> = match cfg.speech.engine {
        EngineKind::Nats => {
            info!("Speech engine: STT service at {}", cfg.nats.url);
            Arc::new(NatsCapability::new(cfg.nats.url.clone()))
        }
        EngineKind::Unavailable => Arc::new(UnavailableCapability),
    };

    let (speech, events) = SpeechController::spawn(cfg.speech_config(), capability);

    let completion = Arc::new(AzureOpenAiClient::new(cfg.completion.clone())?);
    let conversation = Conversation::new(completion);
    if let Ok(key) = std::env::var("MEDIGUIDE_API_KEY") {
        conversation.set_credential(&key).await;
    }

    let state = AppState::new(speech, conversation);
    let pump = state.spawn_event_pump(events, cfg.speech.auto_send);

    if listen {
        state.speech.start_listening()?;
    }

    let addr = format!("{}:{}", cfg.service.http.bind, cfg.service.http.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;
    info!("HTTP server listening on {}", addr);

    axum::serve(listener, create_router(state.clone()))
        .with_graceful_shutdown(async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                warn!("Failed to listen for shutdown signal: {}", e);
            }
        })
        .await
        .context("HTTP server failed")?;

    info!("Shutting down");
    if let Err(e) = state.speech.close() {
        warn!("Speech controller already closed: {}", e);
    }
    pump.await.context("Speech event pump panicked")?;

    Ok(())
}

async fn replay(path: PathBuf, config: SpeechConfig) -> Result<()> {
    let script = ReplayScript::load(&path)?;
    info!(
        "Replaying {} engine session(s) from {}",
        script.engine_count(),
        path.display()
    );

    // Long enough for every scripted event, each restart and a final quiet period.
    let margin = config.restart_backoff * script.engine_count() as u32
        + config.policy.quiet_period.unwrap_or_default()
        + Duration::from_secs(1);
    let deadline = tokio::time::Instant::now() + script.duration() + margin;

    let (handle, mut events) = SpeechController::spawn(config, Arc::new(ReplayCapability::new(script)));
    handle.start_listening()?;

    loop {
        tokio::select! {
            event = events.recv() => {
                let Some(event) = event else { break };
                if !matches!(event, SpeechEvent::TranscriptChanged(_)) {
                    println!("{}", serde_json::to_string(&event)?);
                }
            }
            _ = tokio::time::sleep_until(deadline) => break,
        }
    }

    drop(events);
    handle.shutdown().await
}
