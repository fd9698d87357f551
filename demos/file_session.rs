// Translate a WAV file through the streaming pipeline.
//
// Drives the same session machinery as the live demo, with audio coming
// from a file instead of the microphone.
//
// Usage: cargo run --example file_session -- recording.wav

use anyhow::Result;
use clap::Parser;
use medlingo::audio::{AudioBackendConfig, FileBackend};
use medlingo::stream::{SessionConfig, SetupClient, TranslationSession};
use medlingo::{Config, HttpLanguageServices, SessionStatus};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

#[derive(Parser)]
struct Args {
    /// WAV file to stream
    wav: PathBuf,

    /// Config file (without extension)
    #[arg(long, default_value = "config/medlingo")]
    config: String,

    #[arg(long, default_value = "en")]
    source: String,

    #[arg(long, default_value = "es")]
    target: String,
}

#[tokio::main]
async fn main() -> Result<()> {
    medlingo::telemetry::init();
    let args = Args::parse();
    let cfg = Config::load(&args.config)?;

    let session_config = SessionConfig {
        source_language: args.source,
        target_language: args.target,
        sample_rate: cfg.audio.sample_rate,
        ..Default::default()
    };

    let services = Arc::new(HttpLanguageServices::new(cfg.endpoints.clone()));
    let setup = SetupClient::new(cfg.endpoints.session_setup.clone());
    let session = TranslationSession::new(session_config, services, setup);

    let backend = Box::new(
        FileBackend::new(
            args.wav.clone(),
            AudioBackendConfig {
                target_sample_rate: cfg.audio.sample_rate,
                frame_duration_ms: cfg.audio.frame_ms,
                preferred_device: None,
            },
        )
        .with_pacing(),
    );

    info!("streaming {} through the translation pipeline", args.wav.display());
    session.start(backend).await?;

    // The session stops itself once the file drains and the service closes.
    while session.status() == SessionStatus::Recording {
        tokio::time::sleep(Duration::from_millis(200)).await;
    }

    let stats = session.stop().await?;
    let log = session.get_transcript().await;

    for (i, text) in log.final_transcripts.iter().enumerate() {
        println!("> {text}");
        if let Some(Some(translation)) = log.translations.get(i) {
            println!("  {translation}");
        }
        if let Some(Some(audio)) = log.audio_references.get(i) {
            println!("  audio: {audio}");
        }
    }
    println!(
        "done: {} utterances, {} translations",
        stats.utterances, stats.translations_completed
    );

    Ok(())
}
