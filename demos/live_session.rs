// Live microphone translation session.
//
// Requires the collaborator endpoints from the config file to be reachable.
//
// Usage: cargo run --example live_session -- --source en --target es

use anyhow::Result;
use clap::Parser;
use medlingo::audio::{AudioBackendConfig, AudioBackendFactory, AudioSource};
use medlingo::stream::{SessionConfig, SetupClient, TranslationSession};
use medlingo::{Config, HttpLanguageServices};
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

#[derive(Parser)]
struct Args {
    /// Config file (without extension)
    #[arg(long, default_value = "config/medlingo")]
    config: String,

    #[arg(long, default_value = "en")]
    source: String,

    #[arg(long, default_value = "es")]
    target: String,

    /// Input device name (default device if omitted)
    #[arg(long)]
    device: Option<String>,
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
    let session_id = session_config.session_id.clone();

    let services = Arc::new(HttpLanguageServices::new(cfg.endpoints.clone()));
    let setup = SetupClient::new(cfg.endpoints.session_setup.clone());
    let session = TranslationSession::new(session_config, services, setup);

    let backend = AudioBackendFactory::create(
        AudioSource::Microphone,
        AudioBackendConfig {
            target_sample_rate: cfg.audio.sample_rate,
            frame_duration_ms: cfg.audio.frame_ms,
            preferred_device: args.device,
        },
    )?;

    info!("starting session {session_id}; speak into the microphone, Ctrl-C to stop");
    session.start(backend).await?;

    let mut shown = 0usize;
    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => break,
            _ = tokio::time::sleep(Duration::from_millis(500)) => {
                let log = session.get_transcript().await;
                if !log.partial_text.is_empty() {
                    print!("\r… {}", log.partial_text);
                    use std::io::Write;
                    std::io::stdout().flush().ok();
                }
                while shown < log.final_transcripts.len() {
                    println!("\n> {}", log.final_transcripts[shown]);
                    if let Some(Some(translation)) = log.translations.get(shown) {
                        println!("  {translation}");
                    }
                    shown += 1;
                }
            }
        }
    }

    let stats = session.stop().await?;
    println!(
        "\nsession ended: {} utterances, {} translations, {:.1}s",
        stats.utterances, stats.translations_completed, stats.duration_secs
    );

    Ok(())
}
