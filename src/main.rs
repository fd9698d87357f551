use anyhow::Result;
use clap::{Parser, Subcommand};
use medlingo::stream::{SessionSetupRequest, SetupClient, StreamingTransport};
use medlingo::{Config, ReconnectPolicy};
use std::time::Duration;
use tracing::{info, warn};

#[derive(Parser)]
#[command(name = "medlingo", about = "Real-time healthcare translation service")]
struct Cli {
    /// Config file (without extension)
    #[arg(long, default_value = "config/medlingo")]
    config: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run the session control API
    Serve,
    /// Diagnose connectivity to the collaborators with backoff retries
    Probe {
        /// List available input devices and exit
        #[arg(long)]
        list_devices: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    medlingo::telemetry::init();

    let cli = Cli::parse();
    let cfg = Config::load(&cli.config)?;

    match cli.command {
        Command::Serve => serve(cfg).await,
        Command::Probe { list_devices } => probe(cfg, list_devices).await,
    }
}

async fn serve(cfg: Config) -> Result<()> {
    info!("{} v{}", cfg.service.name, env!("CARGO_PKG_VERSION"));

    let addr = format!("{}:{}", cfg.service.http.bind, cfg.service.http.port);
    let state = medlingo::AppState::new(cfg);
    let router = medlingo::create_router(state);

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!("HTTP server listening on {}", addr);
    axum::serve(listener, router).await?;

    Ok(())
}

/// Diagnostic surface: exercises the session-setup endpoint and the signed
/// streaming URL with the shared backoff policy. The interactive session
/// never retries on its own; this probe is where backoff behavior lives.
async fn probe(cfg: Config, list_devices: bool) -> Result<()> {
    if list_devices {
        for name in medlingo::audio::list_input_devices()? {
            println!("{name}");
        }
        return Ok(());
    }

    let setup = SetupClient::new(cfg.endpoints.session_setup.clone());
    let policy = ReconnectPolicy::new(
        Duration::from_millis(cfg.reconnect.base_delay_ms),
        cfg.reconnect.max_attempts,
    );

    let request = SessionSetupRequest {
        source_language: "en".to_string(),
        target_language: "es".to_string(),
        user_id: "probe".to_string(),
        sample_rate: cfg.audio.sample_rate,
    };

    let mut attempt = 0;
    loop {
        match try_connect(&setup, &request).await {
            Ok(session_id) => {
                info!(attempt, %session_id, "streaming endpoint reachable");
                println!("OK: connected after {} retries", attempt);
                return Ok(());
            }
            Err(e) => {
                warn!(attempt, error = %e, "probe attempt failed");
                match policy.delay_for(attempt) {
                    Some(delay) => {
                        info!("retrying in {:?}", delay);
                        tokio::time::sleep(delay).await;
                        attempt += 1;
                    }
                    None => {
                        anyhow::bail!(
                            "streaming endpoint unreachable after {} attempts: {}",
                            policy.max_attempts,
                            e
                        );
                    }
                }
            }
        }
    }
}

async fn try_connect(setup: &SetupClient, request: &SessionSetupRequest) -> Result<String> {
    let response = setup.request_session(request).await?;
    let transport = StreamingTransport::connect(&response.signed_url).await?;
    drop(transport);
    Ok(response.session_id)
}
