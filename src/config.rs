use anyhow::Result;
use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub service: ServiceConfig,
    pub endpoints: EndpointsConfig,
    pub audio: AudioConfig,
    pub vad: VadConfig,
    pub pipeline: PipelineConfig,
    pub reconnect: ReconnectConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServiceConfig {
    pub name: String,
    pub http: HttpConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct HttpConfig {
    pub bind: String,
    pub port: u16,
}

/// Base URLs of the external collaborators.
#[derive(Debug, Clone, Deserialize)]
pub struct EndpointsConfig {
    pub session_setup: String,
    pub translate: String,
    pub enhance: String,
    pub synthesize: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AudioConfig {
    /// Target sample rate for the streaming service (16kHz)
    pub sample_rate: u32,
    pub channels: u16,
    /// Capture block duration in milliseconds
    pub frame_ms: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct VadConfig {
    /// RMS energy above which a frame counts as speech
    pub energy_threshold: f32,
    /// Consecutive speech frames required before speech is asserted
    pub min_speech_frames: u32,
    /// Trailing silence frames still transmitted after speech ends
    pub max_silence_pad_frames: u32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PipelineConfig {
    /// Per-stage timeout for translate/enhance/synthesize calls
    pub stage_timeout_secs: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ReconnectConfig {
    pub base_delay_ms: u64,
    pub max_attempts: u32,
}

impl Config {
    pub fn load(path: &str) -> Result<Self> {
        let settings = config::Config::builder()
            .add_source(config::File::with_name(path))
            .build()?;

        Ok(settings.try_deserialize()?)
    }
}
