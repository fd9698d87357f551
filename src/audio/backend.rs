use crate::error::{SessionError, SessionResult};
use std::path::PathBuf;
use tokio::sync::mpsc;

/// One block of float samples as produced by the capture device.
///
/// Samples are mono and carry the device's native rate; the resampler
/// converts them to the streaming target rate downstream.
#[derive(Debug, Clone)]
pub struct AudioFrame {
    /// Raw audio samples (f32, mono)
    pub samples: Vec<f32>,
    /// Sample rate in Hz (device-dependent, not necessarily the target rate)
    pub sample_rate: u32,
    /// Timestamp in milliseconds since capture started
    pub timestamp_ms: u64,
}

/// Configuration for audio backends
#[derive(Debug, Clone)]
pub struct AudioBackendConfig {
    /// Target sample rate the pipeline resamples to
    pub target_sample_rate: u32,
    /// Capture block duration in milliseconds (affects latency)
    pub frame_duration_ms: u64,
    /// Preferred input device name (None = system default)
    pub preferred_device: Option<String>,
}

impl Default for AudioBackendConfig {
    fn default() -> Self {
        Self {
            target_sample_rate: 16000, // streaming transcription expects 16kHz
            frame_duration_ms: 100,    // 100ms blocks
            preferred_device: None,
        }
    }
}

/// Audio capture backend trait
///
/// Implementations:
/// - Microphone: cpal input stream (all platforms)
/// - File: read from a WAV file (testing/batch processing)
#[async_trait::async_trait]
pub trait AudioBackend: Send + Sync {
    /// Start capturing audio
    ///
    /// Returns a channel receiver that will receive audio frames.
    async fn start(&mut self) -> SessionResult<mpsc::Receiver<AudioFrame>>;

    /// Stop capturing audio and release the device. Idempotent.
    async fn stop(&mut self) -> SessionResult<()>;

    /// Check if backend is currently capturing
    fn is_capturing(&self) -> bool;

    /// Get backend name for logging
    fn name(&self) -> &str;
}

/// Audio source type
#[derive(Debug, Clone)]
pub enum AudioSource {
    /// Microphone input
    Microphone,
    /// File input (for testing/batch processing)
    File(PathBuf),
}

/// Audio backend factory
pub struct AudioBackendFactory;

impl AudioBackendFactory {
    pub fn create(
        source: AudioSource,
        config: AudioBackendConfig,
    ) -> SessionResult<Box<dyn AudioBackend>> {
        match source {
            AudioSource::Microphone => {
                let backend = super::capture::MicrophoneBackend::new(config);
                Ok(Box::new(backend))
            }
            AudioSource::File(path) => {
                if !path.exists() {
                    return Err(SessionError::DeviceNotFound(format!(
                        "audio file {} does not exist",
                        path.display()
                    )));
                }
                Ok(Box::new(super::file::FileBackend::new(path, config)))
            }
        }
    }
}
