use super::backend::{AudioBackend, AudioBackendConfig, AudioFrame};
use crate::error::{SessionError, SessionResult};
use hound::{SampleFormat, WavReader};
use std::path::{Path, PathBuf};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::info;

/// A decoded WAV file, downmixed to mono f32.
pub struct AudioFile {
    pub path: String,
    pub duration_seconds: f64,
    pub sample_rate: u32,
    pub samples: Vec<f32>,
}

impl AudioFile {
    pub fn open(path: impl AsRef<Path>) -> SessionResult<Self> {
        let path = path.as_ref();
        info!("Opening audio file: {}", path.display());

        let reader = WavReader::open(path)
            .map_err(|e| SessionError::AudioProcessing(format!("failed to open WAV file: {e}")))?;
        let spec = reader.spec();

        let interleaved: Vec<f32> = match spec.sample_format {
            SampleFormat::Int => reader
                .into_samples::<i16>()
                .map(|s| s.map(|v| v as f32 / 32_768.0))
                .collect::<Result<Vec<_>, _>>(),
            SampleFormat::Float => reader
                .into_samples::<f32>()
                .collect::<Result<Vec<_>, _>>(),
        }
        .map_err(|e| SessionError::AudioProcessing(format!("failed to read samples: {e}")))?;

        let channels = usize::from(spec.channels.max(1));
        let samples: Vec<f32> = if channels == 1 {
            interleaved
        } else {
            interleaved
                .chunks(channels)
                .map(|frame| frame.iter().sum::<f32>() / frame.len() as f32)
                .collect()
        };

        let duration_seconds = samples.len() as f64 / spec.sample_rate as f64;

        info!(
            "Audio file loaded: {:.1}s, {}Hz, {} channels, {} samples",
            duration_seconds,
            spec.sample_rate,
            spec.channels,
            samples.len()
        );

        Ok(Self {
            path: path.display().to_string(),
            duration_seconds,
            sample_rate: spec.sample_rate,
            samples,
        })
    }
}

/// WAV-file-driven audio backend for tests, demos, and offline runs.
///
/// Emits frames of `frame_duration_ms` at the file's native rate. With
/// pacing enabled the frames arrive on a real-time cadence; without it the
/// file drains as fast as the consumer accepts frames.
pub struct FileBackend {
    path: PathBuf,
    config: AudioBackendConfig,
    paced: bool,
    task: Option<JoinHandle<()>>,
    capturing: bool,
}

impl FileBackend {
    pub fn new(path: PathBuf, config: AudioBackendConfig) -> Self {
        Self {
            path,
            config,
            paced: false,
            task: None,
            capturing: false,
        }
    }

    /// Emit frames on a real-time cadence instead of draining immediately.
    pub fn with_pacing(mut self) -> Self {
        self.paced = true;
        self
    }
}

#[async_trait::async_trait]
impl AudioBackend for FileBackend {
    async fn start(&mut self) -> SessionResult<mpsc::Receiver<AudioFrame>> {
        let audio = AudioFile::open(&self.path)?;
        let frame_ms = self.config.frame_duration_ms.max(1);
        let frame_len =
            (u64::from(audio.sample_rate) * frame_ms / 1000).max(1) as usize;
        let paced = self.paced;

        let (tx, rx) = mpsc::channel(64);
        let task = tokio::spawn(async move {
            let mut timestamp_ms = 0u64;
            for block in audio.samples.chunks(frame_len) {
                let frame = AudioFrame {
                    samples: block.to_vec(),
                    sample_rate: audio.sample_rate,
                    timestamp_ms,
                };
                timestamp_ms += block.len() as u64 * 1000 / u64::from(audio.sample_rate);
                if tx.send(frame).await.is_err() {
                    break;
                }
                if paced {
                    tokio::time::sleep(std::time::Duration::from_millis(frame_ms)).await;
                }
            }
            // Channel closes on drop; the consumer sees end-of-stream.
        });

        self.task = Some(task);
        self.capturing = true;
        Ok(rx)
    }

    async fn stop(&mut self) -> SessionResult<()> {
        if let Some(task) = self.task.take() {
            task.abort();
        }
        self.capturing = false;
        Ok(())
    }

    fn is_capturing(&self) -> bool {
        self.capturing
    }

    fn name(&self) -> &str {
        "file"
    }
}
