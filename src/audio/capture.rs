//! Microphone capture backend built on cpal.
//!
//! cpal streams are not `Send`, so the stream lives on a dedicated capture
//! thread. The device callback normalizes every supported sample format to
//! f32, downmixes to mono, and hands fixed-size blocks to an async channel
//! without ever blocking; the consumer side runs on the tokio runtime.

use super::backend::{AudioBackend, AudioBackendConfig, AudioFrame};
use crate::error::{SessionError, SessionResult};
use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{SampleFormat, StreamConfig};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

/// List input device names so callers can expose a device selector.
pub fn list_input_devices() -> SessionResult<Vec<String>> {
    let host = cpal::default_host();
    let devices = host
        .input_devices()
        .map_err(|e| SessionError::DeviceNotFound(e.to_string()))?;
    let mut names = Vec::new();
    for device in devices {
        if let Ok(name) = device.name() {
            names.push(name);
        }
    }
    Ok(names)
}

pub struct MicrophoneBackend {
    config: AudioBackendConfig,
    shutdown: Arc<AtomicBool>,
    worker: Option<thread::JoinHandle<()>>,
    capturing: bool,
}

impl MicrophoneBackend {
    pub fn new(config: AudioBackendConfig) -> Self {
        Self {
            config,
            shutdown: Arc::new(AtomicBool::new(false)),
            worker: None,
            capturing: false,
        }
    }
}

#[async_trait::async_trait]
impl AudioBackend for MicrophoneBackend {
    async fn start(&mut self) -> SessionResult<mpsc::Receiver<AudioFrame>> {
        if self.capturing {
            return Err(SessionError::AudioProcessing(
                "microphone capture already started".to_string(),
            ));
        }

        let (frame_tx, frame_rx) = mpsc::channel(64);
        let (ready_tx, ready_rx) = std::sync::mpsc::channel::<SessionResult<()>>();

        // Fresh flag per start so a previous stop doesn't trip the new worker.
        self.shutdown = Arc::new(AtomicBool::new(false));
        let shutdown = Arc::clone(&self.shutdown);
        let config = self.config.clone();

        let worker = thread::Builder::new()
            .name("mic-capture".to_string())
            .spawn(move || run_capture(config, frame_tx, shutdown, ready_tx))
            .map_err(|e| SessionError::AudioProcessing(e.to_string()))?;
        self.worker = Some(worker);

        // The worker reports exactly once whether the device opened.
        let readiness = tokio::task::spawn_blocking(move || ready_rx.recv())
            .await
            .map_err(|e| SessionError::AudioProcessing(e.to_string()))?;

        match readiness {
            Ok(Ok(())) => {
                self.capturing = true;
                Ok(frame_rx)
            }
            Ok(Err(e)) => {
                if let Some(worker) = self.worker.take() {
                    let _ = worker.join();
                }
                Err(e)
            }
            Err(_) => Err(SessionError::AudioProcessing(
                "capture thread exited before reporting readiness".to_string(),
            )),
        }
    }

    async fn stop(&mut self) -> SessionResult<()> {
        self.shutdown.store(true, Ordering::SeqCst);
        if let Some(worker) = self.worker.take() {
            let _ = tokio::task::spawn_blocking(move || worker.join()).await;
        }
        self.capturing = false;
        Ok(())
    }

    fn is_capturing(&self) -> bool {
        self.capturing
    }

    fn name(&self) -> &str {
        "microphone"
    }
}

/// Accumulates downmixed samples into fixed-size frames inside the device
/// callback. Frames are handed off with `try_send`; the callback runs on the
/// audio cadence and must never block on the channel.
struct FrameChunker {
    buffer: Vec<f32>,
    frame_len: usize,
    channels: usize,
    sample_rate: u32,
    emitted_samples: u64,
    dropped_frames: u64,
    tx: mpsc::Sender<AudioFrame>,
    shutdown: Arc<AtomicBool>,
}

impl FrameChunker {
    fn push<T: Copy>(&mut self, data: &[T], convert: impl Fn(T) -> f32) {
        for chunk in data.chunks(self.channels.max(1)) {
            let mut acc = 0.0f32;
            for &sample in chunk {
                acc += convert(sample);
            }
            self.buffer.push(acc / chunk.len() as f32);
        }

        while self.buffer.len() >= self.frame_len {
            let rest = self.buffer.split_off(self.frame_len);
            let samples = std::mem::replace(&mut self.buffer, rest);
            let timestamp_ms = self.emitted_samples * 1000 / u64::from(self.sample_rate.max(1));
            self.emitted_samples += samples.len() as u64;

            let frame = AudioFrame {
                samples,
                sample_rate: self.sample_rate,
                timestamp_ms,
            };
            match self.tx.try_send(frame) {
                Ok(()) => {}
                Err(mpsc::error::TrySendError::Full(_)) => {
                    self.dropped_frames += 1;
                    if self.dropped_frames % 100 == 1 {
                        warn!(dropped = self.dropped_frames, "audio frames dropped: consumer behind");
                    }
                }
                Err(mpsc::error::TrySendError::Closed(_)) => {
                    // Receiver gone; tell the capture thread to wind down.
                    self.shutdown.store(true, Ordering::SeqCst);
                    return;
                }
            }
        }
    }
}

fn run_capture(
    config: AudioBackendConfig,
    frame_tx: mpsc::Sender<AudioFrame>,
    shutdown: Arc<AtomicBool>,
    ready_tx: std::sync::mpsc::Sender<SessionResult<()>>,
) {
    match open_stream(&config, frame_tx, Arc::clone(&shutdown)) {
        Ok(stream) => {
            if let Err(e) = stream.play() {
                let _ = ready_tx.send(Err(SessionError::DeviceUnsupported(e.to_string())));
                return;
            }
            let _ = ready_tx.send(Ok(()));
            while !shutdown.load(Ordering::SeqCst) {
                thread::sleep(Duration::from_millis(50));
            }
            drop(stream);
            debug!("capture thread released audio device");
        }
        Err(e) => {
            let _ = ready_tx.send(Err(e));
        }
    }
}

fn open_stream(
    config: &AudioBackendConfig,
    frame_tx: mpsc::Sender<AudioFrame>,
    shutdown: Arc<AtomicBool>,
) -> SessionResult<cpal::Stream> {
    let host = cpal::default_host();
    let device = match &config.preferred_device {
        Some(name) => {
            let mut devices = host
                .input_devices()
                .map_err(|e| SessionError::DeviceNotFound(e.to_string()))?;
            devices
                .find(|d| d.name().map(|n| &n == name).unwrap_or(false))
                .ok_or_else(|| {
                    SessionError::DeviceNotFound(format!("input device '{name}' not found"))
                })?
        }
        None => host.default_input_device().ok_or_else(|| {
            SessionError::DeviceNotFound("no default input device available".to_string())
        })?,
    };

    let device_name = device.name().unwrap_or_else(|_| "unknown".to_string());

    // The device decides the actual rate and channel count; mono and the
    // target rate are produced on our side of the callback.
    let default_config = device
        .default_input_config()
        .map_err(classify_config_error)?;
    let format = default_config.sample_format();
    let stream_config: StreamConfig = default_config.into();
    let device_rate = stream_config.sample_rate.0;
    let channels = usize::from(stream_config.channels.max(1));

    info!(
        device = %device_name,
        rate = device_rate,
        channels,
        ?format,
        "opening input stream"
    );

    let frame_len = (u64::from(device_rate) * config.frame_duration_ms / 1000).max(1) as usize;
    let mut chunker = FrameChunker {
        buffer: Vec::with_capacity(frame_len * 2),
        frame_len,
        channels,
        sample_rate: device_rate,
        emitted_samples: 0,
        dropped_frames: 0,
        tx: frame_tx,
        shutdown,
    };

    let err_fn = |err| warn!("audio stream error: {err}");

    let stream = match format {
        SampleFormat::F32 => device
            .build_input_stream(
                &stream_config,
                move |data: &[f32], _| chunker.push(data, |s| s),
                err_fn,
                None,
            )
            .map_err(classify_build_error)?,
        SampleFormat::I16 => device
            .build_input_stream(
                &stream_config,
                move |data: &[i16], _| chunker.push(data, |s| s as f32 / 32_768.0),
                err_fn,
                None,
            )
            .map_err(classify_build_error)?,
        SampleFormat::U16 => device
            .build_input_stream(
                &stream_config,
                move |data: &[u16], _| {
                    chunker.push(data, |s| (s as f32 - 32_768.0) / 32_768.0)
                },
                err_fn,
                None,
            )
            .map_err(classify_build_error)?,
        other => {
            return Err(SessionError::DeviceUnsupported(format!(
                "unsupported sample format: {other:?}"
            )))
        }
    };

    Ok(stream)
}

fn classify_config_error(err: cpal::DefaultStreamConfigError) -> SessionError {
    match err {
        cpal::DefaultStreamConfigError::DeviceNotAvailable => {
            SessionError::DeviceNotFound("input device is no longer available".to_string())
        }
        cpal::DefaultStreamConfigError::StreamTypeNotSupported => {
            SessionError::DeviceUnsupported("device has no supported input config".to_string())
        }
        // Platforms report a denied microphone through the backend error.
        cpal::DefaultStreamConfigError::BackendSpecific { err } => {
            SessionError::PermissionDenied(err.to_string())
        }
        #[allow(unreachable_patterns)]
        other => SessionError::DeviceUnsupported(other.to_string()),
    }
}

fn classify_build_error(err: cpal::BuildStreamError) -> SessionError {
    match err {
        cpal::BuildStreamError::DeviceNotAvailable => {
            SessionError::DeviceNotFound("input device is no longer available".to_string())
        }
        cpal::BuildStreamError::StreamConfigNotSupported => {
            SessionError::DeviceUnsupported("device rejected the requested config".to_string())
        }
        cpal::BuildStreamError::BackendSpecific { err } => {
            SessionError::PermissionDenied(err.to_string())
        }
        other => SessionError::DeviceUnsupported(other.to_string()),
    }
}
