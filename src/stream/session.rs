use super::setup::{SessionSetupRequest, SetupClient};
use super::transport::{StreamingTransport, TransportEvent, TransportSink, TransportStream};
use crate::audio::{
    encode_pcm16_le, resample_linear, AudioBackend, AudioFrame, GateConfig, VoiceGate,
};
use crate::error::{SessionError, SessionResult};
use crate::pipeline::{spawn_utterance, AudioPlayer, LanguageServices, PipelineContext};
use crate::wire::headers::{
    EVENT_TYPE_TRANSCRIPT, HEADER_EVENT_TYPE, HEADER_EXCEPTION_TYPE, HEADER_MESSAGE_TYPE,
    MESSAGE_TYPE_EVENT, MESSAGE_TYPE_EXCEPTION,
};
use crate::wire::{parse_transcript_body, TranscriptResult, WireFrame};
use chrono::Utc;
use serde::Serialize;
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicU8, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, Mutex};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

/// Session lifecycle. Any state may transition to `Error` on unrecoverable
/// failure; connection loss is terminal and requires an explicit restart.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionStatus {
    Idle,
    Connecting,
    Recording,
    Stopped,
    Error,
}

/// Configuration for a translation session
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// Unique session identifier
    pub session_id: String,
    /// Identifier forwarded to the session-setup collaborator
    pub user_id: String,
    pub source_language: String,
    pub target_language: String,
    /// Sample rate the streaming service expects (16kHz)
    pub sample_rate: u32,
    pub gate: GateConfig,
    /// Bound on each translate/enhance/synthesize call
    pub stage_timeout: Duration,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            session_id: format!("session-{}", uuid::Uuid::new_v4()),
            user_id: "anonymous".to_string(),
            source_language: "en".to_string(),
            target_language: "es".to_string(),
            sample_rate: 16000, // streaming transcription expects 16kHz
            gate: GateConfig::default(),
            stage_timeout: Duration::from_secs(30),
        }
    }
}

/// The ordered transcript state of one session.
///
/// `translations[i]` and `audio_references[i]` always derive from
/// `final_transcripts[i]`; slots are reserved when a transcript is
/// finalized and filled when its pipeline completes, so pipelines that
/// finish out of order cannot cross-assign.
#[derive(Debug, Clone, Default, Serialize)]
pub struct TranscriptLog {
    /// In-progress transcription; overwritten by each partial result
    pub partial_text: String,
    pub final_transcripts: Vec<String>,
    pub translations: Vec<Option<String>>,
    pub audio_references: Vec<Option<String>>,
}

/// Statistics about a translation session
#[derive(Debug, Clone, Serialize)]
pub struct SessionStats {
    pub status: SessionStatus,
    pub started_at: chrono::DateTime<chrono::Utc>,
    pub duration_secs: f64,
    pub frames_sent: usize,
    pub utterances: usize,
    pub translations_completed: usize,
}

/// Lock-free status shared between the session handle and its tasks.
#[derive(Clone)]
struct StatusCell(Arc<AtomicU8>);

impl StatusCell {
    fn new(status: SessionStatus) -> Self {
        Self(Arc::new(AtomicU8::new(status as u8)))
    }

    fn get(&self) -> SessionStatus {
        match self.0.load(Ordering::SeqCst) {
            0 => SessionStatus::Idle,
            1 => SessionStatus::Connecting,
            2 => SessionStatus::Recording,
            3 => SessionStatus::Stopped,
            _ => SessionStatus::Error,
        }
    }

    fn set(&self, status: SessionStatus) {
        self.0.store(status as u8, Ordering::SeqCst);
    }
}

/// Routes decoded transport frames into session state and pipeline work.
#[derive(Clone)]
struct TranscriptRouter {
    session_id: String,
    log: Arc<Mutex<TranscriptLog>>,
    active: Arc<AtomicBool>,
    status: StatusCell,
    pipeline: PipelineContext,
}

impl TranscriptRouter {
    async fn handle_frame(&self, bytes: &[u8]) {
        let frame = match WireFrame::decode(bytes) {
            Ok(frame) => frame,
            Err(e) => {
                // Malformed frames are non-fatal; streaming continues.
                warn!(bytes = bytes.len(), error = %e, "dropping undecodable frame");
                return;
            }
        };

        match frame.header(HEADER_MESSAGE_TYPE) {
            Some(MESSAGE_TYPE_EVENT) => match frame.header(HEADER_EVENT_TYPE) {
                Some(EVENT_TYPE_TRANSCRIPT) => match parse_transcript_body(&frame.body) {
                    Ok(results) => self.handle_results(results).await,
                    Err(e) => {
                        warn!(bytes = frame.body.len(), error = %e, "dropping malformed transcript payload");
                    }
                },
                other => {
                    debug!(event_type = ?other, "ignoring unhandled event type");
                }
            },
            Some(MESSAGE_TYPE_EXCEPTION) => {
                let code = frame
                    .header(HEADER_EXCEPTION_TYPE)
                    .unwrap_or("unknown")
                    .to_string();
                let message = String::from_utf8_lossy(&frame.body).to_string();
                let exception = SessionError::ServiceException { code, message };
                error!(session_id = %self.session_id, error = %exception, "streaming service exception");
                self.status.set(SessionStatus::Error);
                self.active.store(false, Ordering::SeqCst);
            }
            other => {
                warn!(message_type = ?other, "dropping frame with unknown message type");
            }
        }
    }

    async fn handle_results(&self, results: Vec<TranscriptResult>) {
        for result in results {
            if result.is_partial {
                // Partials supersede each other; never accumulated.
                let mut log = self.log.lock().await;
                log.partial_text = result.text;
                continue;
            }

            let text = result.text.trim().to_string();
            if text.is_empty() {
                continue;
            }

            let index = {
                let mut log = self.log.lock().await;
                log.partial_text.clear();
                let index = log.final_transcripts.len();
                log.final_transcripts.push(text.clone());
                log.translations.push(None);
                log.audio_references.push(None);
                index
            };

            info!(session_id = %self.session_id, index, "final transcript");
            // Fire-and-forget: receipt of further events must not block on
            // this utterance's pipeline.
            let _ = spawn_utterance(&self.pipeline, index, text);
        }
    }
}

/// A translation session that manages audio capture, the streaming
/// transport, transcript routing, and the downstream pipeline.
pub struct TranslationSession {
    config: SessionConfig,
    setup: SetupClient,
    started_at: chrono::DateTime<chrono::Utc>,
    active: Arc<AtomicBool>,
    status: StatusCell,
    log: Arc<Mutex<TranscriptLog>>,
    epoch: Arc<AtomicU64>,
    frames_sent: Arc<AtomicUsize>,
    router: TranscriptRouter,
    backend: Mutex<Option<Box<dyn AudioBackend>>>,
    send_task: Mutex<Option<JoinHandle<()>>>,
    recv_task: Mutex<Option<JoinHandle<()>>>,
}

impl TranslationSession {
    pub fn new(
        config: SessionConfig,
        services: Arc<dyn LanguageServices>,
        setup: SetupClient,
    ) -> Self {
        let active = Arc::new(AtomicBool::new(false));
        let status = StatusCell::new(SessionStatus::Idle);
        let log = Arc::new(Mutex::new(TranscriptLog::default()));
        let epoch = Arc::new(AtomicU64::new(0));

        let pipeline = PipelineContext {
            services,
            player: Arc::new(AudioPlayer::new()),
            log: Arc::clone(&log),
            epoch: Arc::clone(&epoch),
            source_language: config.source_language.clone(),
            target_language: config.target_language.clone(),
            stage_timeout: config.stage_timeout,
        };

        let router = TranscriptRouter {
            session_id: config.session_id.clone(),
            log: Arc::clone(&log),
            active: Arc::clone(&active),
            status: status.clone(),
            pipeline,
        };

        Self {
            config,
            setup,
            started_at: Utc::now(),
            active,
            status,
            log,
            epoch,
            frames_sent: Arc::new(AtomicUsize::new(0)),
            router,
            backend: Mutex::new(None),
            send_task: Mutex::new(None),
            recv_task: Mutex::new(None),
        }
    }

    pub fn status(&self) -> SessionStatus {
        self.status.get()
    }

    pub fn session_id(&self) -> &str {
        &self.config.session_id
    }

    /// Start the session: obtain a signed URL, open the transport, begin
    /// audio capture, and spawn the send/receive tasks.
    pub async fn start(&self, mut backend: Box<dyn AudioBackend>) -> SessionResult<()> {
        if self.active.load(Ordering::SeqCst) {
            warn!(session_id = %self.config.session_id, "session already started");
            return Ok(());
        }

        info!(session_id = %self.config.session_id, "starting translation session");
        self.status.set(SessionStatus::Connecting);

        // Signed URLs expire; one is requested fresh for every start.
        let setup_response = match self
            .setup
            .request_session(&SessionSetupRequest {
                source_language: self.config.source_language.clone(),
                target_language: self.config.target_language.clone(),
                user_id: self.config.user_id.clone(),
                sample_rate: self.config.sample_rate,
            })
            .await
        {
            Ok(response) => response,
            Err(e) => {
                error!(session_id = %self.config.session_id, error = %e, "session setup failed");
                self.status.set(SessionStatus::Error);
                return Err(e);
            }
        };

        let transport = match StreamingTransport::connect(&setup_response.signed_url).await {
            Ok(transport) => transport,
            Err(e) => {
                error!(session_id = %self.config.session_id, error = %e, "transport connect failed");
                self.status.set(SessionStatus::Error);
                return Err(e);
            }
        };

        let frames = match backend.start().await {
            Ok(frames) => frames,
            Err(e) => {
                error!(session_id = %self.config.session_id, error = %e, "audio capture failed");
                self.status.set(SessionStatus::Error);
                return Err(e);
            }
        };

        {
            let mut slot = self.backend.lock().await;
            *slot = Some(backend);
        }

        self.active.store(true, Ordering::SeqCst);
        self.status.set(SessionStatus::Recording);
        info!(
            session_id = %self.config.session_id,
            upstream_session = %setup_response.session_id,
            "recording"
        );

        let (sink, stream) = transport.split();

        let send_task = tokio::spawn(send_audio_loop(
            frames,
            sink,
            self.config.sample_rate,
            self.config.gate.clone(),
            Arc::clone(&self.active),
            Arc::clone(&self.frames_sent),
            self.status.clone(),
        ));
        {
            let mut slot = self.send_task.lock().await;
            *slot = Some(send_task);
        }

        let recv_task = tokio::spawn(receive_loop(
            stream,
            self.router.clone(),
            Arc::clone(&self.active),
            self.status.clone(),
        ));
        {
            let mut slot = self.recv_task.lock().await;
            *slot = Some(recv_task);
        }

        Ok(())
    }

    /// Stop the session and release its resources.
    ///
    /// Idempotent: safe to call repeatedly and on a session that never
    /// started. In-flight utterance pipelines are allowed to complete.
    pub async fn stop(&self) -> SessionResult<SessionStats> {
        info!(session_id = %self.config.session_id, "stopping translation session");
        self.active.store(false, Ordering::SeqCst);

        // Release the audio device; this closes the frame channel and lets
        // the send loop wind down with the end-of-audio signal.
        if let Some(mut backend) = self.backend.lock().await.take() {
            if let Err(e) = backend.stop().await {
                warn!(session_id = %self.config.session_id, error = %e, "audio backend stop failed");
            }
        }

        if let Some(task) = self.send_task.lock().await.take() {
            if let Err(e) = task.await {
                error!(session_id = %self.config.session_id, "send task panicked: {e}");
            }
        }

        // The receive loop normally ends when the peer closes; don't hang
        // teardown on a peer that never does.
        if let Some(mut task) = self.recv_task.lock().await.take() {
            match tokio::time::timeout(Duration::from_secs(5), &mut task).await {
                Ok(Err(e)) => {
                    error!(session_id = %self.config.session_id, "receive task panicked: {e}");
                }
                Err(_) => {
                    warn!(session_id = %self.config.session_id, "receive task did not finish; aborting");
                    task.abort();
                }
                Ok(Ok(())) => {}
            }
        }

        match self.status.get() {
            SessionStatus::Connecting | SessionStatus::Recording => {
                self.status.set(SessionStatus::Stopped);
            }
            _ => {}
        }

        self.get_stats().await
    }

    /// Reset the session's transcript state. Stops recording first if the
    /// session is live; stale pipeline tasks stop mutating once the epoch
    /// advances.
    pub async fn clear(&self) -> SessionResult<()> {
        if self.active.load(Ordering::SeqCst) {
            self.stop().await?;
        }
        self.epoch.fetch_add(1, Ordering::SeqCst);
        {
            let mut log = self.log.lock().await;
            *log = TranscriptLog::default();
        }
        self.frames_sent.store(0, Ordering::SeqCst);
        self.status.set(SessionStatus::Idle);
        info!(session_id = %self.config.session_id, "session cleared");
        Ok(())
    }

    pub async fn get_stats(&self) -> SessionResult<SessionStats> {
        let duration = Utc::now().signed_duration_since(self.started_at);
        let (utterances, translations_completed) = {
            let log = self.log.lock().await;
            (
                log.final_transcripts.len(),
                log.translations.iter().filter(|t| t.is_some()).count(),
            )
        };

        Ok(SessionStats {
            status: self.status.get(),
            started_at: self.started_at,
            duration_secs: duration.num_milliseconds() as f64 / 1000.0,
            frames_sent: self.frames_sent.load(Ordering::SeqCst),
            utterances,
            translations_completed,
        })
    }

    pub async fn get_transcript(&self) -> TranscriptLog {
        self.log.lock().await.clone()
    }

    /// Feed one raw transport frame through the session's routing, exactly
    /// as the receive loop does. Exposed for harnesses that drive the state
    /// machine without a live transport.
    pub async fn handle_wire_frame(&self, bytes: &[u8]) {
        self.router.handle_frame(bytes).await;
    }
}

/// Resample, gate, encode, and transmit captured frames until the capture
/// channel closes or the session deactivates.
async fn send_audio_loop(
    mut frames: mpsc::Receiver<AudioFrame>,
    mut sink: TransportSink,
    target_rate: u32,
    gate_config: GateConfig,
    active: Arc<AtomicBool>,
    frames_sent: Arc<AtomicUsize>,
    status: StatusCell,
) {
    debug!("audio send task started");
    let mut gate = VoiceGate::new(gate_config);

    while let Some(frame) = frames.recv().await {
        if !active.load(Ordering::SeqCst) {
            break;
        }

        let resampled = resample_linear(&frame.samples, frame.sample_rate, target_rate);
        if !gate.admit(&resampled) {
            continue;
        }

        let encoded = WireFrame::audio_event(encode_pcm16_le(&resampled)).encode();

        // Stopping must cancel transmission immediately.
        if !active.load(Ordering::SeqCst) {
            break;
        }
        if let Err(e) = sink.send_frame(encoded).await {
            error!(error = %e, "audio send failed");
            status.set(SessionStatus::Error);
            active.store(false, Ordering::SeqCst);
            break;
        }
        frames_sent.fetch_add(1, Ordering::SeqCst);
    }

    // Signal end of audio so the service flushes any pending results.
    let _ = sink
        .send_frame(WireFrame::audio_event(Vec::new()).encode())
        .await;
    sink.close().await;
    debug!("audio send task stopped");
}

/// Consume transport events until the connection ends.
async fn receive_loop(
    mut stream: TransportStream,
    router: TranscriptRouter,
    active: Arc<AtomicBool>,
    status: StatusCell,
) {
    debug!("transcript receive task started");

    while let Some(event) = stream.next_event().await {
        match event {
            TransportEvent::Frame(bytes) => router.handle_frame(&bytes).await,
            TransportEvent::Closed { normal, reason } => {
                // An exception frame may already have marked the session.
                if status.get() != SessionStatus::Error {
                    if normal {
                        info!("transport closed normally");
                    } else {
                        warn!(%reason, "transport closed abnormally without explicit stop");
                    }
                    status.set(SessionStatus::Stopped);
                }
                active.store(false, Ordering::SeqCst);
                break;
            }
            TransportEvent::Failed(e) => {
                error!(error = %e, "transport failed");
                status.set(SessionStatus::Error);
                active.store(false, Ordering::SeqCst);
                break;
            }
        }
    }

    debug!("transcript receive task stopped");
}
