// End-to-end streaming tests: a real WebSocket stands in for the streaming
// transcription service and an in-process HTTP endpoint plays the
// session-setup collaborator. Audio comes from a WAV file backend.

use async_trait::async_trait;
use axum::{routing::post, Json, Router};
use futures::{SinkExt, StreamExt};
use medlingo::audio::{AudioBackendConfig, FileBackend};
use medlingo::pipeline::{LanguageServices, StageResult};
use medlingo::stream::{SessionConfig, SessionStatus, SetupClient, TranslationSession};
use medlingo::wire::headers::{
    Header, EVENT_TYPE_AUDIO, EVENT_TYPE_TRANSCRIPT, HEADER_EVENT_TYPE, HEADER_MESSAGE_TYPE,
    MESSAGE_TYPE_EVENT,
};
use medlingo::wire::{encode_transcript_body, TranscriptResult, WireFrame};
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tokio_tungstenite::tungstenite::protocol::frame::coding::CloseCode;
use tokio_tungstenite::tungstenite::protocol::CloseFrame;
use tokio_tungstenite::tungstenite::Message;

const FINAL_TEXT: &str = "The patient has chest pain";

struct EchoServices;

#[async_trait]
impl LanguageServices for EchoServices {
    async fn translate(&self, text: &str, _source: &str, _target: &str) -> StageResult<String> {
        Ok(format!("es:{text}"))
    }

    async fn enhance(
        &self,
        translated: &str,
        _source: &str,
        _target: &str,
        _original: &str,
    ) -> StageResult<String> {
        Ok(translated.to_string())
    }

    async fn synthesize(&self, text: &str, _target: &str) -> StageResult<String> {
        Ok(format!("http://127.0.0.1:1/{}.mp3", text.len()))
    }
}

fn transcript_message(text: &str, is_partial: bool) -> Message {
    Message::Binary(
        WireFrame::new(
            vec![
                Header::string(HEADER_MESSAGE_TYPE, MESSAGE_TYPE_EVENT),
                Header::string(HEADER_EVENT_TYPE, EVENT_TYPE_TRANSCRIPT),
            ],
            encode_transcript_body(&[TranscriptResult {
                text: text.to_string(),
                is_partial,
            }])
            .expect("body encodes"),
        )
        .encode(),
    )
}

/// Streaming service stand-in. Replies to the first audio frame with a
/// partial and a final transcript, then closes with `close_code` once the
/// end-of-audio signal arrives.
async fn spawn_streaming_server(close_code: CloseCode) -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind ws");
    let addr = listener.local_addr().expect("ws addr");

    tokio::spawn(async move {
        let (stream, _) = listener.accept().await.expect("accept");
        let mut ws = tokio_tungstenite::accept_async(stream)
            .await
            .expect("ws handshake");

        let mut announced = false;
        while let Some(Ok(message)) = ws.next().await {
            match message {
                Message::Binary(data) => {
                    let frame = WireFrame::decode(&data).expect("client frames decode");
                    assert_eq!(frame.header(HEADER_EVENT_TYPE), Some(EVENT_TYPE_AUDIO));

                    if frame.body.is_empty() {
                        // End of audio: finish the stream.
                        let _ = ws
                            .send(Message::Close(Some(CloseFrame {
                                code: close_code,
                                reason: "stream complete".into(),
                            })))
                            .await;
                        break;
                    }

                    if !announced {
                        announced = true;
                        ws.send(transcript_message("the patient", true))
                            .await
                            .expect("send partial");
                        ws.send(transcript_message(FINAL_TEXT, false))
                            .await
                            .expect("send final");
                    }
                }
                Message::Close(_) => break,
                _ => {}
            }
        }
    });

    format!("ws://{addr}")
}

/// Session-setup stand-in returning the signed streaming URL.
async fn spawn_setup_server(signed_url: String) -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind http");
    let addr = listener.local_addr().expect("http addr");

    let app = Router::new().route(
        "/session",
        post(move || {
            let url = signed_url.clone();
            async move {
                Json(serde_json::json!({
                    "sessionId": "upstream-1",
                    "signedUrl": url,
                }))
            }
        }),
    );

    tokio::spawn(async move {
        axum::serve(listener, app).await.expect("setup server");
    });

    format!("http://{addr}/session")
}

fn speech_wav(dir: &tempfile::TempDir) -> std::path::PathBuf {
    let path = dir.path().join("speech.wav");
    let spec = hound::WavSpec {
        channels: 1,
        sample_rate: 16000,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };
    let mut writer = hound::WavWriter::create(&path, spec).expect("create wav");
    for i in 0..3200 {
        // Loud enough to clear the energy gate.
        let sample = ((i as f32 * 0.05).sin() * 12000.0) as i16;
        writer.write_sample(sample).expect("write sample");
    }
    writer.finalize().expect("finalize wav");
    path
}

async fn run_session(close_code: CloseCode) -> (TranslationSession, tempfile::TempDir) {
    let ws_url = spawn_streaming_server(close_code).await;
    let setup_url = spawn_setup_server(ws_url).await;

    let dir = tempfile::tempdir().expect("tempdir");
    let backend = Box::new(FileBackend::new(
        speech_wav(&dir),
        AudioBackendConfig::default(),
    ));

    let config = SessionConfig {
        session_id: "stream-test".to_string(),
        stage_timeout: Duration::from_secs(5),
        ..Default::default()
    };
    let session = TranslationSession::new(config, Arc::new(EchoServices), SetupClient::new(setup_url));

    session.start(backend).await.expect("session starts");

    // The file drains, the end signal goes out, and the server closes.
    for _ in 0..500 {
        if session.status() == SessionStatus::Stopped {
            break;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }

    (session, dir)
}

#[tokio::test]
async fn test_streaming_session_end_to_end() {
    let (session, _dir) = run_session(CloseCode::Normal).await;
    assert_eq!(session.status(), SessionStatus::Stopped);

    // Transcripts arrived over the wire and went through the pipeline.
    for _ in 0..300 {
        let log = session.get_transcript().await;
        if log.translations.first().map(|t| t.is_some()).unwrap_or(false) {
            break;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }

    let log = session.get_transcript().await;
    assert_eq!(log.final_transcripts, vec![FINAL_TEXT.to_string()]);
    assert_eq!(log.translations, vec![Some(format!("es:{FINAL_TEXT}"))]);

    let stats = session.get_stats().await.expect("stats");
    assert!(stats.frames_sent >= 2, "both audio frames were transmitted");

    // Teardown after a remote close is a no-op and must not fail.
    session.stop().await.expect("stop after close succeeds");
    assert_eq!(session.status(), SessionStatus::Stopped);
}

#[tokio::test]
async fn test_abnormal_close_is_treated_as_stopped() {
    let (session, _dir) = run_session(CloseCode::Away).await;
    assert_eq!(
        session.status(),
        SessionStatus::Stopped,
        "abnormal close without explicit stop still lands in stopped"
    );
}

#[tokio::test]
async fn test_setup_failure_is_fatal() {
    // Nothing listens here; setup must fail before any transport opens.
    let config = SessionConfig::default();
    let session = TranslationSession::new(
        config,
        Arc::new(EchoServices),
        SetupClient::new("http://127.0.0.1:1/session"),
    );

    let dir = tempfile::tempdir().expect("tempdir");
    let backend = Box::new(FileBackend::new(
        speech_wav(&dir),
        AudioBackendConfig::default(),
    ));

    let err = session.start(backend).await.expect_err("setup fails");
    assert!(matches!(err, medlingo::SessionError::Setup(_)));
    assert_eq!(session.status(), SessionStatus::Error);

    // Teardown on an errored session is still safe.
    session.stop().await.expect("stop succeeds");
    assert_eq!(session.status(), SessionStatus::Error);
}
