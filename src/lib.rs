pub mod audio;
pub mod config;
pub mod error;
pub mod http;
pub mod pipeline;
pub mod reconnect;
pub mod stream;
pub mod telemetry;
pub mod wire;

pub use audio::{
    AudioBackend, AudioBackendConfig, AudioBackendFactory, AudioFile, AudioFrame, AudioSource,
    FileBackend, GateConfig, MicrophoneBackend, VoiceGate,
};
pub use config::Config;
pub use error::{SessionError, SessionResult};
pub use http::{create_router, AppState};
pub use pipeline::{AudioPlayer, HttpLanguageServices, LanguageServices, StageError};
pub use reconnect::ReconnectPolicy;
pub use stream::{
    SessionConfig, SessionStats, SessionStatus, SetupClient, TranscriptLog, TranslationSession,
};
pub use wire::{TranscriptResult, WireFrame};
