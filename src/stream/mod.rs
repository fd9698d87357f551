//! Streaming session management
//!
//! This module owns the live half of a translation session:
//! - Session setup (signed URL exchange)
//! - The WebSocket transport to the streaming transcription service
//! - The session state machine routing partial/final transcript events

pub mod session;
pub mod setup;
pub mod transport;

pub use session::{
    SessionConfig, SessionStats, SessionStatus, TranscriptLog, TranslationSession,
};
pub use setup::{SessionSetupRequest, SessionSetupResponse, SetupClient};
pub use transport::{StreamingTransport, TransportEvent, TransportSink, TransportStream};
