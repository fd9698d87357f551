//! Event-stream wire protocol.
//!
//! Frames outbound audio into the streaming service's binary event-stream
//! format and decodes inbound transcript/exception messages.

pub mod codec;
pub mod headers;
pub mod transcript;

pub use codec::{FrameError, WireFrame};
pub use headers::{Header, HeaderValue};
pub use transcript::{encode_transcript_body, parse_transcript_body, TranscriptResult};
