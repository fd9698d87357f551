//! Downstream translation pipeline
//!
//! This module drives finalized transcripts through the external
//! collaborators:
//! - Translation (source → target language)
//! - Enhancement (generative refinement, with fallback)
//! - Synthesis (text to playable audio reference)
//! - Playback (fetch + decode)

pub mod orchestrator;
pub mod playback;
pub mod services;

pub use orchestrator::{spawn_utterance, PipelineContext};
pub use playback::{AudioPlayer, PlaybackInfo};
pub use services::{HttpLanguageServices, LanguageServices, StageError, StageResult};
