//! HTTP API server for session control
//!
//! This module provides a REST API for controlling translation sessions:
//! - POST /sessions/start - Start a new session
//! - POST /sessions/stop/:id - Stop a session
//! - POST /sessions/clear/:id - Reset a session's transcript state
//! - GET /sessions/:id/status - Query session status
//! - GET /sessions/:id/transcript - Get transcripts, translations, audio refs
//! - GET /health - Health check

mod handlers;
mod routes;
mod state;

pub use routes::create_router;
pub use state::AppState;
