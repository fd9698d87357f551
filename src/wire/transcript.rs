//! Transcript event payloads.
//!
//! `TranscriptEvent` bodies are UTF-8 JSON carrying a results array. Each
//! result has an `IsPartial` flag and a list of alternatives; the first
//! alternative's text is the transcript.

use serde::{Deserialize, Serialize};

/// A partial or final transcription result.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TranscriptResult {
    pub text: String,
    pub is_partial: bool,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct TranscriptPayload {
    #[serde(default)]
    pub results: Vec<RecognitionResult>,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct RecognitionResult {
    pub is_partial: bool,
    #[serde(default)]
    pub alternatives: Vec<Alternative>,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Alternative {
    pub transcript: String,
}

/// Parse a `TranscriptEvent` body. Results without alternatives are skipped.
pub fn parse_transcript_body(body: &[u8]) -> Result<Vec<TranscriptResult>, serde_json::Error> {
    let payload: TranscriptPayload = serde_json::from_slice(body)?;
    Ok(payload
        .results
        .into_iter()
        .filter_map(|result| {
            result.alternatives.into_iter().next().map(|alt| TranscriptResult {
                text: alt.transcript,
                is_partial: result.is_partial,
            })
        })
        .collect())
}

/// Build a `TranscriptEvent` body from results (used by diagnostics and
/// test harnesses that stand in for the streaming service).
pub fn encode_transcript_body(
    results: &[TranscriptResult],
) -> Result<Vec<u8>, serde_json::Error> {
    let payload = TranscriptPayload {
        results: results
            .iter()
            .map(|r| RecognitionResult {
                is_partial: r.is_partial,
                alternatives: vec![Alternative {
                    transcript: r.text.clone(),
                }],
            })
            .collect(),
    };
    serde_json::to_vec(&payload)
}
