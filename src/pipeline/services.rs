//! Clients for the translate, enhance, and synthesize collaborators.
//!
//! The trait seam lets tests substitute scripted collaborators; the HTTP
//! implementation talks JSON to the configured endpoints.

use crate::config::EndpointsConfig;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;

/// Stage-local failure. Never escalated to session status; each pipeline
/// stage applies its own handling (abort, fallback, or skip).
#[derive(Error, Debug)]
pub enum StageError {
    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("unexpected status {0}")]
    Status(reqwest::StatusCode),

    #[error("malformed response: {0}")]
    Malformed(String),

    #[error("stage timed out after {0:?}")]
    Timeout(Duration),
}

pub type StageResult<T> = Result<T, StageError>;

#[async_trait::async_trait]
pub trait LanguageServices: Send + Sync {
    /// Translate `text` from `source` to `target`.
    async fn translate(&self, text: &str, source: &str, target: &str) -> StageResult<String>;

    /// Refine a basic translation given the original text and language pair.
    async fn enhance(
        &self,
        translated: &str,
        source: &str,
        target: &str,
        original: &str,
    ) -> StageResult<String>;

    /// Synthesize speech for `text`; returns a playable audio reference.
    async fn synthesize(&self, text: &str, target: &str) -> StageResult<String>;
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct TranslateRequest<'a> {
    text: &'a str,
    source_language: &'a str,
    target_language: &'a str,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct TranslateResponse {
    translated_text: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct EnhanceRequest<'a> {
    translated_text: &'a str,
    source_language: &'a str,
    target_language: &'a str,
    original_text: &'a str,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct EnhanceResponse {
    enhanced_text: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct SynthesizeRequest<'a> {
    text: &'a str,
    target_language: &'a str,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SynthesizeResponse {
    audio_url: String,
}

pub struct HttpLanguageServices {
    endpoints: EndpointsConfig,
    http: reqwest::Client,
}

impl HttpLanguageServices {
    pub fn new(endpoints: EndpointsConfig) -> Self {
        Self {
            endpoints,
            http: reqwest::Client::new(),
        }
    }

    async fn post_json<Req: Serialize, Resp: for<'de> Deserialize<'de>>(
        &self,
        url: &str,
        request: &Req,
    ) -> StageResult<Resp> {
        let response = self.http.post(url).json(request).send().await?;
        if !response.status().is_success() {
            return Err(StageError::Status(response.status()));
        }
        response
            .json::<Resp>()
            .await
            .map_err(|e| StageError::Malformed(e.to_string()))
    }
}

#[async_trait::async_trait]
impl LanguageServices for HttpLanguageServices {
    async fn translate(&self, text: &str, source: &str, target: &str) -> StageResult<String> {
        let response: TranslateResponse = self
            .post_json(
                &self.endpoints.translate,
                &TranslateRequest {
                    text,
                    source_language: source,
                    target_language: target,
                },
            )
            .await?;
        Ok(response.translated_text)
    }

    async fn enhance(
        &self,
        translated: &str,
        source: &str,
        target: &str,
        original: &str,
    ) -> StageResult<String> {
        let response: EnhanceResponse = self
            .post_json(
                &self.endpoints.enhance,
                &EnhanceRequest {
                    translated_text: translated,
                    source_language: source,
                    target_language: target,
                    original_text: original,
                },
            )
            .await?;
        Ok(response.enhanced_text)
    }

    async fn synthesize(&self, text: &str, target: &str) -> StageResult<String> {
        let response: SynthesizeResponse = self
            .post_json(
                &self.endpoints.synthesize,
                &SynthesizeRequest {
                    text,
                    target_language: target,
                },
            )
            .await?;
        Ok(response.audio_url)
    }
}
