//! Session-setup collaborator client.
//!
//! Exchanges language pair and audio parameters for a short-lived signed
//! streaming URL. Signed URLs expire (reference window: 300 seconds), so a
//! fresh one is requested for every session start.

use crate::error::{SessionError, SessionResult};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionSetupRequest {
    pub source_language: String,
    pub target_language: String,
    pub user_id: String,
    pub sample_rate: u32,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionSetupResponse {
    pub session_id: String,
    pub signed_url: String,
    #[serde(default)]
    pub connection_params: Option<serde_json::Value>,
}

#[derive(Clone)]
pub struct SetupClient {
    endpoint: String,
    http: reqwest::Client,
}

impl SetupClient {
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
            http: reqwest::Client::new(),
        }
    }

    pub async fn request_session(
        &self,
        request: &SessionSetupRequest,
    ) -> SessionResult<SessionSetupResponse> {
        let response = self
            .http
            .post(&self.endpoint)
            .json(request)
            .send()
            .await
            .map_err(|e| SessionError::Setup(e.to_string()))?;

        if !response.status().is_success() {
            return Err(SessionError::Setup(format!(
                "session setup returned {}",
                response.status()
            )));
        }

        response
            .json::<SessionSetupResponse>()
            .await
            .map_err(|e| SessionError::Setup(format!("malformed setup response: {e}")))
    }
}
