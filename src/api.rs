use reqwest::Client;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::conversation::ChatRequest;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("chat server unreachable: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("unexpected response body: {0}")]
    Decode(#[from] serde_json::Error),
}

/// Body returned by `POST /api/chat`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatResponse {
    pub success: bool,
    pub response: String,
}

#[derive(Deserialize)]
struct StatusResponse {
    message: String,
}

#[derive(Clone)]
pub struct ChatClient {
    client: Client,
    base_url: String,
}

impl ChatClient {
    pub fn new(base_url: &str) -> Self {
        Self {
            client: Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Send one chat turn. Any HTTP status is accepted as long as the body
    /// decodes; `success: false` comes back as an `Ok` response.
    pub async fn chat(&self, request: &ChatRequest) -> Result<ChatResponse, ApiError> {
        let url = format!("{}/api/chat", self.base_url);

        tracing::debug!(
            %url,
            history = request.chat_history.len(),
            "sending chat request"
        );

        let response = self.client.post(&url).json(request).send().await?;
        let status = response.status();
        let body = response.bytes().await?;

        let chat_response: ChatResponse = serde_json::from_slice(&body)?;
        tracing::debug!(%status, success = chat_response.success, "chat response received");
        Ok(chat_response)
    }

    /// Server banner from `GET /`, used as a reachability probe
    pub async fn health(&self) -> Result<String, ApiError> {
        let url = format!("{}/", self.base_url);

        let response = self.client.get(&url).send().await?;
        let body = response.bytes().await?;

        let status: StatusResponse = serde_json::from_slice(&body)?;
        Ok(status.message)
    }
}
