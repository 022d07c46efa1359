//! OpenAI Chat Completions backend
//!
//! Remote text-completion backend over the Chat Completions API.
//! Transient failures are retried in-call with exponential backoff;
//! anything that survives the retries surfaces as a [`BackendError`]
//! for the coordinator to downgrade.

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use std::time::Duration;
use tracing::{debug, warn};

use super::{BackendError, ResponseBackend};
use crate::config::BackendConfig;

/// Maximum number of retries for transient errors
const MAX_RETRIES: u32 = 3;

/// Initial backoff delay for retries
const INITIAL_BACKOFF_MS: u64 = 1000;

/// Check if an HTTP status code is retryable
fn is_retryable_status(status: u16) -> bool {
    matches!(status, 408 | 429 | 500 | 502 | 503 | 504)
}

/// OpenAI Chat Completions client
#[derive(Debug)]
pub struct OpenAiBackend {
    model: String,
    api_key: String,
    base_url: String,
    http: Client,
    max_tokens: u32,
    system_prompt: String,
}

impl OpenAiBackend {
    /// Create a new backend from configuration
    ///
    /// Reads the API key from the environment variable named in config.
    pub fn from_config(config: &BackendConfig) -> Result<Self, BackendError> {
        debug!(model = %config.model, base_url = %config.base_url, "from_config: called");
        let api_key = config.get_api_key()?;

        let timeout = Duration::from_millis(config.timeout_ms);
        let http = Client::builder().timeout(timeout).build().map_err(BackendError::Network)?;

        Ok(Self {
            model: config.model.clone(),
            api_key,
            base_url: config.base_url.clone(),
            http,
            max_tokens: config.max_tokens,
            system_prompt: config.system_prompt.clone(),
        })
    }

    /// Build the request body for the Chat Completions API
    fn build_request_body(&self, request: &str) -> serde_json::Value {
        debug!(%self.model, "build_request_body: called");
        serde_json::json!({
            "model": self.model,
            "max_tokens": self.max_tokens,
            "messages": [
                {
                    "role": "system",
                    "content": self.system_prompt,
                },
                {
                    "role": "user",
                    "content": request,
                },
            ],
        })
    }

    /// Pull the reply text out of the API response
    fn parse_response(&self, api_response: ChatResponse) -> Result<String, BackendError> {
        let choice = api_response
            .choices
            .into_iter()
            .next()
            .ok_or_else(|| BackendError::InvalidResponse("Response contained no choices".to_string()))?;

        choice
            .message
            .content
            .filter(|c| !c.is_empty())
            .ok_or_else(|| BackendError::InvalidResponse("Response contained no text content".to_string()))
    }
}

#[async_trait]
impl ResponseBackend for OpenAiBackend {
    fn name(&self) -> &str {
        "openai"
    }

    async fn respond(&self, request: &str) -> Result<String, BackendError> {
        debug!(%self.model, request_len = request.len(), "respond: called");
        let url = format!("{}/v1/chat/completions", self.base_url);
        let body = self.build_request_body(request);

        let mut last_error = None;
        for attempt in 0..=MAX_RETRIES {
            if attempt > 0 {
                let backoff = INITIAL_BACKOFF_MS * 2u64.pow(attempt - 1);
                warn!(attempt, backoff_ms = backoff, "respond: retrying after transient error");
                tokio::time::sleep(Duration::from_millis(backoff)).await;
            }

            let response = match self
                .http
                .post(url.clone())
                .header("Authorization", format!("Bearer {}", self.api_key))
                .header("content-type", "application/json")
                .json(&body)
                .send()
                .await
            {
                Ok(r) => r,
                Err(e) => {
                    debug!(attempt, error = %e, "respond: network error");
                    last_error = Some(BackendError::Network(e));
                    continue;
                }
            };

            let status = response.status().as_u16();

            if is_retryable_status(status) && attempt < MAX_RETRIES {
                let text = response.text().await.unwrap_or_default();
                debug!(attempt, status, "respond: retryable error");
                last_error = Some(BackendError::ApiError { status, message: text });
                continue;
            }

            if !response.status().is_success() {
                debug!(%status, "respond: API error");
                let text = response.text().await.unwrap_or_default();
                return Err(BackendError::ApiError { status, message: text });
            }

            debug!("respond: success");
            let api_response: ChatResponse = response
                .json()
                .await
                .map_err(|e| BackendError::InvalidResponse(e.to_string()))?;
            return self.parse_response(api_response);
        }

        Err(last_error.unwrap_or_else(|| BackendError::InvalidResponse("Max retries exceeded".to_string())))
    }
}

// ============================================================================
// API response types
// ============================================================================

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatMessage,
}

#[derive(Debug, Deserialize)]
struct ChatMessage {
    content: Option<String>,
}
