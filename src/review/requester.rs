//! Chat-completions client for drafting review notes.
//!
//! One request per note: no retries, no streaming. The request is bounded by
//! a timeout and can be abandoned through a cancellation future.

use crate::config::ApiKey;
use crate::error::ReviewServiceError;
use crate::review::prompt::{ChatMessage, ReviewRequest};
use serde::{Deserialize, Serialize};
use std::future::Future;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Configuration for the review service.
#[derive(Debug, Clone)]
pub struct ReviewConfig {
    /// Base URL of an OpenAI-compatible API (without `/chat/completions`).
    pub api_url: String,
    pub model_name: String,
    pub temperature: f64,
    pub max_tokens: u32,
    pub timeout_seconds: u64,
}

impl Default for ReviewConfig {
    fn default() -> Self {
        Self {
            api_url: "https://api.openai.com/v1".to_string(),
            model_name: "gpt-4o-mini".to_string(),
            temperature: 0.2,
            max_tokens: 1800,
            timeout_seconds: 120,
        }
    }
}

/// Chat-completions API request.
#[derive(Debug, Serialize)]
struct ChatCompletionRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage>,
    temperature: f64,
    max_tokens: u32,
}

/// Chat-completions API response.
#[derive(Debug, Deserialize)]
struct ChatCompletionResponse {
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ResponseMessage,
}

#[derive(Debug, Deserialize)]
struct ResponseMessage {
    #[serde(default)]
    content: Option<String>,
}

impl ChatCompletionResponse {
    /// Text of the first choice, if any.
    fn into_text(self) -> Option<String> {
        self.choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .filter(|text| !text.trim().is_empty())
    }
}

/// Sends review requests to the text-generation service.
pub struct ReviewNoteRequester {
    config: ReviewConfig,
    api_key: ApiKey,
    http_client: reqwest::Client,
}

impl ReviewNoteRequester {
    /// Create a requester with its own HTTP client.
    pub fn new(config: ReviewConfig, api_key: ApiKey) -> Result<Self, ReviewServiceError> {
        info!(
            "Initializing review requester with model {} at {}",
            config.model_name, config.api_url
        );

        let http_client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_seconds))
            .build()
            .map_err(ReviewServiceError::Client)?;

        Ok(Self {
            config,
            api_key,
            http_client,
        })
    }

    pub fn config(&self) -> &ReviewConfig {
        &self.config
    }

    fn endpoint(&self) -> String {
        format!("{}/chat/completions", self.config.api_url.trim_end_matches('/'))
    }

    /// Send the request and return the drafted text verbatim.
    pub async fn request(&self, request: &ReviewRequest) -> Result<String, ReviewServiceError> {
        let url = self.endpoint();

        let body = ChatCompletionRequest {
            model: &self.config.model_name,
            messages: request.messages(),
            temperature: self.config.temperature,
            max_tokens: self.config.max_tokens,
        };

        debug!(
            "Sending review request ({} bytes of data) to {}",
            request.data_table.len(),
            url
        );

        let response = self
            .http_client
            .post(&url)
            .bearer_auth(self.api_key.expose())
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    ReviewServiceError::Timeout(self.config.timeout_seconds)
                } else if e.is_connect() {
                    ReviewServiceError::Connect {
                        url: url.clone(),
                        source: e,
                    }
                } else {
                    ReviewServiceError::Request(e)
                }
            })?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            warn!("Review service returned {}", status);
            return Err(ReviewServiceError::Status { status, body });
        }

        let completion: ChatCompletionResponse = response.json().await.map_err(|e| {
            if e.is_timeout() {
                ReviewServiceError::Timeout(self.config.timeout_seconds)
            } else {
                ReviewServiceError::MalformedResponse(e)
            }
        })?;

        let text = completion
            .into_text()
            .ok_or(ReviewServiceError::EmptyResponse)?;

        info!("Received review note ({} chars)", text.len());
        Ok(text)
    }

    /// Like [`request`](Self::request), but abandons the call as soon as
    /// `cancel` completes.
    pub async fn request_cancellable<C>(
        &self,
        request: &ReviewRequest,
        cancel: C,
    ) -> Result<String, ReviewServiceError>
    where
        C: Future<Output = ()>,
    {
        tokio::select! {
            biased;
            _ = cancel => {
                warn!("Review request cancelled");
                Err(ReviewServiceError::Cancelled)
            }
            result = self.request(request) => result,
        }
    }
}
