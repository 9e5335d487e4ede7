//! Anthropic Messages client. Classification reaches the model only through
//! the `RawClassifier` impl below; no other module talks to the API.
//!
//! Retry policy: a 429 or 5xx reply is retried with backoff up to
//! `MAX_ATTEMPTS` in total. Send failures (timeouts, refused or reset
//! connections) and every other status fail immediately.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, warn};

use crate::classification::RawClassifier;

pub mod prompts;

const MESSAGES_URL: &str = "https://api.anthropic.com/v1/messages";
const API_VERSION: &str = "2023-06-01";
/// Used when `MODEL_NAME` is not set.
pub const DEFAULT_MODEL: &str = "claude-sonnet-4-5";
const MAX_TOKENS: u32 = 1024;
const MAX_ATTEMPTS: u32 = 3;
const REQUEST_TIMEOUT: Duration = Duration::from_secs(60);
const BASE_BACKOFF: Duration = Duration::from_secs(1);

#[derive(Debug, Error)]
pub enum LlmError {
    #[error("request to the model API failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("model API rejected the request (status {status}): {message}")]
    Rejected { status: u16, message: String },

    #[error("model API still failing after {attempts} attempts (last status {status}): {message}")]
    Exhausted {
        attempts: u32,
        status: u16,
        message: String,
    },

    #[error("model reply had no text block")]
    NoText,
}

#[derive(Debug, Serialize)]
struct MessagesRequest<'a> {
    model: &'a str,
    max_tokens: u32,
    system: &'a str,
    messages: [UserTurn<'a>; 1],
}

#[derive(Debug, Serialize)]
struct UserTurn<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
pub struct MessagesReply {
    #[serde(default)]
    content: Vec<ReplyBlock>,
    #[serde(default)]
    usage: Option<TokenUsage>,
}

#[derive(Debug, Deserialize)]
struct ReplyBlock {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
struct TokenUsage {
    input_tokens: u32,
    output_tokens: u32,
}

impl MessagesReply {
    /// Text of the first `text` block, if any.
    pub fn first_text(&self) -> Option<&str> {
        self.content
            .iter()
            .find(|block| block.kind == "text")
            .and_then(|block| block.text.as_deref())
    }
}

#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    error: ErrorDetail,
}

#[derive(Debug, Deserialize)]
struct ErrorDetail {
    message: String,
}

/// What one HTTP exchange came to.
enum Attempt {
    Done(MessagesReply),
    Retryable { status: u16, message: String },
}

#[derive(Clone)]
pub struct LlmClient {
    http: Client,
    endpoint: String,
    api_key: String,
    model: String,
}

impl LlmClient {
    pub fn new(api_key: String, model: String) -> Result<Self, LlmError> {
        let http = Client::builder().timeout(REQUEST_TIMEOUT).build()?;
        Ok(Self {
            http,
            endpoint: MESSAGES_URL.to_string(),
            api_key,
            model,
        })
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    /// Sends one user turn under `system` and returns the decoded reply.
    pub async fn complete(&self, prompt: &str, system: &str) -> Result<MessagesReply, LlmError> {
        let request = MessagesRequest {
            model: &self.model,
            max_tokens: MAX_TOKENS,
            system,
            messages: [UserTurn {
                role: "user",
                content: prompt,
            }],
        };

        let mut attempt = 1;
        loop {
            match self.send_once(&request).await? {
                Attempt::Done(reply) => return Ok(reply),
                Attempt::Retryable { status, message } if attempt >= MAX_ATTEMPTS => {
                    return Err(LlmError::Exhausted {
                        attempts: attempt,
                        status,
                        message,
                    });
                }
                Attempt::Retryable { status, .. } => {
                    let delay = backoff_delay(attempt);
                    warn!(
                        "Model API returned {status} on attempt {attempt}/{MAX_ATTEMPTS}, retrying in {}ms",
                        delay.as_millis()
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
            }
        }
    }

    async fn send_once(&self, request: &MessagesRequest<'_>) -> Result<Attempt, LlmError> {
        let response = self
            .http
            .post(&self.endpoint)
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", API_VERSION)
            .json(request)
            .send()
            .await?;

        let status = response.status();
        if status.is_success() {
            let reply: MessagesReply = response.json().await?;
            if let Some(usage) = &reply.usage {
                debug!(
                    "Model call ok: input_tokens={}, output_tokens={}",
                    usage.input_tokens, usage.output_tokens
                );
            }
            return Ok(Attempt::Done(reply));
        }

        let message = api_error_message(response.text().await.unwrap_or_default());
        if should_retry(status) {
            Ok(Attempt::Retryable {
                status: status.as_u16(),
                message,
            })
        } else {
            Err(LlmError::Rejected {
                status: status.as_u16(),
                message,
            })
        }
    }
}

#[async_trait]
impl RawClassifier for LlmClient {
    async fn classify_raw(&self, prompt: &str) -> anyhow::Result<String> {
        let reply = self.complete(prompt, prompts::JSON_ONLY_SYSTEM).await?;
        let text = reply.first_text().ok_or(LlmError::NoText)?;
        Ok(text.to_string())
    }
}

/// Only rate limiting and server-side failures are worth another attempt.
fn should_retry(status: StatusCode) -> bool {
    status == StatusCode::TOO_MANY_REQUESTS || status.is_server_error()
}

/// Delay before attempt `attempt + 1`: 1s, 2s, 4s, ...
fn backoff_delay(attempt: u32) -> Duration {
    BASE_BACKOFF * 2u32.saturating_pow(attempt.saturating_sub(1))
}

/// `error.message` from an API error body, or the raw body when it has none.
fn api_error_message(body: String) -> String {
    serde_json::from_str::<ErrorEnvelope>(&body)
        .map(|envelope| envelope.error.message)
        .unwrap_or(body)
}
