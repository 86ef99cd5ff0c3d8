//! Chat-completion client for the model provider.
//!
//! The gateway only ever sends a single user-role prompt and reads back the
//! text of the first choice; parsing that text is the caller's business.
//! `ChatModel` is the seam: the OpenAI-compatible HTTP client implements it in
//! production, tests substitute a scripted fake.
//!
//! NOTE: We never log the API key or prompt contents, only sizes and usage.

use std::time::Instant;

use async_trait::async_trait;
use reqwest::header::{AUTHORIZATION, CONTENT_TYPE, USER_AGENT};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{info, instrument, warn};

use crate::config::OpenAiSettings;

#[derive(Debug, Error)]
pub enum ProviderError {
  #[error("model provider is not configured (OPENAI_API_KEY missing)")]
  NotConfigured,
  #[error("transport error: {0}")]
  Transport(#[from] reqwest::Error),
  #[error("HTTP {status}: {message}")]
  Http { status: u16, message: String },
  #[error("completion contained no content")]
  EmptyResponse,
}

/// One completion request: a model id, a single user prompt, a temperature.
#[derive(Debug, Clone, Copy)]
pub struct Completion<'a> {
  pub model: &'a str,
  pub prompt: &'a str,
  pub temperature: f32,
}

#[async_trait]
pub trait ChatModel: Send + Sync {
  /// Returns the raw text of the first choice.
  async fn complete(&self, req: Completion<'_>) -> Result<String, ProviderError>;
}

#[derive(Clone)]
pub struct OpenAI {
  pub client: reqwest::Client,
  pub api_key: String,
  pub base_url: String,
}

impl OpenAI {
  pub fn new(settings: &OpenAiSettings) -> Result<Self, ProviderError> {
    let client = reqwest::Client::builder()
      .timeout(settings.timeout)
      .build()?;

    Ok(Self {
      client,
      api_key: settings.api_key.clone(),
      base_url: settings.base_url.trim_end_matches('/').to_string(),
    })
  }
}

#[async_trait]
impl ChatModel for OpenAI {
  #[instrument(level = "info", skip(self, req), fields(model = %req.model, prompt_len = req.prompt.len(), temperature = req.temperature))]
  async fn complete(&self, req: Completion<'_>) -> Result<String, ProviderError> {
    let url = format!("{}/chat/completions", self.base_url);
    let body = ChatCompletionRequest {
      model: req.model,
      messages: vec![ChatMessageReq { role: "user", content: req.prompt }],
      temperature: req.temperature,
    };

    let start = Instant::now();
    let res = self.client.post(&url)
      .header(USER_AGENT, concat!("dsa-companion-backend/", env!("CARGO_PKG_VERSION")))
      .header(CONTENT_TYPE, "application/json")
      .header(AUTHORIZATION, format!("Bearer {}", self.api_key))
      .json(&body).send().await?;

    if !res.status().is_success() {
      let status = res.status().as_u16();
      let body = res.text().await.unwrap_or_default();
      let message = extract_openai_error(&body).unwrap_or(body);
      warn!(status, elapsed = ?start.elapsed(), "Model provider returned an error status");
      return Err(ProviderError::Http { status, message });
    }

    let body: ChatCompletionResponse = res.json().await?;
    if let Some(usage) = &body.usage {
      info!(prompt_tokens = ?usage.prompt_tokens, completion_tokens = ?usage.completion_tokens, total_tokens = ?usage.total_tokens, "OpenAI usage");
    }

    let text = body.choices.into_iter().next()
      .and_then(|c| c.message.content)
      .map(|s| s.trim().to_string())
      .unwrap_or_default();

    info!(elapsed = ?start.elapsed(), response_len = text.len(), "Model response received");
    if text.is_empty() {
      return Err(ProviderError::EmptyResponse);
    }
    Ok(text)
  }
}

/// Stand-in used when no API key is configured: the server still starts and
/// every AI call fails cleanly.
pub struct Unconfigured;

#[async_trait]
impl ChatModel for Unconfigured {
  async fn complete(&self, _req: Completion<'_>) -> Result<String, ProviderError> {
    Err(ProviderError::NotConfigured)
  }
}

// --- Chat DTOs ---

#[derive(Serialize)]
struct ChatCompletionRequest<'a> {
  model: &'a str,
  messages: Vec<ChatMessageReq<'a>>,
  temperature: f32,
}
#[derive(Serialize)]
struct ChatMessageReq<'a> { role: &'a str, content: &'a str }

#[derive(Deserialize)]
struct ChatCompletionResponse {
  choices: Vec<ChatChoice>,
  #[serde(default)] usage: Option<Usage>,
}
#[derive(Deserialize)]
struct ChatChoice { message: ChatMessageResp }
#[derive(Deserialize)]
struct ChatMessageResp { content: Option<String> }
#[derive(Deserialize)]
struct Usage {
  #[serde(default)] prompt_tokens: Option<u32>,
  #[serde(default)] completion_tokens: Option<u32>,
  #[serde(default)] total_tokens: Option<u32>,
}

/// Try to extract a clean error message from OpenAI error body.
fn extract_openai_error(body: &str) -> Option<String> {
  #[derive(Deserialize)]
  struct EWrap { error: EObj }
  #[derive(Deserialize)]
  struct EObj { message: String }
  match serde_json::from_str::<EWrap>(body) {
    Ok(w) => Some(w.error.message),
    Err(_) => None,
  }
}
