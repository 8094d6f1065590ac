//! Chat-completion client.
//!
//! `CompletionClient` is the seam between request handling and the network: one request
//! struct in, the trimmed completion text (or an error) out. `OpenAI` is the reqwest-backed
//! implementation; tests plug in a stub.
//!
//! The credential travels inside each `CompletionRequest`; the client itself holds none.
//! Calls are instrumented and log model names, latencies and response sizes (not contents).

use std::time::{Duration, Instant};

use futures::future::BoxFuture;
use reqwest::header::{AUTHORIZATION, CONTENT_TYPE, USER_AGENT};
use serde::{Deserialize, Serialize};
use tracing::{error, info, instrument};

use crate::config::ApiKey;

/// One chat-completion round trip: a single system message carrying the prompt.
#[derive(Clone, Debug)]
pub struct CompletionRequest {
  pub api_key: ApiKey,
  pub model: String,
  pub prompt: String,
  pub max_tokens: u32,
  pub temperature: f32,
}

#[derive(Debug, thiserror::Error)]
pub enum CompletionError {
  #[error("request to completion endpoint failed: {0}")]
  Transport(#[from] reqwest::Error),

  #[error("completion endpoint returned HTTP {status}: {message}")]
  Http { status: u16, message: String },

  #[error("completion response contained no choices")]
  NoChoices,
}

pub trait CompletionClient: Send + Sync {
  fn complete<'a>(&'a self, req: &'a CompletionRequest) -> BoxFuture<'a, Result<String, CompletionError>>;
}

#[derive(Clone)]
pub struct OpenAI {
  pub client: reqwest::Client,
  pub base_url: String,
}

impl OpenAI {
  /// `timeout: None` keeps reqwest's default (no overall timeout).
  pub fn new(base_url: &str, timeout: Option<Duration>) -> Result<Self, CompletionError> {
    let mut builder = reqwest::Client::builder();
    if let Some(t) = timeout {
      builder = builder.timeout(t);
    }
    let client = builder.build()?;
    Ok(Self { client, base_url: base_url.trim_end_matches('/').to_string() })
  }

  #[instrument(level = "info", skip(self, req), fields(model = %req.model, prompt_len = req.prompt.len(), max_tokens = req.max_tokens))]
  async fn chat(&self, req: &CompletionRequest) -> Result<String, CompletionError> {
    let url = format!("{}/chat/completions", self.base_url);
    let body = ChatCompletionRequest::from(req);

    let start = Instant::now();
    let res = self.client.post(&url)
      .header(USER_AGENT, "mcqgen-backend/0.1")
      .header(CONTENT_TYPE, "application/json")
      .header(AUTHORIZATION, format!("Bearer {}", req.api_key.expose()))
      .json(&body).send().await?;

    if !res.status().is_success() {
      let status = res.status();
      let text = res.text().await.unwrap_or_default();
      let message = extract_openai_error(&text).unwrap_or(text);
      error!(elapsed = ?start.elapsed(), %status, "Completion endpoint returned an error");
      return Err(CompletionError::Http { status: status.as_u16(), message });
    }

    let body: ChatCompletionResponse = res.json().await?;
    if let Some(usage) = &body.usage {
      info!(prompt_tokens = ?usage.prompt_tokens, completion_tokens = ?usage.completion_tokens, total_tokens = ?usage.total_tokens, "OpenAI usage");
    }
    let text = first_choice_text(body)?;
    info!(elapsed = ?start.elapsed(), response_len = text.len(), "Model response received");
    Ok(text)
  }
}

impl CompletionClient for OpenAI {
  fn complete<'a>(&'a self, req: &'a CompletionRequest) -> BoxFuture<'a, Result<String, CompletionError>> {
    Box::pin(self.chat(req))
  }
}

/// `choices[0].message.content`, trimmed. A null content counts as empty text.
fn first_choice_text(body: ChatCompletionResponse) -> Result<String, CompletionError> {
  let choice = body.choices.into_iter().next().ok_or(CompletionError::NoChoices)?;
  Ok(choice.message.content.unwrap_or_default().trim().to_string())
}

// --- Chat DTOs ---

#[derive(Serialize)]
struct ChatCompletionRequest<'a> {
  model: &'a str,
  messages: Vec<ChatMessageReq<'a>>,
  max_tokens: u32,
  temperature: f32,
}
#[derive(Serialize)]
struct ChatMessageReq<'a> { role: &'static str, content: &'a str }

impl<'a> From<&'a CompletionRequest> for ChatCompletionRequest<'a> {
  fn from(req: &'a CompletionRequest) -> Self {
    Self {
      model: &req.model,
      messages: vec![ChatMessageReq { role: "system", content: &req.prompt }],
      max_tokens: req.max_tokens,
      temperature: req.temperature,
    }
  }
}

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

/// Try to extract a clean error message from an OpenAI error body.
fn extract_openai_error(body: &str) -> Option<String> {
  #[derive(Deserialize)]
  struct EWrap { error: EObj }
  #[derive(Deserialize)]
  struct EObj { message: String }
  serde_json::from_str::<EWrap>(body).ok().map(|w| w.error.message)
}
