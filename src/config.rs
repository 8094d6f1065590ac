//! Configuration: completion settings from the environment, plus an optional TOML agent config
//! (prompt template and completion tuning).
//!
//! See `AgentConfig`, `Prompts` and `CompletionTuning` for the expected TOML schema:
//!
//! ```toml
//! [prompts]
//! generation_template = "Generate {num_questions} questions from: {text} ..."
//!
//! [completion]
//! max_tokens = 1500
//! temperature = 0.4
//! ```

use std::fmt;
use std::time::Duration;

use serde::Deserialize;
use tracing::{error, info, warn};

pub const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";
pub const DEFAULT_MODEL: &str = "gpt-3.5-turbo";
pub const DEFAULT_MAX_TOKENS: u32 = 2000;
pub const DEFAULT_TEMPERATURE: f32 = 0.7;

#[derive(Clone, Debug, Deserialize, Default)]
pub struct AgentConfig {
  #[serde(default)]
  pub prompts: Prompts,
  #[serde(default)]
  pub completion: CompletionTuning,
}

/// Prompt text sent to the model.
///
/// `generation_template` may reference `{text}`, `{subject}`, `{tone}`, `{num_questions}` and
/// `{response_format}`. The last one expands to `response_format`, the literal JSON shape the
/// model is asked to follow.
#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct Prompts {
  pub generation_template: String,
  pub response_format: String,
}

impl Default for Prompts {
  fn default() -> Self {
    Self {
      generation_template: concat!(
        "Generate {num_questions} multiple-choice questions based on the following text.\n\n",
        "Text: {text}\n\n",
        "Subject: {subject}\n\n",
        "Difficulty: {tone}\n\n",
        "Output the result in the following JSON format:\n",
        "{response_format}",
      )
      .into(),
      response_format: r#"{
    "questions": [
        {
            "mcq": "multiple choice question",
            "options": {
                "a": "choice here",
                "b": "choice here",
                "c": "choice here",
                "d": "choice here"
            },
            "correct": "correct answer"
        },
        ... (repeat for each question)
    ]
}"#
      .into(),
    }
  }
}

/// Sampling knobs for the completion call.
#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct CompletionTuning {
  pub max_tokens: u32,
  pub temperature: f32,
}

impl Default for CompletionTuning {
  fn default() -> Self {
    Self { max_tokens: DEFAULT_MAX_TOKENS, temperature: DEFAULT_TEMPERATURE }
  }
}

/// API credential. Debug output is redacted so it never reaches the logs.
#[derive(Clone, PartialEq, Eq)]
pub struct ApiKey(String);

impl ApiKey {
  /// Wrap a raw key; blank input yields `None`.
  pub fn new(raw: impl Into<String>) -> Option<Self> {
    let raw = raw.into();
    let trimmed = raw.trim();
    if trimmed.is_empty() { None } else { Some(Self(trimmed.to_string())) }
  }

  pub fn expose(&self) -> &str { &self.0 }
}

impl fmt::Debug for ApiKey {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str("ApiKey(***)")
  }
}

/// Where and how to reach the completion endpoint.
#[derive(Clone, Debug)]
pub struct CompletionSettings {
  pub api_key: Option<ApiKey>,
  pub base_url: String,
  pub model: String,
  pub timeout: Option<Duration>,
  pub tuning: CompletionTuning,
}

impl Default for CompletionSettings {
  fn default() -> Self {
    Self {
      api_key: None,
      base_url: DEFAULT_BASE_URL.into(),
      model: DEFAULT_MODEL.into(),
      timeout: None,
      tuning: CompletionTuning::default(),
    }
  }
}

impl CompletionSettings {
  /// Read OPENAI_* variables. Missing values fall back to defaults; the key stays `None`.
  pub fn from_env(tuning: CompletionTuning) -> Self {
    let api_key = std::env::var("OPENAI_API_KEY").ok().and_then(ApiKey::new);
    let base_url = std::env::var("OPENAI_BASE_URL").unwrap_or_else(|_| DEFAULT_BASE_URL.into());
    let model = std::env::var("OPENAI_MODEL").unwrap_or_else(|_| DEFAULT_MODEL.into());
    let timeout = match std::env::var("OPENAI_TIMEOUT_SECS") {
      Ok(v) => match v.trim().parse::<u64>() {
        Ok(secs) if secs > 0 => Some(Duration::from_secs(secs)),
        _ => {
          warn!(target: "mcqgen_backend", value = %v, "Ignoring invalid OPENAI_TIMEOUT_SECS");
          None
        }
      },
      Err(_) => None,
    };

    Self {
      api_key,
      base_url: base_url.trim_end_matches('/').to_string(),
      model,
      timeout,
      tuning,
    }
  }
}

/// Parse an agent config from TOML text.
pub fn parse_agent_config(s: &str) -> Result<AgentConfig, toml::de::Error> {
  toml::from_str::<AgentConfig>(s)
}

/// Attempt to load `AgentConfig` from AGENT_CONFIG_PATH. On any parsing/IO error, returns None.
pub fn load_agent_config_from_env() -> Option<AgentConfig> {
  let path = std::env::var("AGENT_CONFIG_PATH").ok()?;
  match std::fs::read_to_string(&path) {
    Ok(s) => match parse_agent_config(&s) {
      Ok(cfg) => {
        info!(target: "mcqgen_backend", %path, "Loaded agent config (TOML)");
        Some(cfg)
      }
      Err(e) => {
        error!(target: "mcqgen_backend", %path, error = %e, "Failed to parse TOML config");
        None
      }
    },
    Err(e) => {
      error!(target: "mcqgen_backend", %path, error = %e, "Failed to read TOML config file");
      None
    }
  }
}
