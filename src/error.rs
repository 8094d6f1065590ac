//! Errors surfaced to the browser. Every variant renders as `{"error": "..."}` with a status.

use axum::{
  extract::{multipart::MultipartRejection, rejection::JsonRejection},
  http::StatusCode,
  response::{IntoResponse, Response},
  Json,
};
use serde::Serialize;
use tracing::warn;

use crate::openai::CompletionError;
use crate::parser::ParseError;

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
  #[error("no API key configured: set OPENAI_API_KEY or supply one with the request")]
  MissingCredential,

  #[error("question generation is unavailable: no completion client")]
  CompletionUnavailable,

  #[error(transparent)]
  Completion(#[from] CompletionError),

  #[error(transparent)]
  Parse(#[from] ParseError),

  #[error("unknown session: {0}")]
  UnknownSession(String),

  #[error("{0}")]
  BadRequest(String),
}

impl ApiError {
  pub fn status(&self) -> StatusCode {
    match self {
      ApiError::MissingCredential | ApiError::CompletionUnavailable => StatusCode::SERVICE_UNAVAILABLE,
      ApiError::Completion(_) | ApiError::Parse(_) => StatusCode::BAD_GATEWAY,
      ApiError::UnknownSession(_) => StatusCode::NOT_FOUND,
      ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
    }
  }
}

// Body extraction failures (bad JSON, wrong types, unknown difficulty, missing multipart
// boundary) are client errors and share the JSON error shape.
impl From<JsonRejection> for ApiError {
  fn from(rejection: JsonRejection) -> Self {
    ApiError::BadRequest(format!("invalid request body: {}", rejection.body_text()))
  }
}

impl From<MultipartRejection> for ApiError {
  fn from(rejection: MultipartRejection) -> Self {
    ApiError::BadRequest(format!("invalid upload: {}", rejection.body_text()))
  }
}

#[derive(Serialize)]
struct ErrorOut {
  error: String,
}

impl IntoResponse for ApiError {
  fn into_response(self) -> Response {
    let status = self.status();
    warn!(target: "mcqgen_backend", %status, error = %self, "Request failed");
    (status, Json(ErrorOut { error: self.to_string() })).into_response()
  }
}
