//! HTTP endpoint handlers. These are thin wrappers that forward to core logic.
//! One handler per form action; each is instrumented.

use std::sync::Arc;
use axum::{
  extract::{multipart::MultipartRejection, rejection::JsonRejection, Multipart, Path, State},
  Json,
  response::IntoResponse,
};
use tracing::{debug, instrument};

use crate::error::ApiError;
use crate::logic::*;
use crate::protocol::*;
use crate::state::AppState;

/// Multipart field carrying the text file.
const UPLOAD_FIELD: &str = "file";

#[instrument(level = "info")]
pub async fn http_health() -> impl IntoResponse { Json(HealthOut { ok: true }) }

#[instrument(level = "info", skip(state, multipart))]
pub async fn http_post_upload(
  State(state): State<Arc<AppState>>,
  multipart: Result<Multipart, MultipartRejection>,
) -> Result<Json<UploadOut>, ApiError> {
  let mut multipart = multipart?;
  while let Some(field) = multipart
    .next_field()
    .await
    .map_err(|e| ApiError::BadRequest(format!("invalid multipart body: {e}")))?
  {
    if field.name() != Some(UPLOAD_FIELD) {
      debug!(target: "mcqgen_backend", name = ?field.name(), "Skipping unrelated multipart field");
      continue;
    }
    let file_name = field.file_name().unwrap_or("upload.txt").to_string();
    let bytes = field
      .bytes()
      .await
      .map_err(|e| ApiError::BadRequest(format!("failed to read upload: {e}")))?;
    return open_session(&state, file_name, bytes.to_vec()).await.map(Json);
  }
  Err(ApiError::BadRequest(format!("no file uploaded (expected multipart field \"{UPLOAD_FIELD}\")")))
}

#[instrument(level = "info", skip(state, payload))]
pub async fn http_post_generate(
  State(state): State<Arc<AppState>>,
  payload: Result<Json<GenerateIn>, JsonRejection>,
) -> Result<Json<GenerateOut>, ApiError> {
  let Json(body) = payload?;
  generate_mcqs(&state, body).await.map(Json)
}

#[instrument(level = "info", skip(state, payload))]
pub async fn http_post_reviews(
  State(state): State<Arc<AppState>>,
  payload: Result<Json<ReviewsIn>, JsonRejection>,
) -> Result<Json<ReviewsOut>, ApiError> {
  let Json(body) = payload?;
  submit_reviews(&state, body).await.map(Json)
}

#[instrument(level = "info", skip(state))]
pub async fn http_get_session(
  State(state): State<Arc<AppState>>,
  Path(session_id): Path<String>,
) -> Result<Json<SessionOut>, ApiError> {
  session_snapshot(&state, &session_id).await.map(Json)
}
