//! Core behaviors behind the three form actions:
//!   - accepting an uploaded text file (opens a session)
//!   - "Generate MCQs": prompt → completion → parse → store in session
//!   - "Submit Reviews": record one label per question and summarize

use tracing::{debug, info, instrument, warn};

use crate::config::ApiKey;
use crate::domain::{GenerationRequest, ReviewLabel, ReviewSet};
use crate::error::ApiError;
use crate::openai::CompletionRequest;
use crate::parser::parse_questions;
use crate::prompt::build_prompt;
use crate::protocol::{to_rows, GenerateIn, GenerateOut, ReviewSummary, ReviewsIn, ReviewsOut, SessionOut, UploadOut};
use crate::state::{AppState, Session};
use crate::util::trunc_for_log;

#[instrument(level = "info", skip(state, file_name, bytes), fields(%file_name, size = bytes.len()))]
pub async fn open_session(state: &AppState, file_name: String, bytes: Vec<u8>) -> Result<UploadOut, ApiError> {
  let text = String::from_utf8(bytes)
    .map_err(|_| ApiError::BadRequest("uploaded file is not valid UTF-8 text".into()))?;
  if text.trim().is_empty() {
    return Err(ApiError::BadRequest("uploaded file is empty".into()));
  }

  let session = Session::new(file_name.clone(), text.clone());
  let chars = text.chars().count();
  let session_id = state.insert_session(session).await;
  info!(target: "mcq", %session_id, chars, "Session opened from upload");
  Ok(UploadOut { session_id, file_name, text, chars })
}

#[instrument(level = "info", skip(state, body), fields(session_id = %body.session_id, difficulty = %body.difficulty, count = body.count))]
pub async fn generate_mcqs(state: &AppState, body: GenerateIn) -> Result<GenerateOut, ApiError> {
  if body.count < 1 {
    return Err(ApiError::BadRequest("number of questions must be at least 1".into()));
  }
  let session = state
    .get_session(&body.session_id)
    .await
    .ok_or_else(|| ApiError::UnknownSession(body.session_id.clone()))?;

  let api_key = body
    .api_key
    .and_then(ApiKey::new)
    .or_else(|| state.settings.api_key.clone())
    .ok_or(ApiError::MissingCredential)?;
  let client = state.completion.as_ref().ok_or(ApiError::CompletionUnavailable)?;

  let gen_req = GenerationRequest {
    text: session.text,
    subject: body.subject,
    difficulty: body.difficulty,
    count: body.count,
  };
  let prompt = build_prompt(&state.prompts, &gen_req);
  debug!(target: "mcq", prompt_len = prompt.len(), preview = %trunc_for_log(&prompt, 80), "Prompt built");

  let req = CompletionRequest {
    api_key,
    model: state.settings.model.clone(),
    prompt,
    max_tokens: state.settings.tuning.max_tokens,
    temperature: state.settings.tuning.temperature,
  };
  let raw = client.complete(&req).await?;

  let questions = parse_questions(&raw).map_err(|e| {
    warn!(target: "mcq", error = %e, preview = %trunc_for_log(&raw, 120), "Model output could not be parsed");
    ApiError::from(e)
  })?;

  let unknown_labels = questions.iter().filter(|q| !q.has_known_correct_label()).count();
  if unknown_labels > 0 {
    warn!(target: "mcq", unknown_labels, "Some questions name a correct answer that is not an option label");
  }
  if questions.len() != gen_req.count as usize {
    info!(target: "mcq", requested = gen_req.count, received = questions.len(), "Model returned a different number of questions");
  }

  let rows = to_rows(&questions);
  let session_id = body.session_id;
  state
    .update_session(&session_id, move |s| {
      s.last_request = Some(gen_req);
      s.questions = questions;
      s.reviews = ReviewSet::new();
    })
    .await
    .ok_or_else(|| ApiError::UnknownSession(session_id.clone()))?;

  info!(target: "mcq", %session_id, questions = rows.len(), "Questions generated");
  Ok(GenerateOut { session_id, questions: rows })
}

#[instrument(level = "info", skip(state, body), fields(session_id = %body.session_id, submitted = body.reviews.len()))]
pub async fn submit_reviews(state: &AppState, body: ReviewsIn) -> Result<ReviewsOut, ApiError> {
  let ReviewsIn { session_id, reviews } = body;

  let summary = state
    .update_session(&session_id, |s| {
      let total = s.questions.len();
      if total == 0 {
        return Err(ApiError::BadRequest("no questions to review yet; generate first".into()));
      }
      if let Some(bad) = reviews.keys().find(|i| **i >= total) {
        return Err(ApiError::BadRequest(format!("question index {bad} is out of range (0..{total})")));
      }
      let set: ReviewSet = (0..total)
        .map(|i| (i, reviews.get(&i).copied().unwrap_or_default()))
        .collect();
      let summary = ReviewSummary::from_set(&set);
      s.reviews = set;
      Ok(summary)
    })
    .await
    .ok_or_else(|| ApiError::UnknownSession(session_id.clone()))??;

  let poor = summary.0.iter().filter(|(_, r)| *r == ReviewLabel::Poor).count();
  info!(target: "mcq", %session_id, reviewed = summary.0.len(), poor, "Reviews submitted");
  Ok(ReviewsOut { session_id, summary })
}

#[instrument(level = "debug", skip(state), fields(%session_id))]
pub async fn session_snapshot(state: &AppState, session_id: &str) -> Result<SessionOut, ApiError> {
  state
    .get_session(session_id)
    .await
    .map(|s| SessionOut::from(&s))
    .ok_or_else(|| ApiError::UnknownSession(session_id.to_string()))
}

#[cfg(test)]
pub(crate) mod tests {
  use std::sync::{Arc, Mutex};

  use futures::future::BoxFuture;
  use serde_json::json;

  use super::*;
  use crate::config::{CompletionSettings, Prompts};
  use crate::domain::Difficulty;
  use crate::openai::{CompletionClient, CompletionError};

  /// Returns a canned reply and remembers every request it saw.
  pub(crate) struct StubCompletion {
    pub reply: String,
    pub seen: Mutex<Vec<CompletionRequest>>,
  }

  impl StubCompletion {
    pub(crate) fn new(reply: impl Into<String>) -> Arc<Self> {
      Arc::new(Self { reply: reply.into(), seen: Mutex::new(Vec::new()) })
    }
  }

  impl CompletionClient for StubCompletion {
    fn complete<'a>(&'a self, req: &'a CompletionRequest) -> BoxFuture<'a, Result<String, CompletionError>> {
      self.seen.lock().unwrap().push(req.clone());
      let reply = self.reply.clone();
      Box::pin(async move { Ok(reply) })
    }
  }

  pub(crate) fn two_questions() -> String {
    json!({ "questions": [
      { "mcq": "What is the basic unit of life?",
        "options": { "a": "Atom", "b": "Cell", "c": "Organ", "d": "Molecule" }, "correct": "b" },
      { "mcq": "Which structure surrounds a cell?",
        "options": { "a": "Membrane", "b": "Nucleus", "c": "Ribosome", "d": "Wall" }, "correct": "a" },
    ]}).to_string()
  }

  pub(crate) fn state_with(stub: Arc<StubCompletion>, key: Option<&str>) -> AppState {
    let settings = CompletionSettings { api_key: key.and_then(ApiKey::new), ..CompletionSettings::default() };
    AppState::with_parts(settings, Prompts::default(), Some(stub as Arc<dyn CompletionClient>))
  }

  fn generate_in(session_id: &str, count: u32) -> GenerateIn {
    GenerateIn {
      session_id: session_id.into(),
      subject: "Biology".into(),
      difficulty: Difficulty::Simple,
      count,
      api_key: None,
    }
  }

  #[tokio::test]
  async fn generate_end_to_end_with_stub() {
    let stub = StubCompletion::new(two_questions());
    let state = state_with(stub.clone(), Some("sk-env"));
    let up = open_session(&state, "cells.txt".into(), b"Cells are the basic unit of life.".to_vec()).await.unwrap();

    let out = generate_mcqs(&state, generate_in(&up.session_id, 2)).await.unwrap();
    assert_eq!(out.questions.len(), 2);
    assert_eq!(out.questions[0].question, "What is the basic unit of life?");
    assert_eq!(out.questions[0].option_b, "Cell");
    assert_eq!(out.questions[1].question, "Which structure surrounds a cell?");
    assert!(out.questions.iter().all(|r| r.correct_label_known));

    let seen = stub.seen.lock().unwrap();
    assert_eq!(seen.len(), 1);
    let req = &seen[0];
    for needle in ["Cells are the basic unit of life.", "Biology", "Simple", "2"] {
      assert!(req.prompt.contains(needle), "prompt is missing {needle:?}");
    }
    assert_eq!(req.api_key.expose(), "sk-env");
    assert_eq!(req.model, "gpt-3.5-turbo");
    assert_eq!(req.max_tokens, 2000);
    drop(seen);

    let s = state.get_session(&up.session_id).await.unwrap();
    assert_eq!(s.questions.len(), 2);
    assert_eq!(s.last_request.unwrap().count, 2);
  }

  #[tokio::test]
  async fn request_key_overrides_configured_key() {
    let stub = StubCompletion::new(two_questions());
    let state = state_with(stub.clone(), Some("sk-env"));
    let up = open_session(&state, "t.txt".into(), b"text".to_vec()).await.unwrap();

    let mut body = generate_in(&up.session_id, 2);
    body.api_key = Some("sk-request".into());
    generate_mcqs(&state, body).await.unwrap();
    assert_eq!(stub.seen.lock().unwrap()[0].api_key.expose(), "sk-request");
  }

  #[tokio::test]
  async fn missing_key_fails_before_calling_out() {
    let stub = StubCompletion::new(two_questions());
    let state = state_with(stub.clone(), None);
    let up = open_session(&state, "t.txt".into(), b"text".to_vec()).await.unwrap();

    let err = generate_mcqs(&state, generate_in(&up.session_id, 2)).await.unwrap_err();
    assert!(matches!(err, ApiError::MissingCredential));
    assert!(stub.seen.lock().unwrap().is_empty());
  }

  #[tokio::test]
  async fn unparseable_reply_leaves_session_untouched() {
    let stub = StubCompletion::new("Sorry, I cannot help with that.");
    let state = state_with(stub, Some("k"));
    let up = open_session(&state, "t.txt".into(), b"text".to_vec()).await.unwrap();

    let err = generate_mcqs(&state, generate_in(&up.session_id, 1)).await.unwrap_err();
    assert!(matches!(err, ApiError::Parse(crate::parser::ParseError::Decode(_))));
    assert!(state.get_session(&up.session_id).await.unwrap().questions.is_empty());
  }

  #[tokio::test]
  async fn zero_count_and_unknown_session_are_rejected() {
    let state = state_with(StubCompletion::new(two_questions()), Some("k"));
    let up = open_session(&state, "t.txt".into(), b"text".to_vec()).await.unwrap();

    assert!(matches!(generate_mcqs(&state, generate_in(&up.session_id, 0)).await, Err(ApiError::BadRequest(_))));
    assert!(matches!(generate_mcqs(&state, generate_in("nope", 1)).await, Err(ApiError::UnknownSession(_))));
  }

  #[tokio::test]
  async fn empty_or_binary_upload_is_rejected() {
    let state = state_with(StubCompletion::new(two_questions()), Some("k"));
    assert!(matches!(open_session(&state, "e.txt".into(), Vec::new()).await, Err(ApiError::BadRequest(_))));
    assert!(matches!(open_session(&state, "w.txt".into(), b" \n\t".to_vec()).await, Err(ApiError::BadRequest(_))));
    assert!(matches!(open_session(&state, "b.txt".into(), vec![0xff, 0xfe, 0x00]).await, Err(ApiError::BadRequest(_))));
    assert!(state.sessions.read().await.is_empty());
  }

  #[tokio::test]
  async fn reviews_default_to_good_and_are_ordered() {
    let state = state_with(StubCompletion::new(two_questions()), Some("k"));
    let up = open_session(&state, "t.txt".into(), b"text".to_vec()).await.unwrap();
    generate_mcqs(&state, generate_in(&up.session_id, 2)).await.unwrap();

    let body = ReviewsIn { session_id: up.session_id.clone(), reviews: [(1, ReviewLabel::Poor)].into_iter().collect() };
    let out = submit_reviews(&state, body).await.unwrap();
    assert_eq!(out.summary.0, vec![(0, ReviewLabel::Good), (1, ReviewLabel::Poor)]);
    assert_eq!(
      serde_json::to_value(&out.summary).unwrap(),
      json!({ "Question 1": "Good", "Question 2": "Poor" })
    );

    let snap = session_snapshot(&state, &up.session_id).await.unwrap();
    assert_eq!(snap.reviews, out.summary);
    assert_eq!(snap.subject.as_deref(), Some("Biology"));
  }

  #[tokio::test]
  async fn reviews_out_of_range_or_before_generate_are_rejected() {
    let state = state_with(StubCompletion::new(two_questions()), Some("k"));
    let up = open_session(&state, "t.txt".into(), b"text".to_vec()).await.unwrap();

    let early = ReviewsIn { session_id: up.session_id.clone(), reviews: Default::default() };
    assert!(matches!(submit_reviews(&state, early).await, Err(ApiError::BadRequest(_))));

    generate_mcqs(&state, generate_in(&up.session_id, 2)).await.unwrap();
    let bad = ReviewsIn { session_id: up.session_id.clone(), reviews: [(2, ReviewLabel::Average)].into_iter().collect() };
    assert!(matches!(submit_reviews(&state, bad).await, Err(ApiError::BadRequest(_))));

    let unknown = ReviewsIn { session_id: "missing".into(), reviews: Default::default() };
    assert!(matches!(submit_reviews(&state, unknown).await, Err(ApiError::UnknownSession(_))));
  }

  #[tokio::test]
  async fn regenerate_clears_previous_reviews() {
    let state = state_with(StubCompletion::new(two_questions()), Some("k"));
    let up = open_session(&state, "t.txt".into(), b"text".to_vec()).await.unwrap();
    generate_mcqs(&state, generate_in(&up.session_id, 2)).await.unwrap();
    submit_reviews(&state, ReviewsIn { session_id: up.session_id.clone(), reviews: Default::default() }).await.unwrap();
    assert_eq!(state.get_session(&up.session_id).await.unwrap().reviews.len(), 2);

    generate_mcqs(&state, generate_in(&up.session_id, 2)).await.unwrap();
    assert!(state.get_session(&up.session_id).await.unwrap().reviews.is_empty());
  }
}
