//! Decoding the model's reply into question records.
//!
//! Accepted input is a JSON object whose `questions` key holds an array of
//! `{ "mcq", "options": {a,b,c,d}, "correct" }` objects. One surrounding Markdown code
//! fence is tolerated; any other wrapping prose is a decode error.
//!
//! A `correct` value that is not one of the option labels is passed through as-is;
//! callers can check `QuestionRecord::has_known_correct_label`.

use serde::Deserialize;
use serde_json::Value;

use crate::domain::QuestionRecord;
use crate::util::strip_code_fence;

#[derive(Debug, thiserror::Error)]
pub enum ParseError {
  #[error("model output is not valid JSON: {0}")]
  Decode(#[source] serde_json::Error),

  #[error("model output has no \"questions\" key")]
  MissingQuestions,

  #[error("\"questions\" is not an array")]
  NotAnArray,

  #[error("question {index} is malformed: {source}")]
  InvalidRecord {
    index: usize,
    #[source]
    source: serde_json::Error,
  },
}

/// Parse the raw completion text into an ordered list of questions.
pub fn parse_questions(raw: &str) -> Result<Vec<QuestionRecord>, ParseError> {
  let doc: Value = serde_json::from_str(strip_code_fence(raw)).map_err(ParseError::Decode)?;
  let questions = doc.get("questions").ok_or(ParseError::MissingQuestions)?;
  let items = questions.as_array().ok_or(ParseError::NotAnArray)?;

  items
    .iter()
    .enumerate()
    .map(|(index, item)| {
      QuestionRecord::deserialize(item).map_err(|source| ParseError::InvalidRecord { index, source })
    })
    .collect()
}
