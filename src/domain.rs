//! Domain models: generation inputs, question records as the model returns them, and reviews.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

/// Difficulty label. Only changes the prompt wording.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Difficulty {
  Simple,
  Medium,
  Complex,
}
impl Default for Difficulty {
  fn default() -> Self { Difficulty::Simple }
}
impl fmt::Display for Difficulty {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    let s = match self {
      Difficulty::Simple => "Simple",
      Difficulty::Medium => "Medium",
      Difficulty::Complex => "Complex",
    };
    f.write_str(s)
  }
}

/// Everything the prompt needs for one "Generate" press. Never stored beyond the session.
#[derive(Clone, Debug)]
pub struct GenerationRequest {
  pub text: String,
  pub subject: String,
  pub difficulty: Difficulty,
  pub count: u32,
}

/// The four answer choices. All four keys are required on the wire.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuestionOptions {
  pub a: String,
  pub b: String,
  pub c: String,
  pub d: String,
}

impl QuestionOptions {
  /// Look up an option by its label ("a".."d", case-insensitive, surrounding space ignored).
  pub fn get(&self, label: &str) -> Option<&str> {
    match label.trim().to_ascii_lowercase().as_str() {
      "a" => Some(&self.a),
      "b" => Some(&self.b),
      "c" => Some(&self.c),
      "d" => Some(&self.d),
      _ => None,
    }
  }
}

/// One multiple-choice question, field names as they appear in the model's JSON.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuestionRecord {
  #[serde(rename = "mcq")]
  pub prompt: String,
  pub options: QuestionOptions,
  #[serde(rename = "correct")]
  pub correct_label: String,
}

impl QuestionRecord {
  /// The text of the option named by `correct_label`, if the label is one of a..d.
  pub fn correct_option(&self) -> Option<&str> {
    self.options.get(&self.correct_label)
  }

  /// Whether `correct_label` names one of the four options.
  /// Models sometimes answer with the option text instead of its label.
  pub fn has_known_correct_label(&self) -> bool {
    self.correct_option().is_some()
  }
}

/// Reviewer verdict for a single question.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum ReviewLabel {
  Good,
  Average,
  Poor,
}
impl Default for ReviewLabel {
  fn default() -> Self { ReviewLabel::Good }
}

/// Reviews keyed by 0-based question index.
pub type ReviewSet = BTreeMap<usize, ReviewLabel>;

#[cfg(test)]
mod tests {
  use super::*;

  fn record(correct: &str) -> QuestionRecord {
    QuestionRecord {
      prompt: "What is the basic unit of life?".into(),
      options: QuestionOptions { a: "Atom".into(), b: "Cell".into(), c: "Organ".into(), d: "Tissue".into() },
      correct_label: correct.into(),
    }
  }

  #[test]
  fn correct_option_resolves_labels_loosely() {
    assert_eq!(record("b").correct_option(), Some("Cell"));
    assert_eq!(record(" B ").correct_option(), Some("Cell"));
    assert!(record("d").has_known_correct_label());
  }

  #[test]
  fn answer_text_instead_of_label_is_not_a_known_label() {
    let r = record("Cell");
    assert_eq!(r.correct_option(), None);
    assert!(!r.has_known_correct_label());
  }

  #[test]
  fn difficulty_round_trips_through_its_display_name() {
    for d in [Difficulty::Simple, Difficulty::Medium, Difficulty::Complex] {
      let json = serde_json::to_string(&d).unwrap();
      assert_eq!(json, format!("\"{}\"", d));
      let back: Difficulty = serde_json::from_str(&json).unwrap();
      assert_eq!(back, d);
    }
    assert!(serde_json::from_str::<Difficulty>("\"Hard\"").is_err());
  }

  #[test]
  fn review_label_defaults_to_good() {
    assert_eq!(ReviewLabel::default(), ReviewLabel::Good);
  }
}
