//! Public protocol structs for the HTTP endpoints (serde ready).
//! Field names are camelCase on the wire to match the browser form.

use std::collections::BTreeMap;

use serde::{ser::SerializeMap, Deserialize, Serialize, Serializer};

use crate::domain::{Difficulty, QuestionRecord, ReviewLabel, ReviewSet};
use crate::state::Session;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadOut {
    pub session_id: String,
    pub file_name: String,
    pub text: String,
    pub chars: usize,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateIn {
    pub session_id: String,
    #[serde(default)]
    pub subject: String,
    #[serde(default)]
    pub difficulty: Difficulty,
    pub count: u32,
    /// Per-request credential; overrides the configured key for this call only.
    #[serde(default)]
    pub api_key: Option<String>,
}

/// One row of the rendered question table.
#[derive(Debug, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct QuestionRow {
    pub number: usize,
    pub question: String,
    pub option_a: String,
    pub option_b: String,
    pub option_c: String,
    pub option_d: String,
    pub correct_answer: String,
    pub correct_label_known: bool,
}

impl QuestionRow {
    pub fn from_record(index: usize, q: &QuestionRecord) -> Self {
        Self {
            number: index + 1,
            question: q.prompt.clone(),
            option_a: q.options.a.clone(),
            option_b: q.options.b.clone(),
            option_c: q.options.c.clone(),
            option_d: q.options.d.clone(),
            correct_answer: q.correct_label.clone(),
            correct_label_known: q.has_known_correct_label(),
        }
    }
}

pub fn to_rows(questions: &[QuestionRecord]) -> Vec<QuestionRow> {
    questions.iter().enumerate().map(|(i, q)| QuestionRow::from_record(i, q)).collect()
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateOut {
    pub session_id: String,
    pub questions: Vec<QuestionRow>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReviewsIn {
    pub session_id: String,
    /// 0-based question index -> label. Missing indices count as Good.
    #[serde(default)]
    pub reviews: BTreeMap<usize, ReviewLabel>,
}

/// `{"Question 1": "Good", "Question 2": "Poor", ...}` in question order.
#[derive(Debug, Clone, PartialEq)]
pub struct ReviewSummary(pub Vec<(usize, ReviewLabel)>);

impl ReviewSummary {
    pub fn from_set(set: &ReviewSet) -> Self {
        Self(set.iter().map(|(i, r)| (*i, *r)).collect())
    }
}

impl Serialize for ReviewSummary {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.0.len()))?;
        for (index, label) in &self.0 {
            map.serialize_entry(&format!("Question {}", index + 1), label)?;
        }
        map.end()
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReviewsOut {
    pub session_id: String,
    pub summary: ReviewSummary,
}

/// Full re-render of one session.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionOut {
    pub session_id: String,
    pub file_name: String,
    pub text: String,
    pub subject: Option<String>,
    pub difficulty: Option<Difficulty>,
    pub count: Option<u32>,
    pub questions: Vec<QuestionRow>,
    pub reviews: ReviewSummary,
}

impl From<&Session> for SessionOut {
    fn from(s: &Session) -> Self {
        Self {
            session_id: s.id.clone(),
            file_name: s.file_name.clone(),
            text: s.text.clone(),
            subject: s.last_request.as_ref().map(|r| r.subject.clone()),
            difficulty: s.last_request.as_ref().map(|r| r.difficulty),
            count: s.last_request.as_ref().map(|r| r.count),
            questions: to_rows(&s.questions),
            reviews: ReviewSummary::from_set(&s.reviews),
        }
    }
}

#[derive(Serialize)]
pub struct HealthOut {
    pub ok: bool,
}
