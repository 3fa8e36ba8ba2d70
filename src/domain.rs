//! Domain models: quizzes, questions, results, and where each of them came from.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// How hard a quiz claims to be.
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "lowercase")]
pub enum Difficulty {
  Easy,
  #[default]
  Medium,
  Hard,
}

/// Which catalog handed us the quiz? Decides who scores a submission.
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum QuizOrigin {
  Remote,  // authoritative QuizMaster API
  Local,   // built-in seeds or the TOML bank (offline/demo)
}

/// Who computed the numbers on a result.
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ScoringAuthority {
  Local,
  Remote,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct Question {
  pub id: String,
  pub prompt: String,
  pub options: Vec<String>,
  /// `None` when the serving catalog withholds the answer key.
  #[serde(default)]
  pub correct_index: Option<usize>,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct Quiz {
  pub id: String,
  pub title: String,
  #[serde(default)] pub description: String,
  #[serde(default)] pub difficulty: Difficulty,
  #[serde(default)] pub category: String,
  pub questions: Vec<Question>,
  /// Seconds. `None` means unlimited.
  #[serde(default)] pub time_limit: Option<u32>,
  pub origin: QuizOrigin,
}

impl Quiz {
  /// Time limit with `Some(0)` folded into "unlimited".
  pub fn effective_time_limit(&self) -> Option<u32> {
    self.time_limit.filter(|secs| *secs > 0)
  }

  /// True when every question carries an answer key, i.e. local scoring is meaningful.
  pub fn has_answer_key(&self) -> bool {
    self.questions.iter().all(|q| q.correct_index.is_some())
  }

  /// Copy safe to hand to a player: answer keys removed.
  pub fn without_answers(&self) -> Quiz {
    let mut public = self.clone();
    for q in &mut public.questions {
      q.correct_index = None;
    }
    public
  }

  pub fn summary(&self) -> QuizSummary {
    QuizSummary {
      id: self.id.clone(),
      title: self.title.clone(),
      description: self.description.clone(),
      difficulty: self.difficulty,
      category: self.category.clone(),
      total_questions: self.questions.len(),
      time_limit: self.effective_time_limit(),
      origin: self.origin,
    }
  }
}

/// Catalog list entry.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct QuizSummary {
  pub id: String,
  pub title: String,
  pub description: String,
  pub difficulty: Difficulty,
  pub category: String,
  pub total_questions: usize,
  pub time_limit: Option<u32>,
  pub origin: QuizOrigin,
}

/// One reviewed question of a scored attempt.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct QuestionReview {
  pub question_id: String,
  pub selected: Option<usize>,
  pub correct_index: Option<usize>,
  pub is_correct: bool,
}

/// Output of the scorer. Percentage is kept unrounded.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct Scorecard {
  pub score: usize,
  pub total_questions: usize,
  pub percentage: f64,
  pub review: Vec<QuestionReview>,
}

impl Scorecard {
  /// Display value, rounded half-up to a whole percent (1/3 shows as 33).
  pub fn rounded_percentage(&self) -> u32 {
    self.percentage.max(0.0).round() as u32
  }
}

/// A finished attempt. Immutable once produced.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct QuizResult {
  pub id: String,
  pub quiz_id: String,
  pub quiz_title: String,
  #[serde(flatten)]
  pub scorecard: Scorecard,
  pub time_taken_secs: u64,
  pub scored_by: ScoringAuthority,
  pub attempted_at: DateTime<Utc>,
}

impl QuizResult {
  /// Wrap a locally computed scorecard into a fresh result for `quiz`.
  pub fn scored_locally(quiz: &Quiz, scorecard: Scorecard, time_taken_secs: u64) -> Self {
    Self {
      id: Uuid::new_v4().to_string(),
      quiz_id: quiz.id.clone(),
      quiz_title: quiz.title.clone(),
      scorecard,
      time_taken_secs,
      scored_by: ScoringAuthority::Local,
      attempted_at: Utc::now(),
    }
  }
}

/// What a caller hands a catalog when submitting answers.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct Submission {
  pub quiz_id: String,
  pub answers: Vec<Option<usize>>,
  pub time_taken_secs: u64,
  pub player: String,
}
