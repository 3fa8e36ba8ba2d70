//! Offline catalog: quizzes known to this process plus an in-memory result history.

use std::{collections::HashMap, sync::Arc};

use async_trait::async_trait;
use tokio::sync::RwLock;
use tracing::{debug, info, instrument, warn};

use super::QuizCatalog;
use crate::domain::{Quiz, QuizResult, QuizSummary, Submission};
use crate::error::CatalogError;
use crate::scorer;
use crate::stats::{self, Dashboard, LeaderboardEntry, LEADERBOARD_SIZE};

/// Results per player, oldest first.
pub type ResultHistory = HashMap<String, Vec<QuizResult>>;

#[derive(Clone, Default)]
pub struct LocalCatalog {
  by_id: Arc<HashMap<String, Quiz>>,
  order: Arc<Vec<String>>,
  history: Arc<RwLock<ResultHistory>>,
}

impl LocalCatalog {
  /// Build from quizzes in priority order. A repeated id keeps the first entry.
  pub fn new(quizzes: Vec<Quiz>) -> Self {
    let mut by_id = HashMap::new();
    let mut order = Vec::new();
    for quiz in quizzes {
      if by_id.contains_key(&quiz.id) {
        warn!(target: "catalog", id = %quiz.id, "Duplicate local quiz id; keeping the first");
        continue;
      }
      order.push(quiz.id.clone());
      by_id.insert(quiz.id.clone(), quiz);
    }
    Self {
      by_id: Arc::new(by_id),
      order: Arc::new(order),
      history: Arc::new(RwLock::new(HashMap::new())),
    }
  }

  pub fn quiz_count(&self) -> usize {
    self.order.len()
  }

  pub fn contains(&self, id: &str) -> bool {
    self.by_id.contains_key(id)
  }

  /// Append a finished result to `player`'s history.
  #[instrument(level = "debug", skip(self, result), fields(%player, result_id = %result.id))]
  pub async fn record(&self, player: &str, result: QuizResult) {
    let mut history = self.history.write().await;
    history.entry(player.to_string()).or_default().push(result);
  }

  /// `player`'s results, most recent first.
  pub async fn results_for(&self, player: &str) -> Vec<QuizResult> {
    let history = self.history.read().await;
    let mut results = history.get(player).cloned().unwrap_or_default();
    results.reverse();
    results
  }

  pub async fn history_snapshot(&self) -> ResultHistory {
    self.history.read().await.clone()
  }
}

#[async_trait]
impl QuizCatalog for LocalCatalog {
  fn name(&self) -> &'static str {
    "local"
  }

  async fn list_quizzes(&self) -> Result<Vec<QuizSummary>, CatalogError> {
    Ok(self.order.iter().filter_map(|id| self.by_id.get(id)).map(Quiz::summary).collect())
  }

  async fn fetch_quiz(&self, id: &str) -> Result<Quiz, CatalogError> {
    self.by_id.get(id).cloned().ok_or_else(|| CatalogError::NotFound(format!("quiz {id}")))
  }

  #[instrument(level = "info", skip(self, submission, _credential), fields(quiz_id = %submission.quiz_id, player = %submission.player))]
  async fn submit_result(
    &self,
    submission: &Submission,
    _credential: Option<&str>,
  ) -> Result<QuizResult, CatalogError> {
    let quiz = self.fetch_quiz(&submission.quiz_id).await?;
    if !quiz.has_answer_key() {
      return Err(CatalogError::InvalidQuiz(format!("quiz {} has no local answer key", quiz.id)));
    }
    let scorecard = scorer::score(&quiz.questions, &submission.answers);
    let result = QuizResult::scored_locally(&quiz, scorecard, submission.time_taken_secs);
    info!(target: "catalog", result_id = %result.id, score = result.scorecard.score, total = result.scorecard.total_questions, "Scored submission locally");
    self.record(&submission.player, result.clone()).await;
    Ok(result)
  }

  async fn fetch_result(&self, id: &str, _credential: Option<&str>) -> Result<QuizResult, CatalogError> {
    let history = self.history.read().await;
    let found = history.values().flatten().find(|r| r.id == id).cloned();
    debug!(target: "catalog", %id, found = found.is_some(), "Local result lookup");
    found.ok_or_else(|| CatalogError::NotFound(format!("result {id}")))
  }

  async fn list_results(&self, player: &str, _credential: Option<&str>) -> Result<Vec<QuizResult>, CatalogError> {
    Ok(self.results_for(player).await)
  }

  async fn dashboard(&self, player: &str, _credential: Option<&str>) -> Result<Dashboard, CatalogError> {
    Ok(stats::dashboard(player, self.results_for(player).await))
  }

  async fn leaderboard(&self) -> Result<Vec<LeaderboardEntry>, CatalogError> {
    Ok(stats::leaderboard(&self.history_snapshot().await, LEADERBOARD_SIZE))
  }
}
