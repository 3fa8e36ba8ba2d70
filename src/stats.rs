//! Aggregates over stored results: per-player stats, dashboard and leaderboard.

use serde::{Deserialize, Serialize};

use crate::catalog::local::ResultHistory;
use crate::domain::QuizResult;

pub const LEADERBOARD_SIZE: usize = 20;
pub const RECENT_RESULTS: usize = 10;

#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct PlayerStats {
  pub total_quizzes: usize,
  /// Mean percentage, two decimals.
  pub average_score: f64,
  pub best_score: f64,
  pub total_points: usize,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct LeaderboardEntry {
  pub name: String,
  #[serde(flatten)]
  pub stats: PlayerStats,
}

#[derive(Clone, Debug, Serialize)]
pub struct Dashboard {
  pub player: String,
  pub stats: PlayerStats,
  pub recent_results: Vec<QuizResult>,
}

pub fn player_stats(results: &[QuizResult]) -> PlayerStats {
  if results.is_empty() {
    return PlayerStats::default();
  }
  let sum: f64 = results.iter().map(|r| r.scorecard.percentage).sum();
  let best = results.iter().map(|r| r.scorecard.percentage).fold(0.0_f64, f64::max);
  PlayerStats {
    total_quizzes: results.len(),
    average_score: round2(sum / results.len() as f64),
    best_score: best,
    total_points: results.iter().map(|r| r.scorecard.score).sum(),
  }
}

/// Players with at least one result, best average first. Ties go by name.
pub fn leaderboard(history: &ResultHistory, limit: usize) -> Vec<LeaderboardEntry> {
  let mut entries: Vec<LeaderboardEntry> = history
    .iter()
    .filter(|(_, results)| !results.is_empty())
    .map(|(name, results)| LeaderboardEntry { name: name.clone(), stats: player_stats(results) })
    .collect();
  entries.sort_by(|a, b| {
    b.stats
      .average_score
      .total_cmp(&a.stats.average_score)
      .then_with(|| a.name.cmp(&b.name))
  });
  entries.truncate(limit);
  entries
}

/// `results` must already be ordered most recent first.
pub fn dashboard(player: &str, results: Vec<QuizResult>) -> Dashboard {
  let stats = player_stats(&results);
  let recent_results = results.into_iter().take(RECENT_RESULTS).collect();
  Dashboard { player: player.to_string(), stats, recent_results }
}

fn round2(v: f64) -> f64 {
  (v * 100.0).round() / 100.0
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::domain::fixtures::quiz_with_keys;
  use crate::scorer;

  fn result(correct: &[usize], answers: &[Option<usize>]) -> QuizResult {
    let quiz = quiz_with_keys("s", correct, None);
    QuizResult::scored_locally(&quiz, scorer::score(&quiz.questions, answers), 10)
  }

  #[test]
  fn stats_for_no_results_are_zero() {
    assert_eq!(player_stats(&[]), PlayerStats::default());
  }

  #[test]
  fn stats_average_best_and_points() {
    let results = vec![
      result(&[0, 0, 0], &[Some(0), None, None]),       // 33.33
      result(&[0, 0], &[Some(0), Some(0)]),             // 100
      result(&[1, 1, 1, 1], &[Some(1), Some(1), None, None]), // 50
    ];
    let s = player_stats(&results);
    assert_eq!(s.total_quizzes, 3);
    assert_eq!(s.average_score, 61.11);
    assert_eq!(s.best_score, 100.0);
    assert_eq!(s.total_points, 5);
  }

  #[test]
  fn leaderboard_orders_by_average_then_name_and_truncates() {
    let mut history = ResultHistory::new();
    history.insert("cy".into(), vec![result(&[0], &[Some(0)])]);
    history.insert("al".into(), vec![result(&[0], &[Some(0)])]);
    history.insert("bo".into(), vec![result(&[0], &[None])]);
    history.insert("idle".into(), vec![]);

    let board = leaderboard(&history, LEADERBOARD_SIZE);
    let names: Vec<&str> = board.iter().map(|e| e.name.as_str()).collect();
    assert_eq!(names, vec!["al", "cy", "bo"]);
    assert_eq!(leaderboard(&history, 1).len(), 1);
  }

  #[test]
  fn dashboard_keeps_ten_most_recent() {
    let results: Vec<QuizResult> = (0..12).map(|_| result(&[0], &[Some(0)])).collect();
    let d = dashboard("ada", results);
    assert_eq!(d.recent_results.len(), RECENT_RESULTS);
    assert_eq!(d.stats.total_quizzes, 12);
  }
}
