//! Core behaviors shared by both HTTP and WebSocket handlers.
//!
//! This includes:
//!   - Settling a submission with the right scoring authority
//!   - Stateless answer submission (HTTP)
//!   - Result history, dashboard and leaderboard

use tracing::{info, instrument, warn};

use crate::catalog::QuizCatalog;
use crate::domain::{Quiz, QuizOrigin, QuizResult, Submission};
use crate::error::{CatalogError, SessionError};
use crate::protocol::SubmitIn;
use crate::scorer;
use crate::state::AppState;
use crate::stats::{Dashboard, LeaderboardEntry};

/// Turn a submission into the result the player gets to see.
///
/// Remote-origin quizzes are scored by the remote catalog. If it cannot be
/// reached and the quiz carries a full answer key, the submission is scored
/// here and kept in the offline history instead. Local-origin quizzes never
/// leave the process. `local` is a result already computed by a session; it
/// is reused rather than re-scored.
#[instrument(level = "info", skip(state, quiz, submission, credential, local), fields(quiz_id = %quiz.id, origin = ?quiz.origin, player = %submission.player))]
pub async fn settle_result(
  state: &AppState,
  quiz: &Quiz,
  submission: &Submission,
  credential: Option<&str>,
  local: Option<QuizResult>,
) -> Result<QuizResult, CatalogError> {
  if quiz.origin == QuizOrigin::Local {
    return record_offline(state, quiz, submission, local).await;
  }

  let remote_err = match &state.remote {
    Some(remote) => match remote.submit_result(submission, credential).await {
      Ok(result) => return Ok(result),
      Err(e) if e.is_network() => e,
      Err(e) => return Err(e),
    },
    None => CatalogError::Network("remote catalog is not configured".into()),
  };

  if !quiz.has_answer_key() {
    return Err(remote_err);
  }
  warn!(target: "catalog", quiz_id = %quiz.id, error = %remote_err, "Remote scoring unavailable; scoring offline");
  record_offline(state, quiz, submission, local).await
}

async fn record_offline(
  state: &AppState,
  quiz: &Quiz,
  submission: &Submission,
  local: Option<QuizResult>,
) -> Result<QuizResult, CatalogError> {
  match local {
    Some(result) => {
      state.offline.record(&submission.player, result.clone()).await;
      Ok(result)
    }
    None if quiz.origin == QuizOrigin::Local => state.offline.submit_result(submission, None).await,
    None => {
      let card = scorer::score(&quiz.questions, &submission.answers);
      let result = QuizResult::scored_locally(quiz, card, submission.time_taken_secs);
      state.offline.record(&submission.player, result.clone()).await;
      Ok(result)
    }
  }
}

/// Stateless submission: fetch the quiz, check the answers fit it, settle.
#[instrument(level = "info", skip(state, input, credential), fields(%quiz_id, answers = input.answers.len()))]
pub async fn submit_answers(
  state: &AppState,
  quiz_id: &str,
  input: SubmitIn,
  credential: Option<&str>,
) -> Result<QuizResult, CatalogError> {
  let quiz = state.fetch_quiz(quiz_id).await?;
  check_answers(&quiz, &input.answers)?;

  let submission = Submission {
    quiz_id: quiz.id.clone(),
    answers: input.answers,
    time_taken_secs: input.time_taken,
    player: normalize_player(input.player.as_deref()),
  };
  let result = settle_result(state, &quiz, &submission, credential, None).await?;
  info!(target: "quizmaster_backend", result_id = %result.id, score = result.scorecard.score, scored_by = ?result.scored_by, "Submission settled");
  Ok(result)
}

fn check_answers(quiz: &Quiz, answers: &[Option<usize>]) -> Result<(), SessionError> {
  for (question, answer) in quiz.questions.iter().zip(answers) {
    if let Some(option) = *answer {
      if option >= question.options.len() {
        return Err(SessionError::IndexOutOfRange { option, options: question.options.len() });
      }
    }
  }
  Ok(())
}

/// Trimmed player name, `guest` when blank.
pub fn normalize_player(player: Option<&str>) -> String {
  match player.map(str::trim) {
    Some(p) if !p.is_empty() => p.to_string(),
    _ => crate::protocol::DEFAULT_PLAYER.to_string(),
  }
}

pub async fn list_results(
  state: &AppState,
  player: Option<&str>,
  credential: Option<&str>,
) -> Result<Vec<QuizResult>, CatalogError> {
  state.list_results(&normalize_player(player), credential).await
}

pub async fn dashboard(state: &AppState, player: Option<&str>, credential: Option<&str>) -> Result<Dashboard, CatalogError> {
  state.dashboard(&normalize_player(player), credential).await
}

pub async fn leaderboard(state: &AppState) -> Result<Vec<LeaderboardEntry>, CatalogError> {
  state.leaderboard().await
}
