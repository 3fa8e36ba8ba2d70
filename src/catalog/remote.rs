//! Minimal client for the QuizMaster HTTP API.
//!
//! Routes (relative to the configured base URL, e.g. `http://127.0.0.1:5000/api`):
//!   GET  /quizzes              -> {"quizzes": [...]}      (answer keys stripped)
//!   GET  /quizzes/{id}         -> quiz                    (answer keys stripped)
//!   POST /quizzes/{id}/submit  -> {"result": {...}}       (bearer)
//!   GET  /results/{id}         -> {"result", "quiz", "user_answers"} (bearer, keys included)
//!   GET  /results              -> {"results": [...]}      (bearer, most recent first)
//!   GET  /dashboard            -> {"user", "stats", "recent_results"} (bearer)
//!   GET  /leaderboard          -> {"leaderboard": [...]}
//!
//! NOTE: We never log the bearer credential.

use std::fmt;

use async_trait::async_trait;
use chrono::{NaiveDateTime, Utc};
use reqwest::header::{AUTHORIZATION, CONTENT_TYPE, USER_AGENT};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use tracing::{error, info, instrument, warn};

use super::QuizCatalog;
use crate::config::RemoteSettings;
use crate::domain::{
  Difficulty, Question, QuestionReview, Quiz, QuizOrigin, QuizResult, QuizSummary, Scorecard, ScoringAuthority,
  Submission,
};
use crate::error::CatalogError;
use crate::scorer;
use crate::stats::{Dashboard, LeaderboardEntry, PlayerStats};
use crate::util::trunc_for_log;

const UA: &str = "quizmaster-backend/0.1";

#[derive(Clone)]
pub struct RemoteCatalog {
  pub client: reqwest::Client,
  pub base_url: String,
}

impl RemoteCatalog {
  pub fn new(settings: &RemoteSettings) -> Result<Self, CatalogError> {
    let client = reqwest::Client::builder().timeout(settings.timeout).build()?;
    Ok(Self { client, base_url: settings.base_url.clone() })
  }

  fn url(&self, path: &str) -> String {
    format!("{}{}", self.base_url, path)
  }

  #[instrument(level = "debug", skip(self, credential), fields(%path))]
  async fn get_json<T: DeserializeOwned>(&self, path: &str, credential: Option<&str>) -> Result<T, CatalogError> {
    let mut req = self.client.get(self.url(path)).header(USER_AGENT, UA);
    if let Some(token) = credential {
      req = req.header(AUTHORIZATION, format!("Bearer {}", token));
    }
    let res = req.send().await?;
    decode(res).await
  }

  #[instrument(level = "debug", skip(self, body, credential), fields(%path))]
  async fn post_json<B: Serialize + Sync, T: DeserializeOwned>(
    &self,
    path: &str,
    body: &B,
    credential: &str,
  ) -> Result<T, CatalogError> {
    let res = self
      .client
      .post(self.url(path))
      .header(USER_AGENT, UA)
      .header(CONTENT_TYPE, "application/json")
      .header(AUTHORIZATION, format!("Bearer {}", credential))
      .json(body)
      .send()
      .await?;
    decode(res).await
  }
}

/// Authenticated routes never go out without a credential.
fn bearer(credential: Option<&str>) -> Result<&str, CatalogError> {
  credential.ok_or_else(|| CatalogError::Unauthorized("missing bearer credential".into()))
}

/// Map non-success statuses to catalog errors and decode the body otherwise.
async fn decode<T: DeserializeOwned>(res: reqwest::Response) -> Result<T, CatalogError> {
  let status = res.status();
  if !status.is_success() {
    let body = res.text().await.unwrap_or_default();
    let message = extract_api_message(&body).unwrap_or_else(|| trunc_for_log(&body, 200));
    error!(target: "catalog", status = status.as_u16(), %message, "QuizMaster API request failed");
    return Err(match status.as_u16() {
      404 => CatalogError::NotFound(message),
      401 | 403 => CatalogError::Unauthorized(message),
      code => CatalogError::Remote { status: code, message },
    });
  }
  let bytes = res.bytes().await?;
  serde_json::from_slice(&bytes).map_err(|e| CatalogError::Decode(e.to_string()))
}

/// Error bodies look like `{"message": "..."}`.
fn extract_api_message(body: &str) -> Option<String> {
  #[derive(Deserialize)]
  struct ApiMessage {
    message: String,
  }
  serde_json::from_str::<ApiMessage>(body).ok().map(|m| m.message)
}

#[async_trait]
impl QuizCatalog for RemoteCatalog {
  fn name(&self) -> &'static str {
    "remote"
  }

  #[instrument(level = "info", skip(self))]
  async fn list_quizzes(&self) -> Result<Vec<QuizSummary>, CatalogError> {
    let list: QuizListDto = self.get_json("/quizzes", None).await?;
    info!(target: "catalog", count = list.quizzes.len(), "Fetched remote quiz list");
    Ok(list.quizzes.into_iter().map(|q| q.into_quiz().summary()).collect())
  }

  #[instrument(level = "info", skip(self), fields(%id))]
  async fn fetch_quiz(&self, id: &str) -> Result<Quiz, CatalogError> {
    let dto: QuizDto = self.get_json(&format!("/quizzes/{id}"), None).await?;
    Ok(dto.into_quiz())
  }

  #[instrument(level = "info", skip(self, submission, credential), fields(quiz_id = %submission.quiz_id, answers = submission.answers.len()))]
  async fn submit_result(
    &self,
    submission: &Submission,
    credential: Option<&str>,
  ) -> Result<QuizResult, CatalogError> {
    let token = bearer(credential)?;
    let body = SubmitDto { answers: &submission.answers, time_taken: submission.time_taken_secs };
    let res: SubmitResponseDto = self
      .post_json(&format!("/quizzes/{}/submit", submission.quiz_id), &body, token)
      .await?;
    let mut result = res.result.into_result(Vec::new());
    info!(target: "catalog", result_id = %result.id, score = result.scorecard.score, "Remote scored submission");

    // The submit response carries no answer key; the stored result does.
    match self.fetch_result(&result.id, Some(token)).await {
      Ok(stored) => result.scorecard.review = stored.scorecard.review,
      Err(e) => {
        warn!(target: "catalog", result_id = %result.id, error = %e, "Could not load review for remote result");
      }
    }
    Ok(result)
  }

  #[instrument(level = "info", skip(self, credential), fields(%id))]
  async fn fetch_result(&self, id: &str, credential: Option<&str>) -> Result<QuizResult, CatalogError> {
    let token = bearer(credential)?;
    let dto: ResultDetailDto = self.get_json(&format!("/results/{id}"), Some(token)).await?;
    let quiz = dto.quiz.into_quiz();
    // Score and percentage stay the server's; only the breakdown is computed here.
    let review = scorer::score(&quiz.questions, &dto.user_answers).review;
    Ok(dto.result.into_result(review))
  }

  #[instrument(level = "info", skip(self, credential))]
  async fn list_results(&self, _player: &str, credential: Option<&str>) -> Result<Vec<QuizResult>, CatalogError> {
    let dto: ResultListDto = self.get_json("/results", Some(bearer(credential)?)).await?;
    Ok(dto.results.into_iter().map(|r| r.into_result(Vec::new())).collect())
  }

  #[instrument(level = "info", skip(self, credential))]
  async fn dashboard(&self, player: &str, credential: Option<&str>) -> Result<Dashboard, CatalogError> {
    let dto: DashboardDto = self.get_json("/dashboard", Some(bearer(credential)?)).await?;
    Ok(Dashboard {
      player: dto.user.and_then(|u| u.name).unwrap_or_else(|| player.to_string()),
      stats: dto.stats,
      recent_results: dto.recent_results.into_iter().map(|r| r.into_result(Vec::new())).collect(),
    })
  }

  #[instrument(level = "info", skip(self))]
  async fn leaderboard(&self) -> Result<Vec<LeaderboardEntry>, CatalogError> {
    let dto: LeaderboardDto = self.get_json("/leaderboard", None).await?;
    Ok(dto.leaderboard)
  }
}

//
// Wire DTOs (QuizMaster API)
//

/// Ids arrive as integers from the API; accept strings too.
#[derive(Deserialize)]
#[serde(untagged)]
enum WireId {
  Int(i64),
  Text(String),
}

impl fmt::Display for WireId {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      WireId::Int(n) => write!(f, "{n}"),
      WireId::Text(s) => f.write_str(s),
    }
  }
}

#[derive(Deserialize)]
struct QuizListDto {
  #[serde(default)]
  quizzes: Vec<QuizDto>,
}

#[derive(Deserialize)]
struct QuizDto {
  id: WireId,
  title: String,
  #[serde(default)] description: Option<String>,
  #[serde(default)] difficulty: Option<String>,
  #[serde(default)] category: Option<String>,
  #[serde(default)] questions: Vec<QuestionDto>,
  #[serde(default)] time_limit: Option<u32>,
}

#[derive(Deserialize)]
struct QuestionDto {
  #[serde(default)] id: Option<WireId>,
  question: String,
  options: Vec<String>,
  #[serde(default, rename = "correctAnswer")] correct_answer: Option<usize>,
}

impl QuizDto {
  fn into_quiz(self) -> Quiz {
    Quiz {
      id: self.id.to_string(),
      title: self.title,
      description: self.description.unwrap_or_default(),
      difficulty: parse_difficulty(self.difficulty.as_deref()),
      category: self.category.unwrap_or_default(),
      questions: self
        .questions
        .into_iter()
        .enumerate()
        .map(|(i, q)| Question {
          id: q.id.map(|id| id.to_string()).unwrap_or_else(|| (i + 1).to_string()),
          prompt: q.question,
          options: q.options,
          correct_index: q.correct_answer,
        })
        .collect(),
      time_limit: self.time_limit.filter(|s| *s > 0),
      origin: QuizOrigin::Remote,
    }
  }
}

/// Lenient: the API stores free text and defaults to "medium".
fn parse_difficulty(s: Option<&str>) -> Difficulty {
  match s.map(|s| s.trim().to_ascii_lowercase()).as_deref() {
    Some("easy") => Difficulty::Easy,
    Some("hard") => Difficulty::Hard,
    _ => Difficulty::Medium,
  }
}

#[derive(Serialize)]
struct SubmitDto<'a> {
  answers: &'a [Option<usize>],
  time_taken: u64,
}

#[derive(Deserialize)]
struct SubmitResponseDto {
  result: ResultDto,
}

#[derive(Deserialize)]
struct ResultDto {
  id: WireId,
  quiz_id: WireId,
  #[serde(default)] quiz_title: Option<String>,
  score: usize,
  total_questions: usize,
  percentage: f64,
  #[serde(default)] time_taken: Option<u64>,
  #[serde(default)] attempted_at: Option<NaiveDateTime>,
}

impl ResultDto {
  fn into_result(self, review: Vec<QuestionReview>) -> QuizResult {
    QuizResult {
      id: self.id.to_string(),
      quiz_id: self.quiz_id.to_string(),
      quiz_title: self.quiz_title.unwrap_or_default(),
      scorecard: Scorecard {
        score: self.score,
        total_questions: self.total_questions,
        percentage: self.percentage,
        review,
      },
      time_taken_secs: self.time_taken.unwrap_or_default(),
      scored_by: ScoringAuthority::Remote,
      attempted_at: self.attempted_at.map(|t| t.and_utc()).unwrap_or_else(Utc::now),
    }
  }
}

#[derive(Deserialize)]
struct ResultDetailDto {
  result: ResultDto,
  quiz: QuizDto,
  #[serde(default)]
  user_answers: Vec<Option<usize>>,
}

#[derive(Deserialize)]
struct ResultListDto {
  #[serde(default)]
  results: Vec<ResultDto>,
}

#[derive(Deserialize)]
struct UserDto {
  #[serde(default)]
  name: Option<String>,
}

#[derive(Deserialize)]
struct DashboardDto {
  #[serde(default)]
  user: Option<UserDto>,
  #[serde(default)]
  stats: PlayerStats,
  #[serde(default)]
  recent_results: Vec<ResultDto>,
}

#[derive(Deserialize)]
struct LeaderboardDto {
  #[serde(default)]
  leaderboard: Vec<LeaderboardEntry>,
}
