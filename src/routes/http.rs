//! HTTP endpoint handlers. These are thin wrappers that forward to core logic.
//! Catalog failures turn into `{message}` bodies with a matching status code.

use std::sync::Arc;
use axum::{
  extract::{Path, Query, State},
  http::HeaderMap,
  response::IntoResponse,
  Json,
};
use tracing::{info, instrument};

use crate::domain::Quiz;
use crate::error::CatalogError;
use crate::logic;
use crate::protocol::*;
use crate::state::AppState;
use crate::stats::Dashboard;
use crate::util::bearer_token;

#[instrument(level = "info", skip(state))]
pub async fn http_health(State(state): State<Arc<AppState>>) -> impl IntoResponse {
  Json(HealthOut { status: "ok", remote_catalog: state.remote.is_some() })
}

#[instrument(level = "info", skip(state))]
pub async fn http_list_quizzes(State(state): State<Arc<AppState>>) -> impl IntoResponse {
  let (quizzes, source) = state.list_quizzes().await;
  info!(target: "catalog", count = quizzes.len(), %source, "HTTP quiz list served");
  Json(QuizListOut { quizzes, source: source.to_string() })
}

#[instrument(level = "info", skip(state), fields(%id))]
pub async fn http_get_quiz(
  State(state): State<Arc<AppState>>,
  Path(id): Path<String>,
) -> Result<Json<Quiz>, CatalogError> {
  let quiz = state.fetch_quiz(&id).await?;
  Ok(Json(quiz.without_answers()))
}

#[instrument(level = "info", skip(state, headers, body), fields(%id, answers = body.answers.len()))]
pub async fn http_submit_quiz(
  State(state): State<Arc<AppState>>,
  Path(id): Path<String>,
  headers: HeaderMap,
  Json(body): Json<SubmitIn>,
) -> Result<Json<ResultOut>, CatalogError> {
  let credential = bearer_token(&headers);
  let result = logic::submit_answers(&state, &id, body, credential.as_deref()).await?;
  info!(target: "quizmaster_backend", quiz_id = %id, result_id = %result.id, score = result.scorecard.score, "HTTP submission scored");
  Ok(Json(result.into()))
}

#[instrument(level = "info", skip(state, headers), fields(%id))]
pub async fn http_get_result(
  State(state): State<Arc<AppState>>,
  Path(id): Path<String>,
  headers: HeaderMap,
) -> Result<Json<ResultOut>, CatalogError> {
  let credential = bearer_token(&headers);
  let result = state.fetch_result(&id, credential.as_deref()).await?;
  Ok(Json(result.into()))
}

#[instrument(level = "info", skip(state, headers), fields(player = ?q.player))]
pub async fn http_list_results(
  State(state): State<Arc<AppState>>,
  Query(q): Query<PlayerQuery>,
  headers: HeaderMap,
) -> Result<Json<ResultListOut>, CatalogError> {
  let credential = bearer_token(&headers);
  let results = logic::list_results(&state, q.player.as_deref(), credential.as_deref()).await?;
  Ok(Json(ResultListOut { results }))
}

#[instrument(level = "info", skip(state, headers), fields(player = ?q.player))]
pub async fn http_dashboard(
  State(state): State<Arc<AppState>>,
  Query(q): Query<PlayerQuery>,
  headers: HeaderMap,
) -> Result<Json<Dashboard>, CatalogError> {
  let credential = bearer_token(&headers);
  Ok(Json(logic::dashboard(&state, q.player.as_deref(), credential.as_deref()).await?))
}

#[instrument(level = "info", skip(state))]
pub async fn http_leaderboard(State(state): State<Arc<AppState>>) -> Result<Json<LeaderboardOut>, CatalogError> {
  Ok(Json(LeaderboardOut { leaderboard: logic::leaderboard(&state).await? }))
}

#[cfg(test)]
mod tests {
  use axum::{
    body::{to_bytes, Body},
    http::{Request, StatusCode},
    Router,
  };
  use serde_json::{json, Value};
  use tower::ServiceExt;

  use super::*;
  use crate::routes::build_router;
  use crate::state::doubles::offline_state;

  async fn call(app: Router, req: Request<Body>) -> (StatusCode, Value) {
    let res = app.oneshot(req).await.unwrap();
    let status = res.status();
    let bytes = to_bytes(res.into_body(), usize::MAX).await.unwrap();
    (status, serde_json::from_slice(&bytes).unwrap_or(Value::Null))
  }

  fn get(uri: &str) -> Request<Body> {
    Request::get(uri).body(Body::empty()).unwrap()
  }

  fn post_json(uri: &str, body: Value) -> Request<Body> {
    Request::post(uri)
      .header("content-type", "application/json")
      .body(Body::from(body.to_string()))
      .unwrap()
  }

  #[tokio::test]
  async fn health_reports_offline_mode() {
    let app = build_router(Arc::new(offline_state()));
    let (status, body) = call(app, get("/api/v1/health")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({"status": "ok", "remoteCatalog": false}));
  }

  #[tokio::test]
  async fn quiz_detail_strips_answer_keys() {
    let app = build_router(Arc::new(offline_state()));
    let (status, body) = call(app, get("/api/v1/quizzes/sample")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["questions"].as_array().unwrap().len(), 3);
    assert!(body["questions"][0]["correct_index"].is_null());
  }

  #[tokio::test]
  async fn unknown_quiz_is_404_with_message() {
    let app = build_router(Arc::new(offline_state()));
    let (status, body) = call(app, get("/api/v1/quizzes/missing")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert!(body["message"].as_str().unwrap().contains("missing"));
  }

  #[tokio::test]
  async fn submit_then_read_back_and_see_it_on_the_dashboard() {
    let state = Arc::new(offline_state());

    let (status, body) = call(
      build_router(state.clone()),
      post_json("/api/v1/quizzes/sample/submit", json!({"answers": [1, null, 3], "timeTaken": 42, "player": "ada"})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["result"]["score"], 2);
    assert_eq!(body["displayPercentage"], 67);
    let result_id = body["result"]["id"].as_str().unwrap().to_string();

    let (status, body) = call(build_router(state.clone()), get(&format!("/api/v1/results/{result_id}"))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["result"]["time_taken_secs"], 42);

    let (_, body) = call(build_router(state.clone()), get("/api/v1/dashboard?player=ada")).await;
    assert_eq!(body["stats"]["total_quizzes"], 1);

    let (status, body) = call(build_router(state.clone()), get("/api/v1/results?player=ada")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["results"].as_array().unwrap().len(), 1);
    assert_eq!(body["results"][0]["id"], result_id.as_str());

    let (_, body) = call(build_router(state), get("/api/v1/leaderboard")).await;
    assert_eq!(body["leaderboard"][0]["name"], "ada");
  }

  #[tokio::test]
  async fn out_of_range_submission_is_422() {
    let app = build_router(Arc::new(offline_state()));
    let (status, _) = call(app, post_json("/api/v1/quizzes/sample/submit", json!({"answers": [7]}))).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
  }
}
