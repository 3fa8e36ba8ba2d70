//! Error types for the session engine and the quiz catalogs.

use axum::{
  http::StatusCode,
  response::{IntoResponse, Response},
  Json,
};
use serde::Serialize;
use thiserror::Error;

/// Failures of the session state machine. State is left untouched on every one.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SessionError {
  #[error("invalid quiz: {0}")]
  InvalidQuiz(String),

  #[error("option {option} out of range for a question with {options} options")]
  IndexOutOfRange { option: usize, options: usize },

  #[error("no quiz session has been started")]
  EmptySession,

  #[error("quiz session is no longer in progress")]
  SessionClosed,
}

/// Failures of a quiz catalog (remote or local).
#[derive(Debug, Error)]
pub enum CatalogError {
  #[error("not found: {0}")]
  NotFound(String),

  #[error("network error: {0}")]
  Network(String),

  #[error("unauthorized: {0}")]
  Unauthorized(String),

  #[error("remote responded with status {status}: {message}")]
  Remote { status: u16, message: String },

  #[error("could not decode response: {0}")]
  Decode(String),

  #[error("invalid quiz: {0}")]
  InvalidQuiz(String),
}

impl CatalogError {
  /// Transport-level failure; the offline catalog may stand in.
  pub fn is_network(&self) -> bool {
    matches!(self, CatalogError::Network(_))
  }

  pub fn status_code(&self) -> StatusCode {
    match self {
      CatalogError::NotFound(_) => StatusCode::NOT_FOUND,
      CatalogError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
      CatalogError::InvalidQuiz(_) => StatusCode::UNPROCESSABLE_ENTITY,
      CatalogError::Network(_) | CatalogError::Remote { .. } | CatalogError::Decode(_) => {
        StatusCode::BAD_GATEWAY
      }
    }
  }
}

impl From<reqwest::Error> for CatalogError {
  fn from(e: reqwest::Error) -> Self {
    if e.is_decode() {
      CatalogError::Decode(e.to_string())
    } else {
      CatalogError::Network(e.to_string())
    }
  }
}

impl From<SessionError> for CatalogError {
  fn from(e: SessionError) -> Self {
    CatalogError::InvalidQuiz(e.to_string())
  }
}

#[derive(Serialize)]
pub struct ErrorOut {
  pub message: String,
}

impl IntoResponse for CatalogError {
  fn into_response(self) -> Response {
    (self.status_code(), Json(ErrorOut { message: self.to_string() })).into_response()
  }
}
