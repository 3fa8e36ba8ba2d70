//! Loading service configuration (remote catalog + optional local quiz bank) from TOML.
//!
//! See `QuizConfig` and `QuizCfg` for the expected schema. Environment
//! variables win over the file for the remote catalog settings.

use std::time::Duration;

use serde::Deserialize;
use tracing::{error, info};
use uuid::Uuid;

use crate::domain::{Difficulty, Question, Quiz, QuizOrigin};

const DEFAULT_REMOTE_TIMEOUT_SECS: u64 = 10;

#[derive(Clone, Debug, Deserialize, Default)]
pub struct QuizConfig {
  #[serde(default)]
  pub remote: RemoteCfg,
  #[serde(default)]
  pub quizzes: Vec<QuizCfg>,
}

#[derive(Clone, Debug, Deserialize, Default)]
pub struct RemoteCfg {
  #[serde(default)] pub base_url: Option<String>,
  #[serde(default)] pub timeout_secs: Option<u64>,
}

/// Quiz entry accepted in the TOML bank.
#[derive(Clone, Debug, Deserialize)]
pub struct QuizCfg {
  #[serde(default)] pub id: Option<String>,
  pub title: String,
  #[serde(default)] pub description: String,
  #[serde(default)] pub difficulty: Difficulty,
  #[serde(default)] pub category: String,
  #[serde(default)] pub time_limit: Option<u32>,
  pub questions: Vec<QuestionCfg>,
}

#[derive(Clone, Debug, Deserialize)]
pub struct QuestionCfg {
  #[serde(default)] pub id: Option<String>,
  pub prompt: String,
  pub options: Vec<String>,
  /// 0-based index into `options`.
  pub correct: usize,
}

impl QuizCfg {
  /// Convert to a local quiz. Bank entries must be playable offline, so every
  /// question needs at least two options and an in-range answer key.
  pub fn into_quiz(self) -> Result<Quiz, String> {
    let id = self.id.filter(|s| !s.trim().is_empty()).unwrap_or_else(|| Uuid::new_v4().to_string());
    if self.questions.is_empty() {
      return Err(format!("quiz '{}' has no questions", self.title));
    }
    let mut questions = Vec::with_capacity(self.questions.len());
    for (i, q) in self.questions.into_iter().enumerate() {
      if q.options.len() < 2 {
        return Err(format!("question {} of '{}' needs at least two options", i + 1, self.title));
      }
      if q.correct >= q.options.len() {
        return Err(format!("question {} of '{}' has answer {} out of range", i + 1, self.title, q.correct));
      }
      questions.push(Question {
        id: q.id.unwrap_or_else(|| (i + 1).to_string()),
        prompt: q.prompt,
        options: q.options,
        correct_index: Some(q.correct),
      });
    }
    Ok(Quiz {
      id,
      title: self.title,
      description: self.description,
      difficulty: self.difficulty,
      category: self.category,
      questions,
      time_limit: self.time_limit.filter(|s| *s > 0),
      origin: QuizOrigin::Local,
    })
  }
}

/// Effective settings for the remote catalog, after env overrides.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RemoteSettings {
  pub base_url: String,
  pub timeout: Duration,
}

impl RemoteSettings {
  /// `QUIZ_API_URL` / `QUIZ_API_TIMEOUT_SECS` override the file. No URL at all disables the remote catalog.
  pub fn resolve(file: &RemoteCfg) -> Option<Self> {
    Self::resolve_with(file, |k| std::env::var(k).ok())
  }

  fn resolve_with(file: &RemoteCfg, env: impl Fn(&str) -> Option<String>) -> Option<Self> {
    let base_url = env("QUIZ_API_URL")
      .or_else(|| file.base_url.clone())
      .map(|u| u.trim().trim_end_matches('/').to_string())
      .filter(|u| !u.is_empty())?;
    let secs = env("QUIZ_API_TIMEOUT_SECS")
      .and_then(|s| s.parse::<u64>().ok())
      .or(file.timeout_secs)
      .unwrap_or(DEFAULT_REMOTE_TIMEOUT_SECS);
    Some(Self { base_url, timeout: Duration::from_secs(secs) })
  }
}

pub fn parse_config(s: &str) -> Result<QuizConfig, toml::de::Error> {
  toml::from_str::<QuizConfig>(s)
}

/// Attempt to load `QuizConfig` from QUIZ_CONFIG_PATH. On any parsing/IO error, returns None.
pub fn load_quiz_config_from_env() -> Option<QuizConfig> {
  let path = std::env::var("QUIZ_CONFIG_PATH").ok()?;
  match std::fs::read_to_string(&path) {
    Ok(s) => match parse_config(&s) {
      Ok(cfg) => {
        info!(target: "quizmaster_backend", %path, quizzes = cfg.quizzes.len(), "Loaded quiz config (TOML)");
        Some(cfg)
      }
      Err(e) => {
        error!(target: "quizmaster_backend", %path, error = %e, "Failed to parse TOML config");
        None
      }
    },
    Err(e) => {
      error!(target: "quizmaster_backend", %path, error = %e, "Failed to read TOML config file");
      None
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  const SAMPLE: &str = r#"
    [remote]
    base_url = "http://127.0.0.1:5000/api/"
    timeout_secs = 4

    [[quizzes]]
    id = "capitals"
    title = "Capitals"
    difficulty = "easy"
    time_limit = 60

    [[quizzes.questions]]
    prompt = "Capital of Peru?"
    options = ["Lima", "Quito", "Bogota"]
    correct = 0

    [[quizzes.questions]]
    prompt = "Capital of Kenya?"
    options = ["Nairobi", "Mombasa"]
    correct = 0
  "#;

  #[test]
  fn parses_bank_and_remote_section() {
    let cfg = parse_config(SAMPLE).expect("valid toml");
    assert_eq!(cfg.quizzes.len(), 1);
    let quiz = cfg.quizzes[0].clone().into_quiz().expect("valid quiz");
    assert_eq!(quiz.id, "capitals");
    assert_eq!(quiz.difficulty, Difficulty::Easy);
    assert_eq!(quiz.time_limit, Some(60));
    assert_eq!(quiz.questions[1].id, "2");
    assert_eq!(quiz.origin, QuizOrigin::Local);

    let remote = RemoteSettings::resolve_with(&cfg.remote, |_| None).expect("remote enabled");
    assert_eq!(remote.base_url, "http://127.0.0.1:5000/api");
    assert_eq!(remote.timeout, Duration::from_secs(4));
  }

  #[test]
  fn env_overrides_file_and_empty_url_disables_remote() {
    let file = RemoteCfg { base_url: Some("http://file".into()), timeout_secs: None };
    let env = |k: &str| match k {
      "QUIZ_API_URL" => Some("http://env/api".to_string()),
      "QUIZ_API_TIMEOUT_SECS" => Some("7".to_string()),
      _ => None,
    };
    let s = RemoteSettings::resolve_with(&file, env).unwrap();
    assert_eq!(s.base_url, "http://env/api");
    assert_eq!(s.timeout, Duration::from_secs(7));

    assert!(RemoteSettings::resolve_with(&RemoteCfg::default(), |_| None).is_none());
    let blank = RemoteCfg { base_url: Some("  ".into()), timeout_secs: None };
    assert!(RemoteSettings::resolve_with(&blank, |_| None).is_none());
  }

  #[test]
  fn bank_entry_with_bad_answer_key_is_rejected() {
    let cfg = QuizCfg {
      id: None,
      title: "Broken".into(),
      description: String::new(),
      difficulty: Difficulty::Hard,
      category: String::new(),
      time_limit: Some(0),
      questions: vec![QuestionCfg { id: None, prompt: "?".into(), options: vec!["a".into(), "b".into()], correct: 2 }],
    };
    assert!(cfg.into_quiz().is_err());
  }
}
