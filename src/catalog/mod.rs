//! Quiz catalogs: where quizzes come from and who scores submissions.
//!
//! - `RemoteCatalog`: the QuizMaster HTTP API, authoritative when reachable.
//! - `LocalCatalog`: built-in seeds + TOML bank + in-memory result history
//!   (offline/demo mode).

use async_trait::async_trait;

use crate::domain::{Quiz, QuizResult, QuizSummary, Submission};
use crate::error::CatalogError;
use crate::stats::{Dashboard, LeaderboardEntry};

pub mod local;
pub mod remote;

pub use local::LocalCatalog;
pub use remote::RemoteCatalog;

#[async_trait]
pub trait QuizCatalog: Send + Sync {
  /// Short label for logs.
  fn name(&self) -> &'static str;

  async fn list_quizzes(&self) -> Result<Vec<QuizSummary>, CatalogError>;

  async fn fetch_quiz(&self, id: &str) -> Result<Quiz, CatalogError>;

  /// Score `submission` and store the result. `credential` is an opaque bearer token.
  async fn submit_result(
    &self,
    submission: &Submission,
    credential: Option<&str>,
  ) -> Result<QuizResult, CatalogError>;

  /// A stored result, with its per-question review where the catalog can provide one.
  async fn fetch_result(&self, id: &str, credential: Option<&str>) -> Result<QuizResult, CatalogError>;

  /// The player's results, most recent first. The remote API knows the player
  /// by `credential`; the offline catalog by name.
  async fn list_results(&self, player: &str, credential: Option<&str>) -> Result<Vec<QuizResult>, CatalogError>;

  async fn dashboard(&self, player: &str, credential: Option<&str>) -> Result<Dashboard, CatalogError>;

  async fn leaderboard(&self) -> Result<Vec<LeaderboardEntry>, CatalogError>;
}
