//! Application state: the quiz catalogs and the lookup policy between them.
//!
//! This module owns:
//!   - the optional remote catalog (QuizMaster API, authoritative)
//!   - the offline catalog (TOML bank + built-in seeds + result history)
//!
//! Lookup policy: ask the remote catalog first. If it is unreachable, serve
//! what the offline catalog has. No per-player session state lives here; each
//! WebSocket connection owns its own quiz session.

use std::sync::Arc;

use tracing::{error, info, instrument, warn};

use crate::catalog::{LocalCatalog, QuizCatalog, RemoteCatalog};
use crate::config::{load_quiz_config_from_env, RemoteSettings};
use crate::domain::{Quiz, QuizResult, QuizSummary};
use crate::error::CatalogError;
use crate::seeds::seed_quizzes;
use crate::stats::{Dashboard, LeaderboardEntry};

#[derive(Clone)]
pub struct AppState {
    pub remote: Option<Arc<dyn QuizCatalog>>,
    pub offline: LocalCatalog,
}

impl AppState {
    pub fn new(remote: Option<Arc<dyn QuizCatalog>>, offline: LocalCatalog) -> Self {
        Self { remote, offline }
    }

    /// Build state from env: load config, build the offline bank, init the remote client.
    #[instrument(level = "info", skip_all)]
    pub fn from_env() -> Self {
        let cfg = load_quiz_config_from_env().unwrap_or_default();

        // Config bank first so its ids win over built-in seeds.
        let mut quizzes = Vec::new();
        for qc in cfg.quizzes.clone() {
            let title = qc.title.clone();
            match qc.into_quiz() {
                Ok(q) => quizzes.push(q),
                Err(reason) => {
                    error!(target: "catalog", %title, %reason, "Skipping bank quiz");
                }
            }
        }
        let bank = quizzes.len();
        quizzes.extend(seed_quizzes());
        let offline = LocalCatalog::new(quizzes);
        info!(target: "catalog", local_bank = bank, total = offline.quiz_count(), "Startup offline inventory");

        let remote: Option<Arc<dyn QuizCatalog>> = match RemoteSettings::resolve(&cfg.remote) {
            Some(settings) => match RemoteCatalog::new(&settings) {
                Ok(client) => {
                    info!(target: "quizmaster_backend", base_url = %settings.base_url, timeout_secs = settings.timeout.as_secs(), "Remote catalog enabled.");
                    Some(Arc::new(client))
                }
                Err(e) => {
                    error!(target: "quizmaster_backend", error = %e, "Could not build remote catalog client; offline only.");
                    None
                }
            },
            None => {
                info!(target: "quizmaster_backend", "Remote catalog disabled (no QUIZ_API_URL). Using offline catalog.");
                None
            }
        };

        Self::new(remote, offline)
    }

    /// Quiz list plus a label naming where it came from.
    #[instrument(level = "info", skip(self))]
    pub async fn list_quizzes(&self) -> (Vec<QuizSummary>, &'static str) {
        if let Some(remote) = &self.remote {
            match remote.list_quizzes().await {
                Ok(list) => return (list, "remote"),
                Err(e) => {
                    warn!(target: "catalog", catalog = remote.name(), error = %e, "Remote quiz list failed; serving offline catalog");
                    return (self.offline_list().await, "offline_fallback");
                }
            }
        }
        (self.offline_list().await, "offline")
    }

    async fn offline_list(&self) -> Vec<QuizSummary> {
        self.offline.list_quizzes().await.unwrap_or_default()
    }

    /// Full quiz (answer keys included where the catalog provides them).
    #[instrument(level = "info", skip(self), fields(%id))]
    pub async fn fetch_quiz(&self, id: &str) -> Result<Quiz, CatalogError> {
        if let Some(remote) = &self.remote {
            match remote.fetch_quiz(id).await {
                Ok(q) => return Ok(q),
                Err(e) if self.offline.contains(id) => {
                    warn!(target: "catalog", catalog = remote.name(), %id, error = %e, "Remote quiz fetch failed; serving offline copy");
                }
                Err(e) => return Err(e),
            }
        }
        self.offline.fetch_quiz(id).await
    }

    /// Stored result: remote first (needs the credential), then offline history.
    #[instrument(level = "info", skip(self, credential), fields(%id))]
    pub async fn fetch_result(&self, id: &str, credential: Option<&str>) -> Result<QuizResult, CatalogError> {
        if let (Some(remote), Some(_)) = (&self.remote, credential) {
            match remote.fetch_result(id, credential).await {
                Ok(r) => return Ok(r),
                Err(e @ (CatalogError::Unauthorized(_) | CatalogError::Remote { .. } | CatalogError::Decode(_))) => {
                    return Err(e)
                }
                Err(e) => {
                    warn!(target: "catalog", catalog = remote.name(), %id, error = %e, "Remote result lookup failed; checking offline history");
                }
            }
        }
        self.offline.fetch_result(id, credential).await
    }

    /// A player's stored results, most recent first.
    #[instrument(level = "info", skip(self, credential), fields(%player))]
    pub async fn list_results(&self, player: &str, credential: Option<&str>) -> Result<Vec<QuizResult>, CatalogError> {
        if let (Some(remote), Some(_)) = (&self.remote, credential) {
            match remote.list_results(player, credential).await {
                Err(e) if e.is_network() => {
                    warn!(target: "catalog", catalog = remote.name(), error = %e, "Remote result list failed; serving offline history");
                }
                other => return other,
            }
        }
        self.offline.list_results(player, credential).await
    }

    /// Dashboard for one player. The remote account wins when a credential is present.
    #[instrument(level = "info", skip(self, credential), fields(%player))]
    pub async fn dashboard(&self, player: &str, credential: Option<&str>) -> Result<Dashboard, CatalogError> {
        if let (Some(remote), Some(_)) = (&self.remote, credential) {
            match remote.dashboard(player, credential).await {
                Err(e) if e.is_network() => {
                    warn!(target: "catalog", catalog = remote.name(), error = %e, "Remote dashboard failed; serving offline history");
                }
                other => return other,
            }
        }
        self.offline.dashboard(player, credential).await
    }

    #[instrument(level = "info", skip(self))]
    pub async fn leaderboard(&self) -> Result<Vec<LeaderboardEntry>, CatalogError> {
        if let Some(remote) = &self.remote {
            match remote.leaderboard().await {
                Err(e) if e.is_network() => {
                    warn!(target: "catalog", catalog = remote.name(), error = %e, "Remote leaderboard failed; serving offline history");
                }
                other => return other,
            }
        }
        self.offline.leaderboard().await
    }
}

#[cfg(test)]
pub(crate) mod doubles {
    use async_trait::async_trait;

    use super::*;
    use crate::domain::Submission;

    /// Remote catalog that is always unreachable.
    pub struct UnreachableCatalog;

    #[async_trait]
    impl QuizCatalog for UnreachableCatalog {
        fn name(&self) -> &'static str {
            "unreachable"
        }
        async fn list_quizzes(&self) -> Result<Vec<QuizSummary>, CatalogError> {
            Err(CatalogError::Network("connection refused".into()))
        }
        async fn fetch_quiz(&self, _id: &str) -> Result<Quiz, CatalogError> {
            Err(CatalogError::Network("connection refused".into()))
        }
        async fn submit_result(&self, _s: &Submission, _c: Option<&str>) -> Result<QuizResult, CatalogError> {
            Err(CatalogError::Network("connection refused".into()))
        }
        async fn fetch_result(&self, _id: &str, _c: Option<&str>) -> Result<QuizResult, CatalogError> {
            Err(CatalogError::Network("connection refused".into()))
        }
        async fn list_results(&self, _p: &str, _c: Option<&str>) -> Result<Vec<QuizResult>, CatalogError> {
            Err(CatalogError::Network("connection refused".into()))
        }
        async fn dashboard(&self, _p: &str, _c: Option<&str>) -> Result<Dashboard, CatalogError> {
            Err(CatalogError::Network("connection refused".into()))
        }
        async fn leaderboard(&self) -> Result<Vec<LeaderboardEntry>, CatalogError> {
            Err(CatalogError::Network("connection refused".into()))
        }
    }

    pub fn offline_state() -> AppState {
        AppState::new(None, LocalCatalog::new(seed_quizzes()))
    }

    pub fn unreachable_remote_state() -> AppState {
        AppState::new(Some(Arc::new(UnreachableCatalog)), LocalCatalog::new(seed_quizzes()))
    }
}
