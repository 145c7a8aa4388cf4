//! Application state shared by request handlers.

use crate::config::CacheConfig;
use crate::data::SharedStore;
use crate::ratings::RatingCaches;
use dashmap::DashMap;
use serde::Serialize;
use std::sync::Arc;
use std::time::Instant;
use ts_rs::TS;

/// Health status of a service.
#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq, TS)]
#[serde(rename_all = "lowercase")]
#[ts(export)]
pub enum ServiceStatus {
    Starting,
    Active,
    Error,
}

#[derive(Debug, Clone)]
struct StatusEntry {
    status: ServiceStatus,
    updated_at: Instant,
}

/// Thread-safe registry for components to self-report their health.
#[derive(Debug, Clone, Default)]
pub struct ServiceStatusRegistry {
    inner: Arc<DashMap<String, StatusEntry>>,
}

impl ServiceStatusRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts or updates the status for a named service.
    pub fn set(&self, name: &str, status: ServiceStatus) {
        self.inner.insert(
            name.to_owned(),
            StatusEntry {
                status,
                updated_at: Instant::now(),
            },
        );
    }

    pub fn get(&self, name: &str) -> Option<ServiceStatus> {
        self.inner.get(name).map(|entry| entry.status)
    }

    /// Every service with its status and seconds since the last report.
    pub fn all(&self) -> Vec<(String, ServiceStatus, u64)> {
        self.inner
            .iter()
            .map(|entry| {
                (
                    entry.key().clone(),
                    entry.status,
                    entry.updated_at.elapsed().as_secs(),
                )
            })
            .collect()
    }
}

#[derive(Clone)]
pub struct AppState {
    pub store: SharedStore,
    pub ratings: RatingCaches,
    pub service_statuses: ServiceStatusRegistry,
}

impl AppState {
    pub fn new(store: SharedStore, cache_config: &CacheConfig) -> Self {
        Self {
            store,
            ratings: RatingCaches::new(cache_config),
            service_statuses: ServiceStatusRegistry::new(),
        }
    }

    /// Load the active season and the current leaderboard so the first
    /// requests after startup hit warm caches. Failures are logged, not fatal.
    pub async fn warm_caches(&self) {
        if let Err(e) = self.ratings.active_season_id(&self.store).await {
            tracing::info!(error = ?e, "Could not warm active season cache");
        }
        match self.ratings.leaderboard(&self.store).await {
            Ok(board) => tracing::info!(
                rating_start = %board.rating_start_date,
                players = board.snapshot.total_players,
                "Lifetime rating cache warmed"
            ),
            Err(e) => tracing::info!(error = ?e, "Could not warm lifetime rating cache"),
        }
    }
}
