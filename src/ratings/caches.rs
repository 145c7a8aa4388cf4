//! The three read-through caches in front of the league database.
//!
//! | kind | key | loader failure |
//! |---|---|---|
//! | active season id | `active` | propagated |
//! | rating-era start date | `lifetime-rating-start` | propagated |
//! | lifetime snapshot | `lifetime:{start date}` | served as an empty snapshot |
//!
//! The lifetime loader never fails: a history read error yields an empty
//! snapshot, so the engine caches "no ratings known" for one TTL instead of
//! keeping the previous leaderboard. The other two loaders fail normally and
//! keep serving their last fresh value.

use crate::cache::{CacheError, CacheStats, CacheStore};
use crate::config::CacheConfig;
use crate::data::{LeagueStore, SharedStore};
use crate::ratings::snapshot::LifetimeRatingSnapshot;
use crate::utils::fmt_duration;
use anyhow::Context;
use chrono::NaiveDate;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, warn};

const ACTIVE_SEASON_KEY: &str = "active";
const RATING_START_KEY: &str = "lifetime-rating-start";

/// Lifetime leaderboard together with the era it was computed from.
#[derive(Debug, Clone)]
pub struct Leaderboard {
    pub rating_start_date: NaiveDate,
    pub snapshot: Arc<LifetimeRatingSnapshot>,
    /// The start date could not be resolved and the configured fallback was used.
    pub degraded: bool,
}

/// Process-wide rating caches. Created once at startup and shared by handlers.
#[derive(Clone)]
pub struct RatingCaches {
    active_season: CacheStore<Option<String>>,
    rating_start: CacheStore<NaiveDate>,
    lifetime: CacheStore<Arc<LifetimeRatingSnapshot>>,
    rating_start_season: Arc<str>,
    fallback_start_date: NaiveDate,
}

impl RatingCaches {
    pub fn new(config: &CacheConfig) -> Self {
        Self {
            active_season: CacheStore::new("active_season", config.active_season_ttl),
            rating_start: CacheStore::new("rating_start", config.rating_start_ttl),
            lifetime: CacheStore::new("lifetime_ratings", config.lifetime_snapshot_ttl),
            rating_start_season: Arc::from(config.rating_start_season.as_str()),
            fallback_start_date: config.fallback_rating_start_date,
        }
    }

    pub fn fallback_start_date(&self) -> NaiveDate {
        self.fallback_start_date
    }

    /// Id of the newest active season, or `None` when no season is active.
    pub async fn active_season_id(&self, source: &SharedStore) -> Result<Option<String>, CacheError> {
        let source = Arc::clone(source);
        self.active_season
            .get(ACTIVE_SEASON_KEY, move || async move {
                source
                    .active_season_id()
                    .await
                    .context("active season lookup failed")
            })
            .await
    }

    /// First day of the rating era.
    ///
    /// Resolved from the earliest season whose name starts with the configured
    /// prefix; the configured fallback date applies when no such season exists
    /// or it has no start date.
    pub async fn rating_start_date(&self, source: &SharedStore) -> Result<NaiveDate, CacheError> {
        let source = Arc::clone(source);
        let name_prefix = Arc::clone(&self.rating_start_season);
        let fallback = self.fallback_start_date;
        self.rating_start
            .get(RATING_START_KEY, move || async move {
                let start = source
                    .rating_start_season(&name_prefix)
                    .await
                    .context("rating start season lookup failed")?;
                if start.is_none() {
                    debug!(prefix = %name_prefix, %fallback, "no rating start season, using fallback");
                }
                Ok(start.unwrap_or(fallback))
            })
            .await
    }

    /// Lifetime snapshot for the era starting at `start`.
    ///
    /// Keyed by the start date, so moving the era invalidates old snapshots.
    pub async fn lifetime_rating_snapshot(
        &self,
        source: &SharedStore,
        start: NaiveDate,
    ) -> Result<Arc<LifetimeRatingSnapshot>, CacheError> {
        let source = Arc::clone(source);
        self.lifetime
            .get(&lifetime_key(start), move || async move {
                Ok(Arc::new(load_lifetime_snapshot(source.as_ref(), start).await))
            })
            .await
    }

    /// Resolve the rating era and its snapshot in one call.
    ///
    /// An unresolvable era degrades to the fallback start date rather than failing.
    pub async fn leaderboard(&self, source: &SharedStore) -> Result<Leaderboard, CacheError> {
        let (rating_start_date, degraded) = match self.rating_start_date(source).await {
            Ok(date) => (date, false),
            Err(e) => {
                warn!(error = ?e, fallback = %self.fallback_start_date, "rating start date unavailable");
                (self.fallback_start_date, true)
            }
        };

        let snapshot = self
            .lifetime_rating_snapshot(source, rating_start_date)
            .await?;

        Ok(Leaderboard {
            rating_start_date,
            snapshot,
            degraded,
        })
    }

    /// Entry counts and TTLs for every cache kind.
    pub fn stats(&self) -> Vec<CacheStats> {
        vec![
            self.active_season.stats(),
            self.rating_start.stats(),
            self.lifetime.stats(),
        ]
    }
}

fn lifetime_key(start: NaiveDate) -> String {
    format!("lifetime:{start}")
}

async fn load_lifetime_snapshot(source: &dyn LeagueStore, start: NaiveDate) -> LifetimeRatingSnapshot {
    let started = Instant::now();
    match source.lifetime_rating_history(start).await {
        Ok(rows) => {
            let row_count = rows.len();
            let snapshot = LifetimeRatingSnapshot::from_history(rows);
            debug!(
                since = %start,
                rows = row_count,
                players = snapshot.total_players,
                elapsed = fmt_duration(started.elapsed()),
                "lifetime rating snapshot built"
            );
            snapshot
        }
        Err(e) => {
            warn!(error = ?e, since = %start, "lifetime rating history unavailable, serving empty snapshot");
            LifetimeRatingSnapshot::empty()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lifetime_key_uses_iso_date() {
        let start = NaiveDate::from_ymd_opt(2026, 1, 15).unwrap();
        assert_eq!(lifetime_key(start), "lifetime:2026-01-15");
    }

    #[test]
    fn stats_cover_every_kind() {
        let caches = RatingCaches::new(&CacheConfig::default());
        let names: Vec<&str> = caches.stats().iter().map(|s| s.name).collect();
        assert_eq!(names, vec!["active_season", "rating_start", "lifetime_ratings"]);
    }
}
