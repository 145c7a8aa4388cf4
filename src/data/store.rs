//! The data-source seam consumed by the rating caches.

use crate::data::models::RatingHistoryRow;
use anyhow::Result;
use async_trait::async_trait;
use chrono::NaiveDate;
use sqlx::PgPool;
use std::sync::Arc;

/// Queries the rating caches need from the league database.
///
/// Every call either returns rows or an error; nothing here caches.
#[async_trait]
pub trait LeagueStore: Send + Sync {
    /// Id of the newest active season (by start date), if any.
    async fn active_season_id(&self) -> Result<Option<String>>;

    /// Start date of the earliest season whose name starts with `name_prefix`.
    async fn rating_start_season(&self, name_prefix: &str) -> Result<Option<NaiveDate>>;

    /// Lifetime rating events on or after `since`, ordered by
    /// `(played_at DESC, match_id DESC)`.
    async fn lifetime_rating_history(&self, since: NaiveDate) -> Result<Vec<RatingHistoryRow>>;

    /// Check that the backing store is reachable.
    async fn ping(&self) -> Result<()>;
}

pub type SharedStore = Arc<dyn LeagueStore>;

/// [`LeagueStore`] backed by the Postgres pool.
#[derive(Clone)]
pub struct PgLeagueStore {
    pool: PgPool,
}

impl PgLeagueStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl LeagueStore for PgLeagueStore {
    async fn active_season_id(&self) -> Result<Option<String>> {
        super::seasons::active_season_id(&self.pool).await
    }

    async fn rating_start_season(&self, name_prefix: &str) -> Result<Option<NaiveDate>> {
        super::seasons::first_start_date_matching(&self.pool, name_prefix).await
    }

    async fn lifetime_rating_history(&self, since: NaiveDate) -> Result<Vec<RatingHistoryRow>> {
        super::rating_history::lifetime_since(&self.pool, since).await
    }

    async fn ping(&self) -> Result<()> {
        super::health::ping(&self.pool).await
    }
}
