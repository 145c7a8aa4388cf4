//! Queries against the `v_rating_history` view.

use crate::data::models::RatingHistoryRow;
use crate::utils::log_if_slow;
use anyhow::{Context, Result};
use chrono::NaiveDate;
use sqlx::PgPool;
use std::time::{Duration, Instant};

const SLOW_QUERY: Duration = Duration::from_millis(500);

/// All lifetime rating events played on or after `since`, newest first.
///
/// Events sharing a timestamp are ordered by match id, descending, so the
/// first row seen for a player is always that player's latest rating.
pub async fn lifetime_since(pool: &PgPool, since: NaiveDate) -> Result<Vec<RatingHistoryRow>> {
    let start = Instant::now();
    let rows = sqlx::query_as::<_, RatingHistoryRow>(
        r#"
        SELECT
            player_id::text AS player_id,
            new_rate,
            played_at,
            match_id::text AS match_id
        FROM v_rating_history
        WHERE is_lifetime = true
          AND played_at >= $1::date
        ORDER BY played_at DESC, match_id DESC
        "#,
    )
    .bind(since)
    .fetch_all(pool)
    .await
    .context("failed to fetch lifetime rating history")?;

    log_if_slow(start, SLOW_QUERY, "lifetime rating history");
    Ok(rows)
}
