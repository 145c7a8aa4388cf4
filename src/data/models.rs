//! Row types returned by the league queries.

use chrono::{DateTime, Utc};

/// One rating event from `v_rating_history`.
///
/// Every column is nullable at the view level; the snapshot fold decides what
/// counts as usable, so nothing is filtered here.
#[derive(sqlx::FromRow, Debug, Clone, PartialEq)]
pub struct RatingHistoryRow {
    pub player_id: Option<String>,
    pub new_rate: Option<f64>,
    pub played_at: Option<DateTime<Utc>>,
    pub match_id: Option<String>,
}
