//! Active season and lifetime leaderboard handlers.
//!
//! These render a degraded view instead of failing when the data source is
//! down: the active season becomes `null` and the leaderboard falls back to
//! the configured rating-era start date.

use axum::extract::{Path, State};
use axum::response::Response;
use serde::Serialize;
use tracing::warn;
use ts_rs::TS;

use crate::ratings::Standing;
use crate::state::AppState;
use crate::web::error::{ApiError, ApiErrorCode, cache_error};
use crate::web::routes::{cache, with_cache_control};

#[derive(Debug, Serialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct ActiveSeasonResponse {
    pub season_id: Option<String>,
    pub degraded: bool,
}

#[derive(Debug, Serialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct StandingResponse {
    pub player_id: String,
    pub rank: u32,
    pub rate: f64,
    pub games: u32,
    pub updated_at: Option<String>,
}

impl From<Standing> for StandingResponse {
    fn from(standing: Standing) -> Self {
        Self {
            player_id: standing.player_id,
            rank: standing.rank,
            rate: standing.rate,
            games: standing.games,
            updated_at: standing.updated_at.map(|t| t.to_rfc3339()),
        }
    }
}

#[derive(Debug, Serialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct LeaderboardResponse {
    pub rating_start_date: String,
    pub total_players: u32,
    pub standings: Vec<StandingResponse>,
    pub degraded: bool,
}

#[derive(Debug, Serialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct PlayerRatingResponse {
    pub player_id: String,
    pub rank: Option<u32>,
    pub rate: Option<f64>,
    pub games: u32,
    pub updated_at: Option<String>,
    pub total_players: u32,
    pub rating_start_date: String,
}

/// `GET /api/seasons/active`
pub(super) async fn active_season(State(state): State<AppState>) -> Response {
    let (season_id, degraded) = match state.ratings.active_season_id(&state.store).await {
        Ok(season_id) => (season_id, false),
        Err(e) => {
            warn!(error = ?e, "active season unavailable, rendering without one");
            (None, true)
        }
    };

    with_cache_control(
        ActiveSeasonResponse {
            season_id,
            degraded,
        },
        cache::SEASON,
    )
}

/// `GET /api/ratings/lifetime`
pub(super) async fn lifetime_leaderboard(
    State(state): State<AppState>,
) -> Result<Response, ApiError> {
    let board = state
        .ratings
        .leaderboard(&state.store)
        .await
        .map_err(|e| cache_error("Lifetime leaderboard", e))?;

    let standings = board
        .snapshot
        .standings()
        .into_iter()
        .map(StandingResponse::from)
        .collect();

    Ok(with_cache_control(
        LeaderboardResponse {
            rating_start_date: board.rating_start_date.to_string(),
            total_players: count(board.snapshot.total_players),
            standings,
            degraded: board.degraded,
        },
        cache::LEADERBOARD,
    ))
}

/// `GET /api/ratings/lifetime/{player_id}`
pub(super) async fn lifetime_player(
    State(state): State<AppState>,
    Path(player_id): Path<String>,
) -> Result<Response, ApiError> {
    let board = state
        .ratings
        .leaderboard(&state.store)
        .await
        .map_err(|e| cache_error("Lifetime rating", e))?;

    let player_id = player_id.trim();
    let games = board.snapshot.games(player_id);
    let standing = board.snapshot.standing(player_id);
    if games == 0 && standing.is_none() {
        return Err(ApiError::new(
            ApiErrorCode::PlayerNotRated,
            format!("No lifetime rating events for player {player_id}"),
        ));
    }

    Ok(with_cache_control(
        PlayerRatingResponse {
            player_id: player_id.to_owned(),
            rank: standing.as_ref().map(|s| s.rank),
            rate: standing.as_ref().map(|s| s.rate),
            games,
            updated_at: standing
                .and_then(|s| s.updated_at)
                .map(|t| t.to_rfc3339()),
            total_players: count(board.snapshot.total_players),
            rating_start_date: board.rating_start_date.to_string(),
        },
        cache::LEADERBOARD,
    ))
}

fn count(n: usize) -> u32 {
    u32::try_from(n).unwrap_or(u32::MAX)
}
