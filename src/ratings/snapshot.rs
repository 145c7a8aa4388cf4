//! Lifetime rating snapshot: latest rate, game count and dense rank per player.
//!
//! Built in one pass over the rating history, which must arrive newest first
//! (`played_at DESC, match_id DESC`). Under that ordering the first row with a
//! usable rate for a player is that player's current rating.

use crate::data::models::RatingHistoryRow;
use chrono::{DateTime, Utc};
use std::cmp::Ordering;
use std::collections::HashMap;

/// Immutable aggregate over the lifetime rating history.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LifetimeRatingSnapshot {
    pub latest_rate_by_player: HashMap<String, f64>,
    /// Every qualifying event counts, including ones without a usable rate.
    pub games_by_player: HashMap<String, u32>,
    /// Dense competition rank, 1-based.
    pub rank_by_player: HashMap<String, u32>,
    /// Time of the event that supplied the latest rate.
    pub updated_at_by_player: HashMap<String, Option<DateTime<Utc>>>,
    /// Players holding a rank.
    pub total_players: usize,
}

/// One ranked player, as shown on the leaderboard.
#[derive(Debug, Clone, PartialEq)]
pub struct Standing {
    pub player_id: String,
    pub rank: u32,
    pub rate: f64,
    pub games: u32,
    pub updated_at: Option<DateTime<Utc>>,
}

impl LifetimeRatingSnapshot {
    /// Snapshot with no players; served when the history cannot be read.
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.total_players == 0 && self.games_by_player.is_empty()
    }

    /// Fold history rows (newest first) into a ranked snapshot.
    pub fn from_history<I>(rows: I) -> Self
    where
        I: IntoIterator<Item = RatingHistoryRow>,
    {
        let mut latest_rate_by_player: HashMap<String, f64> = HashMap::new();
        let mut games_by_player: HashMap<String, u32> = HashMap::new();
        let mut updated_at_by_player: HashMap<String, Option<DateTime<Utc>>> = HashMap::new();

        for row in rows {
            let Some(player_id) = row
                .player_id
                .as_deref()
                .map(str::trim)
                .filter(|id| !id.is_empty())
            else {
                continue;
            };

            *games_by_player.entry(player_id.to_owned()).or_default() += 1;

            if latest_rate_by_player.contains_key(player_id) {
                continue;
            }
            let Some(rate) = row.new_rate.filter(|rate| rate.is_finite()) else {
                continue;
            };

            latest_rate_by_player.insert(player_id.to_owned(), rate);
            updated_at_by_player.insert(player_id.to_owned(), row.played_at);
        }

        let rank_by_player = dense_ranks(&latest_rate_by_player);
        let total_players = rank_by_player.len();

        Self {
            latest_rate_by_player,
            games_by_player,
            rank_by_player,
            updated_at_by_player,
            total_players,
        }
    }

    /// Number of lifetime events recorded for `player_id`.
    pub fn games(&self, player_id: &str) -> u32 {
        self.games_by_player.get(player_id).copied().unwrap_or(0)
    }

    /// Ranked entry for one player, `None` if they have no usable rate.
    pub fn standing(&self, player_id: &str) -> Option<Standing> {
        let rank = *self.rank_by_player.get(player_id)?;
        let rate = *self.latest_rate_by_player.get(player_id)?;
        Some(Standing {
            player_id: player_id.to_owned(),
            rank,
            rate,
            games: self.games(player_id),
            updated_at: self.updated_at_by_player.get(player_id).copied().flatten(),
        })
    }

    /// Every ranked player, ordered by rank then player id.
    pub fn standings(&self) -> Vec<Standing> {
        let mut standings: Vec<Standing> = self
            .rank_by_player
            .keys()
            .filter_map(|player_id| self.standing(player_id))
            .collect();
        standings.sort_by(|a, b| {
            a.rank
                .cmp(&b.rank)
                .then_with(|| a.player_id.cmp(&b.player_id))
        });
        standings
    }
}

/// Dense competition ranking by rate, highest first.
///
/// Ties share a rank and the next distinct rate gets the following integer
/// (`50, 50, 40` → `1, 1, 2`). Equal rates are ordered by player id so the
/// walk is deterministic.
fn dense_ranks(rates: &HashMap<String, f64>) -> HashMap<String, u32> {
    let mut ordered: Vec<(&str, f64)> = rates.iter().map(|(id, rate)| (id.as_str(), *rate)).collect();
    ordered.sort_by(|a, b| {
        b.1.partial_cmp(&a.1)
            .unwrap_or(Ordering::Equal)
            .then_with(|| a.0.cmp(b.0))
    });

    let mut ranks = HashMap::with_capacity(ordered.len());
    let mut previous: Option<f64> = None;
    let mut rank = 0u32;
    for (player_id, rate) in ordered {
        if previous != Some(rate) {
            rank += 1;
            previous = Some(rate);
        }
        ranks.insert(player_id.to_owned(), rank);
    }
    ranks
}
