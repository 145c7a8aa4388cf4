//! Memoized rating aggregates: active season, rating-era start, lifetime leaderboard.

mod caches;
mod snapshot;

pub use caches::{Leaderboard, RatingCaches};
pub use snapshot::{LifetimeRatingSnapshot, Standing};
