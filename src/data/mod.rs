//! Database models and queries backing the rating caches.

pub mod health;
pub mod models;
pub mod rating_history;
pub mod seasons;
mod store;

pub use store::{LeagueStore, PgLeagueStore, SharedStore};
