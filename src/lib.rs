//! Read-through rating caches and lifetime leaderboard service for the club score tracker.

pub mod app;
pub mod cache;
pub mod cli;
pub mod config;
pub mod data;
pub mod logging;
pub mod ratings;
pub mod state;
pub mod utils;
pub mod web;
