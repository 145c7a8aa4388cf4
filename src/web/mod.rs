//! HTTP API for the rating caches.

pub mod error;
pub mod middleware;
pub mod ratings;
pub mod routes;
pub mod status;

pub use routes::*;
