//! Web API router construction and shared response utilities.

use axum::{
    Router,
    http::HeaderValue,
    response::{IntoResponse, Json, Response},
    routing::get,
};
use std::time::Duration;
use tower_http::{compression::CompressionLayer, timeout::TimeoutLayer};

use crate::state::AppState;
use crate::web::error::ApiError;
use crate::web::middleware::request_id::RequestIdLayer;
use crate::web::{ratings, status};

/// Cache-Control presets for public endpoints, aligned with the in-process TTLs.
pub mod cache {
    /// Active season id.
    pub const SEASON: &str = "public, max-age=30, stale-while-revalidate=30";
    /// Lifetime leaderboard and per-player standings.
    pub const LEADERBOARD: &str = "public, max-age=15, stale-while-revalidate=30";
    /// Health and status -- never cache.
    pub const NO_STORE: &str = "no-store";
}

/// Wraps a JSON response with a `Cache-Control` header.
pub fn with_cache_control<T: serde::Serialize>(value: T, header: &'static str) -> Response {
    let mut response = Json(value).into_response();
    response.headers_mut().insert(
        axum::http::header::CACHE_CONTROL,
        HeaderValue::from_static(header),
    );
    response
}

/// Creates the web server router
pub fn create_router(app_state: AppState) -> Router {
    let api_router = Router::new()
        .route("/health", get(status::health))
        .route("/status", get(status::status))
        .route("/seasons/active", get(ratings::active_season))
        .route("/ratings/lifetime", get(ratings::lifetime_leaderboard))
        .route(
            "/ratings/lifetime/{player_id}",
            get(ratings::lifetime_player),
        )
        .with_state(app_state);

    Router::new()
        .nest("/api", api_router)
        .fallback(not_found)
        .layer((
            // Outermost: per-request ID span + severity-proportional response logging.
            RequestIdLayer,
            CompressionLayer::new()
                .zstd(true)
                .br(true)
                .gzip(true)
                .quality(tower_http::CompressionLevel::Fastest),
            TimeoutLayer::new(Duration::from_secs(30)),
        ))
}

async fn not_found() -> ApiError {
    ApiError::not_found("no such route")
}
