//! Health and status handlers.

use axum::extract::State;
use axum::response::{Json, Response};
use serde::Serialize;
use serde_json::{Value, json};
use std::collections::BTreeMap;
use tracing::{trace, warn};
use ts_rs::TS;

use crate::state::{AppState, ServiceStatus};
use crate::web::routes::{cache, with_cache_control};

#[derive(Serialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct ServiceInfo {
    name: String,
    status: ServiceStatus,
    seconds_since_update: u64,
}

#[derive(Serialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct CacheInfo {
    name: String,
    ttl_ms: u64,
    entries: u32,
    loading: u32,
}

#[derive(Serialize, TS)]
#[ts(export)]
pub struct StatusResponse {
    status: ServiceStatus,
    version: String,
    commit: String,
    services: BTreeMap<String, ServiceInfo>,
    caches: Vec<CacheInfo>,
}

/// Health check endpoint
pub(super) async fn health() -> Json<Value> {
    trace!("health check requested");
    Json(json!({
        "status": "healthy",
        "timestamp": chrono::Utc::now().to_rfc3339()
    }))
}

/// Status endpoint: database reachability, registered services and cache occupancy.
pub(super) async fn status(State(state): State<AppState>) -> Response {
    let database = match state.store.ping().await {
        Ok(()) => ServiceStatus::Active,
        Err(e) => {
            warn!(error = ?e, "database ping failed");
            ServiceStatus::Error
        }
    };
    state.service_statuses.set("database", database);

    let services: BTreeMap<String, ServiceInfo> = state
        .service_statuses
        .all()
        .into_iter()
        .map(|(name, status, seconds_since_update)| {
            (
                name.clone(),
                ServiceInfo {
                    name,
                    status,
                    seconds_since_update,
                },
            )
        })
        .collect();

    let overall_status = overall(services.values().map(|s| s.status));

    let caches = state
        .ratings
        .stats()
        .into_iter()
        .map(|stats| CacheInfo {
            name: stats.name.to_owned(),
            ttl_ms: u64::try_from(stats.ttl.as_millis()).unwrap_or(u64::MAX),
            entries: u32::try_from(stats.entries).unwrap_or(u32::MAX),
            loading: u32::try_from(stats.loading).unwrap_or(u32::MAX),
        })
        .collect();

    with_cache_control(
        StatusResponse {
            status: overall_status,
            version: env!("CARGO_PKG_VERSION").to_string(),
            commit: env!("GIT_COMMIT_HASH").to_string(),
            services,
            caches,
        },
        cache::NO_STORE,
    )
}

/// Any failing service fails the whole; otherwise still-starting services keep it starting.
fn overall(statuses: impl Iterator<Item = ServiceStatus>) -> ServiceStatus {
    let mut result = ServiceStatus::Active;
    for status in statuses {
        match status {
            ServiceStatus::Error => return ServiceStatus::Error,
            ServiceStatus::Starting => result = ServiceStatus::Starting,
            ServiceStatus::Active => {}
        }
    }
    result
}
