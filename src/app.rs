use crate::config::Config;
use crate::data::{PgLeagueStore, SharedStore};
use crate::state::{AppState, ServiceStatus};
use crate::utils::fmt_duration;
use crate::web::create_router;
use anyhow::Context;
use sqlx::ConnectOptions;
use sqlx::postgres::PgPoolOptions;
use std::net::SocketAddr;
use std::process::ExitCode;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info, warn};

/// Main application struct containing all necessary components
pub struct App {
    config: Config,
    app_state: AppState,
}

impl App {
    /// Connect to the database, run migrations and build the shared state.
    pub async fn new(config: Config) -> Result<Self, anyhow::Error> {
        let slow_threshold = Duration::from_millis(500);

        let connect_options = sqlx::postgres::PgConnectOptions::from_str(&config.database_url)
            .context("Failed to parse database URL")?
            .log_statements(tracing::log::LevelFilter::Debug)
            .log_slow_statements(tracing::log::LevelFilter::Warn, Duration::from_secs(1));

        let db_pool = PgPoolOptions::new()
            .min_connections(0)
            .max_connections(4)
            .acquire_slow_threshold(slow_threshold)
            .acquire_timeout(Duration::from_secs(4))
            .idle_timeout(Duration::from_secs(60 * 2))
            .max_lifetime(Duration::from_secs(60 * 30))
            .connect_with(connect_options)
            .await
            .context("Failed to create database pool")?;

        info!(
            min_connections = 0,
            max_connections = 4,
            acquire_timeout = "4s",
            idle_timeout = "2m",
            max_lifetime = "30m",
            acquire_slow_threshold = fmt_duration(slow_threshold),
            "database pool established"
        );

        info!("Running database migrations...");
        sqlx::migrate!("./migrations")
            .run(&db_pool)
            .await
            .context("Failed to run database migrations")?;
        info!("Database migrations completed successfully");

        let store: SharedStore = Arc::new(PgLeagueStore::new(db_pool));
        let cache_config = config.cache_config();
        info!(
            active_season_ttl = fmt_duration(cache_config.active_season_ttl),
            rating_start_ttl = fmt_duration(cache_config.rating_start_ttl),
            lifetime_snapshot_ttl = fmt_duration(cache_config.lifetime_snapshot_ttl),
            rating_start_season = %cache_config.rating_start_season,
            "rating caches configured"
        );

        let app_state = AppState::new(store, &cache_config);
        app_state.service_statuses.set("database", ServiceStatus::Active);
        app_state.warm_caches().await;

        Ok(App { config, app_state })
    }

    /// Serve HTTP until a shutdown signal arrives, then drain within the configured timeout.
    pub async fn run(self) -> ExitCode {
        let addr = SocketAddr::from(([0, 0, 0, 0], self.config.port));
        let listener = match tokio::net::TcpListener::bind(addr).await {
            Ok(listener) => listener,
            Err(e) => {
                error!(error = ?e, %addr, "Failed to bind web server");
                return ExitCode::FAILURE;
            }
        };

        let statuses = self.app_state.service_statuses.clone();
        let router = create_router(self.app_state);
        let (shutdown_tx, shutdown_rx) = tokio::sync::oneshot::channel::<()>();

        let mut server = tokio::spawn(async move {
            axum::serve(listener, router)
                .with_graceful_shutdown(async {
                    shutdown_rx.await.ok();
                })
                .await
        });
        statuses.set("web", ServiceStatus::Active);
        info!(%addr, "web server listening");

        tokio::select! {
            result = &mut server => {
                error!(result = ?result, "web server exited unexpectedly");
                return ExitCode::FAILURE;
            }
            _ = shutdown_signal() => {}
        }

        let timeout = self.config.shutdown_timeout;
        info!(timeout = fmt_duration(timeout), "shutdown signal received, draining requests");
        let _ = shutdown_tx.send(());

        match tokio::time::timeout(timeout, server).await {
            Ok(Ok(Ok(()))) => {
                info!("web server stopped");
                ExitCode::SUCCESS
            }
            Ok(Ok(Err(e))) => {
                error!(error = ?e, "web server failed during shutdown");
                ExitCode::FAILURE
            }
            Ok(Err(e)) => {
                error!(error = ?e, "web server task panicked");
                ExitCode::FAILURE
            }
            Err(_) => {
                warn!(timeout = fmt_duration(timeout), "graceful shutdown timed out");
                ExitCode::FAILURE
            }
        }
    }
}

/// Resolves on Ctrl+C, or SIGTERM on Unix.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!(error = ?e, "Failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                error!(error = ?e, "Failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {}
        _ = terminate => {}
    }
}
