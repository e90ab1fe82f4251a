//! Server bootstrap: open the event store, bind, and serve until shutdown.

use crate::{app, config::Config, AppState};
use parkki_db::{DbPool, DbRuntimeSettings, MigrationError, PoolError};
use std::future::Future;
use std::net::SocketAddr;
use thiserror::Error;
use tokio::net::TcpListener;

/// Failures that stop the server from starting or keep it from serving.
#[derive(Debug, Error)]
pub enum StartupError {
    #[error(transparent)]
    Pool(#[from] PoolError),
    #[error("no database connection for migrations: {0}")]
    Connection(#[from] r2d2::Error),
    #[error(transparent)]
    Migration(#[from] MigrationError),
    #[error("failed to bind {addr}: {source}")]
    Bind {
        addr: SocketAddr,
        source: std::io::Error,
    },
    #[error("server error: {0}")]
    Serve(std::io::Error),
}

/// Opens the event database and brings its schema up to date.
///
/// # Errors
///
/// Returns `StartupError` if the pool cannot be opened or a migration fails.
pub fn open_store(config: &Config) -> Result<DbPool, StartupError> {
    let pool = parkki_db::create_pool(
        &config.database.path,
        DbRuntimeSettings {
            busy_timeout_ms: config.database.busy_timeout_ms,
            pool_max_size: config.database.pool_max_size,
        },
    )?;

    let applied = parkki_db::run_migrations(&*pool.get()?)?;
    tracing::info!(
        path = %config.database.path,
        applied,
        "event store ready"
    );
    Ok(pool)
}

/// Serves `state` on `listener` until `shutdown` resolves.
///
/// In-flight requests finish before this returns. Open WebSocket and SSE
/// streams are dropped with the server.
///
/// # Errors
///
/// Returns `StartupError::Serve` if the accept loop fails.
pub async fn serve_until(
    listener: TcpListener,
    state: AppState,
    shutdown: impl Future<Output = ()> + Send + 'static,
) -> Result<(), StartupError> {
    axum::serve(listener, app(state))
        .with_graceful_shutdown(shutdown)
        .await
        .map_err(StartupError::Serve)
}

/// Runs the Parkki server described by `config` until SIGINT or SIGTERM.
///
/// # Errors
///
/// Returns `StartupError` if the store cannot be opened, the address cannot
/// be bound, or the server loop fails.
pub async fn run(config: Config) -> Result<(), StartupError> {
    let pool = open_store(&config)?;
    let state = AppState::new(pool, config.broadcast.subscriber_buffer);

    let addr = SocketAddr::new(config.server.host, config.server.port);
    let listener = TcpListener::bind(addr)
        .await
        .map_err(|source| StartupError::Bind { addr, source })?;
    tracing::info!(
        %addr,
        subscriber_buffer = config.broadcast.subscriber_buffer,
        "parkki server listening"
    );

    serve_until(listener, state, shutdown_signal()).await?;
    tracing::info!("parkki server shut down");
    Ok(())
}

/// Resolves on SIGINT, or on SIGTERM where the platform has it.
async fn shutdown_signal() {
    let interrupt = async {
        if let Err(err) = tokio::signal::ctrl_c().await {
            tracing::warn!("SIGINT handler unavailable: {}", err);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(err) => {
                tracing::warn!("SIGTERM handler unavailable: {}", err);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = interrupt => tracing::info!("SIGINT received, draining requests"),
        () = terminate => tracing::info!("SIGTERM received, draining requests"),
    }
}
