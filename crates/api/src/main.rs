use std::net::{IpAddr, SocketAddr};
use std::process::ExitCode;
use std::sync::Arc;

use aigc_core::error::CoreError;
use aigc_db::{InMemoryTaskStore, PgTaskStore, TaskStore};
use aigc_pipeline::{Dispatcher, EngineConfig, TaskExecutor, TaskService};
use aigc_providers::{ProviderConfig, ProviderRegistry};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use aigc_api::config::ServerConfig;
use aigc_api::router::build_app_router;
use aigc_api::state::AppState;

/// Startup failures, reported before exiting non-zero.
#[derive(Debug, thiserror::Error)]
enum StartupError {
    #[error("Invalid configuration: {0}")]
    Config(#[from] CoreError),

    #[error("Database error: {0}")]
    Database(String),

    #[error("Server error: {0}")]
    Io(#[from] std::io::Error),
}

#[tokio::main]
async fn main() -> ExitCode {
    dotenvy::dotenv().ok();
    init_tracing();

    match run().await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!(error = %e, "Server failed");
            ExitCode::FAILURE
        }
    }
}

/// Install the tracing subscriber. `LOG_FORMAT=json` switches to JSON lines.
fn init_tracing() {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        "aigc_api=debug,aigc_pipeline=debug,aigc_providers=info,tower_http=debug".into()
    });
    let json = std::env::var("LOG_FORMAT").is_ok_and(|v| v.eq_ignore_ascii_case("json"));

    let registry = tracing_subscriber::registry().with(filter);
    if json {
        registry.with(tracing_subscriber::fmt::layer().json()).init();
    } else {
        registry.with(tracing_subscriber::fmt::layer()).init();
    }
}

async fn run() -> Result<(), StartupError> {
    // --- Configuration ---
    let config = ServerConfig::from_env()?;
    let engine_config = EngineConfig::from_env()?;
    let provider_config = ProviderConfig::from_env()?;
    tracing::info!(host = %config.host, port = %config.port, "Loaded server configuration");

    // --- Task store ---
    let (store, pool) = match aigc_core::env::string_opt("DATABASE_URL") {
        Some(database_url) => {
            let pool = aigc_db::create_pool(&database_url)
                .await
                .map_err(|e| StartupError::Database(e.to_string()))?;
            tracing::info!("Database connection pool created");

            aigc_db::health_check(&pool)
                .await
                .map_err(|e| StartupError::Database(e.to_string()))?;
            aigc_db::run_migrations(&pool)
                .await
                .map_err(|e| StartupError::Database(e.to_string()))?;
            tracing::info!("Database migrations applied");

            let store: Arc<dyn TaskStore> = Arc::new(PgTaskStore::new(pool.clone()));
            (store, Some(pool))
        }
        None => {
            tracing::warn!("DATABASE_URL not set, tasks are kept in memory only");
            let store: Arc<dyn TaskStore> = Arc::new(InMemoryTaskStore::new());
            (store, None)
        }
    };

    // --- Providers and dispatcher ---
    let registry = Arc::new(ProviderRegistry::from_config(&provider_config)?);
    let executor = TaskExecutor::new(Arc::clone(&store), registry)
        .with_provider_timeout(engine_config.provider_timeout);
    let dispatcher = Dispatcher::start(engine_config, executor);

    // --- App state ---
    let state = AppState {
        config: Arc::new(config.clone()),
        tasks: TaskService::new(store, Arc::clone(&dispatcher)),
        pool,
    };
    let app = build_app_router(state, &config);

    // --- Start server ---
    let host = config.host.parse::<IpAddr>().map_err(|e| {
        CoreError::Validation(format!("Invalid HOST address '{}': {e}", config.host))
    })?;
    let addr = SocketAddr::new(host, config.port);
    tracing::info!(%addr, "Starting server");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    // --- Post-shutdown cleanup ---
    tracing::info!("Server stopped accepting connections, draining dispatcher");
    dispatcher.shutdown().await;

    tracing::info!("Graceful shutdown complete");
    Ok(())
}

/// Wait for a termination signal to initiate graceful shutdown.
///
/// Handles both SIGINT (Ctrl-C) and SIGTERM (on Unix). If a handler cannot
/// be installed that branch never fires.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to install Ctrl-C handler");
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
                tracing::error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {
            tracing::info!("Received SIGINT (Ctrl-C), starting graceful shutdown");
        }
        () = terminate => {
            tracing::info!("Received SIGTERM, starting graceful shutdown");
        }
    }
}
