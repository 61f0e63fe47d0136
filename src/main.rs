use std::net::SocketAddr;
use std::process::ExitCode;

use tokio::net::TcpListener;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use manga_api::middleware::RateLimitLayer;
use manga_api::store::Db;
use manga_api::{AppState, Config, build_router, metrics};

#[tokio::main]
async fn main() -> ExitCode {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(true)
        .with_thread_ids(true)
        .init();

    info!("Starting Manga API v{}", env!("CARGO_PKG_VERSION"));

    match run().await {
        Ok(()) => ExitCode::from(exitcode::OK as u8),
        Err(exit_code) => ExitCode::from(exit_code as u8),
    }
}

/// Run the application, returning an exit code on error.
async fn run() -> Result<(), exitcode::ExitCode> {
    // Load configuration
    let config = Config::from_env().map_err(|e| {
        error!("Configuration error: {e}");
        exitcode::CONFIG
    })?;
    info!(
        host = %config.host,
        port = %config.port,
        environment = %config.environment,
        "Configuration loaded"
    );

    // Prometheus exporter (optional)
    if let Some(metrics_addr) = config.metrics_addr() {
        metrics::try_init_metrics(metrics_addr);
    }

    // Open the database pool and apply the schema
    let db = Db::connect(
        &config.database_url,
        config.db_max_connections,
        config.db_query_timeout,
    )
    .await
    .map_err(|e| {
        error!("Failed to open database: {e}");
        exitcode::UNAVAILABLE
    })?;

    // Rate limiter (optional)
    let rate_limit = if config.rate_limiting_enabled() {
        Some(
            RateLimitLayer::new(config.rate_limit_rps, config.rate_limit_burst).map_err(|e| {
                error!("Invalid rate limit configuration: {e}");
                exitcode::CONFIG
            })?,
        )
    } else {
        None
    };

    // Build application state and router
    let state = AppState::new(db, config.clone(), rate_limit);
    let app = build_router(state.clone());

    // Start server
    let addr: SocketAddr = config.server_addr().parse().map_err(|e| {
        error!("Invalid server address: {e}");
        exitcode::CONFIG
    })?;
    let listener = TcpListener::bind(addr).await.map_err(|e| {
        error!("Failed to bind to {addr}: {e}");
        exitcode::UNAVAILABLE
    })?;

    info!("Server listening on http://{addr}");
    info!("API endpoints:");
    info!("  GET    /v1/healthcheck            - Health check");
    info!("  GET    /v1/mangas                 - List mangas");
    info!("  POST   /v1/mangas                 - Create a manga");
    info!("  GET    /v1/mangas/{{id}}            - Fetch a manga");
    info!("  PATCH  /v1/mangas/{{id}}            - Update a manga");
    info!("  DELETE /v1/mangas/{{id}}            - Delete a manga");
    info!("  POST   /v1/users                  - Register a user");
    info!("  PUT    /v1/users/activated        - Activate a user");
    info!("  POST   /v1/tokens/authentication  - Issue a token");

    // Start server with graceful shutdown
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(|e| {
            error!("Server error: {e}");
            exitcode::SOFTWARE
        })?;

    // Gracefully shutdown background tasks and close the pool
    info!("HTTP server stopped, shutting down background tasks...");
    state.shutdown().await;

    info!("Server shutdown complete");
    Ok(())
}

/// Resolves when SIGINT (Ctrl+C) or SIGTERM arrives.
async fn shutdown_signal() {
    #[cfg(unix)]
    let sigterm = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                // Ctrl+C still works without the SIGTERM listener.
                error!("Cannot listen for SIGTERM: {e}");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let sigterm = std::future::pending::<()>();

    tokio::select! {
        result = tokio::signal::ctrl_c() => match result {
            Ok(()) => info!("Interrupt received, draining in-flight requests"),
            Err(e) => error!("Signal listener failed, shutting down: {e}"),
        },
        () = sigterm => info!("SIGTERM received, draining in-flight requests"),
    }
}
