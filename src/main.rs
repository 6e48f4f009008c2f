use std::future::IntoFuture;
use std::net::SocketAddr;
use std::process::ExitCode;
use std::sync::Arc;

use tokio::net::TcpListener;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use jokes_api::store::MemoryStore;
use jokes_api::{AppState, Config, JokeServiceImpl, LogFormat, build_router, metrics, utils};

#[tokio::main]
async fn main() -> ExitCode {
    let config = Config::from_env();

    // Initialize logging before reporting on the configuration itself
    let (level, format) = match &config {
        Ok(c) => (c.log_level.as_str(), c.log_format),
        Err(_) => ("info", LogFormat::default()),
    };
    init_tracing(level, format);

    info!("Starting Jokes API v{}", env!("CARGO_PKG_VERSION"));

    let config = match config {
        Ok(config) => config,
        Err(e) => {
            error!("{e}");
            return ExitCode::from(exitcode::CONFIG as u8);
        }
    };

    match run(config).await {
        Ok(()) => ExitCode::from(exitcode::OK as u8),
        Err(exit_code) => ExitCode::from(exit_code as u8),
    }
}

fn init_tracing(level: &str, format: LogFormat) {
    let filter = EnvFilter::try_new(level).unwrap_or_else(|_| EnvFilter::new("info"));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true);

    match format {
        LogFormat::Json => builder.json().with_current_span(true).init(),
        LogFormat::Text => builder.with_thread_ids(true).init(),
    }
}

/// Run the application, returning an exit code on error.
async fn run(config: Config) -> Result<(), exitcode::ExitCode> {
    info!(
        host = %config.host,
        port = %config.port,
        timeout_ms = config.request_timeout.as_millis(),
        rps = config.rate_limit_rps,
        burst = config.rate_limit_burst,
        log_format = ?config.log_format,
        "Configuration loaded"
    );

    if let Some(metrics_addr) = config.metrics_addr() {
        metrics::try_init_metrics(metrics_addr);
    }

    // Build application state and router
    let store = Arc::new(MemoryStore::new());
    let service = Arc::new(JokeServiceImpl::new(store));
    let grace = config.shutdown_grace_period;
    let server_addr = config.server_addr();

    let state = AppState::new(service, config).map_err(|e| {
        error!("Invalid rate limit configuration: {e}");
        exitcode::CONFIG
    })?;
    let app = build_router(state.clone());

    // Start server
    let addr: SocketAddr = server_addr.parse().map_err(|e| {
        error!("Invalid server address {server_addr}: {e}");
        exitcode::CONFIG
    })?;
    let listener = TcpListener::bind(addr).await.map_err(|e| {
        error!("Failed to bind to {addr}: {e}");
        exitcode::UNAVAILABLE
    })?;

    info!("Server listening on http://{addr}");
    info!("API endpoints:");
    info!("  GET    /hello-world      - Health check");
    info!("  GET    /v1/hello-world   - Health check");
    info!("  GET    /v1/jokes         - List jokes (rate limited)");
    info!("  POST   /v1/jokes         - Create a joke (auth)");
    info!("  GET    /v1/jokes/{{id}}    - Get a joke (rate limited)");
    info!("  PATCH  /v1/jokes/{{id}}    - Update a joke (auth)");
    info!("  DELETE /v1/jokes/{{id}}    - Delete a joke (auth)");

    // Stop accepting on signal, then give in-flight requests the grace period
    let (stop_tx, stop_rx) = tokio::sync::oneshot::channel::<()>();
    let server = axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(async move {
        utils::shutdown_signal().await;
        let _ = stop_tx.send(());
    });

    let mut server = std::pin::pin!(server.into_future());
    tokio::select! {
        result = &mut server => {
            result.map_err(|e| {
                error!("Server error: {e}");
                exitcode::SOFTWARE
            })?;
        }
        _ = stop_rx => {
            let drained = utils::drain_within(grace, async {
                if let Err(e) = (&mut server).await {
                    error!("Server error during shutdown: {e}");
                }
            })
            .await;
            if !drained {
                error!("Forcing exit with requests still in flight");
            }
        }
    }

    // Gracefully shutdown background tasks
    info!("HTTP server stopped, shutting down background tasks...");
    state.shutdown().await;

    info!("Server shutdown complete");
    Ok(())
}
