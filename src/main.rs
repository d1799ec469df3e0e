// src/main.rs

use color_eyre::eyre::{Result, WrapErr};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::info;

use domain_recon::api::{create_router, AppState};
use domain_recon::config::Config;
use domain_recon::core::orchestrator::Orchestrator;
use domain_recon::core::scanner::Scanner;
use domain_recon::logging;

#[tokio::main]
async fn main() -> Result<()> {
    color_eyre::install()?;
    logging::initialize_logging()?;

    let config = Config::from_env().wrap_err("invalid configuration")?;
    let scanner = Scanner::from_config(&config).wrap_err("failed to build HTTP clients")?;
    let orchestrator = Orchestrator::new(Arc::new(scanner), config.concurrency);
    let app = create_router(AppState { orchestrator });

    let addr = SocketAddr::new(config.host, config.port);
    let listener = TcpListener::bind(addr)
        .await
        .wrap_err_with(|| format!("failed to bind {addr}"))?;
    info!(%addr, concurrency = config.concurrency, timeouts = ?config.timeouts, "Listening.");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .wrap_err("server error")?;

    info!("Server stopped.");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to listen for Ctrl-C.");
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
                tracing::error!(error = %e, "Failed to listen for SIGTERM.");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
    info!("Shutdown signal received.");
}
