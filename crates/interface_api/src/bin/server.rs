//! Agent CRM - API Server Binary
//!
//! # Usage
//!
//! ```bash
//! CRM_DATABASE_URL=postgres://... \
//! CRM_JWT_SECRET=... \
//! CRM_ADMIN_EMAIL=agent@example.com \
//! CRM_ADMIN_PASSWORD_HASH='$argon2id$...' \
//! cargo run --bin crm-api
//! ```
//!
//! # Environment Variables
//!
//! * `CRM_HOST` / `CRM_PORT` - Listen address (default: 0.0.0.0:8080)
//! * `CRM_DATABASE_URL` - PostgreSQL connection string
//! * `CRM_JWT_SECRET` - JWT signing secret (required in production)
//! * `CRM_TIMEZONE` - IANA zone of the agent (default: Asia/Kolkata)
//! * `CRM_LOG_LEVEL` / `CRM_LOG_FORMAT` - `info`, `debug`, ... and `pretty` or `json`
//! * `CRM_CLOUDINARY__*`, `CRM_MSG91__*`, `CRM_SMTP__*` - Optional integrations

use std::net::SocketAddr;

use anyhow::Context;
use tokio::net::TcpListener;
use tracing::{error, info, warn};

use interface_api::{bootstrap, config::ApiConfig, create_router, AppState};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env file if present (useful for local development)
    dotenvy::dotenv().ok();

    let config = ApiConfig::from_env().context("reading CRM_* configuration")?;
    bootstrap::init_tracing(&config);

    if let Err(e) = run(config).await {
        error!(error = %format!("{:#}", e), "API server stopped");
        return Err(e);
    }
    Ok(())
}

async fn run(config: ApiConfig) -> anyhow::Result<()> {
    info!(host = %config.host, port = config.port, timezone = %config.timezone, "Starting agent CRM API server");
    if config.admin_password_hash.is_empty() {
        warn!("CRM_ADMIN_PASSWORD_HASH is not set, login is disabled");
    }

    let ports = bootstrap::connect(&config).await?;
    let addr: SocketAddr = config
        .server_addr()
        .parse()
        .context("parsing CRM_HOST/CRM_PORT")?;
    let app = create_router(AppState::new(config, ports)?);

    let listener = TcpListener::bind(addr).await?;
    info!(%addr, "Server listening");
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server shutdown complete");
    Ok(())
}

/// Waits for Ctrl+C or SIGTERM
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!(error = %e, "Failed to listen for Ctrl+C");
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
                error!(error = %e, "Failed to install SIGTERM handler");
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

    info!("Shutdown signal received");
}
