use tokio::net::TcpListener;
use tracing::info;

use crate::api::build_app;
use crate::core::config::Config;
use crate::core::state::ServerState;
use crate::utils::error::{AppError, AppResult};

/// HTTP server wrapper
pub struct Server {
    config: Config,
}

impl Server {
    pub fn new(config: Config) -> Self {
        Self { config }
    }

    /// Initialize state and serve until shutdown
    pub async fn run(&self) -> AppResult<()> {
        let state = ServerState::initialize(&self.config)?;
        let app = build_app(state);

        let addr = format!("0.0.0.0:{}", self.config.http_port);
        let listener = TcpListener::bind(&addr)
            .await
            .map_err(|e| AppError::Internal(format!("Failed to bind {}: {}", addr, e)))?;
        info!(addr = %addr, "HTTP server listening");

        axum::serve(listener, app)
            .with_graceful_shutdown(shutdown_signal())
            .await
            .map_err(|e| AppError::Internal(format!("Server error: {}", e)))?;

        info!("HTTP server stopped");
        Ok(())
    }
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to install ctrl-c handler");
        return;
    }
    info!("Shutdown signal received");
}
