//! Server setup and lifecycle management

use std::sync::Arc;
use std::time::Duration;

use tokio::net::TcpListener;
use wingman_audit::{AuditWriter, JsonlSink};
use wingman_token::{KeySet, TokenService};

use crate::config::{AuditStorage, GatewayConfig};
use crate::error::GatewayError;
use crate::executor::CommandExecutor;
use crate::router::create_router;
use crate::state::GatewayState;

/// Execution gateway server
pub struct Server {
    config: GatewayConfig,
    audit: AuditWriter,
}

impl Server {
    /// Connect the audit backend and assemble the server. Configuration
    /// must already be validated. An unreachable audit database
    /// degrades to the file sink rather than refusing to start.
    pub async fn new(config: GatewayConfig) -> Result<Self, GatewayError> {
        let fallback = JsonlSink::new(config.audit_log.clone());
        let database_url = match config.audit_storage {
            AuditStorage::Postgres => config.database_url.as_deref(),
            AuditStorage::Jsonl => None,
        };
        let audit = AuditWriter::connect(database_url, fallback).await;
        Ok(Self { config, audit })
    }

    /// Run the server until SIGINT or SIGTERM.
    pub async fn run(self) -> Result<(), GatewayError> {
        let tokens = Arc::new(TokenService::new(
            KeySet::from_single(self.config.token_secret.clone()),
            wingman_token::DEFAULT_TTL_SECS,
        ));

        let executor = Arc::new(CommandExecutor::new(
            self.config.exec_workdir.clone(),
            Duration::from_secs(self.config.exec_timeout_secs),
            self.config.max_output_bytes,
        ));

        let state = GatewayState::new(
            tokens,
            Arc::new(self.audit),
            executor,
            self.config.allowed_environments.clone(),
        );

        let app = create_router(state);

        let listener = TcpListener::bind(&self.config.listen_addr)
            .await
            .map_err(|e| {
                GatewayError::Internal(format!("bind {}: {e}", self.config.listen_addr))
            })?;

        tracing::info!(
            addr = %self.config.listen_addr,
            environments = ?self.config.allowed_environments,
            "execution gateway listening"
        );

        axum::serve(listener, app)
            .with_graceful_shutdown(shutdown_signal())
            .await
            .map_err(|e| GatewayError::Internal(format!("server: {e}")))?;

        tracing::info!("execution gateway shutting down");
        Ok(())
    }
}

/// Graceful shutdown signal handler
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "failed to install Ctrl+C handler");
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
                tracing::error!(error = %e, "failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::info!("received Ctrl+C, initiating graceful shutdown");
        }
        _ = terminate => {
            tracing::info!("received terminate signal, initiating graceful shutdown");
        }
    }
}
