//! Server setup and lifecycle management

use std::sync::Arc;
use std::time::Duration;

use tokio::net::TcpListener;
use wingman_audit::ClaimLog;
use wingman_store::ApprovalStore;
use wingman_token::{KeySet, TokenService};
use wingman_validation::{SemanticConfig, ValidationPipeline};

use crate::config::ApiConfig;
use crate::error::ApiError;
use crate::router::create_router;
use crate::state::AppState;

/// Approval API server
pub struct Server {
    config: ApiConfig,
    store: ApprovalStore,
}

impl Server {
    /// Open the durable store and assemble the server. Configuration
    /// must already be validated.
    pub async fn new(config: ApiConfig) -> Result<Self, ApiError> {
        let store = ApprovalStore::open(
            &config.approval_db,
            config.approval_db_fallback.as_deref(),
            Duration::from_secs(config.pending_ttl_secs),
        )
        .await?;
        if store.using_fallback() {
            tracing::warn!("approval store is running on its fallback path");
        }
        Ok(Self { config, store })
    }

    /// Run the server until SIGINT or SIGTERM.
    pub async fn run(self) -> Result<(), ApiError> {
        let semantic = match &self.config.llm_endpoint {
            Some(endpoint) => SemanticConfig::new(
                endpoint.clone(),
                self.config.llm_api_key.clone(),
                self.config.llm_model.clone(),
            ),
            None => SemanticConfig::disabled(),
        };
        let pipeline = Arc::new(ValidationPipeline::new(semantic));

        let tokens = Arc::new(TokenService::new(
            KeySet::from_single(self.config.token_secret.clone()),
            self.config.token_ttl_secs,
        ));

        let state = AppState::new(
            self.store,
            pipeline,
            tokens,
            ClaimLog::new(self.config.claims_log.clone()),
            self.config.keys.clone(),
            self.config.deployment_env,
            self.config.require_approval,
        );

        let app = create_router(state);

        let listener = TcpListener::bind(&self.config.listen_addr)
            .await
            .map_err(|e| ApiError::Internal(format!("bind {}: {e}", self.config.listen_addr)))?;

        tracing::info!(
            addr = %self.config.listen_addr,
            env = %self.config.deployment_env,
            "approval API listening"
        );

        axum::serve(listener, app)
            .with_graceful_shutdown(shutdown_signal())
            .await
            .map_err(|e| ApiError::Internal(format!("server: {e}")))?;

        tracing::info!("approval API shutting down");
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
