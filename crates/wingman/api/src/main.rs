//! Wingman Approval API - governance gateway HTTP service

use clap::Parser;
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use wingman_types::DeploymentEnv;

use wingman_api::config::{ApiConfig, RoleKeys};
use wingman_api::Server;

/// Approval API CLI
#[derive(Parser)]
#[command(name = "wingman-api")]
#[command(about = "Wingman Approval API - approval queue and validation surface", long_about = None)]
#[command(version)]
struct Cli {
    /// Listen address
    #[arg(short, long, env = "WINGMAN_API_LISTEN_ADDR", default_value = "127.0.0.1:8080")]
    listen: String,

    /// Deployment environment (dev|test|prd)
    #[arg(short, long, env = "DEPLOYMENT_ENV", default_value = "dev")]
    deployment_env: String,

    /// Approval gate switch; "0" disables it (dev only)
    #[arg(long, env = "WINGMAN_REQUIRE_APPROVAL", default_value = "1")]
    require_approval: String,

    /// Primary approval database path
    #[arg(long, env = "WINGMAN_APPROVAL_DB", default_value = "wingman_approvals.db")]
    approval_db: PathBuf,

    /// Fallback approval database path
    #[arg(long, env = "WINGMAN_APPROVAL_DB_FALLBACK")]
    approval_db_fallback: Option<PathBuf>,

    /// PENDING time-to-live in seconds
    #[arg(long, env = "WINGMAN_APPROVAL_PENDING_TTL_SEC", default_value_t = 3600)]
    pending_ttl_secs: u64,

    /// Key guarding request submission
    #[arg(long, env = "WINGMAN_APPROVAL_REQUEST_KEY", hide_env_values = true)]
    request_key: Option<String>,

    /// Key guarding read endpoints
    #[arg(long, env = "WINGMAN_APPROVAL_READ_KEY", hide_env_values = true)]
    read_key: Option<String>,

    /// Key guarding decisions
    #[arg(long, env = "WINGMAN_APPROVAL_DECIDE_KEY", hide_env_values = true)]
    decide_key: Option<String>,

    /// Legacy single key accepted for any role
    #[arg(long, env = "WINGMAN_APPROVAL_API_KEY", hide_env_values = true)]
    legacy_key: Option<String>,

    /// HMAC secret for capability tokens
    #[arg(long, env = "WINGMAN_TOKEN_SECRET", hide_env_values = true)]
    token_secret: Option<String>,

    /// Capability token time-to-live in seconds
    #[arg(long, env = "WINGMAN_TOKEN_TTL_SEC", default_value_t = 600)]
    token_ttl_secs: i64,

    /// Claims audit JSONL path
    #[arg(long, env = "WINGMAN_AUDIT_LOG", default_value = "wingman_claims.jsonl")]
    claims_log: PathBuf,

    /// Chat-completions endpoint for the semantic analyzer
    #[arg(long, env = "WINGMAN_LLM_ENDPOINT")]
    llm_endpoint: Option<String>,

    /// API key for the semantic analyzer endpoint
    #[arg(long, env = "WINGMAN_LLM_API_KEY", hide_env_values = true)]
    llm_api_key: Option<String>,

    /// Model name for the semantic analyzer
    #[arg(long, env = "WINGMAN_LLM_MODEL", default_value = "gpt-4o-mini")]
    llm_model: String,

    /// Log level
    #[arg(long, env = "WINGMAN_LOG_LEVEL", default_value = "info")]
    log_level: String,

    /// Enable JSON logging
    #[arg(long, env = "WINGMAN_LOG_JSON")]
    json: bool,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    // Initialize tracing
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| cli.log_level.clone().into());

    if cli.json {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(tracing_subscriber::fmt::layer().json())
            .init();
    } else {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(tracing_subscriber::fmt::layer())
            .init();
    }

    let deployment_env: DeploymentEnv = match cli.deployment_env.parse() {
        Ok(env) => env,
        Err(e) => {
            tracing::error!(error = %e, "invalid deployment environment");
            std::process::exit(1);
        }
    };

    let config = ApiConfig {
        listen_addr: cli.listen,
        deployment_env,
        require_approval: cli.require_approval != "0",
        approval_db: cli.approval_db,
        approval_db_fallback: cli.approval_db_fallback,
        pending_ttl_secs: cli.pending_ttl_secs,
        keys: RoleKeys {
            request: cli.request_key,
            read: cli.read_key,
            decide: cli.decide_key,
            legacy: cli.legacy_key,
        },
        token_secret: cli.token_secret.unwrap_or_default().into_bytes(),
        token_ttl_secs: cli.token_ttl_secs,
        claims_log: cli.claims_log,
        llm_endpoint: cli.llm_endpoint,
        llm_api_key: cli.llm_api_key,
        llm_model: cli.llm_model,
    };

    if let Err(reason) = config.validate() {
        tracing::error!(%reason, "startup configuration rejected");
        std::process::exit(1);
    }

    // Print startup banner
    println!(
        r#"
 __        ___
 \ \      / (_)_ __   __ _ _ __ ___   __ _ _ __
  \ \ /\ / /| | '_ \ / _` | '_ ` _ \ / _` | '_ \
   \ V  V / | | | | | (_| | | | | | | (_| | | | |
    \_/\_/  |_|_| |_|\__, |_| |_| |_|\__,_|_| |_|
                     |___/
  Wingman - Approval API
  Version: {}
  Environment: {}
  Listening: {}
"#,
        env!("CARGO_PKG_VERSION"),
        config.deployment_env,
        config.listen_addr
    );

    let server = match Server::new(config).await {
        Ok(server) => server,
        Err(e) => {
            tracing::error!(error = %e, "failed to start approval API");
            std::process::exit(1);
        }
    };

    if let Err(e) = server.run().await {
        tracing::error!(error = %e, "approval API terminated with an error");
        std::process::exit(1);
    }
}
