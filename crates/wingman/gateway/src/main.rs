//! Wingman Execution Gateway - token-gated command execution

use clap::Parser;
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use wingman_gateway::config::{parse_environments, AuditStorage, GatewayConfig};
use wingman_gateway::executor::{DEFAULT_MAX_OUTPUT_BYTES, DEFAULT_TIMEOUT_SECS};
use wingman_gateway::Server;

/// Execution gateway CLI
#[derive(Parser)]
#[command(name = "wingman-gateway")]
#[command(about = "Wingman Execution Gateway - token-gated command execution with audit", long_about = None)]
#[command(version)]
struct Cli {
    /// Listen address
    #[arg(short, long, env = "WINGMAN_GATEWAY_LISTEN_ADDR", default_value = "127.0.0.1:8081")]
    listen: String,

    /// Comma-separated environments this gateway executes for
    #[arg(long, env = "ALLOWED_ENVIRONMENTS", default_value = "dev,test")]
    allowed_environments: String,

    /// HMAC secret for capability tokens
    #[arg(long, env = "WINGMAN_TOKEN_SECRET", hide_env_values = true)]
    token_secret: Option<String>,

    /// Audit storage backend (postgres|jsonl)
    #[arg(long, env = "AUDIT_STORAGE", default_value = "jsonl")]
    audit_storage: String,

    /// Audit database URL, required when the backend is postgres
    #[arg(long, env = "DATABASE_URL", hide_env_values = true)]
    database_url: Option<String>,

    /// Execution audit JSONL path (fallback and jsonl backend)
    #[arg(long, env = "WINGMAN_EXECUTION_LOG", default_value = "wingman_executions.jsonl")]
    audit_log: PathBuf,

    /// Command timeout in seconds
    #[arg(long, env = "WINGMAN_EXEC_TIMEOUT_SEC", default_value_t = DEFAULT_TIMEOUT_SECS)]
    exec_timeout_secs: u64,

    /// Working directory for executed commands
    #[arg(long, env = "WINGMAN_EXEC_WORKDIR")]
    exec_workdir: Option<PathBuf>,

    /// Captured output cap in bytes
    #[arg(long, env = "WINGMAN_EXEC_MAX_OUTPUT_BYTES", default_value_t = DEFAULT_MAX_OUTPUT_BYTES)]
    max_output_bytes: usize,

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

    let allowed_environments = match parse_environments(&cli.allowed_environments) {
        Ok(envs) => envs,
        Err(reason) => {
            tracing::error!(%reason, "invalid allowed environments");
            std::process::exit(1);
        }
    };

    let audit_storage: AuditStorage = match cli.audit_storage.parse() {
        Ok(backend) => backend,
        Err(reason) => {
            tracing::error!(%reason, "invalid audit storage backend");
            std::process::exit(1);
        }
    };

    let config = GatewayConfig {
        listen_addr: cli.listen,
        allowed_environments,
        token_secret: cli.token_secret.unwrap_or_default().into_bytes(),
        audit_storage,
        database_url: cli.database_url,
        audit_log: cli.audit_log,
        exec_timeout_secs: cli.exec_timeout_secs,
        exec_workdir: cli.exec_workdir,
        max_output_bytes: cli.max_output_bytes,
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
  Wingman - Execution Gateway
  Version: {}
  Environments: {}
  Listening: {}
"#,
        env!("CARGO_PKG_VERSION"),
        config
            .allowed_environments
            .iter()
            .map(|e| e.to_string())
            .collect::<Vec<_>>()
            .join(","),
        config.listen_addr
    );

    let server = match Server::new(config).await {
        Ok(server) => server,
        Err(e) => {
            tracing::error!(error = %e, "failed to start execution gateway");
            std::process::exit(1);
        }
    };

    if let Err(e) = server.run().await {
        tracing::error!(error = %e, "execution gateway terminated with an error");
        std::process::exit(1);
    }
}
