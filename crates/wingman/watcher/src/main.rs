//! Wingman Watcher - claims tailer and approval poller

use clap::Parser;
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use wingman_watcher::config::{parse_backends, WatcherConfig};
use wingman_watcher::Watcher;

/// Watcher CLI
#[derive(Parser)]
#[command(name = "wingman-watcher")]
#[command(about = "Wingman Watcher - claims tailer, approval poller, and operator alerting", long_about = None)]
#[command(version)]
struct Cli {
    /// Claims audit JSONL path
    #[arg(long, env = "WINGMAN_AUDIT_LOG", default_value = "wingman_claims.jsonl")]
    claims_log: PathBuf,

    /// Cursor state file
    #[arg(long, env = "WINGMAN_WATCHER_STATE", default_value = "wingman_watcher_state.json")]
    state_file: PathBuf,

    /// Claims tailer interval in seconds; 0 disables the tailer
    #[arg(long, env = "WINGMAN_WATCHER_INTERVAL_SEC", default_value_t = 5)]
    interval_secs: u64,

    /// Dedup window in seconds
    #[arg(long, env = "WINGMAN_WATCHER_DEDUP_SEC", default_value_t = 600)]
    dedup_window_secs: i64,

    /// Approval poll interval in seconds; 0 disables the poller
    #[arg(long, env = "WINGMAN_APPROVAL_CHECK_INTERVAL_SEC", default_value_t = 30)]
    approval_poll_secs: u64,

    /// Approval API base URL for pending polling
    #[arg(long, env = "WINGMAN_API_URL", default_value = "http://127.0.0.1:8080")]
    api_url: String,

    /// Read key presented to the approval API
    #[arg(long, env = "WINGMAN_APPROVAL_READ_KEY", hide_env_values = true)]
    read_key: Option<String>,

    /// Primary approval database path
    #[arg(long, env = "WINGMAN_APPROVAL_DB", default_value = "wingman_approvals.db")]
    approval_db: PathBuf,

    /// Fallback approval database path
    #[arg(long, env = "WINGMAN_APPROVAL_DB_FALLBACK")]
    approval_db_fallback: Option<PathBuf>,

    /// Comma-separated notification sinks (stdout|telegram|webhook)
    #[arg(long, env = "WINGMAN_NOTIFY_BACKENDS", default_value = "stdout")]
    notify_backends: String,

    /// Telegram bot token
    #[arg(long, env = "TELEGRAM_BOT_TOKEN", hide_env_values = true)]
    telegram_bot_token: Option<String>,

    /// Telegram chat id
    #[arg(long, env = "TELEGRAM_CHAT_ID", hide_env_values = true)]
    telegram_chat_id: Option<String>,

    /// Webhook URL for incident POSTs
    #[arg(long, env = "WINGMAN_WEBHOOK_URL", hide_env_values = true)]
    webhook_url: Option<String>,

    /// Quarantine workers on CRITICAL incidents; "0" disables
    #[arg(long, env = "WINGMAN_QUARANTINE_ON_CRITICAL", default_value = "1")]
    quarantine_on_critical: String,

    /// Remediation command template, whitespace-separated argv with
    /// {worker_id} {verdict} {severity} placeholders
    #[arg(long, env = "WINGMAN_REMEDIATION_CMD")]
    remediation_cmd: Option<String>,

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

    let backends = match parse_backends(&cli.notify_backends) {
        Ok(backends) => backends,
        Err(reason) => {
            tracing::error!(%reason, "invalid notify backends");
            std::process::exit(1);
        }
    };

    let remediation_template = cli.remediation_cmd.as_deref().map(|raw| {
        raw.split_whitespace()
            .map(|s| s.to_string())
            .collect::<Vec<_>>()
    });

    let config = WatcherConfig {
        claims_log: cli.claims_log,
        state_file: cli.state_file,
        interval_secs: cli.interval_secs,
        dedup_window_secs: cli.dedup_window_secs,
        approval_poll_secs: cli.approval_poll_secs,
        api_url: cli.api_url,
        read_key: cli.read_key,
        approval_db: cli.approval_db,
        approval_db_fallback: cli.approval_db_fallback,
        backends,
        telegram_bot_token: cli.telegram_bot_token,
        telegram_chat_id: cli.telegram_chat_id,
        webhook_url: cli.webhook_url,
        quarantine_on_critical: cli.quarantine_on_critical != "0",
        remediation_template,
    };

    if let Err(reason) = config.validate() {
        tracing::error!(%reason, "startup configuration rejected");
        std::process::exit(1);
    }

    if !config.has_work() {
        tracing::warn!("both loops are disabled, nothing to do");
        std::process::exit(2);
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
  Wingman - Watcher
  Version: {}
  Claims log: {}
"#,
        env!("CARGO_PKG_VERSION"),
        config.claims_log.display()
    );

    let watcher = match Watcher::new(config).await {
        Ok(watcher) => watcher,
        Err(e) => {
            tracing::error!(error = %e, "failed to start watcher");
            std::process::exit(1);
        }
    };

    if let Err(e) = watcher.run().await {
        tracing::error!(error = %e, "watcher terminated with an error");
        std::process::exit(1);
    }
}
