//! Shell command execution with timeout and output capping

use std::path::PathBuf;
use std::process::Stdio;
use std::time::{Duration, Instant};

use tokio::process::Command;

pub const DEFAULT_TIMEOUT_SECS: u64 = 300;
pub const DEFAULT_MAX_OUTPUT_BYTES: usize = 64 * 1024;

const TRUNCATION_MARKER: &str = "... [output truncated]";

/// Result of a single command run. Captures everything the audit
/// record needs; the gateway never re-runs a command to recover state.
#[derive(Debug)]
pub struct ExecutionOutcome {
    pub exit_code: i32,
    pub output: String,
    pub duration_ms: u64,
    pub timed_out: bool,
    pub error: Option<String>,
}

/// Runs approved commands under `sh -c` with a wall-clock timeout.
pub struct CommandExecutor {
    workdir: Option<PathBuf>,
    timeout: Duration,
    max_output_bytes: usize,
}

impl CommandExecutor {
    pub fn new(workdir: Option<PathBuf>, timeout: Duration, max_output_bytes: usize) -> Self {
        Self {
            workdir,
            timeout,
            max_output_bytes,
        }
    }

    /// Executes `command` and waits for completion or timeout. A timed
    /// out child is killed; its partial output is not recovered.
    pub async fn run(&self, command: &str) -> ExecutionOutcome {
        let started = Instant::now();

        let mut cmd = Command::new("sh");
        cmd.arg("-c")
            .arg(command)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        if let Some(dir) = &self.workdir {
            cmd.current_dir(dir);
        }

        let child = match cmd.spawn() {
            Ok(child) => child,
            Err(e) => {
                return ExecutionOutcome {
                    exit_code: -1,
                    output: String::new(),
                    duration_ms: started.elapsed().as_millis() as u64,
                    timed_out: false,
                    error: Some(format!("failed to spawn command: {e}")),
                }
            }
        };

        match tokio::time::timeout(self.timeout, child.wait_with_output()).await {
            Ok(Ok(out)) => {
                let mut combined = String::from_utf8_lossy(&out.stdout).into_owned();
                let stderr = String::from_utf8_lossy(&out.stderr);
                if !stderr.is_empty() {
                    if !combined.is_empty() && !combined.ends_with('\n') {
                        combined.push('\n');
                    }
                    combined.push_str(&stderr);
                }
                ExecutionOutcome {
                    exit_code: out.status.code().unwrap_or(-1),
                    output: self.truncate(combined),
                    duration_ms: started.elapsed().as_millis() as u64,
                    timed_out: false,
                    error: None,
                }
            }
            Ok(Err(e)) => ExecutionOutcome {
                exit_code: -1,
                output: String::new(),
                duration_ms: started.elapsed().as_millis() as u64,
                timed_out: false,
                error: Some(format!("failed to collect command output: {e}")),
            },
            // Dropping the timed-out future drops the child, which
            // kill_on_drop reaps.
            Err(_) => ExecutionOutcome {
                exit_code: -1,
                output: String::new(),
                duration_ms: started.elapsed().as_millis() as u64,
                timed_out: true,
                error: Some(format!(
                    "command exceeded timeout of {}s",
                    self.timeout.as_secs()
                )),
            },
        }
    }

    fn truncate(&self, mut output: String) -> String {
        if output.len() <= self.max_output_bytes {
            return output;
        }
        let mut cut = self.max_output_bytes;
        while cut > 0 && !output.is_char_boundary(cut) {
            cut -= 1;
        }
        output.truncate(cut);
        output.push_str(TRUNCATION_MARKER);
        output
    }
}

impl Default for CommandExecutor {
    fn default() -> Self {
        Self::new(
            None,
            Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            DEFAULT_MAX_OUTPUT_BYTES,
        )
    }
}
