//! Coding-agent child process supervision.
//!
//! Spawns the external coding-agent CLI against a project directory and
//! handles signal-based shutdown: SIGTERM, a grace period, then SIGKILL.
//! Recorded pids are weak references; liveness is probed before signalling.

use std::path::Path;
use std::process::Stdio;
use std::time::Duration;

use nix::sys::signal::{kill, Signal};
use nix::unistd::Pid;
use tokio::io::AsyncWriteExt;
use tokio::process::{Child, Command};
use uuid::Uuid;

use crate::domain::error::{DomainError, DomainResult};
use crate::domain::models::SessionOptions;

/// How long a stopped child gets to exit before SIGKILL.
pub const STOP_GRACE: Duration = Duration::from_secs(2);

/// Daemon environment variables forwarded to children; everything else is
/// dropped.
const INHERITED_ENV: &[&str] = &[
    "PATH",
    "HOME",
    "ANTHROPIC_API_KEY",
    "NOTION_TOKEN",
    "NOTION_PARENT_PAGE_ID",
];

/// Configuration for launching the coding agent.
#[derive(Debug, Clone)]
pub struct AgentBinary {
    /// Executable name or path; `CLAUDE_BINARY` overrides
    pub path: String,
}

impl Default for AgentBinary {
    fn default() -> Self {
        Self {
            path: std::env::var("CLAUDE_BINARY").unwrap_or_else(|_| "claude".to_string()),
        }
    }
}

/// Spawns and signals coding-agent children.
#[derive(Debug, Clone, Default)]
pub struct ProcessSupervisor {
    binary: AgentBinary,
}

impl ProcessSupervisor {
    pub fn new(binary: AgentBinary) -> Self {
        Self { binary }
    }

    /// Probe whether the coding-agent CLI can be executed.
    pub async fn is_available(&self) -> bool {
        Command::new(&self.binary.path)
            .arg("--version")
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status()
            .await
            .map(|status| status.success())
            .unwrap_or(false)
    }

    /// Spawn the coding agent in the project directory.
    ///
    /// The child gets a sanitised environment: only [`INHERITED_ENV`]
    /// variables survive, plus `MAXCLAW_SESSION_ID` and
    /// `MAXCLAW_PROJECT_ID`. Spawn failure surfaces synchronously to the
    /// caller.
    pub async fn spawn(
        &self,
        project_path: &Path,
        session_id: Uuid,
        project_id: Uuid,
        options: &SessionOptions,
    ) -> DomainResult<Child> {
        let mut cmd = Command::new(&self.binary.path);
        cmd.current_dir(project_path).env_clear();
        for name in INHERITED_ENV {
            if let Ok(value) = std::env::var(name) {
                cmd.env(name, value);
            }
        }
        cmd.env("MAXCLAW_SESSION_ID", session_id.to_string())
            .env("MAXCLAW_PROJECT_ID", project_id.to_string())
            .stdin(Stdio::piped())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .kill_on_drop(false);

        if let Some(tools) = &options.allowed_tools {
            if !tools.is_empty() {
                cmd.arg("--allowedTools").arg(tools.join(","));
            }
        }

        tracing::info!(
            session_id = %session_id,
            project_id = %project_id,
            binary = %self.binary.path,
            cwd = %project_path.display(),
            "spawning coding agent"
        );

        let mut child = cmd.spawn().map_err(|e| {
            DomainError::Operational(format!(
                "failed to spawn coding agent '{}': {e}",
                self.binary.path
            ))
        })?;

        if let Some(prompt) = &options.initial_prompt {
            if let Some(mut stdin) = child.stdin.take() {
                let prompt = prompt.clone();
                let sid = session_id;
                tokio::spawn(async move {
                    if let Err(e) = stdin.write_all(prompt.as_bytes()).await {
                        tracing::warn!(session_id = %sid, error = %e, "failed to write initial prompt");
                    }
                    // Closing stdin signals end of input.
                });
            }
        } else {
            drop(child.stdin.take());
        }

        Ok(child)
    }
}

/// Whether a process with this pid exists.
pub fn pid_alive(pid: u32) -> bool {
    kill(Pid::from_raw(pid as i32), None).is_ok()
}

/// Send SIGTERM; errors from already-dead processes are ignored.
pub fn signal_term(pid: u32) {
    if let Err(e) = kill(Pid::from_raw(pid as i32), Signal::SIGTERM) {
        tracing::debug!(pid, error = %e, "SIGTERM delivery failed");
    }
}

/// Send SIGKILL; errors from already-dead processes are ignored.
pub fn signal_kill(pid: u32) {
    if let Err(e) = kill(Pid::from_raw(pid as i32), Signal::SIGKILL) {
        tracing::debug!(pid, error = %e, "SIGKILL delivery failed");
    }
}

/// Stop a child: SIGTERM, wait up to [`STOP_GRACE`], then SIGKILL.
///
/// Polls liveness rather than reaping; the session's exit waiter owns the
/// actual `wait`.
pub async fn stop_with_grace(pid: u32) {
    signal_term(pid);

    let deadline = tokio::time::Instant::now() + STOP_GRACE;
    while tokio::time::Instant::now() < deadline {
        if !pid_alive(pid) {
            return;
        }
        tokio::time::sleep(Duration::from_millis(100)).await;
    }

    if pid_alive(pid) {
        tracing::warn!(pid, "grace period expired, sending SIGKILL");
        signal_kill(pid);
    }
}
