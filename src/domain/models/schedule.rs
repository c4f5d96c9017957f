//! Cron-triggered maintenance schedules and their execution logs.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// What kind of work a schedule dispatches.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TaskKind {
    Reminder,
    Backup,
    Command,
    Skill,
    /// Declared but no executor is registered; executing it fails with
    /// "no executor".
    GithubSync,
}

impl TaskKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Reminder => "reminder",
            Self::Backup => "backup",
            Self::Command => "command",
            Self::Skill => "skill",
            Self::GithubSync => "github-sync",
        }
    }

    #[allow(clippy::should_implement_trait)]
    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "reminder" => Some(Self::Reminder),
            "backup" => Some(Self::Backup),
            "command" => Some(Self::Command),
            "skill" => Some(Self::Skill),
            "github-sync" => Some(Self::GithubSync),
            _ => None,
        }
    }
}

/// A cron-triggered task attached to a project.
///
/// Invariants: `next_run_at` is set iff `enabled`; `run_count` only grows.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Schedule {
    pub id: Uuid,
    pub project_id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub cron_expression: String,
    pub task_kind: TaskKind,
    pub command: Option<String>,
    pub skill_name: Option<String>,
    pub skill_command: Option<String>,
    pub skill_args: Option<serde_json::Value>,
    pub message: Option<String>,
    pub enabled: bool,
    pub last_run_at: Option<DateTime<Utc>>,
    pub next_run_at: Option<DateTime<Utc>>,
    pub run_count: u64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Schedule {
    pub fn new(
        project_id: Uuid,
        name: impl Into<String>,
        cron_expression: impl Into<String>,
        task_kind: TaskKind,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            project_id,
            name: name.into(),
            description: None,
            cron_expression: cron_expression.into(),
            task_kind,
            command: None,
            skill_name: None,
            skill_command: None,
            skill_args: None,
            message: None,
            enabled: true,
            last_run_at: None,
            next_run_at: None,
            run_count: 0,
            created_at: now,
            updated_at: now,
        }
    }

    /// Due when enabled and the next run is unset or in the past.
    pub fn is_due(&self, now: DateTime<Utc>) -> bool {
        if !self.enabled {
            return false;
        }
        match self.next_run_at {
            None => true,
            Some(next) => next <= now,
        }
    }
}

/// Status of one schedule execution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunStatus {
    Pending,
    Running,
    Completed,
    Failed,
}

impl RunStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Running => "running",
            Self::Completed => "completed",
            Self::Failed => "failed",
        }
    }

    #[allow(clippy::should_implement_trait)]
    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(Self::Pending),
            "running" => Some(Self::Running),
            "completed" => Some(Self::Completed),
            "failed" => Some(Self::Failed),
            _ => None,
        }
    }
}

/// Record of one execution of a schedule. Cascade-deleted with it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScheduleLog {
    pub id: Uuid,
    pub schedule_id: Uuid,
    pub status: RunStatus,
    pub started_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
    pub output: Option<String>,
    pub error: Option<String>,
    pub duration_ms: Option<u64>,
}

impl ScheduleLog {
    /// Open a log in the `running` state.
    pub fn start(schedule_id: Uuid) -> Self {
        Self {
            id: Uuid::new_v4(),
            schedule_id,
            status: RunStatus::Running,
            started_at: Utc::now(),
            completed_at: None,
            output: None,
            error: None,
            duration_ms: None,
        }
    }

    /// Close the log with the executor's outcome.
    pub fn finish(&mut self, outcome: &ExecutionOutcome) {
        self.status = if outcome.success {
            RunStatus::Completed
        } else {
            RunStatus::Failed
        };
        self.completed_at = Some(Utc::now());
        self.output = outcome.output.clone();
        self.error = outcome.error.clone();
        self.duration_ms = Some(outcome.duration_ms);
    }
}

/// What a task executor reports back.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExecutionOutcome {
    pub success: bool,
    pub output: Option<String>,
    pub error: Option<String>,
    pub duration_ms: u64,
}

impl ExecutionOutcome {
    pub fn ok(output: impl Into<String>, duration_ms: u64) -> Self {
        Self {
            success: true,
            output: Some(output.into()),
            error: None,
            duration_ms,
        }
    }

    pub fn failed(error: impl Into<String>, duration_ms: u64) -> Self {
        Self {
            success: false,
            output: None,
            error: Some(error.into()),
            duration_ms,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_task_kind_round_trip() {
        for kind in [
            TaskKind::Reminder,
            TaskKind::Backup,
            TaskKind::Command,
            TaskKind::Skill,
            TaskKind::GithubSync,
        ] {
            assert_eq!(TaskKind::from_str(kind.as_str()), Some(kind));
        }
        assert_eq!(TaskKind::GithubSync.as_str(), "github-sync");
    }

    #[test]
    fn test_due_detection() {
        let mut s = Schedule::new(Uuid::new_v4(), "nightly", "0 3 * * *", TaskKind::Backup);
        let now = Utc::now();

        // No next_run_at yet: due.
        assert!(s.is_due(now));

        s.next_run_at = Some(now + chrono::Duration::hours(1));
        assert!(!s.is_due(now));

        s.next_run_at = Some(now - chrono::Duration::minutes(1));
        assert!(s.is_due(now));

        s.enabled = false;
        assert!(!s.is_due(now));
    }

    #[test]
    fn test_log_lifecycle() {
        let mut log = ScheduleLog::start(Uuid::new_v4());
        assert_eq!(log.status, RunStatus::Running);

        log.finish(&ExecutionOutcome::ok("standup", 12));
        assert_eq!(log.status, RunStatus::Completed);
        assert_eq!(log.output.as_deref(), Some("standup"));
        assert!(log.completed_at.is_some());

        let mut failed = ScheduleLog::start(Uuid::new_v4());
        failed.finish(&ExecutionOutcome::failed("boom", 3));
        assert_eq!(failed.status, RunStatus::Failed);
        assert_eq!(failed.error.as_deref(), Some("boom"));
    }
}
