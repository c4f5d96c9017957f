//! Built-in task executors for the cron engine.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;

use async_trait::async_trait;
use chrono::Utc;
use serde_json::json;
use tokio::process::Command;

use super::skills::SkillRegistry;
use crate::domain::models::{ExecutionOutcome, Project, Schedule};
use crate::domain::ports::TaskExecutor;

fn elapsed_ms(start: Instant) -> u64 {
    start.elapsed().as_millis() as u64
}

/// Logs the schedule's message. Always succeeds.
pub struct ReminderExecutor;

#[async_trait]
impl TaskExecutor for ReminderExecutor {
    async fn execute(&self, schedule: &Schedule, project: &Project) -> ExecutionOutcome {
        let start = Instant::now();
        let message = schedule
            .message
            .clone()
            .unwrap_or_else(|| format!("Reminder from schedule '{}'", schedule.name));
        tracing::info!(
            schedule = %schedule.name,
            project = %project.name,
            "{message}"
        );
        ExecutionOutcome::ok(message, elapsed_ms(start))
    }
}

/// Serialises the project record and schedule context to a JSON file under
/// `backups/{projectId}/` in the data directory.
pub struct BackupExecutor {
    data_dir: PathBuf,
}

impl BackupExecutor {
    pub fn new(data_dir: PathBuf) -> Self {
        Self { data_dir }
    }
}

#[async_trait]
impl TaskExecutor for BackupExecutor {
    async fn execute(&self, schedule: &Schedule, project: &Project) -> ExecutionOutcome {
        let start = Instant::now();
        let timestamp = Utc::now().format("%Y-%m-%dT%H-%M-%SZ");
        let backup_dir = self.data_dir.join("backups").join(project.id.to_string());
        let path = backup_dir.join(format!("backup-{timestamp}.json"));

        let payload = json!({
            "project": project,
            "schedule": {"id": schedule.id, "name": schedule.name},
            "createdAt": Utc::now().to_rfc3339(),
        });

        let result = async {
            tokio::fs::create_dir_all(&backup_dir).await?;
            let body = serde_json::to_vec_pretty(&payload)
                .map_err(|e| std::io::Error::other(e.to_string()))?;
            tokio::fs::write(&path, body).await
        }
        .await;

        match result {
            Ok(()) => ExecutionOutcome::ok(path.display().to_string(), elapsed_ms(start)),
            Err(e) => ExecutionOutcome::failed(
                format!("backup write failed: {e}"),
                elapsed_ms(start),
            ),
        }
    }
}

/// Runs the schedule's command as a shell command in the project root,
/// capturing stdout and stderr.
pub struct CommandExecutor;

#[async_trait]
impl TaskExecutor for CommandExecutor {
    async fn execute(&self, schedule: &Schedule, project: &Project) -> ExecutionOutcome {
        let start = Instant::now();
        let Some(command) = schedule.command.as_deref() else {
            return ExecutionOutcome::failed("schedule has no command", elapsed_ms(start));
        };

        let output = Command::new("sh")
            .arg("-c")
            .arg(command)
            .current_dir(&project.absolute_path)
            .output()
            .await;

        match output {
            Ok(output) => {
                let stdout = String::from_utf8_lossy(&output.stdout).trim().to_string();
                let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
                if output.status.success() {
                    ExecutionOutcome::ok(stdout, elapsed_ms(start))
                } else {
                    ExecutionOutcome {
                        success: false,
                        output: (!stdout.is_empty()).then_some(stdout),
                        error: Some(format!(
                            "command exited with {}: {stderr}",
                            output
                                .status
                                .code()
                                .map_or_else(|| "signal".to_string(), |c| c.to_string())
                        )),
                        duration_ms: elapsed_ms(start),
                    }
                }
            }
            Err(e) => {
                ExecutionOutcome::failed(format!("failed to run command: {e}"), elapsed_ms(start))
            }
        }
    }
}

/// Delegates to a command of a registered skill.
pub struct SkillExecutor {
    registry: Arc<SkillRegistry>,
}

impl SkillExecutor {
    pub fn new(registry: Arc<SkillRegistry>) -> Self {
        Self { registry }
    }
}

#[async_trait]
impl TaskExecutor for SkillExecutor {
    async fn execute(&self, schedule: &Schedule, _project: &Project) -> ExecutionOutcome {
        let start = Instant::now();
        let (Some(skill_name), Some(skill_command)) =
            (schedule.skill_name.as_deref(), schedule.skill_command.as_deref())
        else {
            return ExecutionOutcome::failed(
                "schedule is missing skillName or skillCommand",
                elapsed_ms(start),
            );
        };
        let args = schedule.skill_args.clone().unwrap_or(json!({}));

        match self.registry.execute(skill_name, skill_command, args).await {
            Ok(result) => ExecutionOutcome::ok(result.to_string(), elapsed_ms(start)),
            Err(e) => ExecutionOutcome::failed(e.to_string(), elapsed_ms(start)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::models::TaskKind;
    use uuid::Uuid;

    fn schedule(kind: TaskKind) -> Schedule {
        Schedule::new(Uuid::new_v4(), "test", "* * * * *", kind)
    }

    fn project_at(path: &str) -> Project {
        Project::new("demo", path)
    }

    #[tokio::test]
    async fn test_reminder_uses_message() {
        let mut s = schedule(TaskKind::Reminder);
        s.message = Some("standup".into());
        let outcome = ReminderExecutor
            .execute(&s, &project_at("/tmp"))
            .await;
        assert!(outcome.success);
        assert_eq!(outcome.output.as_deref(), Some("standup"));
    }

    #[tokio::test]
    async fn test_reminder_default_message() {
        let s = schedule(TaskKind::Reminder);
        let outcome = ReminderExecutor
            .execute(&s, &project_at("/tmp"))
            .await;
        assert!(outcome.success);
        assert!(outcome.output.unwrap().contains("test"));
    }

    #[tokio::test]
    async fn test_backup_writes_json_file() {
        let dir = tempfile::tempdir().unwrap();
        let executor = BackupExecutor::new(dir.path().to_path_buf());
        let project = project_at("/tmp/demo");
        let outcome = executor.execute(&schedule(TaskKind::Backup), &project).await;

        assert!(outcome.success, "backup failed: {:?}", outcome.error);
        let path = PathBuf::from(outcome.output.unwrap());
        assert!(path.exists());
        let contents: serde_json::Value =
            serde_json::from_slice(&std::fs::read(&path).unwrap()).unwrap();
        assert_eq!(contents["project"]["name"], "demo");
        assert!(path
            .parent()
            .unwrap()
            .ends_with(project.id.to_string()));
    }

    #[tokio::test]
    async fn test_command_captures_stdout() {
        let dir = tempfile::tempdir().unwrap();
        let mut s = schedule(TaskKind::Command);
        s.command = Some("echo hello".into());
        let outcome = CommandExecutor
            .execute(&s, &project_at(dir.path().to_str().unwrap()))
            .await;
        assert!(outcome.success);
        assert_eq!(outcome.output.as_deref(), Some("hello"));
    }

    #[tokio::test]
    async fn test_command_failure_reports_stderr() {
        let dir = tempfile::tempdir().unwrap();
        let mut s = schedule(TaskKind::Command);
        s.command = Some("echo oops >&2; exit 3".into());
        let outcome = CommandExecutor
            .execute(&s, &project_at(dir.path().to_str().unwrap()))
            .await;
        assert!(!outcome.success);
        let error = outcome.error.unwrap();
        assert!(error.contains('3'));
        assert!(error.contains("oops"));
    }

    #[tokio::test]
    async fn test_command_missing_is_failure() {
        let s = schedule(TaskKind::Command);
        let outcome = CommandExecutor.execute(&s, &project_at("/tmp")).await;
        assert!(!outcome.success);
    }
}
