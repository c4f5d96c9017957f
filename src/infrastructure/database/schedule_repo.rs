//! SQLite implementation of `ScheduleRepository`.

use async_trait::async_trait;
use sqlx::SqlitePool;
use uuid::Uuid;

use super::utils::{parse_datetime, parse_datetime_opt, parse_uuid};
use crate::domain::error::{DomainError, DomainResult};
use crate::domain::models::{RunStatus, Schedule, ScheduleLog, TaskKind};
use crate::domain::ports::ScheduleRepository;

pub struct ScheduleRepositoryImpl {
    pool: SqlitePool,
}

impl ScheduleRepositoryImpl {
    pub const fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[derive(sqlx::FromRow)]
struct ScheduleRow {
    id: String,
    project_id: String,
    name: String,
    description: Option<String>,
    cron_expression: String,
    task_kind: String,
    command: Option<String>,
    skill_name: Option<String>,
    skill_command: Option<String>,
    skill_args: Option<String>,
    message: Option<String>,
    enabled: i64,
    last_run_at: Option<String>,
    next_run_at: Option<String>,
    run_count: i64,
    created_at: String,
    updated_at: String,
}

impl ScheduleRow {
    fn into_schedule(self) -> DomainResult<Schedule> {
        let task_kind = TaskKind::from_str(&self.task_kind).ok_or_else(|| {
            DomainError::Operational(format!("unknown task kind '{}'", self.task_kind))
        })?;
        let skill_args = self
            .skill_args
            .as_deref()
            .map(serde_json::from_str)
            .transpose()
            .map_err(|e| DomainError::Operational(format!("invalid skill_args JSON: {e}")))?;
        Ok(Schedule {
            id: parse_uuid(&self.id)?,
            project_id: parse_uuid(&self.project_id)?,
            name: self.name,
            description: self.description,
            cron_expression: self.cron_expression,
            task_kind,
            command: self.command,
            skill_name: self.skill_name,
            skill_command: self.skill_command,
            skill_args,
            message: self.message,
            enabled: self.enabled != 0,
            last_run_at: parse_datetime_opt(self.last_run_at.as_deref())?,
            next_run_at: parse_datetime_opt(self.next_run_at.as_deref())?,
            run_count: self.run_count as u64,
            created_at: parse_datetime(&self.created_at)?,
            updated_at: parse_datetime(&self.updated_at)?,
        })
    }
}

const SCHEDULE_COLUMNS: &str = "id, project_id, name, description, cron_expression, task_kind, \
     command, skill_name, skill_command, skill_args, message, enabled, last_run_at, \
     next_run_at, run_count, created_at, updated_at";

#[derive(sqlx::FromRow)]
struct LogRow {
    id: String,
    schedule_id: String,
    status: String,
    started_at: String,
    completed_at: Option<String>,
    output: Option<String>,
    error: Option<String>,
    duration_ms: Option<i64>,
}

impl LogRow {
    fn into_log(self) -> DomainResult<ScheduleLog> {
        let status = RunStatus::from_str(&self.status).ok_or_else(|| {
            DomainError::Operational(format!("unknown run status '{}'", self.status))
        })?;
        Ok(ScheduleLog {
            id: parse_uuid(&self.id)?,
            schedule_id: parse_uuid(&self.schedule_id)?,
            status,
            started_at: parse_datetime(&self.started_at)?,
            completed_at: parse_datetime_opt(self.completed_at.as_deref())?,
            output: self.output,
            error: self.error,
            duration_ms: self.duration_ms.map(|d| d as u64),
        })
    }
}

#[async_trait]
impl ScheduleRepository for ScheduleRepositoryImpl {
    async fn create(&self, schedule: &Schedule) -> DomainResult<()> {
        let skill_args = schedule
            .skill_args
            .as_ref()
            .map(serde_json::to_string)
            .transpose()?;
        sqlx::query(
            "INSERT INTO schedules (id, project_id, name, description, cron_expression, \
             task_kind, command, skill_name, skill_command, skill_args, message, enabled, \
             last_run_at, next_run_at, run_count, created_at, updated_at) \
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16, ?17)",
        )
        .bind(schedule.id.to_string())
        .bind(schedule.project_id.to_string())
        .bind(&schedule.name)
        .bind(&schedule.description)
        .bind(&schedule.cron_expression)
        .bind(schedule.task_kind.as_str())
        .bind(&schedule.command)
        .bind(&schedule.skill_name)
        .bind(&schedule.skill_command)
        .bind(skill_args)
        .bind(&schedule.message)
        .bind(i64::from(schedule.enabled))
        .bind(schedule.last_run_at.map(|t| t.to_rfc3339()))
        .bind(schedule.next_run_at.map(|t| t.to_rfc3339()))
        .bind(schedule.run_count as i64)
        .bind(schedule.created_at.to_rfc3339())
        .bind(schedule.updated_at.to_rfc3339())
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn get(&self, id: Uuid) -> DomainResult<Option<Schedule>> {
        let row: Option<ScheduleRow> = sqlx::query_as(&format!(
            "SELECT {SCHEDULE_COLUMNS} FROM schedules WHERE id = ?1"
        ))
        .bind(id.to_string())
        .fetch_optional(&self.pool)
        .await?;
        row.map(ScheduleRow::into_schedule).transpose()
    }

    async fn update(&self, schedule: &Schedule) -> DomainResult<()> {
        let skill_args = schedule
            .skill_args
            .as_ref()
            .map(serde_json::to_string)
            .transpose()?;
        let result = sqlx::query(
            "UPDATE schedules SET name = ?2, description = ?3, cron_expression = ?4, \
             task_kind = ?5, command = ?6, skill_name = ?7, skill_command = ?8, \
             skill_args = ?9, message = ?10, enabled = ?11, last_run_at = ?12, \
             next_run_at = ?13, run_count = ?14, updated_at = ?15 WHERE id = ?1",
        )
        .bind(schedule.id.to_string())
        .bind(&schedule.name)
        .bind(&schedule.description)
        .bind(&schedule.cron_expression)
        .bind(schedule.task_kind.as_str())
        .bind(&schedule.command)
        .bind(&schedule.skill_name)
        .bind(&schedule.skill_command)
        .bind(skill_args)
        .bind(&schedule.message)
        .bind(i64::from(schedule.enabled))
        .bind(schedule.last_run_at.map(|t| t.to_rfc3339()))
        .bind(schedule.next_run_at.map(|t| t.to_rfc3339()))
        .bind(schedule.run_count as i64)
        .bind(schedule.updated_at.to_rfc3339())
        .execute(&self.pool)
        .await?;
        if result.rows_affected() == 0 {
            return Err(DomainError::not_found(format!("schedule {}", schedule.id)));
        }
        Ok(())
    }

    async fn delete(&self, id: Uuid) -> DomainResult<()> {
        let result = sqlx::query("DELETE FROM schedules WHERE id = ?1")
            .bind(id.to_string())
            .execute(&self.pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(DomainError::not_found(format!("schedule {id}")));
        }
        Ok(())
    }

    async fn list_by_project(&self, project_id: Uuid) -> DomainResult<Vec<Schedule>> {
        let rows: Vec<ScheduleRow> = sqlx::query_as(&format!(
            "SELECT {SCHEDULE_COLUMNS} FROM schedules WHERE project_id = ?1 ORDER BY name"
        ))
        .bind(project_id.to_string())
        .fetch_all(&self.pool)
        .await?;
        rows.into_iter().map(ScheduleRow::into_schedule).collect()
    }

    async fn list_enabled(&self) -> DomainResult<Vec<Schedule>> {
        let rows: Vec<ScheduleRow> = sqlx::query_as(&format!(
            "SELECT {SCHEDULE_COLUMNS} FROM schedules WHERE enabled = 1 ORDER BY name"
        ))
        .fetch_all(&self.pool)
        .await?;
        rows.into_iter().map(ScheduleRow::into_schedule).collect()
    }

    async fn create_log(&self, log: &ScheduleLog) -> DomainResult<()> {
        sqlx::query(
            "INSERT INTO schedule_logs (id, schedule_id, status, started_at, completed_at, \
             output, error, duration_ms) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
        )
        .bind(log.id.to_string())
        .bind(log.schedule_id.to_string())
        .bind(log.status.as_str())
        .bind(log.started_at.to_rfc3339())
        .bind(log.completed_at.map(|t| t.to_rfc3339()))
        .bind(&log.output)
        .bind(&log.error)
        .bind(log.duration_ms.map(|d| d as i64))
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn update_log(&self, log: &ScheduleLog) -> DomainResult<()> {
        let result = sqlx::query(
            "UPDATE schedule_logs SET status = ?2, completed_at = ?3, output = ?4, \
             error = ?5, duration_ms = ?6 WHERE id = ?1",
        )
        .bind(log.id.to_string())
        .bind(log.status.as_str())
        .bind(log.completed_at.map(|t| t.to_rfc3339()))
        .bind(&log.output)
        .bind(&log.error)
        .bind(log.duration_ms.map(|d| d as i64))
        .execute(&self.pool)
        .await?;
        if result.rows_affected() == 0 {
            return Err(DomainError::not_found(format!("schedule log {}", log.id)));
        }
        Ok(())
    }

    async fn list_logs(&self, schedule_id: Uuid, limit: usize) -> DomainResult<Vec<ScheduleLog>> {
        let rows: Vec<LogRow> = sqlx::query_as(
            "SELECT id, schedule_id, status, started_at, completed_at, output, error, \
             duration_ms FROM schedule_logs WHERE schedule_id = ?1 \
             ORDER BY started_at DESC LIMIT ?2",
        )
        .bind(schedule_id.to_string())
        .bind(limit as i64)
        .fetch_all(&self.pool)
        .await?;
        rows.into_iter().map(LogRow::into_log).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::models::{ExecutionOutcome, Project};
    use crate::domain::ports::ProjectRepository;
    use crate::infrastructure::database::{DatabaseConnection, ProjectRepositoryImpl};

    async fn setup() -> (ScheduleRepositoryImpl, Project) {
        let db = DatabaseConnection::new("sqlite::memory:").await.unwrap();
        db.migrate().await.unwrap();
        let projects = ProjectRepositoryImpl::new(db.pool().clone());
        let project = Project::new("demo", "/tmp/demo");
        projects.create(&project).await.unwrap();
        (ScheduleRepositoryImpl::new(db.pool().clone()), project)
    }

    #[tokio::test]
    async fn test_schedule_round_trip() {
        let (repo, project) = setup().await;
        let mut s = Schedule::new(project.id, "standup", "0 9 * * *", TaskKind::Reminder);
        s.message = Some("standup".into());
        repo.create(&s).await.unwrap();

        let got = repo.get(s.id).await.unwrap().unwrap();
        assert_eq!(got, s);
    }

    #[tokio::test]
    async fn test_list_enabled_filters() {
        let (repo, project) = setup().await;
        let enabled = Schedule::new(project.id, "a", "* * * * *", TaskKind::Reminder);
        let mut disabled = Schedule::new(project.id, "b", "* * * * *", TaskKind::Reminder);
        disabled.enabled = false;
        repo.create(&enabled).await.unwrap();
        repo.create(&disabled).await.unwrap();

        let listed = repo.list_enabled().await.unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].id, enabled.id);
    }

    #[tokio::test]
    async fn test_log_lifecycle_and_cascade() {
        let (repo, project) = setup().await;
        let s = Schedule::new(project.id, "nightly", "0 3 * * *", TaskKind::Backup);
        repo.create(&s).await.unwrap();

        let mut log = ScheduleLog::start(s.id);
        repo.create_log(&log).await.unwrap();
        log.finish(&ExecutionOutcome::ok("done", 42));
        repo.update_log(&log).await.unwrap();

        let logs = repo.list_logs(s.id, 10).await.unwrap();
        assert_eq!(logs.len(), 1);
        assert_eq!(logs[0].status, RunStatus::Completed);

        repo.delete(s.id).await.unwrap();
        assert!(repo.list_logs(s.id, 10).await.unwrap().is_empty());
    }
}
