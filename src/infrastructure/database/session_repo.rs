//! SQLite implementation of `SessionRepository`.

use async_trait::async_trait;
use sqlx::SqlitePool;
use uuid::Uuid;

use super::utils::{map_insert_err, parse_datetime, parse_datetime_opt, parse_uuid};
use crate::domain::error::{DomainError, DomainResult};
use crate::domain::models::{Session, SessionStatus};
use crate::domain::ports::SessionRepository;

pub struct SessionRepositoryImpl {
    pool: SqlitePool,
}

impl SessionRepositoryImpl {
    pub const fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[derive(sqlx::FromRow)]
struct SessionRow {
    id: String,
    project_id: String,
    started_at: String,
    ended_at: Option<String>,
    status: String,
    summary: Option<String>,
    summary_status: Option<String>,
    summary_generated_at: Option<String>,
    os_process_id: Option<i64>,
}

impl SessionRow {
    fn into_session(self) -> DomainResult<Session> {
        let status = SessionStatus::from_str(&self.status).ok_or_else(|| {
            DomainError::Operational(format!("unknown session status '{}'", self.status))
        })?;
        Ok(Session {
            id: parse_uuid(&self.id)?,
            project_id: parse_uuid(&self.project_id)?,
            started_at: parse_datetime(&self.started_at)?,
            ended_at: parse_datetime_opt(self.ended_at.as_deref())?,
            status,
            summary: self.summary,
            summary_status: self.summary_status,
            summary_generated_at: parse_datetime_opt(self.summary_generated_at.as_deref())?,
            os_process_id: self.os_process_id.map(|pid| pid as u32),
        })
    }
}

const COLUMNS: &str = "id, project_id, started_at, ended_at, status, summary, summary_status, \
     summary_generated_at, os_process_id";

#[async_trait]
impl SessionRepository for SessionRepositoryImpl {
    async fn create(&self, session: &Session) -> DomainResult<()> {
        sqlx::query(
            "INSERT INTO sessions (id, project_id, started_at, ended_at, status, summary, \
             summary_status, summary_generated_at, os_process_id) \
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
        )
        .bind(session.id.to_string())
        .bind(session.project_id.to_string())
        .bind(session.started_at.to_rfc3339())
        .bind(session.ended_at.map(|t| t.to_rfc3339()))
        .bind(session.status.as_str())
        .bind(&session.summary)
        .bind(&session.summary_status)
        .bind(session.summary_generated_at.map(|t| t.to_rfc3339()))
        .bind(session.os_process_id.map(i64::from))
        .execute(&self.pool)
        .await
        .map_err(|e| {
            // The partial unique index on active sessions turns a lost
            // start race into a conflict here.
            map_insert_err(
                e,
                &format!("active session for project {}", session.project_id),
            )
        })?;
        Ok(())
    }

    async fn get(&self, id: Uuid) -> DomainResult<Option<Session>> {
        let row: Option<SessionRow> =
            sqlx::query_as(&format!("SELECT {COLUMNS} FROM sessions WHERE id = ?1"))
                .bind(id.to_string())
                .fetch_optional(&self.pool)
                .await?;
        row.map(SessionRow::into_session).transpose()
    }

    async fn update(&self, session: &Session) -> DomainResult<()> {
        let result = sqlx::query(
            "UPDATE sessions SET ended_at = ?2, status = ?3, summary = ?4, \
             summary_status = ?5, summary_generated_at = ?6, os_process_id = ?7 WHERE id = ?1",
        )
        .bind(session.id.to_string())
        .bind(session.ended_at.map(|t| t.to_rfc3339()))
        .bind(session.status.as_str())
        .bind(&session.summary)
        .bind(&session.summary_status)
        .bind(session.summary_generated_at.map(|t| t.to_rfc3339()))
        .bind(session.os_process_id.map(i64::from))
        .execute(&self.pool)
        .await?;
        if result.rows_affected() == 0 {
            return Err(DomainError::not_found(format!("session {}", session.id)));
        }
        Ok(())
    }

    async fn list_active(&self) -> DomainResult<Vec<Session>> {
        let rows: Vec<SessionRow> = sqlx::query_as(&format!(
            "SELECT {COLUMNS} FROM sessions WHERE status = 'active' ORDER BY started_at"
        ))
        .fetch_all(&self.pool)
        .await?;
        rows.into_iter().map(SessionRow::into_session).collect()
    }

    async fn active_for_project(&self, project_id: Uuid) -> DomainResult<Option<Session>> {
        let row: Option<SessionRow> = sqlx::query_as(&format!(
            "SELECT {COLUMNS} FROM sessions WHERE project_id = ?1 AND status = 'active' LIMIT 1"
        ))
        .bind(project_id.to_string())
        .fetch_optional(&self.pool)
        .await?;
        row.map(SessionRow::into_session).transpose()
    }

    async fn list_by_project(
        &self,
        project_id: Uuid,
        limit: usize,
    ) -> DomainResult<Vec<Session>> {
        let rows: Vec<SessionRow> = sqlx::query_as(&format!(
            "SELECT {COLUMNS} FROM sessions WHERE project_id = ?1 \
             ORDER BY started_at DESC LIMIT ?2"
        ))
        .bind(project_id.to_string())
        .bind(limit as i64)
        .fetch_all(&self.pool)
        .await?;
        rows.into_iter().map(SessionRow::into_session).collect()
    }

    async fn count_by_status(&self, status: SessionStatus) -> DomainResult<u64> {
        let row: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM sessions WHERE status = ?1")
            .bind(status.as_str())
            .fetch_one(&self.pool)
            .await?;
        Ok(row.0 as u64)
    }

    async fn count_all(&self) -> DomainResult<u64> {
        let row: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM sessions")
            .fetch_one(&self.pool)
            .await?;
        Ok(row.0 as u64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::models::Project;
    use crate::domain::ports::ProjectRepository;
    use crate::infrastructure::database::{DatabaseConnection, ProjectRepositoryImpl};

    async fn setup() -> (SessionRepositoryImpl, Project) {
        let db = DatabaseConnection::new("sqlite::memory:").await.unwrap();
        db.migrate().await.unwrap();
        let projects = ProjectRepositoryImpl::new(db.pool().clone());
        let project = Project::new("demo", "/tmp/demo");
        projects.create(&project).await.unwrap();
        (SessionRepositoryImpl::new(db.pool().clone()), project)
    }

    #[tokio::test]
    async fn test_create_and_active_lookup() {
        let (repo, project) = setup().await;
        let session = Session::new(project.id);
        repo.create(&session).await.unwrap();

        let active = repo.active_for_project(project.id).await.unwrap();
        assert_eq!(active.map(|s| s.id), Some(session.id));
        assert_eq!(repo.list_active().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_terminal_update_clears_active() {
        let (repo, project) = setup().await;
        let mut session = Session::new(project.id);
        session.os_process_id = Some(4242);
        repo.create(&session).await.unwrap();

        session.finish(SessionStatus::Interrupted).unwrap();
        repo.update(&session).await.unwrap();

        assert!(repo.active_for_project(project.id).await.unwrap().is_none());
        let got = repo.get(session.id).await.unwrap().unwrap();
        assert_eq!(got.status, SessionStatus::Interrupted);
        assert!(got.ended_at.is_some());
        assert_eq!(got.os_process_id, Some(4242));
    }

    #[tokio::test]
    async fn test_second_active_session_for_project_conflicts() {
        let (repo, project) = setup().await;
        let first = Session::new(project.id);
        repo.create(&first).await.unwrap();

        let second = Session::new(project.id);
        let err = repo.create(&second).await.unwrap_err();
        assert!(matches!(err, DomainError::Conflict(_)), "got {err:?}");
        assert!(err.to_string().contains("already exists"));

        // Once the first session ends, a new active session is accepted.
        let mut first = first;
        first.finish(SessionStatus::Completed).unwrap();
        repo.update(&first).await.unwrap();
        repo.create(&second).await.unwrap();
    }

    #[tokio::test]
    async fn test_counts() {
        let (repo, project) = setup().await;
        let mut s1 = Session::new(project.id);
        repo.create(&s1).await.unwrap();
        s1.finish(SessionStatus::Completed).unwrap();
        repo.update(&s1).await.unwrap();

        let s2 = Session::new(project.id);
        repo.create(&s2).await.unwrap();

        assert_eq!(repo.count_all().await.unwrap(), 2);
        assert_eq!(repo.count_by_status(SessionStatus::Active).await.unwrap(), 1);
        assert_eq!(
            repo.count_by_status(SessionStatus::Completed).await.unwrap(),
            1
        );
    }

    #[tokio::test]
    async fn test_project_cascade_removes_sessions() {
        let db = DatabaseConnection::new("sqlite::memory:").await.unwrap();
        db.migrate().await.unwrap();
        let projects = ProjectRepositoryImpl::new(db.pool().clone());
        let repo = SessionRepositoryImpl::new(db.pool().clone());

        let project = Project::new("demo", "/tmp/demo");
        projects.create(&project).await.unwrap();
        let session = Session::new(project.id);
        repo.create(&session).await.unwrap();

        projects.delete(project.id).await.unwrap();
        assert!(repo.get(session.id).await.unwrap().is_none());
    }
}
