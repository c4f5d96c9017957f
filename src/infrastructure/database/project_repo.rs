//! SQLite implementation of `ProjectRepository`.

use async_trait::async_trait;
use chrono::Utc;
use sqlx::SqlitePool;
use uuid::Uuid;

use super::utils::{map_insert_err, parse_datetime, parse_datetime_opt, parse_json, parse_uuid, to_json};
use crate::domain::error::{DomainError, DomainResult};
use crate::domain::models::{NotifyLevel, NotifyPlatform, Project};
use crate::domain::ports::ProjectRepository;

pub struct ProjectRepositoryImpl {
    pool: SqlitePool,
}

impl ProjectRepositoryImpl {
    pub const fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[derive(sqlx::FromRow)]
struct ProjectRow {
    id: String,
    name: String,
    absolute_path: String,
    description: Option<String>,
    tech_stack: String,
    discovered_at: String,
    last_accessed_at: Option<String>,
    notification_webhook: Option<String>,
    notification_platform: Option<String>,
    notification_min_level: Option<String>,
}

impl ProjectRow {
    fn into_project(self) -> DomainResult<Project> {
        Ok(Project {
            id: parse_uuid(&self.id)?,
            name: self.name,
            absolute_path: self.absolute_path,
            description: self.description,
            tech_stack: parse_json(&self.tech_stack)?,
            discovered_at: parse_datetime(&self.discovered_at)?,
            last_accessed_at: parse_datetime_opt(self.last_accessed_at.as_deref())?,
            notification_webhook: self.notification_webhook,
            notification_platform: self
                .notification_platform
                .as_deref()
                .and_then(NotifyPlatform::from_str),
            notification_min_level: self
                .notification_min_level
                .as_deref()
                .and_then(NotifyLevel::from_str),
        })
    }
}

const SELECT_COLUMNS: &str = "id, name, absolute_path, description, tech_stack, discovered_at, \
     last_accessed_at, notification_webhook, notification_platform, notification_min_level";

#[async_trait]
impl ProjectRepository for ProjectRepositoryImpl {
    async fn create(&self, project: &Project) -> DomainResult<()> {
        sqlx::query(
            "INSERT INTO projects (id, name, absolute_path, description, tech_stack, \
             discovered_at, last_accessed_at, notification_webhook, notification_platform, \
             notification_min_level) \
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
        )
        .bind(project.id.to_string())
        .bind(&project.name)
        .bind(&project.absolute_path)
        .bind(&project.description)
        .bind(to_json(&project.tech_stack)?)
        .bind(project.discovered_at.to_rfc3339())
        .bind(project.last_accessed_at.map(|t| t.to_rfc3339()))
        .bind(&project.notification_webhook)
        .bind(project.notification_platform.map(|p| p.as_str()))
        .bind(project.notification_min_level.map(|l| l.as_str()))
        .execute(&self.pool)
        .await
        .map_err(|e| map_insert_err(e, &format!("project at {}", project.absolute_path)))?;
        Ok(())
    }

    async fn get(&self, id: Uuid) -> DomainResult<Option<Project>> {
        let row: Option<ProjectRow> = sqlx::query_as(&format!(
            "SELECT {SELECT_COLUMNS} FROM projects WHERE id = ?1"
        ))
        .bind(id.to_string())
        .fetch_optional(&self.pool)
        .await?;
        row.map(ProjectRow::into_project).transpose()
    }

    async fn get_by_path(&self, absolute_path: &str) -> DomainResult<Option<Project>> {
        let row: Option<ProjectRow> = sqlx::query_as(&format!(
            "SELECT {SELECT_COLUMNS} FROM projects WHERE absolute_path = ?1"
        ))
        .bind(absolute_path)
        .fetch_optional(&self.pool)
        .await?;
        row.map(ProjectRow::into_project).transpose()
    }

    async fn get_by_name(&self, name: &str) -> DomainResult<Option<Project>> {
        let row: Option<ProjectRow> = sqlx::query_as(&format!(
            "SELECT {SELECT_COLUMNS} FROM projects WHERE name = ?1 LIMIT 1"
        ))
        .bind(name)
        .fetch_optional(&self.pool)
        .await?;
        row.map(ProjectRow::into_project).transpose()
    }

    async fn list(&self) -> DomainResult<Vec<Project>> {
        let rows: Vec<ProjectRow> = sqlx::query_as(&format!(
            "SELECT {SELECT_COLUMNS} FROM projects ORDER BY name"
        ))
        .fetch_all(&self.pool)
        .await?;
        rows.into_iter().map(ProjectRow::into_project).collect()
    }

    async fn update(&self, project: &Project) -> DomainResult<()> {
        let result = sqlx::query(
            "UPDATE projects SET name = ?2, absolute_path = ?3, description = ?4, \
             tech_stack = ?5, last_accessed_at = ?6, notification_webhook = ?7, \
             notification_platform = ?8, notification_min_level = ?9 WHERE id = ?1",
        )
        .bind(project.id.to_string())
        .bind(&project.name)
        .bind(&project.absolute_path)
        .bind(&project.description)
        .bind(to_json(&project.tech_stack)?)
        .bind(project.last_accessed_at.map(|t| t.to_rfc3339()))
        .bind(&project.notification_webhook)
        .bind(project.notification_platform.map(|p| p.as_str()))
        .bind(project.notification_min_level.map(|l| l.as_str()))
        .execute(&self.pool)
        .await?;
        if result.rows_affected() == 0 {
            return Err(DomainError::not_found(format!("project {}", project.id)));
        }
        Ok(())
    }

    async fn delete(&self, id: Uuid) -> DomainResult<()> {
        let result = sqlx::query("DELETE FROM projects WHERE id = ?1")
            .bind(id.to_string())
            .execute(&self.pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(DomainError::not_found(format!("project {id}")));
        }
        Ok(())
    }

    async fn touch(&self, id: Uuid) -> DomainResult<()> {
        sqlx::query("UPDATE projects SET last_accessed_at = ?2 WHERE id = ?1")
            .bind(id.to_string())
            .bind(Utc::now().to_rfc3339())
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn set_notification(
        &self,
        id: Uuid,
        webhook: Option<String>,
        platform: Option<NotifyPlatform>,
        min_level: Option<NotifyLevel>,
    ) -> DomainResult<()> {
        let result = sqlx::query(
            "UPDATE projects SET notification_webhook = ?2, notification_platform = ?3, \
             notification_min_level = ?4 WHERE id = ?1",
        )
        .bind(id.to_string())
        .bind(webhook)
        .bind(platform.map(|p| p.as_str()))
        .bind(min_level.map(|l| l.as_str()))
        .execute(&self.pool)
        .await?;
        if result.rows_affected() == 0 {
            return Err(DomainError::not_found(format!("project {id}")));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::database::DatabaseConnection;

    async fn repo() -> ProjectRepositoryImpl {
        let db = DatabaseConnection::new("sqlite::memory:").await.unwrap();
        db.migrate().await.unwrap();
        ProjectRepositoryImpl::new(db.pool().clone())
    }

    #[tokio::test]
    async fn test_create_get_round_trip() {
        let repo = repo().await;
        let mut p = Project::new("demo", "/tmp/demo");
        p.push_tag("Rust");
        repo.create(&p).await.unwrap();

        let got = repo.get(p.id).await.unwrap().expect("project should exist");
        assert_eq!(got, p);
    }

    #[tokio::test]
    async fn test_duplicate_path_is_conflict() {
        let repo = repo().await;
        let p1 = Project::new("a", "/tmp/same");
        let p2 = Project::new("b", "/tmp/same");
        repo.create(&p1).await.unwrap();
        let err = repo.create(&p2).await.unwrap_err();
        assert!(matches!(err, DomainError::Conflict(_)), "got {err:?}");
    }

    #[tokio::test]
    async fn test_delete_then_get_is_none() {
        let repo = repo().await;
        let p = Project::new("demo", "/tmp/demo");
        repo.create(&p).await.unwrap();
        repo.delete(p.id).await.unwrap();
        assert!(repo.get(p.id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_lookup_by_path_and_name() {
        let repo = repo().await;
        let p = Project::new("demo", "/tmp/demo");
        repo.create(&p).await.unwrap();
        assert_eq!(repo.get_by_path("/tmp/demo").await.unwrap().unwrap().id, p.id);
        assert_eq!(repo.get_by_name("demo").await.unwrap().unwrap().id, p.id);
        assert!(repo.get_by_name("missing").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_set_notification() {
        let repo = repo().await;
        let p = Project::new("demo", "/tmp/demo");
        repo.create(&p).await.unwrap();
        repo.set_notification(
            p.id,
            Some("https://hooks.example/x".into()),
            Some(NotifyPlatform::Slack),
            Some(NotifyLevel::Warning),
        )
        .await
        .unwrap();
        let got = repo.get(p.id).await.unwrap().unwrap();
        assert_eq!(got.notification_platform, Some(NotifyPlatform::Slack));
        assert_eq!(got.notification_min_level, Some(NotifyLevel::Warning));
    }
}
