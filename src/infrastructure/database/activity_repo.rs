//! SQLite implementation of `ActivityRepository`.

use async_trait::async_trait;
use sqlx::SqlitePool;
use uuid::Uuid;

use super::utils::{parse_datetime, parse_json, parse_uuid, parse_uuid_opt, to_json};
use crate::domain::error::{DomainError, DomainResult};
use crate::domain::models::{Activity, ActivityKind};
use crate::domain::ports::ActivityRepository;

pub struct ActivityRepositoryImpl {
    pool: SqlitePool,
}

impl ActivityRepositoryImpl {
    pub const fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[derive(sqlx::FromRow)]
struct ActivityRow {
    id: String,
    project_id: String,
    session_id: Option<String>,
    kind: String,
    timestamp: String,
    details: String,
}

impl ActivityRow {
    fn into_activity(self) -> DomainResult<Activity> {
        let kind = ActivityKind::from_str(&self.kind).ok_or_else(|| {
            DomainError::Operational(format!("unknown activity kind '{}'", self.kind))
        })?;
        Ok(Activity {
            id: parse_uuid(&self.id)?,
            project_id: parse_uuid(&self.project_id)?,
            session_id: parse_uuid_opt(self.session_id.as_deref())?,
            kind,
            timestamp: parse_datetime(&self.timestamp)?,
            details: parse_json(&self.details)?,
        })
    }
}

#[async_trait]
impl ActivityRepository for ActivityRepositoryImpl {
    async fn append(&self, activity: &Activity) -> DomainResult<()> {
        sqlx::query(
            "INSERT INTO activities (id, project_id, session_id, kind, timestamp, details) \
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
        )
        .bind(activity.id.to_string())
        .bind(activity.project_id.to_string())
        .bind(activity.session_id.map(|s| s.to_string()))
        .bind(activity.kind.as_str())
        .bind(activity.timestamp.to_rfc3339())
        .bind(to_json(&activity.details)?)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn list_by_project(
        &self,
        project_id: Uuid,
        limit: usize,
    ) -> DomainResult<Vec<Activity>> {
        let rows: Vec<ActivityRow> = sqlx::query_as(
            "SELECT id, project_id, session_id, kind, timestamp, details FROM activities \
             WHERE project_id = ?1 ORDER BY timestamp DESC LIMIT ?2",
        )
        .bind(project_id.to_string())
        .bind(limit as i64)
        .fetch_all(&self.pool)
        .await?;
        rows.into_iter().map(ActivityRow::into_activity).collect()
    }

    async fn list_recent(&self, limit: usize) -> DomainResult<Vec<Activity>> {
        let rows: Vec<ActivityRow> = sqlx::query_as(
            "SELECT id, project_id, session_id, kind, timestamp, details FROM activities \
             ORDER BY timestamp DESC LIMIT ?1",
        )
        .bind(limit as i64)
        .fetch_all(&self.pool)
        .await?;
        rows.into_iter().map(ActivityRow::into_activity).collect()
    }
}
