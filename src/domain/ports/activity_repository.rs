//! Activity log repository port.

use async_trait::async_trait;
use uuid::Uuid;

use crate::domain::error::DomainResult;
use crate::domain::models::Activity;

/// Append-only audit log. Entries are removed only by project cascade.
#[async_trait]
pub trait ActivityRepository: Send + Sync {
    async fn append(&self, activity: &Activity) -> DomainResult<()>;

    async fn list_by_project(&self, project_id: Uuid, limit: usize) -> DomainResult<Vec<Activity>>;

    /// Most recent entries across all projects, newest first.
    async fn list_recent(&self, limit: usize) -> DomainResult<Vec<Activity>>;
}
