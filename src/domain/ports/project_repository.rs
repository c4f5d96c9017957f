//! Project repository port.

use async_trait::async_trait;
use uuid::Uuid;

use crate::domain::error::DomainResult;
use crate::domain::models::{NotifyLevel, NotifyPlatform, Project};

/// Repository interface for Project persistence.
///
/// `create` enforces uniqueness by absolute path; `delete` cascades to
/// sessions, activities, schedules, and teams.
#[async_trait]
pub trait ProjectRepository: Send + Sync {
    async fn create(&self, project: &Project) -> DomainResult<()>;

    async fn get(&self, id: Uuid) -> DomainResult<Option<Project>>;

    async fn get_by_path(&self, absolute_path: &str) -> DomainResult<Option<Project>>;

    async fn get_by_name(&self, name: &str) -> DomainResult<Option<Project>>;

    async fn list(&self) -> DomainResult<Vec<Project>>;

    async fn update(&self, project: &Project) -> DomainResult<()>;

    async fn delete(&self, id: Uuid) -> DomainResult<()>;

    /// Record activity by bumping `last_accessed_at` to now.
    async fn touch(&self, id: Uuid) -> DomainResult<()>;

    /// Update the notification webhook settings in one call.
    async fn set_notification(
        &self,
        id: Uuid,
        webhook: Option<String>,
        platform: Option<NotifyPlatform>,
        min_level: Option<NotifyLevel>,
    ) -> DomainResult<()>;
}
