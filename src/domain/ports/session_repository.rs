//! Session repository port.

use async_trait::async_trait;
use uuid::Uuid;

use crate::domain::error::DomainResult;
use crate::domain::models::{Session, SessionStatus};

/// Repository interface for Session persistence.
#[async_trait]
pub trait SessionRepository: Send + Sync {
    async fn create(&self, session: &Session) -> DomainResult<()>;

    async fn get(&self, id: Uuid) -> DomainResult<Option<Session>>;

    async fn update(&self, session: &Session) -> DomainResult<()>;

    /// All sessions currently recorded as `active`.
    async fn list_active(&self) -> DomainResult<Vec<Session>>;

    /// The active session for a project, if any. The single-active-session
    /// invariant makes this unambiguous.
    async fn active_for_project(&self, project_id: Uuid) -> DomainResult<Option<Session>>;

    async fn list_by_project(&self, project_id: Uuid, limit: usize) -> DomainResult<Vec<Session>>;

    /// Total number of sessions in a given status, for daemon stats.
    async fn count_by_status(&self, status: SessionStatus) -> DomainResult<u64>;

    /// Total number of sessions ever recorded.
    async fn count_all(&self) -> DomainResult<u64>;
}
