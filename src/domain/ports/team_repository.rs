//! Team aggregate repository port.
//!
//! Members, tasks, and team sessions are stored flat and joined by id;
//! there is no persisted "team with members" shape.

use async_trait::async_trait;
use uuid::Uuid;

use crate::domain::error::DomainResult;
use crate::domain::models::{Team, TeamMember, TeamSession, TeamTask, TeamTaskStatus};

#[async_trait]
pub trait TeamRepository: Send + Sync {
    async fn create_team(&self, team: &Team) -> DomainResult<()>;

    async fn get_team(&self, id: Uuid) -> DomainResult<Option<Team>>;

    async fn update_team(&self, team: &Team) -> DomainResult<()>;

    async fn delete_team(&self, id: Uuid) -> DomainResult<()>;

    async fn list_teams_by_project(&self, project_id: Uuid) -> DomainResult<Vec<Team>>;

    async fn add_member(&self, member: &TeamMember) -> DomainResult<()>;

    async fn get_member(&self, id: Uuid) -> DomainResult<Option<TeamMember>>;

    async fn update_member(&self, member: &TeamMember) -> DomainResult<()>;

    async fn list_members(&self, team_id: Uuid) -> DomainResult<Vec<TeamMember>>;

    async fn create_task(&self, task: &TeamTask) -> DomainResult<()>;

    async fn get_task(&self, id: Uuid) -> DomainResult<Option<TeamTask>>;

    async fn update_task(&self, task: &TeamTask) -> DomainResult<()>;

    async fn list_tasks(&self, team_id: Uuid) -> DomainResult<Vec<TeamTask>>;

    /// Tasks assigned to a member in `pending` or `in_progress`; the
    /// member's current workload.
    async fn count_open_tasks(&self, member_id: Uuid) -> DomainResult<usize>;

    async fn list_tasks_by_status(
        &self,
        team_id: Uuid,
        status: TeamTaskStatus,
    ) -> DomainResult<Vec<TeamTask>>;

    async fn create_team_session(&self, session: &TeamSession) -> DomainResult<()>;

    async fn update_team_session(&self, session: &TeamSession) -> DomainResult<()>;

    async fn get_team_session(&self, id: Uuid) -> DomainResult<Option<TeamSession>>;
}
