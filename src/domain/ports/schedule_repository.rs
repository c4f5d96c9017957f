//! Schedule and schedule-log repository port.

use async_trait::async_trait;
use uuid::Uuid;

use crate::domain::error::DomainResult;
use crate::domain::models::{Schedule, ScheduleLog};

#[async_trait]
pub trait ScheduleRepository: Send + Sync {
    async fn create(&self, schedule: &Schedule) -> DomainResult<()>;

    async fn get(&self, id: Uuid) -> DomainResult<Option<Schedule>>;

    async fn update(&self, schedule: &Schedule) -> DomainResult<()>;

    async fn delete(&self, id: Uuid) -> DomainResult<()>;

    async fn list_by_project(&self, project_id: Uuid) -> DomainResult<Vec<Schedule>>;

    /// Schedules the sweep considers: enabled only.
    async fn list_enabled(&self) -> DomainResult<Vec<Schedule>>;

    // Execution logs; cascade-deleted with their schedule.

    async fn create_log(&self, log: &ScheduleLog) -> DomainResult<()>;

    async fn update_log(&self, log: &ScheduleLog) -> DomainResult<()>;

    async fn list_logs(&self, schedule_id: Uuid, limit: usize) -> DomainResult<Vec<ScheduleLog>>;
}
