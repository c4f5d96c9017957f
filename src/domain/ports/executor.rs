//! Task executor port for the cron engine.

use async_trait::async_trait;

use crate::domain::models::{ExecutionOutcome, Project, Schedule};

/// Handler for one schedule task kind.
///
/// Executors never return `Err`: failures are reported through
/// `ExecutionOutcome` so the engine can close the log and notify
/// uniformly. An executor may retry internally; the engine never does.
#[async_trait]
pub trait TaskExecutor: Send + Sync {
    async fn execute(&self, schedule: &Schedule, project: &Project) -> ExecutionOutcome;
}
