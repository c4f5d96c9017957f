//! Cron engine: expression parsing, due detection, and dispatch.
//!
//! Expressions are the standard five fields (minute hour day-of-month
//! month day-of-week). The parser wants a seconds field, so a `0` is
//! prefixed before handing the expression over.

use std::collections::HashMap;
use std::str::FromStr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio::sync::RwLock;

use super::notifier::Notifier;
use crate::domain::error::{DomainError, DomainResult};
use crate::domain::models::{
    ExecutionOutcome, NotificationEvent, Schedule, ScheduleLog, TaskKind,
};
use crate::domain::ports::{ProjectRepository, ScheduleRepository, TaskExecutor};

/// Default sweep period.
pub const DEFAULT_SWEEP_INTERVAL: Duration = Duration::from_secs(60);

fn normalize(expr: &str) -> Option<String> {
    let fields: Vec<&str> = expr.split_whitespace().collect();
    if fields.len() != 5 {
        return None;
    }
    Some(format!("0 {}", fields.join(" ")))
}

/// Whether an expression is an acceptable five-field cron.
pub fn validate(expr: &str) -> bool {
    match normalize(expr) {
        Some(normalized) => cron::Schedule::from_str(&normalized).is_ok(),
        None => false,
    }
}

/// Next occurrence strictly after `from`, or None when unparsable.
pub fn next_run(expr: &str, from: DateTime<Utc>) -> Option<DateTime<Utc>> {
    let normalized = normalize(expr)?;
    let schedule = cron::Schedule::from_str(&normalized).ok()?;
    schedule.after(&from).next()
}

/// Periodic sweep over enabled schedules, dispatching due ones to their
/// task-kind executors.
pub struct CronEngine {
    schedules: Arc<dyn ScheduleRepository>,
    projects: Arc<dyn ProjectRepository>,
    notifier: Arc<Notifier>,
    executors: RwLock<HashMap<TaskKind, Arc<dyn TaskExecutor>>>,
    sweep_interval: Duration,
    running: AtomicBool,
}

impl CronEngine {
    /// `sweep_interval` of zero means "sweep immediately, then every
    /// default period".
    pub fn new(
        schedules: Arc<dyn ScheduleRepository>,
        projects: Arc<dyn ProjectRepository>,
        notifier: Arc<Notifier>,
        sweep_interval: Duration,
    ) -> Self {
        let sweep_interval = if sweep_interval.is_zero() {
            DEFAULT_SWEEP_INTERVAL
        } else {
            sweep_interval
        };
        Self {
            schedules,
            projects,
            notifier,
            executors: RwLock::new(HashMap::new()),
            sweep_interval,
            running: AtomicBool::new(true),
        }
    }

    /// Bind an executor for a task kind. Rebinding replaces.
    pub async fn register_executor(&self, kind: TaskKind, executor: Arc<dyn TaskExecutor>) {
        self.executors.write().await.insert(kind, executor);
    }

    /// Create a schedule, computing its first `next_run_at`.
    pub async fn create_schedule(&self, mut schedule: Schedule) -> DomainResult<Schedule> {
        if !validate(&schedule.cron_expression) {
            return Err(DomainError::validation(format!(
                "invalid cron expression '{}'",
                schedule.cron_expression
            )));
        }
        schedule.next_run_at = if schedule.enabled {
            next_run(&schedule.cron_expression, Utc::now())
        } else {
            None
        };
        self.schedules.create(&schedule).await?;
        Ok(schedule)
    }

    /// Enable a schedule, restoring its `next_run_at`.
    pub async fn enable_schedule(&self, mut schedule: Schedule) -> DomainResult<Schedule> {
        schedule.enabled = true;
        schedule.next_run_at = next_run(&schedule.cron_expression, Utc::now());
        schedule.updated_at = Utc::now();
        self.schedules.update(&schedule).await?;
        Ok(schedule)
    }

    /// Disable a schedule; disabled schedules carry no `next_run_at`.
    pub async fn disable_schedule(&self, mut schedule: Schedule) -> DomainResult<Schedule> {
        schedule.enabled = false;
        schedule.next_run_at = None;
        schedule.updated_at = Utc::now();
        self.schedules.update(&schedule).await?;
        Ok(schedule)
    }

    /// Spawn the periodic sweep. The first tick fires immediately.
    pub fn start(self: &Arc<Self>) -> tokio::task::JoinHandle<()> {
        let engine = Arc::clone(self);
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(engine.sweep_interval);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
            loop {
                ticker.tick().await;
                if !engine.running.load(Ordering::SeqCst) {
                    return;
                }
                engine.sweep().await;
            }
        })
    }

    pub fn stop(&self) {
        self.running.store(false, Ordering::SeqCst);
    }

    /// One sweep: query enabled schedules, dispatch the due ones without
    /// awaiting them.
    pub async fn sweep(self: &Arc<Self>) {
        let schedules = match self.schedules.list_enabled().await {
            Ok(schedules) => schedules,
            Err(e) => {
                tracing::error!(error = %e, "failed to query schedules");
                return;
            }
        };

        let now = Utc::now();
        for schedule in schedules.into_iter().filter(|s| s.is_due(now)) {
            let engine = Arc::clone(self);
            tokio::spawn(async move {
                engine.execute_schedule(schedule).await;
            });
        }
    }

    /// Execute one schedule end to end: open a running log, run the
    /// executor, close the log, advance the schedule, notify. Notification
    /// failure never fails the task.
    pub async fn execute_schedule(&self, mut schedule: Schedule) {
        let mut log = ScheduleLog::start(schedule.id);
        if let Err(e) = self.schedules.create_log(&log).await {
            tracing::error!(schedule_id = %schedule.id, error = %e, "failed to open schedule log");
            return;
        }
        let started_at = log.started_at;

        let project = match self.projects.get(schedule.project_id).await {
            Ok(Some(project)) => Some(project),
            Ok(None) => None,
            Err(e) => {
                tracing::error!(schedule_id = %schedule.id, error = %e, "project lookup failed");
                None
            }
        };

        let executor = self.executors.read().await.get(&schedule.task_kind).cloned();
        let outcome = match (executor, &project) {
            (Some(executor), Some(project)) => executor.execute(&schedule, project).await,
            (Some(_), None) => ExecutionOutcome::failed(
                format!("project {} not found", schedule.project_id),
                0,
            ),
            (None, _) => ExecutionOutcome::failed(
                format!(
                    "no executor registered for task kind '{}'",
                    schedule.task_kind.as_str()
                ),
                0,
            ),
        };

        log.finish(&outcome);
        if let Err(e) = self.schedules.update_log(&log).await {
            tracing::error!(schedule_id = %schedule.id, error = %e, "failed to close schedule log");
        }

        schedule.last_run_at = Some(started_at);
        schedule.run_count += 1;
        schedule.next_run_at = next_run(&schedule.cron_expression, Utc::now());
        schedule.updated_at = Utc::now();
        if let Err(e) = self.schedules.update(&schedule).await {
            tracing::error!(schedule_id = %schedule.id, error = %e, "failed to advance schedule");
        }

        if let Some(project) = project {
            let event = NotificationEvent::ScheduleResult {
                schedule_name: schedule.name.clone(),
                success: outcome.success,
                output: outcome.output.clone(),
                error: outcome.error.clone(),
                duration_ms: outcome.duration_ms,
            };
            if let Err(e) = self.notifier.notify(&project, event).await {
                tracing::warn!(schedule_id = %schedule.id, error = %e, "schedule notification failed");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_validate_accepts_standard_expressions() {
        assert!(validate("*/5 * * * *"));
        assert!(validate("0 9 * * *"));
        assert!(validate("0 3 * * 1"));
        assert!(validate("30 14 1 * *"));
    }

    #[test]
    fn test_validate_rejects_malformed() {
        assert!(!validate("invalid"));
        assert!(!validate(""));
        assert!(!validate("* * *"));
        assert!(!validate("61 * * * *"));
        assert!(!validate("* * * * * *"));
    }

    #[test]
    fn test_next_run_strictly_after() {
        let from = Utc.with_ymd_and_hms(2025, 6, 1, 8, 30, 0).unwrap();
        let next = next_run("0 9 * * *", from).unwrap();
        assert_eq!(next, Utc.with_ymd_and_hms(2025, 6, 1, 9, 0, 0).unwrap());

        // From exactly 09:00, the next run is tomorrow.
        let at_nine = Utc.with_ymd_and_hms(2025, 6, 1, 9, 0, 0).unwrap();
        let next = next_run("0 9 * * *", at_nine).unwrap();
        assert_eq!(next, Utc.with_ymd_and_hms(2025, 6, 2, 9, 0, 0).unwrap());
    }

    #[test]
    fn test_next_run_monotonic() {
        let t1 = Utc::now();
        let n1 = next_run("*/5 * * * *", t1).unwrap();
        let n2 = next_run("*/5 * * * *", n1).unwrap();
        assert!(n1 > t1);
        assert!(n2 > n1);
    }

    #[test]
    fn test_next_run_unparsable_is_none() {
        assert!(next_run("bogus", Utc::now()).is_none());
    }
}
