//! Session lifecycle: start, stop, recovery, and exit reaping.
//!
//! The daemon owns child processes it spawned in this lifetime; sessions
//! recovered from a previous lifetime are retained but never signalled.

use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;

use serde_json::json;
use tokio::sync::Mutex;
use uuid::Uuid;

use crate::domain::error::{DomainError, DomainResult};
use crate::domain::models::{
    Activity, ActivityKind, NotificationEvent, Project, Session, SessionOptions, SessionStatus,
};
use crate::domain::ports::{ActivityRepository, ProjectRepository, SessionRepository};
use crate::infrastructure::process::{self, ProcessSupervisor};
use crate::services::{Admission, Notifier, SessionPool};

/// Orchestrates coding-agent sessions against the store, pool, and
/// supervisor.
pub struct SessionService {
    sessions: Arc<dyn SessionRepository>,
    projects: Arc<dyn ProjectRepository>,
    activities: Arc<dyn ActivityRepository>,
    pool: Arc<SessionPool>,
    supervisor: ProcessSupervisor,
    notifier: Arc<Notifier>,
    /// Children spawned by this daemon lifetime; the only pids we signal.
    owned: Arc<Mutex<HashMap<Uuid, u32>>>,
}

impl SessionService {
    pub fn new(
        sessions: Arc<dyn SessionRepository>,
        projects: Arc<dyn ProjectRepository>,
        activities: Arc<dyn ActivityRepository>,
        pool: Arc<SessionPool>,
        supervisor: ProcessSupervisor,
        notifier: Arc<Notifier>,
    ) -> Arc<Self> {
        Arc::new(Self {
            sessions,
            projects,
            activities,
            pool,
            supervisor,
            notifier,
            owned: Arc::new(Mutex::new(HashMap::new())),
        })
    }

    /// Start a session for a project: pool admission, atomic session
    /// record, child spawn, exit waiter.
    ///
    /// Exclusivity is held by the store's partial unique index on active
    /// sessions, so concurrent starts for one project serialise at the
    /// insert; the loser never spawns a child.
    pub async fn start(
        self: &Arc<Self>,
        project_id: Uuid,
        options: SessionOptions,
    ) -> DomainResult<Session> {
        let project = self
            .projects
            .get(project_id)
            .await?
            .ok_or_else(|| DomainError::not_found(format!("project {project_id}")))?;

        // Fast path for a friendly diagnostic naming the running session;
        // the unique index below is what enforces the invariant.
        if let Some(existing) = self.sessions.active_for_project(project_id).await? {
            return Err(DomainError::conflict(format!(
                "active session already exists for project '{}' (session {})",
                project.name, existing.id
            )));
        }

        match self.pool.admit(project_id) {
            Admission::Allocated => {}
            Admission::Rejected {
                reason,
                suggested_queue_position,
            } => {
                let hint = suggested_queue_position
                    .map(|p| format!("; queue position {p} available"))
                    .unwrap_or_default();
                return Err(DomainError::conflict(format!(
                    "session rejected: {reason}{hint}"
                )));
            }
        }

        let mut session = Session::new(project_id);
        self.sessions.create(&session).await.map_err(|e| match e {
            DomainError::Conflict(_) => DomainError::conflict(format!(
                "active session already exists for project '{}'",
                project.name
            )),
            other => other,
        })?;

        let child = match self
            .supervisor
            .spawn(
                Path::new(&project.absolute_path),
                session.id,
                project_id,
                &options,
            )
            .await
        {
            Ok(child) => child,
            Err(e) => {
                let _ = session.finish(SessionStatus::Interrupted);
                let _ = self.sessions.update(&session).await;
                return Err(e);
            }
        };
        let pid = child.id().unwrap_or_default();
        session.os_process_id = Some(pid);
        if let Err(e) = self.sessions.update(&session).await {
            process::signal_kill(pid);
            let _ = session.finish(SessionStatus::Interrupted);
            let _ = self.sessions.update(&session).await;
            return Err(e);
        }

        if let Err(e) = self.pool.allocate(session.id, project_id).await {
            // Lost an admission race; reap the child we just spawned.
            process::signal_kill(pid);
            let _ = session.finish(SessionStatus::Interrupted);
            let _ = self.sessions.update(&session).await;
            return Err(e);
        }
        self.owned.lock().await.insert(session.id, pid);
        self.projects.touch(project_id).await?;
        self.activities
            .append(
                &Activity::new(project_id, ActivityKind::Start)
                    .with_session(session.id)
                    .with_details(json!({"osProcessId": pid})),
            )
            .await?;

        self.spawn_exit_waiter(session.id, project, child);
        Ok(session)
    }

    fn spawn_exit_waiter(
        self: &Arc<Self>,
        session_id: Uuid,
        project: Project,
        mut child: tokio::process::Child,
    ) {
        let service = Arc::clone(self);
        tokio::spawn(async move {
            let status = child.wait().await;
            service.owned.lock().await.remove(&session_id);

            let clean_exit = status.as_ref().map(|s| s.success()).unwrap_or(false);
            if let Err(e) = &status {
                tracing::error!(session_id = %session_id, error = %e, "failed to reap child");
            }

            let terminal = if clean_exit {
                SessionStatus::Completed
            } else {
                SessionStatus::Interrupted
            };
            service
                .finalize(session_id, &project, terminal, clean_exit)
                .await;
        });
    }

    /// Write the terminal record, release the slot, log activity, and
    /// notify. Skips sessions another path already closed.
    async fn finalize(
        &self,
        session_id: Uuid,
        project: &Project,
        terminal: SessionStatus,
        clean_exit: bool,
    ) {
        let session = match self.sessions.get(session_id).await {
            Ok(Some(session)) if session.is_active() => session,
            Ok(_) => return,
            Err(e) => {
                tracing::error!(session_id = %session_id, error = %e, "session lookup failed");
                return;
            }
        };

        let mut session = session;
        if session.finish(terminal).is_ok() {
            if let Err(e) = self.sessions.update(&session).await {
                tracing::error!(session_id = %session_id, error = %e, "failed to record session end");
            }
        }
        if let Err(e) = self.pool.release(session_id).await {
            tracing::debug!(session_id = %session_id, error = %e, "pool slot already released");
        }
        if let Err(e) = self
            .activities
            .append(
                &Activity::new(project.id, ActivityKind::Complete)
                    .with_session(session_id)
                    .with_details(json!({"status": terminal.as_str()})),
            )
            .await
        {
            tracing::warn!(session_id = %session_id, error = %e, "failed to log completion");
        }

        let event = if clean_exit {
            NotificationEvent::SessionSummary {
                project_name: project.name.clone(),
                session_id: session_id.to_string(),
                status: terminal.as_str().to_string(),
                duration_secs: session
                    .duration()
                    .map(|d| d.num_seconds())
                    .unwrap_or_default(),
                summary: session.summary.clone(),
            }
        } else {
            NotificationEvent::ErrorAlert {
                title: format!("Session crashed: {}", project.name),
                message: format!("Session {session_id} ended abnormally"),
                context: Some(project.absolute_path.clone()),
                stack: None,
            }
        };
        if let Err(e) = self.notifier.notify(project, event).await {
            tracing::warn!(session_id = %session_id, error = %e, "session notification failed");
        }
    }

    /// Stop an active session. Owned children get SIGTERM, a grace
    /// period, then SIGKILL; unowned (recovered) sessions are closed in
    /// the store without signalling.
    pub async fn stop(&self, session_id: Uuid) -> DomainResult<()> {
        let mut session = self
            .sessions
            .get(session_id)
            .await?
            .ok_or_else(|| DomainError::not_found(format!("session {session_id}")))?;
        if !session.is_active() {
            return Err(DomainError::validation(format!(
                "session {session_id} is not active ({})",
                session.status.as_str()
            )));
        }

        let owned_pid = self.owned.lock().await.remove(&session_id);
        if let Some(pid) = owned_pid {
            process::stop_with_grace(pid).await;
        }

        // Record the terminal state here so the caller observes it
        // immediately; the exit waiter skips already-closed sessions.
        session
            .finish(SessionStatus::Interrupted)
            .map_err(DomainError::Validation)?;
        self.sessions.update(&session).await?;
        if let Err(e) = self.pool.release(session_id).await {
            tracing::debug!(session_id = %session_id, error = %e, "pool slot already released");
        }
        Ok(())
    }

    pub async fn status(&self, session_id: Uuid) -> DomainResult<Session> {
        self.sessions
            .get(session_id)
            .await?
            .ok_or_else(|| DomainError::not_found(format!("session {session_id}")))
    }

    pub async fn list_active(&self) -> DomainResult<Vec<Session>> {
        self.sessions.list_active().await
    }

    /// Start a session for the given project, or for the most recently
    /// active project when unspecified.
    pub async fn resume(
        self: &Arc<Self>,
        project_id: Option<Uuid>,
    ) -> DomainResult<Session> {
        let project_id = match project_id {
            Some(project_id) => project_id,
            None => {
                let projects = self.projects.list().await?;
                let mut latest: Option<(chrono::DateTime<chrono::Utc>, Uuid)> = None;
                for project in &projects {
                    if let Some(session) =
                        self.sessions.list_by_project(project.id, 1).await?.pop()
                    {
                        if latest.map_or(true, |(t, _)| session.started_at > t) {
                            latest = Some((session.started_at, project.id));
                        }
                    }
                }
                latest
                    .map(|(_, id)| id)
                    .ok_or_else(|| DomainError::validation("no sessions to resume"))?
            }
        };
        self.start(project_id, SessionOptions::default()).await
    }

    /// Reconcile persisted `active` sessions after a daemon restart.
    ///
    /// Dead pids become `interrupted`; live pids are retained unowned and
    /// keep their pool slots, but this daemon never signals them.
    pub async fn recover(&self) -> DomainResult<RecoveryReport> {
        let mut report = RecoveryReport::default();

        for mut session in self.sessions.list_active().await? {
            let alive = session
                .os_process_id
                .map(process::pid_alive)
                .unwrap_or(false);

            if alive {
                if let Err(e) = self.pool.allocate(session.id, session.project_id).await {
                    tracing::warn!(session_id = %session.id, error = %e, "recovered session exceeds pool caps");
                }
                tracing::info!(
                    session_id = %session.id,
                    pid = session.os_process_id,
                    "retaining unowned session from previous daemon"
                );
                report.retained += 1;
            } else {
                if session.finish(SessionStatus::Interrupted).is_ok() {
                    self.sessions.update(&session).await?;
                }
                report.interrupted += 1;
            }
        }
        Ok(report)
    }
}

/// What session recovery found.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct RecoveryReport {
    pub interrupted: usize,
    pub retained: usize,
}
