//! Session pool: slot accounting under global and per-project caps.
//!
//! Admission is the two-phase contract: `admit` answers whether a slot is
//! available, `allocate` re-checks and records. Both indices live under one
//! mutex; bus events are published after the lock is dropped.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::sync::Mutex;

use serde_json::json;
use uuid::Uuid;

use super::bus::MessageBus;
use super::queue::SessionQueue;
use crate::domain::error::{DomainError, DomainResult};
use crate::domain::models::{BusMessage, MessageType};

/// Pool limits and toggles.
#[derive(Debug, Clone)]
pub struct PoolConfig {
    pub max_global_concurrent: usize,
    pub max_per_project: usize,
    /// Carried from configuration; no enforcement path exists.
    pub session_timeout_ms: u64,
    pub queue_enabled: bool,
    pub resource_monitor_enabled: bool,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            max_global_concurrent: 5,
            max_per_project: 2,
            session_timeout_ms: 300_000,
            queue_enabled: true,
            resource_monitor_enabled: false,
        }
    }
}

/// Outcome of an admission check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Admission {
    Allocated,
    Rejected {
        reason: String,
        suggested_queue_position: Option<usize>,
    },
}

impl Admission {
    pub fn is_allocated(&self) -> bool {
        matches!(self, Self::Allocated)
    }
}

#[derive(Default)]
struct PoolState {
    sessions_by_id: HashMap<Uuid, Uuid>,
    sessions_by_project: HashMap<Uuid, HashSet<Uuid>>,
}

/// Slot accounting for concurrent coding-agent sessions.
pub struct SessionPool {
    config: PoolConfig,
    state: Mutex<PoolState>,
    bus: Arc<MessageBus>,
    /// Consulted for the suggested queue position on rejection.
    queue: Option<Arc<SessionQueue>>,
}

impl SessionPool {
    pub fn new(config: PoolConfig, bus: Arc<MessageBus>) -> Self {
        Self {
            config,
            state: Mutex::new(PoolState::default()),
            bus,
            queue: None,
        }
    }

    /// Attach the waiting list so rejections can report where a queued
    /// request would land.
    pub fn with_queue(mut self, queue: Arc<SessionQueue>) -> Self {
        self.queue = Some(queue);
        self
    }

    pub fn config(&self) -> &PoolConfig {
        &self.config
    }

    /// Where a newly queued request would sit, when queueing is on.
    fn suggested_position(&self) -> Option<usize> {
        self.config
            .queue_enabled
            .then(|| self.queue.as_ref().map_or(1, |q| q.len() + 1))
    }

    /// Check capacity without reserving. The global cap is checked before
    /// the per-project cap.
    pub fn admit(&self, project_id: Uuid) -> Admission {
        let state = self.state.lock().expect("pool mutex poisoned");
        self.admit_locked(&state, project_id)
    }

    fn admit_locked(&self, state: &PoolState, project_id: Uuid) -> Admission {
        if state.sessions_by_id.len() >= self.config.max_global_concurrent {
            return Admission::Rejected {
                reason: "global limit".to_string(),
                suggested_queue_position: self.suggested_position(),
            };
        }
        let per_project = state
            .sessions_by_project
            .get(&project_id)
            .map_or(0, HashSet::len);
        if per_project >= self.config.max_per_project {
            return Admission::Rejected {
                reason: "per-project limit".to_string(),
                suggested_queue_position: self.suggested_position(),
            };
        }
        Admission::Allocated
    }

    /// Re-check admission and record the session.
    pub async fn allocate(&self, session_id: Uuid, project_id: Uuid) -> DomainResult<()> {
        {
            let mut state = self.state.lock().expect("pool mutex poisoned");
            match self.admit_locked(&state, project_id) {
                Admission::Allocated => {}
                Admission::Rejected { reason, .. } => {
                    return Err(DomainError::conflict(format!(
                        "cannot allocate session: {reason}"
                    )));
                }
            }
            state.sessions_by_id.insert(session_id, project_id);
            state
                .sessions_by_project
                .entry(project_id)
                .or_default()
                .insert(session_id);
        }

        self.bus
            .publish(
                "session:allocated",
                BusMessage::new(
                    MessageType::Notification,
                    "session-pool",
                    json!({"sessionId": session_id, "projectId": project_id}),
                ),
            )
            .await;
        Ok(())
    }

    /// Release a slot; the per-project entry is pruned when empty.
    pub async fn release(&self, session_id: Uuid) -> DomainResult<()> {
        let project_id = {
            let mut state = self.state.lock().expect("pool mutex poisoned");
            let Some(project_id) = state.sessions_by_id.remove(&session_id) else {
                return Err(DomainError::not_found(format!("session {session_id}")));
            };
            if let Some(set) = state.sessions_by_project.get_mut(&project_id) {
                set.remove(&session_id);
                if set.is_empty() {
                    state.sessions_by_project.remove(&project_id);
                }
            }
            project_id
        };

        self.bus
            .publish(
                "session:released",
                BusMessage::new(
                    MessageType::Notification,
                    "session-pool",
                    json!({"sessionId": session_id, "projectId": project_id}),
                ),
            )
            .await;
        Ok(())
    }

    pub fn active_count(&self) -> usize {
        self.state
            .lock()
            .expect("pool mutex poisoned")
            .sessions_by_id
            .len()
    }

    pub fn active_for_project(&self, project_id: Uuid) -> usize {
        self.state
            .lock()
            .expect("pool mutex poisoned")
            .sessions_by_project
            .get(&project_id)
            .map_or(0, HashSet::len)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pool(max_global: usize, max_per_project: usize) -> SessionPool {
        SessionPool::new(
            PoolConfig {
                max_global_concurrent: max_global,
                max_per_project,
                ..Default::default()
            },
            Arc::new(MessageBus::new()),
        )
    }

    #[tokio::test]
    async fn test_allocate_and_release() {
        let pool = pool(5, 2);
        let project = Uuid::new_v4();
        let session = Uuid::new_v4();

        assert!(pool.admit(project).is_allocated());
        pool.allocate(session, project).await.unwrap();
        assert_eq!(pool.active_count(), 1);
        assert_eq!(pool.active_for_project(project), 1);

        pool.release(session).await.unwrap();
        assert_eq!(pool.active_count(), 0);
        assert_eq!(pool.active_for_project(project), 0);
    }

    #[tokio::test]
    async fn test_global_limit_reason() {
        let pool = pool(2, 2);
        let project = Uuid::new_v4();
        pool.allocate(Uuid::new_v4(), project).await.unwrap();
        pool.allocate(Uuid::new_v4(), project).await.unwrap();

        // Full of one project: the global cap answers first.
        match pool.admit(Uuid::new_v4()) {
            Admission::Rejected { reason, .. } => assert_eq!(reason, "global limit"),
            Admission::Allocated => panic!("pool should be full"),
        }
    }

    #[tokio::test]
    async fn test_per_project_limit_with_global_slack() {
        let pool = pool(5, 2);
        let project = Uuid::new_v4();
        pool.allocate(Uuid::new_v4(), project).await.unwrap();
        pool.allocate(Uuid::new_v4(), project).await.unwrap();

        match pool.admit(project) {
            Admission::Rejected { reason, .. } => assert_eq!(reason, "per-project limit"),
            Admission::Allocated => panic!("per-project cap should reject"),
        }
        // A different project still fits.
        assert!(pool.admit(Uuid::new_v4()).is_allocated());
    }

    #[tokio::test]
    async fn test_suggested_position_tracks_queue_depth() {
        use crate::domain::models::SessionOptions;

        let queue = Arc::new(SessionQueue::default());
        queue
            .enqueue(Uuid::new_v4(), "a", 3, SessionOptions::default())
            .unwrap();
        queue
            .enqueue(Uuid::new_v4(), "b", 3, SessionOptions::default())
            .unwrap();

        let pool = SessionPool::new(
            PoolConfig {
                max_global_concurrent: 1,
                max_per_project: 1,
                ..Default::default()
            },
            Arc::new(MessageBus::new()),
        )
        .with_queue(Arc::clone(&queue));
        pool.allocate(Uuid::new_v4(), Uuid::new_v4()).await.unwrap();

        // Two waiting items: a new request would land third.
        match pool.admit(Uuid::new_v4()) {
            Admission::Rejected {
                suggested_queue_position,
                ..
            } => assert_eq!(suggested_queue_position, Some(3)),
            Admission::Allocated => panic!("pool should be full"),
        }

        // With queueing disabled there is no hint at all.
        let no_queue_pool = SessionPool::new(
            PoolConfig {
                max_global_concurrent: 1,
                max_per_project: 1,
                queue_enabled: false,
                ..Default::default()
            },
            Arc::new(MessageBus::new()),
        );
        no_queue_pool
            .allocate(Uuid::new_v4(), Uuid::new_v4())
            .await
            .unwrap();
        match no_queue_pool.admit(Uuid::new_v4()) {
            Admission::Rejected {
                suggested_queue_position,
                ..
            } => assert_eq!(suggested_queue_position, None),
            Admission::Allocated => panic!("pool should be full"),
        }
    }

    #[tokio::test]
    async fn test_allocate_rechecks_admission() {
        let pool = pool(1, 1);
        let project = Uuid::new_v4();
        pool.allocate(Uuid::new_v4(), project).await.unwrap();

        let err = pool.allocate(Uuid::new_v4(), project).await.unwrap_err();
        assert!(matches!(err, DomainError::Conflict(_)));
    }

    #[tokio::test]
    async fn test_release_unknown_session() {
        let pool = pool(5, 2);
        assert!(matches!(
            pool.release(Uuid::new_v4()).await.unwrap_err(),
            DomainError::NotFound(_)
        ));
    }

    #[tokio::test]
    async fn test_caps_invariant_under_churn() {
        let pool = pool(3, 2);
        let projects: Vec<Uuid> = (0..3).map(|_| Uuid::new_v4()).collect();
        let mut allocated = Vec::new();

        for round in 0..10 {
            for &project in &projects {
                let session = Uuid::new_v4();
                if pool.admit(project).is_allocated() {
                    pool.allocate(session, project).await.unwrap();
                    allocated.push(session);
                }
                assert!(pool.active_count() <= 3);
                for &p in &projects {
                    assert!(pool.active_for_project(p) <= 2);
                }
            }
            if round % 2 == 0 {
                if let Some(session) = allocated.pop() {
                    pool.release(session).await.unwrap();
                }
            }
        }
    }
}
