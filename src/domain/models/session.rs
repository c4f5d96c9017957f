//! Coding-agent session model.
//!
//! A session is one invocation of the coding agent against a single project.
//! At most one session may be active per project at any instant.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Status of a coding-agent session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionStatus {
    /// Child process is (or is believed to be) running
    Active,
    /// Child exited cleanly or was stopped gracefully
    Completed,
    /// Child crashed, was killed, or was orphaned by a daemon restart
    Interrupted,
}

impl SessionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Active => "active",
            Self::Completed => "completed",
            Self::Interrupted => "interrupted",
        }
    }

    #[allow(clippy::should_implement_trait)]
    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "active" => Some(Self::Active),
            "completed" => Some(Self::Completed),
            "interrupted" => Some(Self::Interrupted),
            _ => None,
        }
    }

    /// Terminal states never transition again.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Interrupted)
    }
}

/// A running or finished invocation of the coding agent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Session {
    pub id: Uuid,
    pub project_id: Uuid,
    pub started_at: DateTime<Utc>,
    pub ended_at: Option<DateTime<Utc>>,
    pub status: SessionStatus,
    pub summary: Option<String>,
    pub summary_status: Option<String>,
    pub summary_generated_at: Option<DateTime<Utc>>,
    /// OS pid of the child; a weak reference validated before signalling
    pub os_process_id: Option<u32>,
}

impl Session {
    pub fn new(project_id: Uuid) -> Self {
        Self {
            id: Uuid::new_v4(),
            project_id,
            started_at: Utc::now(),
            ended_at: None,
            status: SessionStatus::Active,
            summary: None,
            summary_status: None,
            summary_generated_at: None,
            os_process_id: None,
        }
    }

    /// Transition to a terminal state, setting `ended_at`.
    ///
    /// Returns an error if the session is already terminal; terminal states
    /// are final.
    pub fn finish(&mut self, status: SessionStatus) -> Result<(), String> {
        if self.status.is_terminal() {
            return Err(format!(
                "session {} is already {}",
                self.id,
                self.status.as_str()
            ));
        }
        if !status.is_terminal() {
            return Err(format!("{} is not a terminal status", status.as_str()));
        }
        self.status = status;
        self.ended_at = Some(Utc::now());
        Ok(())
    }

    pub fn is_active(&self) -> bool {
        self.status == SessionStatus::Active
    }

    /// Wall-clock duration, if the session has ended.
    pub fn duration(&self) -> Option<chrono::Duration> {
        self.ended_at.map(|end| end - self.started_at)
    }
}
