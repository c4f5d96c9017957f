//! Append-only activity audit log entries.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

/// What happened.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActivityKind {
    Start,
    Command,
    Complete,
    Discover,
    Add,
    Remove,
    TeamStart,
    TeamStop,
}

impl ActivityKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Start => "start",
            Self::Command => "command",
            Self::Complete => "complete",
            Self::Discover => "discover",
            Self::Add => "add",
            Self::Remove => "remove",
            Self::TeamStart => "team_start",
            Self::TeamStop => "team_stop",
        }
    }

    #[allow(clippy::should_implement_trait)]
    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "start" => Some(Self::Start),
            "command" => Some(Self::Command),
            "complete" => Some(Self::Complete),
            "discover" => Some(Self::Discover),
            "add" => Some(Self::Add),
            "remove" => Some(Self::Remove),
            "team_start" => Some(Self::TeamStart),
            "team_stop" => Some(Self::TeamStop),
            _ => None,
        }
    }
}

/// One audit-log record. Never updated or deleted individually; removed
/// only by project cascade.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Activity {
    pub id: Uuid,
    pub project_id: Uuid,
    pub session_id: Option<Uuid>,
    pub kind: ActivityKind,
    pub timestamp: DateTime<Utc>,
    /// Free-form context (command line, source path, counts)
    pub details: Value,
}

impl Activity {
    pub fn new(project_id: Uuid, kind: ActivityKind) -> Self {
        Self {
            id: Uuid::new_v4(),
            project_id,
            session_id: None,
            kind,
            timestamp: Utc::now(),
            details: Value::Object(serde_json::Map::new()),
        }
    }

    pub fn with_session(mut self, session_id: Uuid) -> Self {
        self.session_id = Some(session_id);
        self
    }

    pub fn with_details(mut self, details: Value) -> Self {
        self.details = details;
        self
    }
}
