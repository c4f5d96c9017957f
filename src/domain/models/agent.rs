//! Runtime directory entries for registered agents.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AgentStatus {
    Idle,
    Busy,
    /// Missed heartbeats
    Offline,
    /// initialize() or handleMessage() escaped with an error
    Error,
}

impl AgentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Busy => "busy",
            Self::Offline => "offline",
            Self::Error => "error",
        }
    }
}

/// Directory record for a registered agent. Maintained by the runtime on
/// register/unregister and heartbeat; never persisted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentInfo {
    pub id: String,
    pub name: String,
    pub description: Option<String>,
    pub status: AgentStatus,
    /// Topics this agent listens on, in subscription order
    pub subscriptions: Vec<String>,
    pub capabilities: Vec<String>,
    pub registered_at: DateTime<Utc>,
    pub last_heartbeat_at: Option<DateTime<Utc>>,
    pub metadata: HashMap<String, serde_json::Value>,
}

impl AgentInfo {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            description: None,
            status: AgentStatus::Idle,
            subscriptions: Vec::new(),
            capabilities: Vec::new(),
            registered_at: Utc::now(),
            last_heartbeat_at: None,
            metadata: HashMap::new(),
        }
    }

    pub fn has_capability(&self, capability: &str) -> bool {
        self.capabilities.iter().any(|c| c == capability)
    }
}
