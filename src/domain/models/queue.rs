//! In-memory session waiting list items.
//!
//! Queue items are never persisted; the queue is rebuilt empty on daemon
//! restart.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QueueItemStatus {
    Queued,
    Running,
    Cancelled,
    Completed,
}

impl QueueItemStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Queued => "queued",
            Self::Running => "running",
            Self::Cancelled => "cancelled",
            Self::Completed => "completed",
        }
    }
}

/// Options carried from the enqueue request to the eventual session start.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SessionOptions {
    /// Tool allowlist handed to the coding agent, when restricted
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub allowed_tools: Option<Vec<String>>,
    /// Prompt written to the agent's stdin at start
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub initial_prompt: Option<String>,
}

/// A waiting session request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueueItem {
    pub id: Uuid,
    pub project_id: Uuid,
    /// Name snapshot so displays survive project renames
    pub project_name: String,
    pub requested_at: DateTime<Utc>,
    /// 1 (lowest) .. 5 (highest); default 3
    pub priority: u8,
    pub options: SessionOptions,
    pub status: QueueItemStatus,
    /// 1-based position among queued items; 0 once no longer queued
    pub position: usize,
}

impl QueueItem {
    pub fn new(project_id: Uuid, project_name: impl Into<String>, priority: u8) -> Self {
        Self {
            id: Uuid::new_v4(),
            project_id,
            project_name: project_name.into(),
            requested_at: Utc::now(),
            priority,
            options: SessionOptions::default(),
            status: QueueItemStatus::Queued,
            position: 0,
        }
    }
}
