//! Project domain model.
//!
//! A project is a discovered source tree identified by marker files.
//! Unique by absolute path.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::notification::{NotifyLevel, NotifyPlatform};

/// A source tree the orchestrator knows about.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Project {
    /// Unique identifier
    pub id: Uuid,
    /// Human-readable name (directory name by default)
    pub name: String,
    /// Canonical filesystem path; unique across the store
    pub absolute_path: String,
    /// Optional description (user-supplied or generated)
    pub description: Option<String>,
    /// Detected technology tags, in detection order
    pub tech_stack: Vec<String>,
    /// When discovery or manual add first saw this project
    pub discovered_at: DateTime<Utc>,
    /// Last session or command activity
    pub last_accessed_at: Option<DateTime<Utc>>,
    /// Webhook URL for notifications, if configured
    pub notification_webhook: Option<String>,
    /// Webhook payload dialect
    pub notification_platform: Option<NotifyPlatform>,
    /// Minimum level delivered; lower levels are dropped
    pub notification_min_level: Option<NotifyLevel>,
}

impl Project {
    /// Create a new project at the given path.
    pub fn new(name: impl Into<String>, absolute_path: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            absolute_path: absolute_path.into(),
            description: None,
            tech_stack: Vec::new(),
            discovered_at: Utc::now(),
            last_accessed_at: None,
            notification_webhook: None,
            notification_platform: None,
            notification_min_level: None,
        }
    }

    /// Add a tech-stack tag, preserving order and skipping duplicates.
    pub fn push_tag(&mut self, tag: impl Into<String>) {
        let tag = tag.into();
        if !self.tech_stack.contains(&tag) {
            self.tech_stack.push(tag);
        }
    }

    /// Record activity against this project.
    pub fn touch(&mut self) {
        self.last_accessed_at = Some(Utc::now());
    }

    /// Effective notification threshold (info when unset).
    pub fn min_level(&self) -> NotifyLevel {
        self.notification_min_level.unwrap_or(NotifyLevel::Info)
    }
}
