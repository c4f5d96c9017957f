//! Teams of simulated engineering personas and their tasks.
//!
//! Members, tasks, and teams reference each other by id only; joined views
//! are projections built at query time, never persisted.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TeamStatus {
    Idle,
    Active,
    Completed,
}

impl TeamStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Active => "active",
            Self::Completed => "completed",
        }
    }

    #[allow(clippy::should_implement_trait)]
    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "idle" => Some(Self::Idle),
            "active" => Some(Self::Active),
            "completed" => Some(Self::Completed),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Team {
    pub id: Uuid,
    pub name: String,
    pub project_id: Uuid,
    pub lead_member_id: Uuid,
    pub member_ids: Vec<Uuid>,
    pub status: TeamStatus,
    pub created_at: DateTime<Utc>,
    pub config: serde_json::Value,
}

/// Persona role within a team.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MemberRole {
    Lead,
    Developer,
    Architect,
    Qa,
    Pm,
    Analyst,
}

impl MemberRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Lead => "lead",
            Self::Developer => "developer",
            Self::Architect => "architect",
            Self::Qa => "qa",
            Self::Pm => "pm",
            Self::Analyst => "analyst",
        }
    }

    #[allow(clippy::should_implement_trait)]
    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "lead" => Some(Self::Lead),
            "developer" => Some(Self::Developer),
            "architect" => Some(Self::Architect),
            "qa" => Some(Self::Qa),
            "pm" => Some(Self::Pm),
            "analyst" => Some(Self::Analyst),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MemberStatus {
    Idle,
    Busy,
    Offline,
}

impl MemberStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Busy => "busy",
            Self::Offline => "offline",
        }
    }

    #[allow(clippy::should_implement_trait)]
    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "idle" => Some(Self::Idle),
            "busy" => Some(Self::Busy),
            "offline" => Some(Self::Offline),
            _ => None,
        }
    }
}

/// Allowed range for a member's concurrent-task capacity.
pub const MIN_CONCURRENT_TASKS: u32 = 1;
pub const MAX_CONCURRENT_TASKS: u32 = 10;
pub const DEFAULT_CONCURRENT_TASKS: u32 = 3;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TeamMember {
    pub id: Uuid,
    pub team_id: Uuid,
    pub name: String,
    pub role: MemberRole,
    pub specialty: Vec<String>,
    pub expertise: Vec<String>,
    pub status: MemberStatus,
    pub current_task_id: Option<Uuid>,
    pub max_concurrent_tasks: u32,
}

impl TeamMember {
    pub fn new(team_id: Uuid, name: impl Into<String>, role: MemberRole) -> Self {
        Self {
            id: Uuid::new_v4(),
            team_id,
            name: name.into(),
            role,
            specialty: Vec::new(),
            expertise: Vec::new(),
            status: MemberStatus::Idle,
            current_task_id: None,
            max_concurrent_tasks: DEFAULT_CONCURRENT_TASKS,
        }
    }

    /// Lowercased union of expertise and specialty tags.
    pub fn skill_set(&self) -> Vec<String> {
        let mut skills: Vec<String> = self
            .expertise
            .iter()
            .chain(self.specialty.iter())
            .map(|s| s.to_lowercase())
            .collect();
        skills.sort();
        skills.dedup();
        skills
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TeamTaskStatus {
    Pending,
    InProgress,
    Completed,
    Blocked,
}

impl TeamTaskStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::InProgress => "in_progress",
            Self::Completed => "completed",
            Self::Blocked => "blocked",
        }
    }

    #[allow(clippy::should_implement_trait)]
    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(Self::Pending),
            "in_progress" => Some(Self::InProgress),
            "completed" => Some(Self::Completed),
            "blocked" => Some(Self::Blocked),
            _ => None,
        }
    }

    /// Counts toward a member's workload.
    pub fn is_open(&self) -> bool {
        matches!(self, Self::Pending | Self::InProgress)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TeamTask {
    pub id: Uuid,
    pub team_id: Uuid,
    pub session_id: Uuid,
    pub assignee_member_id: Option<Uuid>,
    pub title: String,
    pub description: Option<String>,
    pub status: TeamTaskStatus,
    pub dependencies: Vec<Uuid>,
    pub created_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
    pub result: Option<String>,
    pub kind: Option<String>,
    pub required_skills: Option<Vec<String>>,
    /// 1 (lowest) .. 5 (highest)
    pub priority: u8,
}

impl TeamTask {
    pub fn new(team_id: Uuid, session_id: Uuid, title: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            team_id,
            session_id,
            assignee_member_id: None,
            title: title.into(),
            description: None,
            status: TeamTaskStatus::Pending,
            dependencies: Vec::new(),
            created_at: Utc::now(),
            completed_at: None,
            result: None,
            kind: None,
            required_skills: None,
            priority: 3,
        }
    }
}

/// A working period for a whole team.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TeamSession {
    pub id: Uuid,
    pub team_id: Uuid,
    pub project_id: Uuid,
    pub started_at: DateTime<Utc>,
    pub ended_at: Option<DateTime<Utc>>,
    pub status: TeamStatus,
    pub goal: Option<String>,
}

/// A ranked assignment candidate produced by the team assigner.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AssignmentSuggestion {
    pub member_id: Uuid,
    pub member_name: String,
    pub skill_match_score: f64,
    pub workload_factor: f64,
    pub overall_score: f64,
    pub current_task_count: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_skill_set_is_lowercased_union() {
        let mut m = TeamMember::new(Uuid::new_v4(), "ada", MemberRole::Developer);
        m.expertise = vec!["Frontend".into(), "React".into()];
        m.specialty = vec!["frontend".into(), "CSS".into()];
        assert_eq!(m.skill_set(), vec!["css", "frontend", "react"]);
    }

    #[test]
    fn test_open_statuses() {
        assert!(TeamTaskStatus::Pending.is_open());
        assert!(TeamTaskStatus::InProgress.is_open());
        assert!(!TeamTaskStatus::Completed.is_open());
        assert!(!TeamTaskStatus::Blocked.is_open());
    }

    #[test]
    fn test_default_capacity() {
        let m = TeamMember::new(Uuid::new_v4(), "bo", MemberRole::Qa);
        assert_eq!(m.max_concurrent_tasks, DEFAULT_CONCURRENT_TASKS);
    }
}
