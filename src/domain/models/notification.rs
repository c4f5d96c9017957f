//! Notification levels, platforms, and trigger shapes.

use serde::{Deserialize, Serialize};

/// Severity of an outbound notification. Ordered so that level filtering
/// is a simple comparison.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotifyLevel {
    Info,
    Warning,
    Error,
}

impl NotifyLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Info => "info",
            Self::Warning => "warning",
            Self::Error => "error",
        }
    }

    #[allow(clippy::should_implement_trait)]
    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "info" => Some(Self::Info),
            "warning" => Some(Self::Warning),
            "error" => Some(Self::Error),
            _ => None,
        }
    }
}

/// Which webhook dialect a project's endpoint speaks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotifyPlatform {
    Feishu,
    Wechat,
    Slack,
    Custom,
}

impl NotifyPlatform {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Feishu => "feishu",
            Self::Wechat => "wechat",
            Self::Slack => "slack",
            Self::Custom => "custom",
        }
    }

    #[allow(clippy::should_implement_trait)]
    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "feishu" => Some(Self::Feishu),
            "wechat" => Some(Self::Wechat),
            "slack" => Some(Self::Slack),
            "custom" => Some(Self::Custom),
            _ => None,
        }
    }
}

/// The five notification trigger shapes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum NotificationEvent {
    /// Free-form message.
    Generic { title: String, body: String },
    /// Session finished; duration derived from start/end.
    SessionSummary {
        project_name: String,
        session_id: String,
        status: String,
        duration_secs: i64,
        summary: Option<String>,
    },
    /// A team task reached `completed`.
    TeamTaskCompleted {
        team_name: String,
        task_title: String,
        assignee: Option<String>,
        result: Option<String>,
    },
    /// Something went wrong; optional context and stack.
    ErrorAlert {
        title: String,
        message: String,
        context: Option<String>,
        stack: Option<String>,
    },
    /// A schedule execution finished.
    ScheduleResult {
        schedule_name: String,
        success: bool,
        output: Option<String>,
        error: Option<String>,
        duration_ms: u64,
    },
}

impl NotificationEvent {
    /// Short title used by the payload adapters.
    pub fn title(&self) -> String {
        match self {
            Self::Generic { title, .. } => title.clone(),
            Self::SessionSummary { project_name, .. } => {
                format!("Session finished: {project_name}")
            }
            Self::TeamTaskCompleted { task_title, .. } => {
                format!("Task completed: {task_title}")
            }
            Self::ErrorAlert { title, .. } => title.clone(),
            Self::ScheduleResult { schedule_name, success, .. } => {
                if *success {
                    format!("Schedule succeeded: {schedule_name}")
                } else {
                    format!("Schedule failed: {schedule_name}")
                }
            }
        }
    }

    /// Plain-text body used by the payload adapters.
    pub fn body(&self) -> String {
        match self {
            Self::Generic { body, .. } => body.clone(),
            Self::SessionSummary {
                session_id,
                status,
                duration_secs,
                summary,
                ..
            } => {
                let mut body = format!(
                    "Session {session_id} ended with status {status} after {duration_secs}s"
                );
                if let Some(summary) = summary {
                    body.push_str("\n\n");
                    body.push_str(summary);
                }
                body
            }
            Self::TeamTaskCompleted {
                team_name,
                assignee,
                result,
                ..
            } => {
                let mut body = format!("Team {team_name}");
                if let Some(assignee) = assignee {
                    body.push_str(&format!(", assignee {assignee}"));
                }
                if let Some(result) = result {
                    body.push_str("\n\n");
                    body.push_str(result);
                }
                body
            }
            Self::ErrorAlert {
                message,
                context,
                stack,
                ..
            } => {
                let mut body = message.clone();
                if let Some(context) = context {
                    body.push_str(&format!("\n\nContext: {context}"));
                }
                if let Some(stack) = stack {
                    body.push_str(&format!("\n\n{stack}"));
                }
                body
            }
            Self::ScheduleResult { output, error, duration_ms, .. } => {
                let mut body = format!("Finished in {duration_ms} ms");
                if let Some(output) = output {
                    body.push_str(&format!("\n\n{output}"));
                }
                if let Some(error) = error {
                    body.push_str(&format!("\n\nError: {error}"));
                }
                body
            }
        }
    }

    /// Default severity of the event.
    pub fn level(&self) -> NotifyLevel {
        match self {
            Self::ErrorAlert { .. } => NotifyLevel::Error,
            Self::ScheduleResult { success: false, .. } => NotifyLevel::Error,
            _ => NotifyLevel::Info,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_level_ordering() {
        assert!(NotifyLevel::Info < NotifyLevel::Warning);
        assert!(NotifyLevel::Warning < NotifyLevel::Error);
    }

    #[test]
    fn test_schedule_result_levels() {
        let ok = NotificationEvent::ScheduleResult {
            schedule_name: "nightly".into(),
            success: true,
            output: None,
            error: None,
            duration_ms: 10,
        };
        assert_eq!(ok.level(), NotifyLevel::Info);
        assert!(ok.title().contains("succeeded"));

        let failed = NotificationEvent::ScheduleResult {
            schedule_name: "nightly".into(),
            success: false,
            output: None,
            error: Some("exit 1".into()),
            duration_ms: 10,
        };
        assert_eq!(failed.level(), NotifyLevel::Error);
        assert!(failed.body().contains("exit 1"));
    }

    #[test]
    fn test_session_summary_body() {
        let ev = NotificationEvent::SessionSummary {
            project_name: "demo".into(),
            session_id: "abc".into(),
            status: "completed".into(),
            duration_secs: 61,
            summary: Some("refactored auth".into()),
        };
        let body = ev.body();
        assert!(body.contains("61s"));
        assert!(body.contains("refactored auth"));
    }
}
