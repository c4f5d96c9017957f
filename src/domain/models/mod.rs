//! Domain models
//!
//! Pure domain entities with business logic and validation rules.
//! These models are framework-agnostic and contain no infrastructure
//! concerns.

pub mod activity;
pub mod agent;
pub mod config;
pub mod message;
pub mod notification;
pub mod project;
pub mod queue;
pub mod schedule;
pub mod search;
pub mod session;
pub mod skill;
pub mod team;

pub use activity::{Activity, ActivityKind};
pub use agent::{AgentInfo, AgentStatus};
pub use config::{AiConfig, Config, DefaultOptions, MultiplexConfig, TuiConfig};
pub use message::{BusMessage, MessageType, SendOutcome};
pub use notification::{NotificationEvent, NotifyLevel, NotifyPlatform};
pub use project::Project;
pub use queue::{QueueItem, QueueItemStatus, SessionOptions};
pub use schedule::{ExecutionOutcome, RunStatus, Schedule, ScheduleLog, TaskKind};
pub use search::{
    ProjectMatches, QueryMode, SearchMatch, SearchOptions, SearchResponse, SymbolType,
};
pub use session::{Session, SessionStatus};
pub use skill::{
    SkillCommand, SkillManifest, SkillPermission, SkillRecord, SkillSource,
};
pub use team::{
    AssignmentSuggestion, MemberRole, MemberStatus, Team, TeamMember, TeamSession, TeamStatus,
    TeamTask, TeamTaskStatus, DEFAULT_CONCURRENT_TASKS, MAX_CONCURRENT_TASKS,
    MIN_CONCURRENT_TASKS,
};
