//! Ports: trait boundaries between the domain and everything else.

pub mod activity_repository;
pub mod agent;
pub mod executor;
pub mod project_repository;
pub mod schedule_repository;
pub mod session_repository;
pub mod skill;
pub mod team_repository;

pub use activity_repository::ActivityRepository;
pub use agent::AgentHandler;
pub use executor::TaskExecutor;
pub use project_repository::ProjectRepository;
pub use schedule_repository::ScheduleRepository;
pub use session_repository::SessionRepository;
pub use skill::{SkillContext, SkillEvent, SkillHandler};
pub use team_repository::TeamRepository;
