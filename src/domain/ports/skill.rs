//! Skill host contract: the handler trait and the capability-scoped
//! context handed to it.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;
use tokio::sync::mpsc;
use uuid::Uuid;

use crate::domain::error::{DomainError, DomainResult};
use crate::domain::models::SkillPermission;
use crate::domain::ports::ProjectRepository;

/// Hook event emitted by a skill; fanned out by the registry.
#[derive(Debug, Clone)]
pub struct SkillEvent {
    pub skill_name: String,
    pub event: String,
    pub data: Value,
}

/// Capability-scoped environment a skill runs against.
///
/// Everything a skill touches goes through here; the permission set comes
/// from its validated manifest.
pub struct SkillContext {
    /// Skill name, used as the tracing target and event source
    pub skill_name: String,
    /// Directory containing the skill's manifest and code
    pub skill_dir: PathBuf,
    permissions: Vec<SkillPermission>,
    projects: Arc<dyn ProjectRepository>,
    config: Value,
    events: mpsc::UnboundedSender<SkillEvent>,
}

impl SkillContext {
    pub fn new(
        skill_name: impl Into<String>,
        skill_dir: PathBuf,
        permissions: Vec<SkillPermission>,
        projects: Arc<dyn ProjectRepository>,
        config: Value,
        events: mpsc::UnboundedSender<SkillEvent>,
    ) -> Self {
        Self {
            skill_name: skill_name.into(),
            skill_dir,
            permissions,
            projects,
            config,
            events,
        }
    }

    /// Whether the manifest granted a permission. `all` grants everything.
    pub fn has_permission(&self, permission: SkillPermission) -> bool {
        self.permissions.contains(&SkillPermission::All)
            || self.permissions.contains(&permission)
    }

    /// Resolve a project's absolute path. Requires `fs:read`.
    pub async fn get_project_path(&self, project_id: Uuid) -> DomainResult<PathBuf> {
        if !self.has_permission(SkillPermission::FsRead) {
            return Err(DomainError::validation(format!(
                "skill '{}' lacks fs:read permission",
                self.skill_name
            )));
        }
        let project = self
            .projects
            .get(project_id)
            .await?
            .ok_or_else(|| DomainError::not_found(format!("project {project_id}")))?;
        Ok(PathBuf::from(project.absolute_path))
    }

    /// Per-skill configuration block.
    pub fn config(&self) -> &Value {
        &self.config
    }

    pub fn skill_dir(&self) -> &Path {
        &self.skill_dir
    }

    /// Emit a hook event into the registry's fan-out.
    pub fn emit(&self, event: impl Into<String>, data: Value) {
        let _ = self.events.send(SkillEvent {
            skill_name: self.skill_name.clone(),
            event: event.into(),
            data,
        });
    }
}

/// Code entry point of a skill.
#[async_trait]
pub trait SkillHandler: Send + Sync {
    /// Called on registration with the scoped context. Failure rejects the
    /// registration.
    async fn activate(&self, ctx: &SkillContext) -> DomainResult<()>;

    /// Run a command declared in the manifest.
    async fn execute(
        &self,
        ctx: &SkillContext,
        command: &str,
        args: Value,
    ) -> DomainResult<Value>;

    /// Handle a hook event the manifest subscribed to. Errors are logged
    /// by the registry and never propagated.
    async fn handle_hook(&self, ctx: &SkillContext, event: &str, data: Value)
        -> DomainResult<()>;
}
