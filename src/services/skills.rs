//! Skill registry: loading, activation, command execution, and hook
//! fan-out for plug-ins running inside the daemon.

use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;

use chrono::Utc;
use serde_json::{json, Value};
use tokio::sync::{mpsc, Mutex, RwLock};
use uuid::Uuid;

use crate::domain::error::{DomainError, DomainResult};
use crate::domain::models::{SkillManifest, SkillRecord, SkillSource};
use crate::domain::ports::{ProjectRepository, SkillContext, SkillEvent, SkillHandler};

struct LoadedSkill {
    record: SkillRecord,
    handler: Arc<dyn SkillHandler>,
    ctx: Arc<SkillContext>,
}

/// Hosts skills under their declared permission sets.
pub struct SkillRegistry {
    skills: RwLock<HashMap<String, LoadedSkill>>,
    projects: Arc<dyn ProjectRepository>,
    event_tx: mpsc::UnboundedSender<SkillEvent>,
    event_rx: Mutex<Option<mpsc::UnboundedReceiver<SkillEvent>>>,
}

impl SkillRegistry {
    pub fn new(projects: Arc<dyn ProjectRepository>) -> Self {
        let (event_tx, event_rx) = mpsc::unbounded_channel();
        Self {
            skills: RwLock::new(HashMap::new()),
            projects,
            event_tx,
            event_rx: Mutex::new(Some(event_rx)),
        }
    }

    /// Take the hook-event stream fed by `SkillContext::emit`. The daemon
    /// drains it into `trigger_hook`.
    pub async fn take_event_receiver(&self) -> Option<mpsc::UnboundedReceiver<SkillEvent>> {
        self.event_rx.lock().await.take()
    }

    /// Parse a `skill.yaml` from a skill directory.
    pub fn load_manifest(skill_dir: &Path) -> DomainResult<SkillManifest> {
        let manifest_path = skill_dir.join("skill.yaml");
        let raw = std::fs::read_to_string(&manifest_path).map_err(|e| {
            DomainError::validation(format!(
                "cannot read manifest {}: {e}",
                manifest_path.display()
            ))
        })?;
        let manifest: SkillManifest = serde_yaml::from_str(&raw)
            .map_err(|e| DomainError::validation(format!("malformed manifest: {e}")))?;
        manifest.validate().map_err(DomainError::Validation)?;
        Ok(manifest)
    }

    /// Register and activate a skill. A duplicate name is a conflict; a
    /// failed activation leaves the registry unchanged.
    pub async fn register(
        &self,
        handler: Arc<dyn SkillHandler>,
        manifest: SkillManifest,
        skill_dir: &Path,
        source: SkillSource,
        config: Value,
    ) -> DomainResult<()> {
        manifest.validate().map_err(DomainError::Validation)?;

        {
            let skills = self.skills.read().await;
            if skills.contains_key(&manifest.name) {
                return Err(DomainError::conflict(format!(
                    "skill '{}' is already registered",
                    manifest.name
                )));
            }
        }

        let ctx = Arc::new(SkillContext::new(
            manifest.name.clone(),
            skill_dir.to_path_buf(),
            manifest.permissions.clone(),
            Arc::clone(&self.projects),
            config.clone(),
            self.event_tx.clone(),
        ));

        handler.activate(&ctx).await?;

        let record = SkillRecord {
            id: Uuid::new_v4(),
            name: manifest.name.clone(),
            version: manifest.version.clone(),
            source,
            path: skill_dir.display().to_string(),
            enabled: true,
            config,
            loaded_at: Some(Utc::now()),
            error: None,
            manifest: manifest.clone(),
        };

        self.skills.write().await.insert(
            manifest.name.clone(),
            LoadedSkill {
                record,
                handler,
                ctx,
            },
        );
        tracing::info!(skill = %manifest.name, version = %manifest.version, "skill registered");
        Ok(())
    }

    /// Remove a skill. Unknown names are a no-op.
    pub async fn unregister(&self, name: &str) {
        if self.skills.write().await.remove(name).is_some() {
            tracing::info!(skill = name, "skill unregistered");
        }
    }

    /// Idempotent enable.
    pub async fn enable(&self, name: &str) {
        if let Some(skill) = self.skills.write().await.get_mut(name) {
            skill.record.enabled = true;
        }
    }

    /// Idempotent disable.
    pub async fn disable(&self, name: &str) {
        if let Some(skill) = self.skills.write().await.get_mut(name) {
            skill.record.enabled = false;
        }
    }

    pub async fn list(&self) -> Vec<SkillRecord> {
        let skills = self.skills.read().await;
        let mut records: Vec<SkillRecord> = skills.values().map(|s| s.record.clone()).collect();
        records.sort_by(|a, b| a.name.cmp(&b.name));
        records
    }

    /// Run a declared command of an enabled skill.
    pub async fn execute(
        &self,
        skill_name: &str,
        command: &str,
        args: Value,
    ) -> DomainResult<Value> {
        let (handler, ctx) = {
            let skills = self.skills.read().await;
            let skill = skills
                .get(skill_name)
                .ok_or_else(|| DomainError::not_found(format!("skill '{skill_name}'")))?;
            if !skill.record.enabled {
                return Err(DomainError::validation(format!(
                    "skill '{skill_name}' is disabled"
                )));
            }
            if !skill.record.manifest.declares_command(command) {
                return Err(DomainError::validation(format!(
                    "skill '{skill_name}' does not declare command '{command}'"
                )));
            }
            (Arc::clone(&skill.handler), Arc::clone(&skill.ctx))
        };

        let result = handler.execute(&ctx, command, args).await?;

        self.trigger_hook(
            "command:executed",
            json!({"skill": skill_name, "command": command}),
        )
        .await;

        Ok(result)
    }

    /// Invoke `handle_hook` on every enabled skill whose manifest lists
    /// the event. Handler errors are logged and do not propagate.
    pub async fn trigger_hook(&self, event: &str, data: Value) {
        let targets: Vec<(Arc<dyn SkillHandler>, Arc<SkillContext>, String)> = {
            let skills = self.skills.read().await;
            skills
                .values()
                .filter(|s| s.record.enabled && s.record.manifest.declares_hook(event))
                .map(|s| {
                    (
                        Arc::clone(&s.handler),
                        Arc::clone(&s.ctx),
                        s.record.name.clone(),
                    )
                })
                .collect()
        };

        for (handler, ctx, name) in targets {
            if let Err(e) = handler.handle_hook(&ctx, event, data.clone()).await {
                tracing::warn!(skill = %name, event, error = %e, "hook handler failed");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::models::{Project, SkillCommand, SkillPermission};
    use crate::domain::ports::ProjectRepository;
    use crate::infrastructure::database::{DatabaseConnection, ProjectRepositoryImpl};
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct CountingSkill {
        executions: AtomicUsize,
        hooks: AtomicUsize,
        fail_activation: bool,
    }

    impl CountingSkill {
        fn new() -> Arc<Self> {
            Arc::new(Self {
                executions: AtomicUsize::new(0),
                hooks: AtomicUsize::new(0),
                fail_activation: false,
            })
        }
    }

    #[async_trait]
    impl SkillHandler for CountingSkill {
        async fn activate(&self, _ctx: &SkillContext) -> DomainResult<()> {
            if self.fail_activation {
                return Err(DomainError::Operational("activation failed".into()));
            }
            Ok(())
        }
        async fn execute(
            &self,
            _ctx: &SkillContext,
            command: &str,
            _args: Value,
        ) -> DomainResult<Value> {
            self.executions.fetch_add(1, Ordering::SeqCst);
            Ok(json!({"ran": command}))
        }
        async fn handle_hook(
            &self,
            _ctx: &SkillContext,
            _event: &str,
            _data: Value,
        ) -> DomainResult<()> {
            self.hooks.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    fn manifest(name: &str, hooks: &[&str]) -> SkillManifest {
        SkillManifest {
            name: name.to_string(),
            version: "1.0.0".to_string(),
            description: None,
            commands: vec![SkillCommand {
                name: "run".to_string(),
                description: None,
            }],
            permissions: vec![SkillPermission::FsRead],
            hooks: hooks
                .iter()
                .map(|h| ((*h).to_string(), "handler".to_string()))
                .collect(),
        }
    }

    async fn registry() -> (SkillRegistry, Arc<dyn ProjectRepository>) {
        let db = DatabaseConnection::new("sqlite::memory:").await.unwrap();
        db.migrate().await.unwrap();
        let projects: Arc<dyn ProjectRepository> =
            Arc::new(ProjectRepositoryImpl::new(db.pool().clone()));
        (SkillRegistry::new(Arc::clone(&projects)), projects)
    }

    #[tokio::test]
    async fn test_register_execute_and_hook_event() {
        let (registry, _) = registry().await;
        let skill = CountingSkill::new();
        registry
            .register(
                skill.clone(),
                manifest("counter", &["command:executed"]),
                Path::new("/tmp/skills/counter"),
                SkillSource::External,
                json!({}),
            )
            .await
            .unwrap();

        let result = registry.execute("counter", "run", json!({})).await.unwrap();
        assert_eq!(result["ran"], "run");
        assert_eq!(skill.executions.load(Ordering::SeqCst), 1);
        // The command:executed hook fired back into the skill.
        assert_eq!(skill.hooks.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_duplicate_name_conflicts() {
        let (registry, _) = registry().await;
        registry
            .register(
                CountingSkill::new(),
                manifest("dup", &[]),
                Path::new("/tmp/skills/dup"),
                SkillSource::External,
                json!({}),
            )
            .await
            .unwrap();
        let err = registry
            .register(
                CountingSkill::new(),
                manifest("dup", &[]),
                Path::new("/tmp/skills/dup"),
                SkillSource::External,
                json!({}),
            )
            .await
            .unwrap_err();
        assert!(matches!(err, DomainError::Conflict(_)));
    }

    #[tokio::test]
    async fn test_failed_activation_leaves_registry_empty() {
        let (registry, _) = registry().await;
        let skill = Arc::new(CountingSkill {
            executions: AtomicUsize::new(0),
            hooks: AtomicUsize::new(0),
            fail_activation: true,
        });
        assert!(registry
            .register(
                skill,
                manifest("broken", &[]),
                Path::new("/tmp/skills/broken"),
                SkillSource::External,
                json!({}),
            )
            .await
            .is_err());
        assert!(registry.list().await.is_empty());
    }

    #[tokio::test]
    async fn test_disabled_skill_rejects_execute() {
        let (registry, _) = registry().await;
        registry
            .register(
                CountingSkill::new(),
                manifest("sleepy", &[]),
                Path::new("/tmp/skills/sleepy"),
                SkillSource::External,
                json!({}),
            )
            .await
            .unwrap();

        registry.disable("sleepy").await;
        registry.disable("sleepy").await; // idempotent
        assert!(registry.execute("sleepy", "run", json!({})).await.is_err());

        registry.enable("sleepy").await;
        assert!(registry.execute("sleepy", "run", json!({})).await.is_ok());
    }

    #[tokio::test]
    async fn test_undeclared_command_rejected() {
        let (registry, _) = registry().await;
        registry
            .register(
                CountingSkill::new(),
                manifest("strict", &[]),
                Path::new("/tmp/skills/strict"),
                SkillSource::External,
                json!({}),
            )
            .await
            .unwrap();
        let err = registry
            .execute("strict", "not-declared", json!({}))
            .await
            .unwrap_err();
        assert!(matches!(err, DomainError::Validation(_)));
    }

    #[tokio::test]
    async fn test_unknown_skill_not_found() {
        let (registry, _) = registry().await;
        let err = registry.execute("ghost", "run", json!({})).await.unwrap_err();
        assert!(matches!(err, DomainError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_context_permission_guard() {
        let (registry, projects) = registry().await;
        let project = Project::new("demo", "/tmp/demo");
        projects.create(&project).await.unwrap();

        // fs:read granted: path resolution works.
        let (tx, _rx) = mpsc::unbounded_channel();
        let ctx = SkillContext::new(
            "reader",
            "/tmp/skills/reader".into(),
            vec![SkillPermission::FsRead],
            Arc::clone(&projects),
            json!({}),
            tx,
        );
        let path = ctx.get_project_path(project.id).await.unwrap();
        assert_eq!(path, std::path::PathBuf::from("/tmp/demo"));

        // Without fs:read the same call is refused.
        let (tx, _rx) = mpsc::unbounded_channel();
        let ctx = SkillContext::new(
            "blind",
            "/tmp/skills/blind".into(),
            vec![SkillPermission::DbRead],
            Arc::clone(&projects),
            json!({}),
            tx,
        );
        assert!(ctx.get_project_path(project.id).await.is_err());

        let _ = registry;
    }

    #[tokio::test]
    async fn test_unregister_is_idempotent() {
        let (registry, _) = registry().await;
        registry
            .register(
                CountingSkill::new(),
                manifest("gone", &[]),
                Path::new("/tmp/skills/gone"),
                SkillSource::External,
                json!({}),
            )
            .await
            .unwrap();
        registry.unregister("gone").await;
        registry.unregister("gone").await;
        assert!(registry.list().await.is_empty());
    }
}
