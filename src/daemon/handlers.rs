//! RPC method handlers: the daemon's surface for the CLI, dashboard, and
//! TUI adapters.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Deserialize;
use serde_json::{json, Value};
use tokio::sync::watch;
use uuid::Uuid;

use super::sessions::SessionService;
use crate::domain::error::{DomainError, DomainResult};
use crate::domain::models::{Session, SessionOptions};
use crate::domain::ports::{ProjectRepository, SessionRepository};
use crate::infrastructure::ipc::MethodRegistry;
use crate::services::SessionQueue;

/// Everything the method handlers reach for.
pub struct HandlerContext {
    pub sessions: Arc<SessionService>,
    pub session_repo: Arc<dyn SessionRepository>,
    pub projects: Arc<dyn ProjectRepository>,
    pub queue: Arc<SessionQueue>,
    pub started_at: DateTime<Utc>,
    pub shutdown: watch::Sender<bool>,
}

fn parse_params<T: for<'de> Deserialize<'de>>(params: Option<Value>) -> DomainResult<T> {
    serde_json::from_value(params.unwrap_or(Value::Null))
        .map_err(|e| DomainError::validation(format!("invalid params: {e}")))
}

fn parse_uuid(raw: &str, what: &str) -> DomainResult<Uuid> {
    Uuid::parse_str(raw).map_err(|_| DomainError::validation(format!("invalid {what}: '{raw}'")))
}

fn session_snapshot(session: &Session) -> Value {
    json!({
        "sessionId": session.id,
        "projectId": session.project_id,
        "status": session.status.as_str(),
        "startedAt": session.started_at.to_rfc3339(),
        "endedAt": session.ended_at.map(|t| t.to_rfc3339()),
        "osProcessId": session.os_process_id,
    })
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct StartParams {
    project_id: String,
    #[serde(default)]
    allowed_tools: Option<Vec<String>>,
    #[serde(default)]
    initial_prompt: Option<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct SessionIdParams {
    session_id: String,
}

#[derive(Deserialize, Default)]
#[serde(rename_all = "camelCase")]
struct ResumeParams {
    #[serde(default)]
    project_id: Option<String>,
}

/// Build the dispatch table.
pub fn register_methods(ctx: Arc<HandlerContext>) -> MethodRegistry {
    let mut registry = MethodRegistry::new();

    {
        let ctx = Arc::clone(&ctx);
        registry.register("session.start", move |params| {
            let ctx = Arc::clone(&ctx);
            async move {
                let params: StartParams = parse_params(params)?;
                let project_id = parse_uuid(&params.project_id, "projectId")?;
                let options = SessionOptions {
                    allowed_tools: params.allowed_tools,
                    initial_prompt: params.initial_prompt,
                };
                let session = ctx.sessions.start(project_id, options).await?;
                Ok(json!({"sessionId": session.id, "status": "started"}))
            }
        });
    }

    {
        let ctx = Arc::clone(&ctx);
        registry.register("session.stop", move |params| {
            let ctx = Arc::clone(&ctx);
            async move {
                let params: SessionIdParams = parse_params(params)?;
                let session_id = parse_uuid(&params.session_id, "sessionId")?;
                ctx.sessions.stop(session_id).await?;
                Ok(json!({"success": true}))
            }
        });
    }

    {
        let ctx = Arc::clone(&ctx);
        registry.register("session.status", move |params| {
            let ctx = Arc::clone(&ctx);
            async move {
                let params: SessionIdParams = parse_params(params)?;
                let session_id = parse_uuid(&params.session_id, "sessionId")?;
                let session = ctx.sessions.status(session_id).await?;
                Ok(json!({
                    "status": session.status.as_str(),
                    "osProcessId": session.os_process_id,
                }))
            }
        });
    }

    {
        let ctx = Arc::clone(&ctx);
        registry.register("session.list", move |_params| {
            let ctx = Arc::clone(&ctx);
            async move {
                let sessions = ctx.sessions.list_active().await?;
                Ok(Value::Array(
                    sessions.iter().map(session_snapshot).collect(),
                ))
            }
        });
    }

    {
        let ctx = Arc::clone(&ctx);
        registry.register("session.resume", move |params| {
            let ctx = Arc::clone(&ctx);
            async move {
                let params: ResumeParams = parse_params(params).unwrap_or_default();
                let project_id = params
                    .project_id
                    .as_deref()
                    .map(|raw| parse_uuid(raw, "projectId"))
                    .transpose()?;
                let session = ctx.sessions.resume(project_id).await?;
                Ok(json!({"sessionId": session.id, "status": "started"}))
            }
        });
    }

    {
        let ctx = Arc::clone(&ctx);
        registry.register("daemon.status", move |_params| {
            let ctx = Arc::clone(&ctx);
            async move {
                let active = ctx.session_repo.list_active().await?.len();
                let total = ctx.session_repo.count_all().await?;
                let uptime = (Utc::now() - ctx.started_at).num_seconds().max(0);
                Ok(json!({
                    "running": true,
                    "osProcessId": std::process::id(),
                    "startedAt": ctx.started_at.to_rfc3339(),
                    "uptimeSeconds": uptime,
                    "activeSessions": active,
                    "totalSessionsHandled": total,
                }))
            }
        });
    }

    {
        let ctx = Arc::clone(&ctx);
        registry.register("daemon.stop", move |_params| {
            let ctx = Arc::clone(&ctx);
            async move {
                let _ = ctx.shutdown.send(true);
                Ok(json!({"success": true}))
            }
        });
    }

    {
        let ctx = Arc::clone(&ctx);
        registry.register("project.list", move |_params| {
            let ctx = Arc::clone(&ctx);
            async move {
                let projects = ctx.projects.list().await?;
                Ok(Value::Array(
                    projects
                        .iter()
                        .map(|p| {
                            json!({
                                "id": p.id,
                                "name": p.name,
                                "absolutePath": p.absolute_path,
                                "techStack": p.tech_stack,
                                "lastAccessedAt": p.last_accessed_at.map(|t| t.to_rfc3339()),
                            })
                        })
                        .collect(),
                ))
            }
        });
    }

    {
        let ctx = Arc::clone(&ctx);
        registry.register("queue.status", move |_params| {
            let ctx = Arc::clone(&ctx);
            async move {
                let queued = ctx.queue.snapshot();
                Ok(json!({
                    "queued": queued.len(),
                    "items": queued
                        .iter()
                        .map(|item| {
                            json!({
                                "id": item.id,
                                "projectName": item.project_name,
                                "priority": item.priority,
                                "position": item.position,
                                "status": item.status.as_str(),
                            })
                        })
                        .collect::<Vec<_>>(),
                }))
            }
        });
    }

    registry
}
