//! Command handlers. Store-backed commands open the database directly;
//! session and daemon commands talk to the running daemon over its
//! socket.

pub mod config;
pub mod daemon;
pub mod projects;
pub mod session;

use std::sync::Arc;

use uuid::Uuid;

use crate::domain::error::{DomainError, DomainResult};
use crate::domain::models::Project;
use crate::domain::ports::ProjectRepository;

/// Resolve a user-supplied project reference: name, absolute path, or id.
pub async fn resolve_project(
    projects: &Arc<dyn ProjectRepository>,
    reference: &str,
) -> DomainResult<Project> {
    if let Some(project) = projects.get_by_name(reference).await? {
        return Ok(project);
    }
    if let Some(project) = projects.get_by_path(reference).await? {
        return Ok(project);
    }
    if let Ok(id) = Uuid::parse_str(reference) {
        if let Some(project) = projects.get(id).await? {
            return Ok(project);
        }
    }
    Err(DomainError::not_found(format!("project '{reference}'")))
}
