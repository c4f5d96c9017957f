//! Project management commands: list, discover, add, remove, history,
//! activity.

use std::path::Path;
use std::sync::Arc;

use anyhow::Result;
use serde_json::json;

use super::resolve_project;
use crate::cli::output;
use crate::domain::models::{Activity, ActivityKind};
use crate::domain::ports::{ActivityRepository, ProjectRepository, SessionRepository};
use crate::services::DiscoveryService;

pub async fn handle_list(projects: &Arc<dyn ProjectRepository>, json: bool) -> Result<()> {
    let listed = projects.list().await?;
    if json {
        output::print_json(&listed);
    } else if listed.is_empty() {
        println!("No projects registered. Try `maxclaw discover <path>`.");
    } else {
        println!("{}", output::project_table(&listed));
    }
    Ok(())
}

pub async fn handle_discover(
    discovery: &DiscoveryService,
    path: &str,
    json: bool,
) -> Result<()> {
    let root = std::fs::canonicalize(path)?;
    let added = discovery.discover(&root).await?;
    if json {
        output::print_json(&added);
    } else if added.is_empty() {
        println!("No new projects found under {}", root.display());
    } else {
        for project in &added {
            println!(
                "Added {} ({}) [{}]",
                project.name,
                project.absolute_path,
                project.tech_stack.join(", ")
            );
        }
    }
    Ok(())
}

pub async fn handle_add(
    discovery: &DiscoveryService,
    path: &str,
    name: Option<String>,
    json: bool,
) -> Result<()> {
    let path = std::fs::canonicalize(path)?;
    let project = discovery.add(Path::new(&path), name).await?;
    if json {
        output::print_json(&project);
    } else {
        println!("Added {} ({})", project.name, project.absolute_path);
    }
    Ok(())
}

pub async fn handle_remove(
    projects: &Arc<dyn ProjectRepository>,
    activities: &Arc<dyn ActivityRepository>,
    reference: &str,
) -> Result<()> {
    let project = resolve_project(projects, reference).await?;
    // Recorded for observers watching the log live; the row itself
    // cascades away with the project.
    activities
        .append(
            &Activity::new(project.id, ActivityKind::Remove)
                .with_details(json!({"name": project.name})),
        )
        .await
        .ok();
    projects.delete(project.id).await?;
    println!("Removed {}", project.name);
    Ok(())
}

pub async fn handle_history(
    projects: &Arc<dyn ProjectRepository>,
    sessions: &Arc<dyn SessionRepository>,
    reference: &str,
    json: bool,
) -> Result<()> {
    let project = resolve_project(projects, reference).await?;
    let history = sessions.list_by_project(project.id, 50).await?;
    if json {
        output::print_json(&history);
    } else if history.is_empty() {
        println!("No sessions recorded for {}", project.name);
    } else {
        println!("{}", output::session_table(&history));
    }
    Ok(())
}

pub async fn handle_activity(
    projects: &Arc<dyn ProjectRepository>,
    activities: &Arc<dyn ActivityRepository>,
    reference: Option<&str>,
    json: bool,
) -> Result<()> {
    let entries = match reference {
        Some(reference) => {
            let project = resolve_project(projects, reference).await?;
            activities.list_by_project(project.id, 50).await?
        }
        None => activities.list_recent(50).await?,
    };
    if json {
        output::print_json(&entries);
    } else if entries.is_empty() {
        println!("No activity recorded.");
    } else {
        println!("{}", output::activity_table(&entries));
    }
    Ok(())
}
