//! Terminal output helpers.

use comfy_table::{presets::UTF8_FULL_CONDENSED, Cell, Table};

use crate::domain::models::{Activity, Project, Session};

pub fn print_json<T: serde::Serialize>(value: &T) {
    match serde_json::to_string_pretty(value) {
        Ok(rendered) => println!("{rendered}"),
        Err(e) => eprintln!("failed to render JSON: {e}"),
    }
}

pub fn project_table(projects: &[Project]) -> Table {
    let mut table = Table::new();
    table.load_preset(UTF8_FULL_CONDENSED);
    table.set_header(vec!["Name", "Path", "Tech stack", "Last accessed"]);
    for project in projects {
        table.add_row(vec![
            Cell::new(&project.name),
            Cell::new(&project.absolute_path),
            Cell::new(project.tech_stack.join(", ")),
            Cell::new(
                project
                    .last_accessed_at
                    .map(|t| t.format("%Y-%m-%d %H:%M").to_string())
                    .unwrap_or_else(|| "-".to_string()),
            ),
        ]);
    }
    table
}

pub fn session_table(sessions: &[Session]) -> Table {
    let mut table = Table::new();
    table.load_preset(UTF8_FULL_CONDENSED);
    table.set_header(vec!["Session", "Status", "Started", "Ended", "PID"]);
    for session in sessions {
        table.add_row(vec![
            Cell::new(session.id),
            Cell::new(session.status.as_str()),
            Cell::new(session.started_at.format("%Y-%m-%d %H:%M:%S")),
            Cell::new(
                session
                    .ended_at
                    .map(|t| t.format("%Y-%m-%d %H:%M:%S").to_string())
                    .unwrap_or_else(|| "-".to_string()),
            ),
            Cell::new(
                session
                    .os_process_id
                    .map(|p| p.to_string())
                    .unwrap_or_else(|| "-".to_string()),
            ),
        ]);
    }
    table
}

pub fn activity_table(activities: &[Activity]) -> Table {
    let mut table = Table::new();
    table.load_preset(UTF8_FULL_CONDENSED);
    table.set_header(vec!["Time", "Kind", "Project", "Details"]);
    for activity in activities {
        table.add_row(vec![
            Cell::new(activity.timestamp.format("%Y-%m-%d %H:%M:%S")),
            Cell::new(activity.kind.as_str()),
            Cell::new(activity.project_id),
            Cell::new(activity.details.to_string()),
        ]);
    }
    table
}
