//! Session commands routed through the daemon socket.

use std::path::Path;
use std::sync::Arc;

use anyhow::{bail, Result};
use serde_json::json;

use super::resolve_project;
use crate::cli::output;
use crate::domain::ports::ProjectRepository;
use crate::infrastructure::ipc::IpcClient;

pub async fn handle_start(
    projects: &Arc<dyn ProjectRepository>,
    socket_path: &Path,
    reference: &str,
    json: bool,
) -> Result<()> {
    let project = resolve_project(projects, reference).await?;

    let mut client = match IpcClient::connect(socket_path).await {
        Ok(client) => client,
        Err(_) => bail!("daemon is not running; start it with `maxclaw daemon run`"),
    };
    let result = client
        .call(
            "session.start",
            Some(json!({"projectId": project.id.to_string()})),
        )
        .await?;

    if json {
        output::print_json(&result);
    } else {
        println!(
            "Started session {} for {}",
            result["sessionId"].as_str().unwrap_or("?"),
            project.name
        );
    }
    Ok(())
}
