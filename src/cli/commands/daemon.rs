//! Daemon lifecycle commands.

use std::path::Path;

use anyhow::Result;

use crate::cli::output;
use crate::daemon::{Daemon, DaemonPaths};
use crate::domain::models::Config;
use crate::infrastructure::ipc::IpcClient;

pub async fn handle_run(paths: DaemonPaths, config: Config) -> Result<()> {
    let daemon = Daemon::start(paths, config).await?;
    daemon.run_until_shutdown().await?;
    Ok(())
}

pub async fn handle_stop(socket_path: &Path) -> Result<()> {
    let mut client = IpcClient::connect(socket_path).await?;
    client.call("daemon.stop", None).await?;
    println!("Daemon stopping.");
    Ok(())
}

pub async fn handle_status(socket_path: &Path, json: bool) -> Result<()> {
    match IpcClient::connect(socket_path).await {
        Ok(mut client) => {
            let status = client.call("daemon.status", None).await?;
            if json {
                output::print_json(&status);
            } else {
                println!(
                    "Daemon running (pid {}), up {}s, {} active session(s), {} handled",
                    status["osProcessId"],
                    status["uptimeSeconds"],
                    status["activeSessions"],
                    status["totalSessionsHandled"],
                );
            }
        }
        Err(_) => {
            if json {
                output::print_json(&serde_json::json!({"running": false}));
            } else {
                println!("Daemon is not running.");
            }
        }
    }
    Ok(())
}
