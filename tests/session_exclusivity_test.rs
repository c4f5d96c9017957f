//! Session exclusivity over the real daemon socket: one active session
//! per project, stop, and status transitions.

use std::os::unix::fs::PermissionsExt;
use std::path::Path;

use maxclaw::daemon::{Daemon, DaemonPaths};
use maxclaw::domain::models::{Config, Project};
use maxclaw::domain::ports::ProjectRepository;
use maxclaw::infrastructure::database::{DatabaseConnection, ProjectRepositoryImpl};
use maxclaw::infrastructure::ipc::IpcClient;
use serde_json::json;

/// A stand-in coding agent that records its environment and then stays
/// alive until signalled.
fn write_fake_agent(dir: &Path) -> (String, std::path::PathBuf) {
    let env_dump = dir.join("agent-env.txt");
    let path = dir.join("fake-agent.sh");
    std::fs::write(
        &path,
        format!("#!/bin/sh\nenv > {}\nsleep 60\n", env_dump.display()),
    )
    .unwrap();
    std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).unwrap();
    (path.display().to_string(), env_dump)
}

/// Poll for the agent's environment dump.
async fn read_env_dump(path: &Path) -> String {
    for _ in 0..100 {
        if let Ok(contents) = std::fs::read_to_string(path) {
            if !contents.is_empty() {
                return contents;
            }
        }
        tokio::time::sleep(std::time::Duration::from_millis(20)).await;
    }
    panic!("agent never wrote its environment dump");
}

#[tokio::test]
async fn session_start_is_exclusive_per_project() {
    let data_dir = tempfile::tempdir().unwrap();
    let project_dir = tempfile::tempdir().unwrap();

    let (agent_path, env_dump) = write_fake_agent(data_dir.path());
    std::env::set_var("CLAUDE_BINARY", agent_path);
    std::env::set_var("MAXCLAW_SCHEDULER_AUTOSTART", "false");
    std::env::set_var("TEST_MODE", "1");
    // Must not survive the sanitised child environment.
    std::env::set_var("MAXCLAW_LEAK_CANARY", "do-not-forward");

    let paths = DaemonPaths::new(data_dir.path());
    paths.ensure_layout().unwrap();

    // Seed a project before the daemon opens the store.
    let db = DatabaseConnection::new(&paths.database_url()).await.unwrap();
    db.migrate().await.unwrap();
    let projects = ProjectRepositoryImpl::new(db.pool().clone());
    let project = Project::new("demo", project_dir.path().to_str().unwrap());
    projects.create(&project).await.unwrap();
    db.close().await;

    let daemon = Daemon::start(paths.clone(), Config::default()).await.unwrap();

    let mut client = IpcClient::connect(&paths.socket_path()).await.unwrap();
    let params = json!({"projectId": project.id.to_string()});

    // First start succeeds.
    let started = client
        .call("session.start", Some(params.clone()))
        .await
        .unwrap();
    assert_eq!(started["status"], "started");
    let session_id = started["sessionId"].as_str().unwrap().to_string();

    // The child saw a sanitised environment: the session variables are
    // present, the daemon's other variables are not.
    let child_env = read_env_dump(&env_dump).await;
    assert!(child_env.contains(&format!("MAXCLAW_SESSION_ID={session_id}")));
    assert!(child_env.contains("MAXCLAW_PROJECT_ID="));
    assert!(child_env.contains("PATH="));
    assert!(
        !child_env.contains("MAXCLAW_LEAK_CANARY"),
        "daemon environment leaked into the child:\n{child_env}"
    );

    // Second start for the same project is refused.
    let err = client
        .call("session.start", Some(params))
        .await
        .unwrap_err();
    assert!(
        err.to_string().contains("already exists"),
        "unexpected error: {err}"
    );

    // The session is listed as active.
    let listed = client.call("session.list", None).await.unwrap();
    assert_eq!(listed.as_array().unwrap().len(), 1);

    // Stop succeeds and the terminal status is observable.
    let stopped = client
        .call("session.stop", Some(json!({"sessionId": session_id})))
        .await
        .unwrap();
    assert_eq!(stopped["success"], true);

    let status = client
        .call("session.status", Some(json!({"sessionId": session_id})))
        .await
        .unwrap();
    assert_eq!(status["status"], "interrupted");

    // Daemon status reflects the handled session.
    let daemon_status = client.call("daemon.status", None).await.unwrap();
    assert_eq!(daemon_status["running"], true);
    assert_eq!(daemon_status["activeSessions"], 0);
    assert_eq!(daemon_status["totalSessionsHandled"], 1);

    daemon.shutdown().await;
    assert!(!paths.pid_path().exists());
    assert!(!paths.socket_path().exists());
}

#[tokio::test]
async fn second_daemon_refuses_to_start() {
    let data_dir = tempfile::tempdir().unwrap();
    std::env::set_var("MAXCLAW_SCHEDULER_AUTOSTART", "false");

    let paths = DaemonPaths::new(data_dir.path());
    let first = Daemon::start(paths.clone(), Config::default()).await.unwrap();

    let second = Daemon::start(paths.clone(), Config::default()).await;
    assert!(second.is_err(), "second daemon must fail to start");

    first.shutdown().await;
    first.shutdown().await; // idempotent
}

#[tokio::test]
async fn unknown_method_gets_rpc_error() {
    let data_dir = tempfile::tempdir().unwrap();
    std::env::set_var("MAXCLAW_SCHEDULER_AUTOSTART", "false");

    let paths = DaemonPaths::new(data_dir.path());
    let daemon = Daemon::start(paths.clone(), Config::default()).await.unwrap();

    let mut client = IpcClient::connect(&paths.socket_path()).await.unwrap();
    let err = client.call("nope.nothing", None).await.unwrap_err();
    assert!(err.to_string().contains("not found"));

    daemon.shutdown().await;
}
