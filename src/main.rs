//! MaxClaw CLI entry point.

use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;

use maxclaw::cli::{commands, Cli, Commands, DaemonCommands};
use maxclaw::daemon::DaemonPaths;
use maxclaw::domain::ports::{ActivityRepository, ProjectRepository, SessionRepository};
use maxclaw::infrastructure::config::{resolve_data_dir, ConfigLoader};
use maxclaw::infrastructure::database::{
    ActivityRepositoryImpl, DatabaseConnection, ProjectRepositoryImpl, SessionRepositoryImpl,
};
use maxclaw::infrastructure::logging::{self, LogFormat};
use maxclaw::services::DiscoveryService;

#[tokio::main]
async fn main() {
    if let Err(e) = run().await {
        eprintln!("error: {e:#}");
        std::process::exit(1);
    }
}

async fn run() -> Result<()> {
    let cli = Cli::parse();

    // Resolve the data directory before anything else: the config file
    // lives inside it, and its dataDir key may move everything.
    let default_dir = resolve_data_dir(None);
    let mut config = ConfigLoader::load(&default_dir).context("failed to load configuration")?;
    let data_dir = resolve_data_dir(Some(&config.data_dir));
    let paths = DaemonPaths::new(&data_dir);

    // The daemon logs structured; one-shot commands stay quiet unless
    // RUST_LOG says otherwise.
    let _log_guard = if matches!(cli.command, Commands::Daemon(DaemonCommands::Run)) {
        logging::init(LogFormat::Pretty, None)?
    } else {
        None
    };

    match cli.command {
        Commands::Daemon(DaemonCommands::Run) => {
            commands::daemon::handle_run(paths, config).await?;
        }
        Commands::Daemon(DaemonCommands::Stop) => {
            commands::daemon::handle_stop(&paths.socket_path()).await?;
        }
        Commands::Daemon(DaemonCommands::Status) | Commands::Status => {
            commands::daemon::handle_status(&paths.socket_path(), cli.json).await?;
        }
        Commands::Config {
            add_path,
            remove_path,
        } => {
            commands::config::handle_config(
                &mut config,
                &paths.config_path(),
                add_path,
                remove_path,
                cli.json,
            )?;
        }
        command => {
            // Everything else needs the store.
            paths.ensure_layout()?;
            let db = DatabaseConnection::new(&paths.database_url())
                .await
                .context("failed to open store")?;
            db.migrate().await.context("failed to migrate store")?;

            let projects: Arc<dyn ProjectRepository> =
                Arc::new(ProjectRepositoryImpl::new(db.pool().clone()));
            let sessions: Arc<dyn SessionRepository> =
                Arc::new(SessionRepositoryImpl::new(db.pool().clone()));
            let activities: Arc<dyn ActivityRepository> =
                Arc::new(ActivityRepositoryImpl::new(db.pool().clone()));
            let discovery = DiscoveryService::new(Arc::clone(&projects), Arc::clone(&activities));

            match command {
                Commands::List => {
                    commands::projects::handle_list(&projects, cli.json).await?;
                }
                Commands::Discover { path } => {
                    commands::projects::handle_discover(&discovery, &path, cli.json).await?;
                }
                Commands::Add { path, name } => {
                    commands::projects::handle_add(&discovery, &path, name, cli.json).await?;
                }
                Commands::Remove { project } => {
                    commands::projects::handle_remove(&projects, &activities, &project).await?;
                }
                Commands::History { project } => {
                    commands::projects::handle_history(&projects, &sessions, &project, cli.json)
                        .await?;
                }
                Commands::Activity { project } => {
                    commands::projects::handle_activity(
                        &projects,
                        &activities,
                        project.as_deref(),
                        cli.json,
                    )
                    .await?;
                }
                Commands::Start { project } => {
                    commands::session::handle_start(
                        &projects,
                        &paths.socket_path(),
                        &project,
                        cli.json,
                    )
                    .await?;
                }
                _ => unreachable!("handled above"),
            }

            db.close().await;
        }
    }

    Ok(())
}
