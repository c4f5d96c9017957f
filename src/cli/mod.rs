//! Command-line interface.

pub mod commands;
pub mod output;

use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(
    name = "maxclaw",
    version,
    about = "Multi-project AI coding-session orchestrator"
)]
pub struct Cli {
    /// Emit machine-readable JSON instead of tables
    #[arg(long, global = true)]
    pub json: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// List known projects
    List,
    /// Walk a directory and register the projects found in it
    Discover {
        /// Root directory to scan
        path: String,
    },
    /// Register a single directory as a project
    Add {
        path: String,
        /// Project name (directory name when omitted)
        #[arg(long)]
        name: Option<String>,
    },
    /// Remove a project and everything attached to it
    Remove {
        /// Project id, name, or path
        project: String,
    },
    /// Show daemon status
    Status,
    /// Show session history for a project
    History {
        /// Project id, name, or path
        project: String,
    },
    /// Show the activity log
    Activity {
        /// Project id, name, or path; all projects when omitted
        project: Option<String>,
    },
    /// Show or edit configuration
    Config {
        /// Add a discovery scan path
        #[arg(long = "add-path")]
        add_path: Option<String>,
        /// Remove a discovery scan path
        #[arg(long = "remove-path")]
        remove_path: Option<String>,
    },
    /// Start a coding-agent session for a project
    Start {
        /// Project id, name, or path
        project: String,
    },
    /// Daemon lifecycle
    #[command(subcommand)]
    Daemon(DaemonCommands),
}

#[derive(Subcommand)]
pub enum DaemonCommands {
    /// Run the daemon in the foreground
    Run,
    /// Ask a running daemon to stop
    Stop,
    /// Show daemon status
    Status,
}
