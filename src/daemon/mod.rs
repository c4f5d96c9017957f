//! Daemon coordinator, session lifecycle, RPC handlers, and data-dir
//! layout.

pub mod coordinator;
pub mod handlers;
pub mod paths;
pub mod sessions;

pub use coordinator::Daemon;
pub use paths::{read_pid_file, DaemonPaths};
pub use sessions::{RecoveryReport, SessionService};
