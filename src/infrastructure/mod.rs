//! Infrastructure layer: persistence, configuration, logging, process
//! supervision, and socket transport.

pub mod config;
pub mod database;
pub mod ipc;
pub mod logging;
pub mod process;
