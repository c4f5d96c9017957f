//! MaxClaw - multi-project AI coding-session orchestrator.
//!
//! A local background daemon that discovers software projects, supervises
//! coding-agent child processes under concurrency caps, runs cron-driven
//! maintenance tasks, routes work between cooperating agents over an
//! in-process message bus, and searches code across the whole corpus.

pub mod cli;
pub mod daemon;
pub mod domain;
pub mod infrastructure;
pub mod services;

pub use infrastructure::database::DatabaseConnection;
