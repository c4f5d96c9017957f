//! Configuration loading and path resolution.

pub mod loader;

pub use loader::{expand_tilde, resolve_data_dir, ConfigError, ConfigLoader};
