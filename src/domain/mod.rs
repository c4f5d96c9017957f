//! Domain layer: entities, state machines, error taxonomy, and ports.

pub mod error;
pub mod models;
pub mod ports;

pub use error::{DomainError, DomainResult};
