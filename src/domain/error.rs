//! Error taxonomy shared across services and the daemon.
//!
//! Kinds map to how an error is handled: Validation/NotFound/Conflict are
//! reported to the caller, Transient errors are retried, Operational errors
//! are logged and notified, Fatal errors abort daemon startup.

use thiserror::Error;

/// Core error type for domain and service operations.
#[derive(Debug, Error)]
pub enum DomainError {
    /// Bad input: unknown project, bad cron expression, capacity out of
    /// range, malformed manifest. Reported to the caller.
    #[error("validation error: {0}")]
    Validation(String),

    /// Referenced entity does not exist.
    #[error("not found: {0}")]
    NotFound(String),

    /// Uniqueness or state guard violated (duplicate project, active
    /// session exists, duplicate agent id).
    #[error("conflict: {0}")]
    Conflict(String),

    /// Retryable transport failure (HTTP >= 500, 429, connection errors).
    #[error("transient error: {0}")]
    Transient(String),

    /// Persistent external failure. Logged and surfaced via notification;
    /// never crashes the daemon.
    #[error("operational error: {0}")]
    Operational(String),

    /// Invariants cannot be maintained (daemon already running, store
    /// corruption, PID file unwritable). Only valid during startup.
    #[error("fatal: {0}")]
    Fatal(String),

    /// Request/response correlation expired before a reply arrived.
    #[error("timed out after {0} ms")]
    Timeout(u64),

    #[error(transparent)]
    Database(#[from] sqlx::Error),

    #[error(transparent)]
    Serialization(#[from] serde_json::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

pub type DomainResult<T> = Result<T, DomainError>;

impl DomainError {
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::NotFound(msg.into())
    }

    pub fn conflict(msg: impl Into<String>) -> Self {
        Self::Conflict(msg.into())
    }

    /// Whether a retry may succeed.
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Transient(_) | Self::Timeout(_))
    }

    /// Whether this error is reported to the caller rather than logged as
    /// an incident.
    pub fn is_caller_fault(&self) -> bool {
        matches!(
            self,
            Self::Validation(_) | Self::NotFound(_) | Self::Conflict(_)
        )
    }
}
