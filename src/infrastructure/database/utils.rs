//! Row conversion helpers shared by the repositories.

use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::domain::error::{DomainError, DomainResult};

/// Parse an RFC 3339 TEXT column.
pub fn parse_datetime(s: &str) -> DomainResult<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| DomainError::Operational(format!("invalid timestamp '{s}': {e}")))
}

/// Parse an optional RFC 3339 TEXT column.
pub fn parse_datetime_opt(s: Option<&str>) -> DomainResult<Option<DateTime<Utc>>> {
    s.map(parse_datetime).transpose()
}

/// Parse a UUID TEXT column.
pub fn parse_uuid(s: &str) -> DomainResult<Uuid> {
    Uuid::parse_str(s).map_err(|e| DomainError::Operational(format!("invalid UUID '{s}': {e}")))
}

pub fn parse_uuid_opt(s: Option<&str>) -> DomainResult<Option<Uuid>> {
    s.map(parse_uuid).transpose()
}

/// Deserialize a JSON TEXT column into a typed value.
pub fn parse_json<T: serde::de::DeserializeOwned>(s: &str) -> DomainResult<T> {
    serde_json::from_str(s)
        .map_err(|e| DomainError::Operational(format!("invalid JSON column: {e}")))
}

/// Serialize a value into a JSON TEXT column.
pub fn to_json<T: serde::Serialize>(value: &T) -> DomainResult<String> {
    serde_json::to_string(value)
        .map_err(|e| DomainError::Operational(format!("failed to serialize column: {e}")))
}

/// Map a sqlx error, converting unique-constraint violations to Conflict.
pub fn map_insert_err(e: sqlx::Error, what: &str) -> DomainError {
    if let sqlx::Error::Database(ref db) = e {
        if db.is_unique_violation() {
            return DomainError::conflict(format!("{what} already exists"));
        }
    }
    DomainError::Database(e)
}
