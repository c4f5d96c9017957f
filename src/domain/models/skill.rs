//! Skill plug-in records and manifest validation.
//!
//! A skill is a directory with a `skill.yaml` manifest. The manifest
//! declares commands, optional event hooks, and a permission set; the
//! registry refuses anything that fails validation here.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use uuid::Uuid;

/// Capability grants a skill may request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SkillPermission {
    #[serde(rename = "db:read")]
    DbRead,
    #[serde(rename = "db:write")]
    DbWrite,
    #[serde(rename = "fs:read")]
    FsRead,
    #[serde(rename = "fs:write")]
    FsWrite,
    Exec,
    Network,
    All,
}

impl SkillPermission {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::DbRead => "db:read",
            Self::DbWrite => "db:write",
            Self::FsRead => "fs:read",
            Self::FsWrite => "fs:write",
            Self::Exec => "exec",
            Self::Network => "network",
            Self::All => "all",
        }
    }

    #[allow(clippy::should_implement_trait)]
    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "db:read" => Some(Self::DbRead),
            "db:write" => Some(Self::DbWrite),
            "fs:read" => Some(Self::FsRead),
            "fs:write" => Some(Self::FsWrite),
            "exec" => Some(Self::Exec),
            "network" => Some(Self::Network),
            "all" => Some(Self::All),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SkillSource {
    Builtin,
    External,
}

impl SkillSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Builtin => "builtin",
            Self::External => "external",
        }
    }
}

/// A command declared by a skill manifest.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SkillCommand {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
}

/// Parsed `skill.yaml`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SkillManifest {
    pub name: String,
    pub version: String,
    #[serde(default)]
    pub description: Option<String>,
    pub commands: Vec<SkillCommand>,
    pub permissions: Vec<SkillPermission>,
    /// Event name -> handler identifier
    #[serde(default)]
    pub hooks: HashMap<String, String>,
}

impl SkillManifest {
    /// Validate the manifest contract: lowercase-kebab name (1..=100
    /// chars), three-component numeric version, at least one command, at
    /// least one permission.
    pub fn validate(&self) -> Result<(), String> {
        if self.name.is_empty() || self.name.len() > 100 {
            return Err("skill name must be 1..100 characters".to_string());
        }
        if !is_kebab_case(&self.name) {
            return Err(format!(
                "skill name '{}' must be lowercase kebab-case",
                self.name
            ));
        }
        if !is_semver(&self.version) {
            return Err(format!(
                "skill version '{}' is not a valid semver",
                self.version
            ));
        }
        if self.commands.is_empty() {
            return Err("manifest must declare at least one command".to_string());
        }
        if self.permissions.is_empty() {
            return Err("manifest must declare at least one permission".to_string());
        }
        Ok(())
    }

    pub fn declares_command(&self, name: &str) -> bool {
        self.commands.iter().any(|c| c.name == name)
    }

    pub fn declares_hook(&self, event: &str) -> bool {
        self.hooks.contains_key(event)
    }
}

fn is_kebab_case(s: &str) -> bool {
    !s.starts_with('-')
        && !s.ends_with('-')
        && !s.contains("--")
        && s.chars()
            .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-')
}

fn is_semver(s: &str) -> bool {
    let core = s.split(['-', '+']).next().unwrap_or(s);
    let parts: Vec<&str> = core.split('.').collect();
    parts.len() == 3
        && parts
            .iter()
            .all(|p| !p.is_empty() && p.chars().all(|c| c.is_ascii_digit()))
}

/// Registry record for a loaded (or failed-to-load) skill.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SkillRecord {
    pub id: Uuid,
    pub name: String,
    pub version: String,
    pub source: SkillSource,
    /// Directory containing skill.yaml
    pub path: String,
    pub enabled: bool,
    pub config: serde_json::Value,
    pub loaded_at: Option<DateTime<Utc>>,
    pub error: Option<String>,
    pub manifest: SkillManifest,
}
