//! Daemon configuration model.
//!
//! Mirrors the YAML layout of `~/.maxclaw/config.yaml`. Keys are camelCase
//! on disk; `~` in paths is expanded by the loader.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Config {
    /// Roots walked by project discovery
    pub scan_paths: Vec<String>,
    pub default_options: DefaultOptions,
    /// Overrides the data root (`~/.maxclaw`)
    pub data_dir: String,
    pub ai: AiConfig,
    pub multiplex: MultiplexConfig,
    pub tui: TuiConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            scan_paths: vec![
                "~/projects".to_string(),
                "~/workspace".to_string(),
                "~/code".to_string(),
                "~/src".to_string(),
            ],
            default_options: DefaultOptions::default(),
            data_dir: "~/.maxclaw".to_string(),
            ai: AiConfig::default(),
            multiplex: MultiplexConfig::default(),
            tui: TuiConfig::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct DefaultOptions {
    /// Max child runtime hint, milliseconds
    pub timeout: u64,
}

impl Default for DefaultOptions {
    fn default() -> Self {
        Self { timeout: 300_000 }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct AiConfig {
    pub summary_enabled: bool,
    pub summary_model: String,
    /// Overrides ANTHROPIC_API_KEY when set
    pub api_key: Option<String>,
}

impl Default for AiConfig {
    fn default() -> Self {
        Self {
            summary_enabled: true,
            summary_model: "claude-3-sonnet-20240229".to_string(),
            api_key: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct MultiplexConfig {
    /// Global concurrent session cap
    pub max_sessions: usize,
    pub max_sessions_per_project: usize,
}

impl Default for MultiplexConfig {
    fn default() -> Self {
        Self {
            max_sessions: 5,
            max_sessions_per_project: 2,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct TuiConfig {
    /// UI refresh hint, milliseconds
    pub refresh_interval: u64,
}

impl Default for TuiConfig {
    fn default() -> Self {
        Self {
            refresh_interval: 3000,
        }
    }
}
