//! Cross-project code search request and result types.

use serde::{Deserialize, Serialize};

/// How a query string is interpreted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QueryMode {
    /// Query is escaped before compilation
    Literal,
    /// Query is a regular expression
    Regex,
}

impl Default for QueryMode {
    fn default() -> Self {
        Self::Literal
    }
}

/// Options accepted by every search entry point.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchOptions {
    /// Project ids or names to search; all projects when empty
    #[serde(default)]
    pub projects: Vec<String>,
    /// Language filter mapped to a fixed extension table
    #[serde(default)]
    pub language: Option<String>,
    /// Per-project result cap
    #[serde(default = "default_limit")]
    pub limit: usize,
    #[serde(default)]
    pub mode: QueryMode,
    #[serde(default)]
    pub case_sensitive: bool,
    /// Context lines around each match, when requested
    #[serde(default)]
    pub context_lines: Option<usize>,
}

fn default_limit() -> usize {
    50
}

impl Default for SearchOptions {
    fn default() -> Self {
        Self {
            projects: Vec::new(),
            language: None,
            limit: default_limit(),
            mode: QueryMode::default(),
            case_sensitive: false,
            context_lines: None,
        }
    }
}

/// Kind of declaration a symbol hit was classified as.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SymbolType {
    Function,
    Method,
    Class,
    Type,
    Struct,
    Variable,
    Constant,
    Unknown,
}

impl SymbolType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Function => "function",
            Self::Method => "method",
            Self::Class => "class",
            Self::Type => "type",
            Self::Struct => "struct",
            Self::Variable => "variable",
            Self::Constant => "constant",
            Self::Unknown => "unknown",
        }
    }
}

/// One matching line.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchMatch {
    /// Path relative to the project root
    pub file: String,
    pub line: u64,
    pub column: u64,
    pub text: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub context: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub symbol_type: Option<SymbolType>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub symbol_name: Option<String>,
}

/// Matches for one project.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProjectMatches {
    pub project_id: String,
    pub project_name: String,
    pub matches: Vec<SearchMatch>,
    /// True when the per-project limit truncated the results
    pub has_more: bool,
}

/// Full response across all searched projects.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchResponse {
    pub query: String,
    pub results: Vec<ProjectMatches>,
    pub total_matches: usize,
    pub elapsed_ms: u64,
}
