//! Cross-project code search.
//!
//! Each project is searched with the external `rg` binary when available
//! (JSON output), falling back to a recursive walk with a fixed ignore
//! set. Project searches run under a concurrency ceiling and results are
//! cached with a TTL.

use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;
use std::time::{Duration, Instant};

use regex::RegexBuilder;
use serde_json::Value;
use tokio::process::Command;
use tokio::sync::{Mutex, OnceCell, Semaphore};

use crate::domain::error::{DomainError, DomainResult};
use crate::domain::models::{
    Project, ProjectMatches, QueryMode, SearchMatch, SearchOptions, SearchResponse, SymbolType,
};
use crate::domain::ports::ProjectRepository;

/// Directory names never searched by the fallback walker.
pub const IGNORED_DIRS: &[&str] = &[
    "node_modules",
    ".git",
    "dist",
    "build",
    "coverage",
    ".cache",
    ".next",
    "vendor",
    "__pycache__",
    ".venv",
    "venv",
    "target",
    ".idea",
    ".vscode",
];

/// File name patterns never searched.
pub const IGNORED_FILE_PATTERNS: &[&str] = &[
    "*.min.js",
    "*.bundle.js",
    "*.lock",
    "package-lock.json",
    "pnpm-lock.yaml",
    "yarn.lock",
];

/// Default per-project search concurrency.
pub const DEFAULT_CONCURRENCY: usize = 5;
/// Default results-cache TTL.
pub const DEFAULT_CACHE_TTL: Duration = Duration::from_secs(300);

/// Language filter to extension table.
pub fn language_extensions(language: &str) -> Option<&'static [&'static str]> {
    match language.to_lowercase().as_str() {
        "rust" => Some(&["rs"]),
        "typescript" => Some(&["ts", "tsx"]),
        "javascript" => Some(&["js", "jsx", "mjs"]),
        "python" => Some(&["py"]),
        "go" => Some(&["go"]),
        "java" => Some(&["java"]),
        "c" => Some(&["c", "h"]),
        "cpp" | "c++" => Some(&["cpp", "cc", "hpp", "hh"]),
        "ruby" => Some(&["rb"]),
        "php" => Some(&["php"]),
        "shell" => Some(&["sh", "bash"]),
        "yaml" => Some(&["yaml", "yml"]),
        "json" => Some(&["json"]),
        "markdown" => Some(&["md"]),
        _ => None,
    }
}

fn is_ignored_file(name: &str) -> bool {
    IGNORED_FILE_PATTERNS.iter().any(|pattern| {
        pattern
            .strip_prefix('*')
            .map_or(*pattern == name, |suffix| name.ends_with(suffix))
    })
}

struct CacheEntry {
    response: SearchResponse,
    inserted: Instant,
}

/// Search entry points plus the TTL cache.
pub struct SearchEngine {
    projects: Arc<dyn ProjectRepository>,
    semaphore: Arc<Semaphore>,
    cache: Mutex<HashMap<String, CacheEntry>>,
    cache_ttl: Duration,
}

impl SearchEngine {
    pub fn new(projects: Arc<dyn ProjectRepository>) -> Self {
        Self::with_limits(projects, DEFAULT_CONCURRENCY, DEFAULT_CACHE_TTL)
    }

    pub fn with_limits(
        projects: Arc<dyn ProjectRepository>,
        concurrency: usize,
        cache_ttl: Duration,
    ) -> Self {
        Self {
            projects,
            semaphore: Arc::new(Semaphore::new(concurrency.max(1))),
            cache: Mutex::new(HashMap::new()),
            cache_ttl,
        }
    }

    /// Search file contents across projects.
    pub async fn search_code(
        &self,
        query: &str,
        options: &SearchOptions,
    ) -> DomainResult<SearchResponse> {
        if query.is_empty() {
            return Err(DomainError::validation("query cannot be empty"));
        }
        self.cached(query, "code", options, |project, permit| {
            let query = query.to_string();
            let options = options.clone();
            async move {
                let _permit = permit;
                search_project_contents(&project, &query, &options, rg_binary_available().await)
                    .await
            }
        })
        .await
    }

    /// Search file names across projects.
    pub async fn search_files(
        &self,
        pattern: &str,
        options: &SearchOptions,
    ) -> DomainResult<SearchResponse> {
        if pattern.is_empty() {
            return Err(DomainError::validation("pattern cannot be empty"));
        }
        self.cached(pattern, "files", options, |project, permit| {
            let pattern = pattern.to_string();
            let options = options.clone();
            async move {
                let _permit = permit;
                search_project_files(&project, &pattern, &options)
            }
        })
        .await
    }

    /// Search symbol declarations across projects.
    ///
    /// The declaration patterns are deliberately broad and can match call
    /// sites; classification against the typed pattern table compensates.
    pub async fn search_symbols(
        &self,
        symbol: &str,
        options: &SearchOptions,
    ) -> DomainResult<SearchResponse> {
        if symbol.is_empty() {
            return Err(DomainError::validation("symbol cannot be empty"));
        }
        let pattern = symbol_disjunction(symbol);
        let mut symbol_options = options.clone();
        symbol_options.mode = QueryMode::Regex;

        let mut response = self
            .cached(&pattern, "symbols", &symbol_options, |project, permit| {
                let pattern = pattern.clone();
                let options = symbol_options.clone();
                async move {
                    let _permit = permit;
                    search_project_contents(
                        &project,
                        &pattern,
                        &options,
                        rg_binary_available().await,
                    )
                    .await
                }
            })
            .await?;

        for group in &mut response.results {
            for m in &mut group.matches {
                let (symbol_type, symbol_name) = classify_symbol(&m.text, symbol);
                m.symbol_type = Some(symbol_type);
                m.symbol_name = Some(symbol_name);
            }
        }
        response.query = symbol.to_string();
        Ok(response)
    }

    /// Entries currently cached (expired entries included until touched).
    pub async fn cache_size(&self) -> usize {
        self.cache.lock().await.len()
    }

    pub async fn clear_cache(&self) {
        self.cache.lock().await.clear();
    }

    async fn cached<F, Fut>(
        &self,
        query: &str,
        kind: &str,
        options: &SearchOptions,
        search_one: F,
    ) -> DomainResult<SearchResponse>
    where
        F: Fn(Project, tokio::sync::OwnedSemaphorePermit) -> Fut,
        Fut: std::future::Future<Output = DomainResult<(Vec<SearchMatch>, bool)>> + Send + 'static,
    {
        let key = format!("{kind}:{query}:{}", serde_json::to_string(options)?);

        {
            let mut cache = self.cache.lock().await;
            if let Some(entry) = cache.get(&key) {
                if entry.inserted.elapsed() < self.cache_ttl {
                    return Ok(entry.response.clone());
                }
                cache.remove(&key);
            }
        }

        let start = Instant::now();
        let projects = self.resolve_projects(options).await?;

        let mut handles = Vec::with_capacity(projects.len());
        for project in projects {
            let permit = Arc::clone(&self.semaphore)
                .acquire_owned()
                .await
                .expect("semaphore never closed");
            let id = project.id.to_string();
            let name = project.name.clone();
            handles.push((id, name, tokio::spawn(search_one(project, permit))));
        }

        let mut results = Vec::with_capacity(handles.len());
        let mut total_matches = 0;
        for (project_id, project_name, handle) in handles {
            match handle.await {
                Ok(Ok((matches, has_more))) => {
                    total_matches += matches.len();
                    results.push(ProjectMatches {
                        project_id,
                        project_name,
                        matches,
                        has_more,
                    });
                }
                Ok(Err(e)) => {
                    tracing::warn!(project = %project_name, error = %e, "project search failed");
                }
                Err(e) => {
                    tracing::warn!(project = %project_name, error = %e, "search task panicked");
                }
            }
        }

        let response = SearchResponse {
            query: query.to_string(),
            results,
            total_matches,
            elapsed_ms: start.elapsed().as_millis() as u64,
        };

        self.cache.lock().await.insert(
            key,
            CacheEntry {
                response: response.clone(),
                inserted: Instant::now(),
            },
        );
        Ok(response)
    }

    async fn resolve_projects(&self, options: &SearchOptions) -> DomainResult<Vec<Project>> {
        let all = self.projects.list().await?;
        if options.projects.is_empty() {
            return Ok(all);
        }
        let mut selected = Vec::new();
        for wanted in &options.projects {
            let found = all
                .iter()
                .find(|p| p.id.to_string() == *wanted || p.name == *wanted);
            match found {
                Some(project) => selected.push(project.clone()),
                None => tracing::warn!(project = %wanted, "unknown project in search scope"),
            }
        }
        Ok(selected)
    }
}

/// Whether an `rg` binary answers on this machine. Probed once.
async fn rg_binary_available() -> bool {
    static AVAILABLE: OnceCell<bool> = OnceCell::const_new();
    *AVAILABLE
        .get_or_init(|| async {
            Command::new("rg")
                .arg("--version")
                .stdout(std::process::Stdio::null())
                .stderr(std::process::Stdio::null())
                .status()
                .await
                .map(|s| s.success())
                .unwrap_or(false)
        })
        .await
}

async fn search_project_contents(
    project: &Project,
    query: &str,
    options: &SearchOptions,
    use_rg: bool,
) -> DomainResult<(Vec<SearchMatch>, bool)> {
    let root = Path::new(&project.absolute_path);
    if !root.is_dir() {
        return Ok((Vec::new(), false));
    }
    if use_rg {
        rg_search(root, query, options).await
    } else {
        walk_search(root, query, options)
    }
}

async fn rg_search(
    root: &Path,
    query: &str,
    options: &SearchOptions,
) -> DomainResult<(Vec<SearchMatch>, bool)> {
    let mut cmd = Command::new("rg");
    cmd.current_dir(root)
        .arg("--json")
        .arg("--line-number")
        .arg("--column")
        .arg(if options.case_sensitive {
            "--case-sensitive"
        } else {
            "--ignore-case"
        })
        .arg("--max-count")
        .arg((options.limit + 1).to_string());

    if options.mode == QueryMode::Literal {
        cmd.arg("--fixed-strings");
    }
    if let Some(context) = options.context_lines {
        cmd.arg("--context").arg(context.to_string());
    }
    if let Some(extensions) = options.language.as_deref().and_then(language_extensions) {
        for ext in extensions {
            cmd.arg("--glob").arg(format!("*.{ext}"));
        }
    }
    for dir in IGNORED_DIRS {
        cmd.arg("--glob").arg(format!("!**/{dir}/**"));
    }
    for pattern in IGNORED_FILE_PATTERNS {
        cmd.arg("--glob").arg(format!("!{pattern}"));
    }
    cmd.arg("--").arg(query).arg(".");

    let output = cmd.output().await.map_err(|e| {
        DomainError::Operational(format!("failed to invoke rg: {e}"))
    })?;
    // Exit code 1 means no matches; only 2+ is an error.
    if let Some(code) = output.status.code() {
        if code >= 2 {
            return Err(DomainError::Operational(format!(
                "rg failed: {}",
                String::from_utf8_lossy(&output.stderr)
            )));
        }
    }

    let mut matches = Vec::new();
    for line in String::from_utf8_lossy(&output.stdout).lines() {
        let Ok(record) = serde_json::from_str::<Value>(line) else {
            continue;
        };
        match record["type"].as_str() {
            Some("match") => {
                let data = &record["data"];
                let file = data["path"]["text"].as_str().unwrap_or_default();
                let text = data["lines"]["text"]
                    .as_str()
                    .unwrap_or_default()
                    .trim_end_matches('\n');
                let column = data["submatches"][0]["start"].as_u64().unwrap_or(0) + 1;
                matches.push(SearchMatch {
                    file: file.trim_start_matches("./").to_string(),
                    line: data["line_number"].as_u64().unwrap_or(0),
                    column,
                    text: text.to_string(),
                    context: Vec::new(),
                    symbol_type: None,
                    symbol_name: None,
                });
            }
            Some("context") => {
                if let Some(last) = matches.last_mut() {
                    if let Some(text) = record["data"]["lines"]["text"].as_str() {
                        last.context.push(text.trim_end_matches('\n').to_string());
                    }
                }
            }
            _ => {}
        }
    }

    let has_more = matches.len() > options.limit;
    matches.truncate(options.limit);
    Ok((matches, has_more))
}

fn compile_query(query: &str, options: &SearchOptions) -> DomainResult<regex::Regex> {
    let pattern = match options.mode {
        QueryMode::Literal => regex::escape(query),
        QueryMode::Regex => query.to_string(),
    };
    RegexBuilder::new(&pattern)
        .case_insensitive(!options.case_sensitive)
        .build()
        .map_err(|e| DomainError::validation(format!("invalid search pattern: {e}")))
}

fn wanted_extension(path: &Path, options: &SearchOptions) -> bool {
    let Some(extensions) = options.language.as_deref().and_then(language_extensions) else {
        return true;
    };
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|ext| extensions.contains(&ext))
}

fn walk_project(root: &Path) -> impl Iterator<Item = std::path::PathBuf> {
    ignore::WalkBuilder::new(root)
        .standard_filters(false)
        .filter_entry(|entry| {
            let name = entry.file_name().to_string_lossy();
            if entry.file_type().is_some_and(|t| t.is_dir()) {
                return !IGNORED_DIRS.contains(&name.as_ref());
            }
            !is_ignored_file(&name)
        })
        .build()
        .flatten()
        .filter(|entry| entry.file_type().is_some_and(|t| t.is_file()))
        .map(|entry| entry.into_path())
}

fn walk_search(
    root: &Path,
    query: &str,
    options: &SearchOptions,
) -> DomainResult<(Vec<SearchMatch>, bool)> {
    let regex = compile_query(query, options)?;
    let context_lines = options.context_lines.unwrap_or(0);
    let mut matches = Vec::new();
    let mut has_more = false;

    'files: for path in walk_project(root) {
        if !wanted_extension(&path, options) {
            continue;
        }
        let Ok(contents) = std::fs::read_to_string(&path) else {
            continue; // binary or unreadable
        };
        let lines: Vec<&str> = contents.lines().collect();
        for (index, line) in lines.iter().enumerate() {
            let Some(found) = regex.find(line) else {
                continue;
            };
            if matches.len() >= options.limit {
                has_more = true;
                break 'files;
            }
            let context = if context_lines > 0 {
                let from = index.saturating_sub(context_lines);
                let to = (index + context_lines + 1).min(lines.len());
                lines[from..to]
                    .iter()
                    .map(|l| (*l).to_string())
                    .collect()
            } else {
                Vec::new()
            };
            let file = path
                .strip_prefix(root)
                .unwrap_or(&path)
                .display()
                .to_string();
            matches.push(SearchMatch {
                file,
                line: index as u64 + 1,
                column: found.start() as u64 + 1,
                text: (*line).to_string(),
                context,
                symbol_type: None,
                symbol_name: None,
            });
        }
    }

    Ok((matches, has_more))
}

fn search_project_files(
    project: &Project,
    pattern: &str,
    options: &SearchOptions,
) -> DomainResult<(Vec<SearchMatch>, bool)> {
    let root = Path::new(&project.absolute_path);
    if !root.is_dir() {
        return Ok((Vec::new(), false));
    }

    let regex = compile_query(pattern, options)?;
    let mut matches = Vec::new();
    let mut has_more = false;

    for path in walk_project(root) {
        if !wanted_extension(&path, options) {
            continue;
        }
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_default();
        if !regex.is_match(&name) {
            continue;
        }
        if matches.len() >= options.limit {
            has_more = true;
            break;
        }
        let file = path
            .strip_prefix(root)
            .unwrap_or(&path)
            .display()
            .to_string();
        matches.push(SearchMatch {
            file: file.clone(),
            line: 0,
            column: 0,
            text: file,
            context: Vec::new(),
            symbol_type: None,
            symbol_name: None,
        });
    }

    Ok((matches, has_more))
}

/// Broad declaration-pattern disjunction for a symbol name.
fn symbol_disjunction(symbol: &str) -> String {
    let s = regex::escape(symbol);
    format!(
        "(?:function|fn|func|def)\\s+{s}\\b\
         |class\\s+{s}\\b\
         |(?:type|interface|enum|trait)\\s+{s}\\b\
         |struct\\s+{s}\\b\
         |(?:const|static|final)\\s+(?:[A-Za-z_][A-Za-z0-9_<>\\[\\]]*\\s+)?{s}\\b\
         |(?:let|var|val)\\s+(?:mut\\s+)?{s}\\b\
         |{s}\\s*[:=]\\s*(?:async\\s+)?(?:function\\b|\\()"
    )
}

/// Classify a matched line against the typed pattern table.
fn classify_symbol(line: &str, symbol: &str) -> (SymbolType, String) {
    let s = regex::escape(symbol);
    let table: &[(SymbolType, String)] = &[
        (
            SymbolType::Function,
            format!("(?:function|fn|func|def)\\s+{s}\\b"),
        ),
        (SymbolType::Class, format!("class\\s+{s}\\b")),
        (SymbolType::Struct, format!("struct\\s+{s}\\b")),
        (
            SymbolType::Type,
            format!("(?:type|interface|enum|trait)\\s+{s}\\b"),
        ),
        (
            SymbolType::Constant,
            format!("(?:const|static|final)\\s+(?:[A-Za-z_][A-Za-z0-9_<>\\[\\]]*\\s+)?{s}\\b"),
        ),
        (
            SymbolType::Variable,
            format!("(?:let|var|val)\\s+(?:mut\\s+)?{s}\\b"),
        ),
        (
            SymbolType::Method,
            format!("{s}\\s*[:=]\\s*(?:async\\s+)?(?:function\\b|\\()"),
        ),
    ];

    for (symbol_type, pattern) in table {
        if regex::Regex::new(pattern)
            .map(|r| r.is_match(line))
            .unwrap_or(false)
        {
            return (*symbol_type, symbol.to_string());
        }
    }
    (SymbolType::Unknown, symbol.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::database::{DatabaseConnection, ProjectRepositoryImpl};

    async fn engine_with_project(
        files: &[(&str, &str)],
    ) -> (SearchEngine, tempfile::TempDir, Project) {
        let dir = tempfile::tempdir().unwrap();
        for (name, contents) in files {
            let path = dir.path().join(name);
            if let Some(parent) = path.parent() {
                std::fs::create_dir_all(parent).unwrap();
            }
            std::fs::write(path, contents).unwrap();
        }

        let db = DatabaseConnection::new("sqlite::memory:").await.unwrap();
        db.migrate().await.unwrap();
        let repo = ProjectRepositoryImpl::new(db.pool().clone());
        let project = Project::new("demo", dir.path().to_str().unwrap());
        crate::domain::ports::ProjectRepository::create(&repo, &project)
            .await
            .unwrap();

        let engine = SearchEngine::new(Arc::new(repo));
        (engine, dir, project)
    }

    #[tokio::test]
    async fn test_search_code_finds_matches() {
        let (engine, _dir, _project) = engine_with_project(&[
            ("src/main.rs", "fn main() {\n    handle_request();\n}\n"),
            ("src/lib.rs", "pub fn handle_request() {}\n"),
        ])
        .await;

        let response = engine
            .search_code("handle_request", &SearchOptions::default())
            .await
            .unwrap();
        assert_eq!(response.total_matches, 2);
        assert_eq!(response.results.len(), 1);
        assert!(!response.results[0].has_more);
    }

    #[tokio::test]
    async fn test_per_project_limit_sets_has_more() {
        let body = "needle\n".repeat(10);
        let (engine, _dir, _project) =
            engine_with_project(&[("data.txt", body.as_str())]).await;

        let options = SearchOptions {
            limit: 3,
            ..Default::default()
        };
        let response = engine.search_code("needle", &options).await.unwrap();
        assert_eq!(response.results[0].matches.len(), 3);
        assert!(response.results[0].has_more);
    }

    #[tokio::test]
    async fn test_ignored_dirs_are_skipped() {
        let (engine, _dir, _project) = engine_with_project(&[
            ("src/ok.js", "secret_token\n"),
            ("node_modules/dep/index.js", "secret_token\n"),
            ("target/debug/out.rs", "secret_token\n"),
        ])
        .await;

        let response = engine
            .search_code("secret_token", &SearchOptions::default())
            .await
            .unwrap();
        assert_eq!(response.total_matches, 1);
        assert!(response.results[0].matches[0].file.contains("ok.js"));
    }

    #[tokio::test]
    async fn test_ignored_file_patterns() {
        let (engine, _dir, _project) = engine_with_project(&[
            ("app.js", "marker\n"),
            ("app.min.js", "marker\n"),
            ("yarn.lock", "marker\n"),
        ])
        .await;

        let response = engine
            .search_code("marker", &SearchOptions::default())
            .await
            .unwrap();
        assert_eq!(response.total_matches, 1);
    }

    #[tokio::test]
    async fn test_language_filter() {
        let (engine, _dir, _project) = engine_with_project(&[
            ("a.rs", "let shared = 1;\n"),
            ("b.py", "shared = 1\n"),
        ])
        .await;

        let options = SearchOptions {
            language: Some("rust".into()),
            ..Default::default()
        };
        let response = engine.search_code("shared", &options).await.unwrap();
        assert_eq!(response.total_matches, 1);
        assert!(response.results[0].matches[0].file.ends_with("a.rs"));
    }

    #[tokio::test]
    async fn test_case_sensitivity_modes() {
        let (engine, _dir, _project) =
            engine_with_project(&[("a.txt", "Needle\nneedle\n")]).await;

        let insensitive = engine
            .search_code("needle", &SearchOptions::default())
            .await
            .unwrap();
        assert_eq!(insensitive.total_matches, 2);

        let sensitive = engine
            .search_code(
                "needle",
                &SearchOptions {
                    case_sensitive: true,
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(sensitive.total_matches, 1);
    }

    #[tokio::test]
    async fn test_literal_mode_escapes_regex_metacharacters() {
        let (engine, _dir, _project) =
            engine_with_project(&[("a.txt", "value = f(x)\nvalue = fx\n")]).await;

        let response = engine
            .search_code("f(x)", &SearchOptions::default())
            .await
            .unwrap();
        assert_eq!(response.total_matches, 1);
    }

    #[tokio::test]
    async fn test_cache_hits_are_bit_exact_and_clearable() {
        let (engine, _dir, _project) =
            engine_with_project(&[("a.txt", "cached\n")]).await;

        assert_eq!(engine.cache_size().await, 0);
        let first = engine
            .search_code("cached", &SearchOptions::default())
            .await
            .unwrap();
        assert_eq!(engine.cache_size().await, 1);

        let second = engine
            .search_code("cached", &SearchOptions::default())
            .await
            .unwrap();
        assert_eq!(first, second, "cache hit must be bit-exact");

        engine.clear_cache().await;
        assert_eq!(engine.cache_size().await, 0);
    }

    #[tokio::test]
    async fn test_expired_entries_removed_on_access() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("a.txt"), "x\n").unwrap();
        let db = DatabaseConnection::new("sqlite::memory:").await.unwrap();
        db.migrate().await.unwrap();
        let repo = ProjectRepositoryImpl::new(db.pool().clone());
        let project = Project::new("demo", dir.path().to_str().unwrap());
        crate::domain::ports::ProjectRepository::create(&repo, &project)
            .await
            .unwrap();

        let engine =
            SearchEngine::with_limits(Arc::new(repo), 2, Duration::from_millis(10));
        engine.search_code("x", &SearchOptions::default()).await.unwrap();
        tokio::time::sleep(Duration::from_millis(30)).await;
        // Expired entry is evicted and replaced by a fresh search.
        engine.search_code("x", &SearchOptions::default()).await.unwrap();
        assert_eq!(engine.cache_size().await, 1);
    }

    #[tokio::test]
    async fn test_search_files_by_name() {
        let (engine, _dir, _project) = engine_with_project(&[
            ("src/user_service.rs", ""),
            ("src/order_service.rs", ""),
            ("README.md", ""),
        ])
        .await;

        let response = engine
            .search_files("service", &SearchOptions::default())
            .await
            .unwrap();
        assert_eq!(response.total_matches, 2);
        for m in &response.results[0].matches {
            assert_eq!(m.line, 0);
            assert!(m.file.contains("service"));
        }
    }

    #[tokio::test]
    async fn test_search_symbols_classifies_declarations() {
        let (engine, _dir, _project) = engine_with_project(&[
            (
                "code.rs",
                "fn process() {}\nstruct process {}\nlet process = 1;\n",
            ),
            ("code.js", "class process {}\nconst process = () => {};\n"),
        ])
        .await;

        let response = engine
            .search_symbols("process", &SearchOptions::default())
            .await
            .unwrap();
        assert!(response.total_matches >= 4);

        let types: Vec<SymbolType> = response.results[0]
            .matches
            .iter()
            .filter_map(|m| m.symbol_type)
            .collect();
        assert!(types.contains(&SymbolType::Function));
        assert!(types.contains(&SymbolType::Struct));
        assert!(types.contains(&SymbolType::Class));
    }

    #[test]
    fn test_classify_table_order() {
        assert_eq!(
            classify_symbol("fn run()", "run").0,
            SymbolType::Function
        );
        assert_eq!(classify_symbol("class Run {", "Run").0, SymbolType::Class);
        assert_eq!(
            classify_symbol("struct Run {", "Run").0,
            SymbolType::Struct
        );
        assert_eq!(
            classify_symbol("interface Run {", "Run").0,
            SymbolType::Type
        );
        assert_eq!(
            classify_symbol("const RUN = 3", "RUN").0,
            SymbolType::Constant
        );
        assert_eq!(
            classify_symbol("let run = 3", "run").0,
            SymbolType::Variable
        );
        assert_eq!(
            classify_symbol("run: function() {", "run").0,
            SymbolType::Method
        );
        assert_eq!(
            classify_symbol("some.run(arg)", "run").0,
            SymbolType::Unknown
        );
    }

    #[test]
    fn test_ignored_file_matcher() {
        assert!(is_ignored_file("app.min.js"));
        assert!(is_ignored_file("vendor.bundle.js"));
        assert!(is_ignored_file("Cargo.lock"));
        assert!(is_ignored_file("package-lock.json"));
        assert!(!is_ignored_file("app.js"));
    }

    #[tokio::test]
    async fn test_project_scoping_by_name() {
        let dir_a = tempfile::tempdir().unwrap();
        let dir_b = tempfile::tempdir().unwrap();
        std::fs::write(dir_a.path().join("a.txt"), "shared\n").unwrap();
        std::fs::write(dir_b.path().join("b.txt"), "shared\n").unwrap();

        let db = DatabaseConnection::new("sqlite::memory:").await.unwrap();
        db.migrate().await.unwrap();
        let repo = ProjectRepositoryImpl::new(db.pool().clone());
        let project_a = Project::new("alpha", dir_a.path().to_str().unwrap());
        let project_b = Project::new("beta", dir_b.path().to_str().unwrap());
        crate::domain::ports::ProjectRepository::create(&repo, &project_a)
            .await
            .unwrap();
        crate::domain::ports::ProjectRepository::create(&repo, &project_b)
            .await
            .unwrap();

        let engine = SearchEngine::new(Arc::new(repo));
        let scoped = engine
            .search_code(
                "shared",
                &SearchOptions {
                    projects: vec!["alpha".to_string()],
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(scoped.results.len(), 1);
        assert_eq!(scoped.results[0].project_name, "alpha");

        let all = engine
            .search_code("shared", &SearchOptions::default())
            .await
            .unwrap();
        assert_eq!(all.results.len(), 2);
    }
}
