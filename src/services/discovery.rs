//! Project discovery: directory walking and marker-file detection.

use std::path::Path;
use std::sync::Arc;

use serde_json::{json, Value};

use crate::domain::error::DomainResult;
use crate::domain::models::{Activity, ActivityKind, Project};
use crate::domain::ports::{ActivityRepository, ProjectRepository};

/// Directories discovery never descends into.
const SKIPPED_DIRS: &[&str] = &["node_modules", "target", "dist", "build"];

/// How deep discovery walks below each scan root.
pub const DEFAULT_MAX_DEPTH: usize = 3;

/// package.json dependency names that add a tech-stack tag.
const PACKAGE_TAGS: &[(&str, &str)] = &[
    ("react", "React"),
    ("vue", "Vue"),
    ("angular", "Angular"),
    ("next", "Next.js"),
    ("nuxt", "Nuxt"),
    ("typescript", "TypeScript"),
    ("tsx", "TSX"),
    ("express", "Express"),
    ("@nestjs/core", "NestJS"),
    ("prisma", "Prisma"),
    ("tailwindcss", "Tailwind CSS"),
];

/// Inspect a directory for project marker files. Returns the detected
/// tech-stack tags, or None when the directory is not a project root.
pub fn detect_project(dir: &Path) -> Option<Vec<String>> {
    let mut tags = Vec::new();

    if dir.join(".git").is_dir() {
        tags.push("Git".to_string());
    }
    if dir.join("package.json").is_file() {
        tags.push("Node.js".to_string());
        tags.extend(package_json_tags(&dir.join("package.json")));
    }
    if dir.join("Cargo.toml").is_file() {
        tags.push("Rust".to_string());
    }
    if dir.join("pyproject.toml").is_file()
        || dir.join("setup.py").is_file()
        || dir.join("requirements.txt").is_file()
    {
        tags.push("Python".to_string());
    }
    if dir.join("go.mod").is_file() {
        tags.push("Go".to_string());
    }
    if dir.join("Dockerfile").is_file() || dir.join("docker-compose.yml").is_file() {
        tags.push("Docker".to_string());
    }

    if tags.is_empty() {
        None
    } else {
        Some(tags)
    }
}

/// Whether the project carries agent memory instructions.
pub fn has_memory_file(dir: &Path) -> bool {
    dir.join("CLAUDE.md").is_file()
}

fn package_json_tags(path: &Path) -> Vec<String> {
    let Ok(raw) = std::fs::read_to_string(path) else {
        return Vec::new();
    };
    let Ok(parsed) = serde_json::from_str::<Value>(&raw) else {
        return Vec::new();
    };

    let mut tags = Vec::new();
    for section in ["dependencies", "devDependencies"] {
        if let Some(deps) = parsed[section].as_object() {
            for (tag_dep, tag) in PACKAGE_TAGS {
                if deps.contains_key(*tag_dep) && !tags.contains(&(*tag).to_string()) {
                    tags.push((*tag).to_string());
                }
            }
        }
    }
    tags
}

/// A project root found by a walk.
#[derive(Debug, Clone, PartialEq)]
pub struct DiscoveredProject {
    pub name: String,
    pub absolute_path: String,
    pub tech_stack: Vec<String>,
}

/// Walk a root and collect project directories.
///
/// Skips `node_modules`, `target`, `dist`, `build`, and dot-directories,
/// and does not descend into a directory already identified as a project.
pub fn scan(root: &Path, max_depth: usize) -> Vec<DiscoveredProject> {
    let mut found = Vec::new();
    scan_dir(root, 1, max_depth, &mut found);
    found.sort_by(|a, b| a.absolute_path.cmp(&b.absolute_path));
    found
}

fn scan_dir(dir: &Path, depth: usize, max_depth: usize, found: &mut Vec<DiscoveredProject>) {
    if depth > max_depth {
        return;
    }
    let Ok(entries) = std::fs::read_dir(dir) else {
        return;
    };

    for entry in entries.flatten() {
        let path = entry.path();
        if !path.is_dir() {
            continue;
        }
        let name = entry.file_name().to_string_lossy().to_string();
        if name.starts_with('.') || SKIPPED_DIRS.contains(&name.as_str()) {
            continue;
        }

        if let Some(tech_stack) = detect_project(&path) {
            found.push(DiscoveredProject {
                name,
                absolute_path: path.display().to_string(),
                tech_stack,
            });
            // Project roots terminate the walk on this branch.
            continue;
        }

        scan_dir(&path, depth + 1, max_depth, found);
    }
}

/// Registers discovered projects in the store.
pub struct DiscoveryService {
    projects: Arc<dyn ProjectRepository>,
    activities: Arc<dyn ActivityRepository>,
}

impl DiscoveryService {
    pub fn new(
        projects: Arc<dyn ProjectRepository>,
        activities: Arc<dyn ActivityRepository>,
    ) -> Self {
        Self {
            projects,
            activities,
        }
    }

    /// Scan a root and persist any projects not yet known. Returns the
    /// projects added by this call.
    pub async fn discover(&self, root: &Path) -> DomainResult<Vec<Project>> {
        let mut added = Vec::new();
        for discovered in scan(root, DEFAULT_MAX_DEPTH) {
            if self
                .projects
                .get_by_path(&discovered.absolute_path)
                .await?
                .is_some()
            {
                continue;
            }

            let path = Path::new(&discovered.absolute_path);
            let mut project = Project::new(&discovered.name, &discovered.absolute_path);
            project.tech_stack = discovered.tech_stack;
            self.projects.create(&project).await?;
            self.activities
                .append(
                    &Activity::new(project.id, ActivityKind::Discover).with_details(json!({
                        "root": root.display().to_string(),
                        "hasMemory": has_memory_file(path),
                    })),
                )
                .await?;
            added.push(project);
        }
        Ok(added)
    }

    /// Register a single directory as a project, detecting its stack.
    pub async fn add(&self, path: &Path, name: Option<String>) -> DomainResult<Project> {
        let tech_stack = detect_project(path).unwrap_or_default();
        let project_name = name.unwrap_or_else(|| {
            path.file_name()
                .map(|n| n.to_string_lossy().to_string())
                .unwrap_or_else(|| path.display().to_string())
        });

        let mut project = Project::new(project_name, path.display().to_string());
        project.tech_stack = tech_stack;
        self.projects.create(&project).await?;
        self.activities
            .append(&Activity::new(project.id, ActivityKind::Add))
            .await?;
        Ok(project)
    }
}
