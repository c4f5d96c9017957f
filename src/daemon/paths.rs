//! Well-known file locations under the per-user data directory.

use std::path::{Path, PathBuf};

/// Layout of `~/.maxclaw` (or the configured data root).
#[derive(Debug, Clone)]
pub struct DaemonPaths {
    pub data_dir: PathBuf,
}

impl DaemonPaths {
    pub fn new(data_dir: impl Into<PathBuf>) -> Self {
        Self {
            data_dir: data_dir.into(),
        }
    }

    pub fn db_path(&self) -> PathBuf {
        self.data_dir.join("data.db")
    }

    pub fn database_url(&self) -> String {
        format!("sqlite:{}", self.db_path().display())
    }

    pub fn config_path(&self) -> PathBuf {
        self.data_dir.join("config.yaml")
    }

    pub fn pid_path(&self) -> PathBuf {
        self.data_dir.join("daemon.pid")
    }

    pub fn socket_path(&self) -> PathBuf {
        self.data_dir.join("daemon.sock")
    }

    pub fn backups_dir(&self) -> PathBuf {
        self.data_dir.join("backups")
    }

    pub fn skills_dir(&self) -> PathBuf {
        self.data_dir.join("skills")
    }

    pub fn project_memory_path(&self, project_id: &str) -> PathBuf {
        self.data_dir
            .join("projects")
            .join(project_id)
            .join("CLAUDE.md")
    }

    pub fn ensure_layout(&self) -> std::io::Result<()> {
        std::fs::create_dir_all(&self.data_dir)?;
        std::fs::create_dir_all(self.backups_dir())?;
        std::fs::create_dir_all(self.skills_dir())?;
        Ok(())
    }
}

/// Read a PID file: a single decimal integer.
pub fn read_pid_file(path: &Path) -> Option<u32> {
    std::fs::read_to_string(path)
        .ok()
        .and_then(|raw| raw.trim().parse().ok())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_layout() {
        let paths = DaemonPaths::new("/home/u/.maxclaw");
        assert_eq!(paths.db_path(), PathBuf::from("/home/u/.maxclaw/data.db"));
        assert_eq!(paths.pid_path(), PathBuf::from("/home/u/.maxclaw/daemon.pid"));
        assert_eq!(
            paths.socket_path(),
            PathBuf::from("/home/u/.maxclaw/daemon.sock")
        );
        assert!(paths.database_url().starts_with("sqlite:"));
    }

    #[test]
    fn test_pid_file_parsing() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("daemon.pid");

        std::fs::write(&path, "1234\n").unwrap();
        assert_eq!(read_pid_file(&path), Some(1234));

        std::fs::write(&path, "not a pid").unwrap();
        assert_eq!(read_pid_file(&path), None);

        assert_eq!(read_pid_file(&dir.path().join("missing")), None);
    }
}
