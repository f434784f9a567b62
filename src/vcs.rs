//! Version-control status queries.
//!
//! Gatekeeper never modifies the repository; it only asks whether the
//! working tree is clean.

use std::path::Path;
use std::process::Command;

use crate::error::{GateError, Result};

/// Source of working-tree status.
pub trait VcsStatus: Send + Sync {
    /// Porcelain status lines for `cwd`, one per modified or untracked path.
    ///
    /// An empty list means the tree is clean. An error means status could
    /// not be determined (tool missing, not a repository).
    fn porcelain_status(&self, cwd: &Path) -> Result<Vec<String>>;
}

/// `git status --porcelain`.
#[derive(Debug, Default, Clone, Copy)]
pub struct GitStatus;

impl VcsStatus for GitStatus {
    fn porcelain_status(&self, cwd: &Path) -> Result<Vec<String>> {
        let output = Command::new("git")
            .args(["status", "--porcelain"])
            .current_dir(cwd)
            .output()
            .map_err(|e| GateError::storage(cwd, e))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(GateError::invalid_input(format!(
                "git status failed in {}: {}",
                cwd.display(),
                stderr.trim()
            )));
        }

        Ok(parse_porcelain(&String::from_utf8_lossy(&output.stdout)))
    }
}

/// Split porcelain output into non-empty lines.
pub fn parse_porcelain(output: &str) -> Vec<String> {
    output
        .lines()
        .filter(|line| !line.trim().is_empty())
        .map(str::to_string)
        .collect()
}

/// Fixed status, for tests.
#[derive(Debug, Clone, Default)]
pub struct StaticStatus {
    lines: Option<Vec<String>>,
}

impl StaticStatus {
    /// A clean working tree.
    pub fn clean() -> Self {
        Self {
            lines: Some(Vec::new()),
        }
    }

    /// A working tree with the given porcelain lines.
    pub fn dirty<I, S>(lines: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            lines: Some(lines.into_iter().map(Into::into).collect()),
        }
    }

    /// Status cannot be determined.
    pub fn unavailable() -> Self {
        Self { lines: None }
    }
}

impl VcsStatus for StaticStatus {
    fn porcelain_status(&self, _cwd: &Path) -> Result<Vec<String>> {
        self.lines
            .clone()
            .ok_or_else(|| GateError::invalid_input("git unavailable"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_parse_porcelain() {
        let lines = parse_porcelain(" M src/lib.rs\n?? notes.txt\n\n");
        assert_eq!(lines, vec![" M src/lib.rs", "?? notes.txt"]);
        assert!(parse_porcelain("").is_empty());
    }

    #[test]
    fn test_static_status() {
        let cwd = Path::new("/");
        assert!(StaticStatus::clean().porcelain_status(cwd).unwrap().is_empty());
        assert_eq!(
            StaticStatus::dirty(["?? a"]).porcelain_status(cwd).unwrap(),
            vec!["?? a"]
        );
        assert!(StaticStatus::unavailable().porcelain_status(cwd).is_err());
    }

    #[test]
    fn test_git_status_outside_repository_errors() {
        let dir = TempDir::new().unwrap();
        // Either git is missing or the directory is not a repository.
        // Environments that place tempdirs inside a repository are skipped.
        if let Ok(lines) = GitStatus.porcelain_status(dir.path()) {
            assert!(lines.iter().all(|l| !l.is_empty()));
        }
    }
}
