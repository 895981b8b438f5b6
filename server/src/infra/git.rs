//! Read files out of bare project repositories

use std::path::PathBuf;

use async_trait::async_trait;
use tokio::process::Command;
use tracing::debug;

use crate::domain::types::Project;
use crate::error::{Error, Result};
use crate::service::create::devfile_fetcher::RepositoryFiles;

/// Repository file access through the `git` executable
pub struct GitRepositoryFiles {
    git_binary: String,
    repositories_dir: PathBuf,
}

impl GitRepositoryFiles {
    pub fn new(git_binary: impl Into<String>, repositories_dir: impl Into<PathBuf>) -> Self {
        Self {
            git_binary: git_binary.into(),
            repositories_dir: repositories_dir.into(),
        }
    }

    /// `<repositories_dir>/<full_path>.git`
    pub fn repository_path(&self, project: &Project) -> PathBuf {
        self.repositories_dir
            .join(format!("{}.git", project.full_path))
    }
}

#[async_trait]
impl RepositoryFiles for GitRepositoryFiles {
    async fn read_file(&self, project: &Project, git_ref: &str, path: &str) -> Result<Option<String>> {
        if git_ref.starts_with('-') {
            debug!("Refusing ref {:?} that looks like an option", git_ref);
            return Ok(None);
        }

        let git_dir = self.repository_path(project);

        let output = Command::new(&self.git_binary)
            .arg("--git-dir")
            .arg(&git_dir)
            .arg("show")
            .arg("--end-of-options")
            .arg(format!("{}:{}", git_ref, path))
            .kill_on_drop(true)
            .output()
            .await
            .map_err(|e| Error::GitError(format!("Failed to run {}: {}", self.git_binary, e)))?;

        // A missing ref, path or repository all mean there is no blob to load
        if !output.status.success() {
            debug!(
                "git show {}:{} in {} failed: {}",
                git_ref,
                path,
                git_dir.display(),
                String::from_utf8_lossy(&output.stderr).trim()
            );
            return Ok(None);
        }

        match String::from_utf8(output.stdout) {
            Ok(content) => Ok(Some(content)),
            Err(_) => Ok(None),
        }
    }
}
