// ABOUTME: Git repository access for project-root discovery and session branch operations

use std::path::{Path, PathBuf};
use std::process::{Command, Output};

use git2::{BranchType, Repository};
use thiserror::Error;
use tracing::debug;

#[derive(Debug, Error)]
pub enum GitError {
    #[error("not inside a git repository: {0}")]
    NotARepository(PathBuf),
    #[error("git repository error: {0}")]
    Git(#[from] git2::Error),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("invalid branch name: {0}")]
    InvalidBranchName(String),
    #[error("git command failed: {0}")]
    CommandFailed(String),
}

/// Handle on the project's working tree.
///
/// Read-only queries go through git2; working-tree operations (checkout,
/// merge) shell out to the `git` binary, which handles index and conflict
/// state more reliably. Subprocess calls are synchronous and have no
/// timeout.
#[derive(Clone)]
pub struct GitRepository {
    root: PathBuf,
}

impl GitRepository {
    /// Discovers the repository containing `start`, walking upwards the
    /// way git itself does.
    pub fn discover(start: &Path) -> Result<Self, GitError> {
        let repo = Repository::discover(start)
            .map_err(|_| GitError::NotARepository(start.to_path_buf()))?;
        Self::from_repo(&repo, start)
    }

    /// Opens the repository whose working tree is rooted at `root`.
    pub fn at(root: &Path) -> Result<Self, GitError> {
        let repo =
            Repository::open(root).map_err(|_| GitError::NotARepository(root.to_path_buf()))?;
        Self::from_repo(&repo, root)
    }

    fn from_repo(repo: &Repository, origin: &Path) -> Result<Self, GitError> {
        let root = repo
            .workdir()
            .ok_or_else(|| GitError::NotARepository(origin.to_path_buf()))?
            .to_path_buf();
        let root = root.canonicalize().unwrap_or(root);
        Ok(Self { root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Shorthand name of the currently checked-out branch, or `None` on a
    /// detached or unborn HEAD.
    pub fn current_branch(&self) -> Option<String> {
        let repo = Repository::open(&self.root).ok()?;
        let head = repo.head().ok()?;
        head.shorthand().map(str::to_string)
    }

    pub fn branch_exists(&self, name: &str) -> bool {
        Repository::open(&self.root)
            .and_then(|repo| repo.find_branch(name, BranchType::Local).map(|_| ()))
            .is_ok()
    }

    /// Creates `branch` at HEAD and switches to it.
    pub fn create_and_checkout(&self, branch: &str) -> Result<(), GitError> {
        Self::validate_branch_name(branch)?;
        let output = self.run_git(&["checkout", "-b", branch])?;
        if !output.status.success() {
            return Err(GitError::CommandFailed(format!(
                "branch creation failed: {}",
                stderr_text(&output)
            )));
        }
        debug!("created and checked out branch {branch}");
        Ok(())
    }

    pub fn checkout(&self, branch: &str) -> Result<(), GitError> {
        let output = self.run_git(&["checkout", branch])?;
        if !output.status.success() {
            return Err(GitError::CommandFailed(format!(
                "checkout of {branch} failed: {}",
                stderr_text(&output)
            )));
        }
        debug!("checked out branch {branch}");
        Ok(())
    }

    /// Merges `branch` into the current branch without opening an editor.
    /// A conflicted or otherwise failed merge is reported as
    /// `CommandFailed`; this never resolves conflict content.
    pub fn merge_no_edit(&self, branch: &str) -> Result<(), GitError> {
        let output = self.run_git(&["merge", branch, "--no-edit"])?;
        if !output.status.success() {
            return Err(GitError::CommandFailed(format!(
                "merge of {branch} failed: {}",
                stderr_text(&output)
            )));
        }
        debug!("merged branch {branch}");
        Ok(())
    }

    fn run_git(&self, args: &[&str]) -> Result<Output, std::io::Error> {
        debug!("running git {}", args.join(" "));
        Command::new("git")
            .current_dir(&self.root)
            .args(args)
            .output()
    }

    pub fn validate_branch_name(name: &str) -> Result<(), GitError> {
        if name.is_empty() {
            return Err(GitError::InvalidBranchName(
                "branch name cannot be empty".to_string(),
            ));
        }

        // Git branch name validation rules
        let invalid_chars = [' ', '~', '^', ':', '?', '*', '[', '\\'];
        if name.chars().any(|c| invalid_chars.contains(&c)) {
            return Err(GitError::InvalidBranchName(format!(
                "branch name contains invalid characters: {name}"
            )));
        }

        if name.starts_with('-') || name.ends_with('/') || name.contains("//") {
            return Err(GitError::InvalidBranchName(format!(
                "invalid branch name format: {name}"
            )));
        }

        Ok(())
    }
}

fn stderr_text(output: &Output) -> String {
    let text = String::from_utf8_lossy(&output.stderr).trim().to_string();
    if text.is_empty() {
        "unknown error".to_string()
    } else {
        text
    }
}
