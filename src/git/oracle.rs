// ABOUTME: Content-identity oracle: computes the token that detects file divergence

use std::fs;
use std::path::{Path, PathBuf};

use git2::{ObjectType, Oid};
use sha2::{Digest, Sha256};
use tracing::debug;

#[cfg(test)]
use mockall::automock;

/// Source of content-identity tokens.
///
/// Tokens are opaque: callers compare them with simple equality and never
/// interpret them. Behind this trait the production implementation talks
/// to git; tests substitute a pure in-memory double so coordinator
/// behavior can be exercised without a repository.
#[cfg_attr(test, automock)]
pub trait VersionOracle {
    /// Returns the token for the file's current content, or `None` when
    /// the path does not exist or cannot be read.
    fn identity(&self, path: &Path) -> Option<String>;
}

/// Git-backed oracle. Files under the project root are identified by
/// their git blob object id (the same id `git hash-object` prints, which
/// for tracked-and-unchanged files equals the id git itself records);
/// files outside the root fall back to a direct SHA-256 of their bytes.
/// The two token spaces never mix for one file unless it moves across
/// the project boundary.
pub struct GitVersionOracle {
    project_root: PathBuf,
}

impl GitVersionOracle {
    pub fn new(project_root: impl Into<PathBuf>) -> Self {
        let project_root = project_root.into();
        let project_root = project_root.canonicalize().unwrap_or(project_root);
        Self { project_root }
    }
}

impl VersionOracle for GitVersionOracle {
    fn identity(&self, path: &Path) -> Option<String> {
        let path = path.canonicalize().ok()?;
        let content = fs::read(&path).ok()?;

        if path.starts_with(&self.project_root) {
            match Oid::hash_object(ObjectType::Blob, &content) {
                Ok(oid) => return Some(oid.to_string()),
                Err(err) => {
                    debug!("git blob hashing failed for {}: {err}", path.display());
                }
            }
        }

        let mut hasher = Sha256::new();
        hasher.update(&content);
        Some(format!("{:x}", hasher.finalize()))
    }
}
