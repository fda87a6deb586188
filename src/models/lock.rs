// ABOUTME: Lock data model: persisted lock records and the derived conflict/cleanup reports

use std::fmt;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};

use super::session::SessionId;

/// Persisted claim on a file, one JSON file per (session, file) pair under
/// the owning session's namespace directory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LockRecord {
    /// Base name of the locked file.
    pub file: String,
    /// Absolute, symlink-resolved path.
    pub file_path: PathBuf,
    /// Path relative to the project root, or absolute if outside it.
    pub relative_path: PathBuf,
    /// Full identity of the owning session.
    pub session: SessionId,
    /// Content-identity token captured at acquisition time.
    pub hash: String,
    pub locked_at: DateTime<Local>,
}

impl LockRecord {
    pub fn new(
        file_path: PathBuf,
        relative_path: PathBuf,
        session: SessionId,
        hash: String,
    ) -> Self {
        let file = file_path
            .file_name()
            .map_or_else(String::new, |n| n.to_string_lossy().into_owned());
        Self {
            file,
            file_path,
            relative_path,
            session,
            hash,
            locked_at: Local::now(),
        }
    }
}

/// Result of releasing a lock. Verification is advisory: a detected
/// divergence is reported here but never blocks the release.
#[derive(Debug, Clone)]
pub struct ReleaseOutcome {
    pub file_path: PathBuf,
    pub session: SessionId,
    pub released_at: DateTime<Local>,
    pub original_hash: String,
    pub conflict_detected: bool,
    pub current_hash: Option<String>,
    pub warning: Option<String>,
}

/// Why a held lock is considered conflicting.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConflictKind {
    FileDeleted,
    HashMismatch,
}

impl fmt::Display for ConflictKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ConflictKind::FileDeleted => "file_deleted",
            ConflictKind::HashMismatch => "hash_mismatch",
        };
        f.write_str(s)
    }
}

/// Derived conflict report for one lock record. Never persisted;
/// recomputed on demand by the conflict scan.
#[derive(Debug, Clone)]
pub struct LockConflict {
    pub record: LockRecord,
    pub kind: ConflictKind,
    pub current_hash: Option<String>,
    pub message: &'static str,
}

impl LockConflict {
    pub fn file_deleted(record: LockRecord) -> Self {
        Self {
            record,
            kind: ConflictKind::FileDeleted,
            current_hash: None,
            message: "file has been deleted",
        }
    }

    pub fn hash_mismatch(record: LockRecord, current_hash: String) -> Self {
        Self {
            record,
            kind: ConflictKind::HashMismatch,
            current_hash: Some(current_hash),
            message: "file was modified after locking",
        }
    }
}

/// A lock that cleanup refused to release because its file diverged.
#[derive(Debug, Clone)]
pub struct CleanupConflict {
    pub file: PathBuf,
    pub original_hash: String,
    pub current_hash: String,
}

/// A lock record cleanup could not process at all.
#[derive(Debug, Clone)]
pub struct CleanupError {
    pub file: String,
    pub error: String,
}

/// Per-record outcome of cleaning a session's namespace. Cleanup is
/// atomic per record, not across the session: conflicts and errors are
/// collected while the remaining records are still processed.
#[derive(Debug, Clone)]
pub struct CleanupReport {
    pub session_id: SessionId,
    pub cleaned_at: DateTime<Local>,
    pub released: Vec<String>,
    pub conflicts: Vec<CleanupConflict>,
    pub errors: Vec<CleanupError>,
}

impl CleanupReport {
    pub fn new(session_id: SessionId) -> Self {
        Self {
            session_id,
            cleaned_at: Local::now(),
            released: Vec::new(),
            conflicts: Vec::new(),
            errors: Vec::new(),
        }
    }

    pub fn is_clean(&self) -> bool {
        self.conflicts.is_empty() && self.errors.is_empty()
    }
}

/// Truncates a content token for display, the way the CLI reports hashes.
pub fn short_hash(hash: &str) -> &str {
    &hash[..hash.len().min(12)]
}

/// Display name for a lock target: the relative path when available.
pub fn display_path(record: &LockRecord) -> &Path {
    &record.relative_path
}
