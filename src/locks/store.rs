// ABOUTME: Filesystem-backed lock store, one JSON record per (session, file) pair

use std::fs;
use std::path::{Path, PathBuf};

use sha2::{Digest, Sha256};
use tracing::{debug, warn};

use super::error::LockError;
use crate::models::{LockRecord, SessionId};

/// Extension of every persisted lock record.
pub const LOCK_EXTENSION: &str = "lock";

/// Persists lock records under a per-session namespace directory:
///
/// ```text
/// locks/
/// ├── SES-a7f3/
/// │   ├── CLAUDE.md.lock
/// │   └── docs-index.md.lock
/// └── SES-b9e2/
///     └── workspace.json.lock
/// ```
///
/// A session's locks can be enumerated and removed as a unit; a record is
/// only ever written by the tooling of the session that owns it (by
/// convention, not filesystem permissions).
pub struct LockStore {
    locks_dir: PathBuf,
    project_root: PathBuf,
}

impl LockStore {
    pub fn new(locks_dir: PathBuf, project_root: PathBuf) -> Self {
        let project_root = project_root.canonicalize().unwrap_or(project_root);
        Self {
            locks_dir,
            project_root,
        }
    }

    pub fn locks_dir(&self) -> &Path {
        &self.locks_dir
    }

    pub fn project_root(&self) -> &Path {
        &self.project_root
    }

    pub fn session_dir(&self, session: &SessionId) -> PathBuf {
        self.locks_dir.join(session.short())
    }

    /// Encodes a lock target as a single path segment: the
    /// project-relative path with separators replaced by hyphens, or a
    /// hash of the absolute path for files outside the project.
    fn encoded_name(&self, file_path: &Path) -> String {
        match file_path.strip_prefix(&self.project_root) {
            Ok(relative) => relative.to_string_lossy().replace(['/', '\\'], "-"),
            Err(_) => {
                let mut hasher = Sha256::new();
                hasher.update(file_path.to_string_lossy().as_bytes());
                format!("{:x}", hasher.finalize())[..16].to_string()
            }
        }
    }

    pub fn record_path(&self, file_path: &Path, session: &SessionId) -> PathBuf {
        self.session_dir(session)
            .join(format!("{}.{LOCK_EXTENSION}", self.encoded_name(file_path)))
    }

    pub fn put(&self, record: &LockRecord) -> Result<PathBuf, LockError> {
        let path = self.record_path(&record.file_path, &record.session);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string_pretty(record)?;
        fs::write(&path, json)?;
        debug!("wrote lock record {}", path.display());
        Ok(path)
    }

    pub fn get(
        &self,
        file_path: &Path,
        session: &SessionId,
    ) -> Result<Option<LockRecord>, LockError> {
        let path = self.record_path(file_path, session);
        if !path.exists() {
            return Ok(None);
        }
        let raw = fs::read_to_string(&path)?;
        Ok(Some(serde_json::from_str(&raw)?))
    }

    /// Removes the record if present and prunes the session directory
    /// when it empties. Deleting an absent record is not an error.
    pub fn delete(&self, file_path: &Path, session: &SessionId) -> Result<(), LockError> {
        let path = self.record_path(file_path, session);
        if path.exists() {
            fs::remove_file(&path)?;
            debug!("deleted lock record {}", path.display());
        }
        self.prune_session_dir(session)
    }

    /// Removes a session's namespace directory once it holds no records.
    pub fn prune_session_dir(&self, session: &SessionId) -> Result<(), LockError> {
        let dir = self.session_dir(session);
        if dir.exists() && fs::read_dir(&dir)?.next().is_none() {
            fs::remove_dir(&dir)?;
            debug!("pruned empty lock namespace {}", dir.display());
        }
        Ok(())
    }

    /// Enumerates records for one session namespace or across all of
    /// them. Best effort: unreadable or malformed records are skipped
    /// with a warning so one corrupt file cannot hide the rest.
    pub fn list_all(&self, session: Option<&SessionId>) -> Vec<LockRecord> {
        let dirs: Vec<PathBuf> = match session {
            Some(session) => vec![self.session_dir(session)],
            None => self.session_dirs(),
        };

        let mut records = Vec::new();
        for dir in dirs {
            if !dir.exists() {
                continue;
            }
            let Ok(entries) = fs::read_dir(&dir) else {
                warn!("cannot read lock namespace {}", dir.display());
                continue;
            };
            for entry in entries.flatten() {
                let path = entry.path();
                if path.extension().and_then(|e| e.to_str()) != Some(LOCK_EXTENSION) {
                    continue;
                }
                match self.read_record(&path) {
                    Ok(record) => records.push(record),
                    Err(err) => {
                        warn!("skipping lock record {}: {}", path.display(), err);
                    }
                }
            }
        }
        records
    }

    /// All locks held on one file, across every session. File identity is
    /// compared on the symlink-resolved absolute path.
    pub fn find_by_file(&self, file_path: &Path) -> Vec<LockRecord> {
        let target = canonical(file_path);
        self.list_all(None)
            .into_iter()
            .filter(|record| canonical(&record.file_path) == target)
            .collect()
    }

    /// Raw record paths in a session's namespace, in stable order.
    /// Cleanup walks these itself so per-record failures can be reported
    /// instead of silently skipped.
    pub fn entry_paths(&self, session: &SessionId) -> Result<Vec<PathBuf>, std::io::Error> {
        let dir = self.session_dir(session);
        if !dir.exists() {
            return Ok(Vec::new());
        }
        let mut paths: Vec<PathBuf> = fs::read_dir(&dir)?
            .flatten()
            .map(|entry| entry.path())
            .filter(|path| path.extension().and_then(|e| e.to_str()) == Some(LOCK_EXTENSION))
            .collect();
        paths.sort();
        Ok(paths)
    }

    pub fn read_record(&self, path: &Path) -> Result<LockRecord, LockError> {
        let raw = fs::read_to_string(path)?;
        Ok(serde_json::from_str(&raw)?)
    }

    fn session_dirs(&self) -> Vec<PathBuf> {
        if !self.locks_dir.exists() {
            return Vec::new();
        }
        let Ok(entries) = fs::read_dir(&self.locks_dir) else {
            warn!("cannot read locks directory {}", self.locks_dir.display());
            return Vec::new();
        };
        entries
            .flatten()
            .map(|entry| entry.path())
            .filter(|path| {
                path.is_dir()
                    && path
                        .file_name()
                        .and_then(|n| n.to_str())
                        .is_some_and(|name| !name.starts_with('.'))
            })
            .collect()
    }
}

fn canonical(path: &Path) -> PathBuf {
    path.canonicalize().unwrap_or_else(|_| path.to_path_buf())
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use tempfile::TempDir;

    fn session(id: &str) -> SessionId {
        SessionId::new(id).unwrap()
    }

    fn store_in(dir: &TempDir) -> LockStore {
        LockStore::new(dir.path().join("locks"), dir.path().to_path_buf())
    }

    fn record_for(dir: &TempDir, relative: &str, session_id: &str) -> LockRecord {
        let file_path = dir.path().join(relative);
        std::fs::create_dir_all(file_path.parent().unwrap()).unwrap();
        std::fs::write(&file_path, "content").unwrap();
        LockRecord::new(
            file_path.canonicalize().unwrap(),
            PathBuf::from(relative),
            session(session_id),
            "abc123".to_string(),
        )
    }

    #[test]
    fn encoded_name_flattens_nested_paths() {
        let dir = TempDir::new().unwrap();
        let store = store_in(&dir);
        let path = store.record_path(
            &dir.path().canonicalize().unwrap().join("docs/guide/index.md"),
            &session("SES-20260129-1432-a7f3"),
        );
        assert!(path.ends_with("SES-a7f3/docs-guide-index.md.lock"));
    }

    #[test]
    fn encoded_name_outside_project_uses_path_hash() {
        let dir = TempDir::new().unwrap();
        let store = store_in(&dir);
        let outside = PathBuf::from("/elsewhere/notes.md");
        let path = store.record_path(&outside, &session("SES-20260129-1432-a7f3"));
        let name = path.file_stem().unwrap().to_str().unwrap();
        assert_eq!(name.len(), 16);
        assert!(name.chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn put_get_delete_round_trip() {
        let dir = TempDir::new().unwrap();
        let store = store_in(&dir);
        let record = record_for(&dir, "CLAUDE.md", "SES-20260129-1432-a7f3");

        store.put(&record).unwrap();
        let loaded = store
            .get(&record.file_path, &record.session)
            .unwrap()
            .unwrap();
        assert_eq!(loaded, record);

        store.delete(&record.file_path, &record.session).unwrap();
        assert!(store
            .get(&record.file_path, &record.session)
            .unwrap()
            .is_none());
        // Last record gone: the namespace directory is pruned too.
        assert!(!store.session_dir(&record.session).exists());
    }

    #[test]
    fn delete_of_absent_record_is_a_no_op() {
        let dir = TempDir::new().unwrap();
        let store = store_in(&dir);
        let file = dir.path().join("missing.md");
        store.delete(&file, &session("SES-x")).unwrap();
    }

    #[test]
    fn list_all_skips_malformed_records() {
        let dir = TempDir::new().unwrap();
        let store = store_in(&dir);
        let record = record_for(&dir, "a.md", "SES-20260129-1432-a7f3");
        store.put(&record).unwrap();

        let bad = store.session_dir(&record.session).join("broken.lock");
        std::fs::write(&bad, "{not json").unwrap();

        let listed = store.list_all(None);
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0], record);
    }

    #[test]
    fn list_all_scopes_to_one_session() {
        let dir = TempDir::new().unwrap();
        let store = store_in(&dir);
        let first = record_for(&dir, "a.md", "SES-20260129-1432-a7f3");
        let second = record_for(&dir, "b.md", "SES-20260129-1500-b9e2");
        store.put(&first).unwrap();
        store.put(&second).unwrap();

        let all = store.list_all(None);
        assert_eq!(all.len(), 2);

        let scoped = store.list_all(Some(&first.session));
        assert_eq!(scoped.len(), 1);
        assert_eq!(scoped[0].file, "a.md");
    }

    #[test]
    fn find_by_file_matches_on_resolved_path() {
        let dir = TempDir::new().unwrap();
        let store = store_in(&dir);
        let record = record_for(&dir, "docs/index.md", "SES-20260129-1432-a7f3");
        store.put(&record).unwrap();

        // Unresolved spelling of the same file.
        let sloppy = dir.path().join("docs/../docs/index.md");
        let found = store.find_by_file(&sloppy);
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].session, record.session);

        assert!(store.find_by_file(&dir.path().join("other.md")).is_empty());
    }
}
