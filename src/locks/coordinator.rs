// ABOUTME: Lock coordinator implementing optimistic acquire/release/scan/cleanup semantics

use std::fs;
use std::path::{Path, PathBuf};

use tracing::{debug, info, warn};

use super::error::LockError;
use super::store::LockStore;
use crate::git::VersionOracle;
use crate::models::{
    CleanupConflict, CleanupError, CleanupReport, LockConflict, LockRecord, ReleaseOutcome,
    SessionId,
};

/// Coordinates advisory locks over the store and the content-identity
/// oracle.
///
/// A (file, session) pair moves unlocked -> locked -> released, with the
/// released edge optionally flagged as conflicted when the content
/// diverged while held. The coordinator never blocks waiting for a lock:
/// acquisition either succeeds immediately or reports the conflict for the
/// caller to resolve. Coordination across processes goes through the
/// filesystem store, so two concurrent acquires on the same file have a
/// narrow read-check-then-write race window; this is accepted.
pub struct LockCoordinator<O> {
    store: LockStore,
    oracle: O,
}

impl<O: VersionOracle> LockCoordinator<O> {
    pub fn new(store: LockStore, oracle: O) -> Self {
        Self { store, oracle }
    }

    pub fn store(&self) -> &LockStore {
        &self.store
    }

    /// Acquires a lock on `file_path` for `session`.
    ///
    /// Fails with `Conflict` if another session holds a non-forced lock on
    /// the file, mutating nothing. With `force`, every foreign record is
    /// deleted first; the override leaves no trace in the new record.
    pub fn acquire(
        &self,
        file_path: &Path,
        session: &SessionId,
        force: bool,
    ) -> Result<LockRecord, LockError> {
        let full_path = file_path
            .canonicalize()
            .map_err(|_| LockError::FileNotFound(file_path.to_path_buf()))?;

        let foreign: Vec<LockRecord> = self
            .store
            .find_by_file(&full_path)
            .into_iter()
            .filter(|record| record.session != *session)
            .collect();

        if !foreign.is_empty() {
            if !force {
                return Err(LockError::Conflict(foreign));
            }
            for record in &foreign {
                warn!(
                    "force-acquiring {}: stealing lock held by {}",
                    full_path.display(),
                    record.session
                );
                self.store.delete(&record.file_path, &record.session)?;
            }
        }

        let hash = self.oracle.identity(&full_path).ok_or_else(|| {
            LockError::Acquire(format!(
                "cannot hash {}: file vanished or is unreadable",
                full_path.display()
            ))
        })?;

        let relative_path = self.relative_path(&full_path);
        let record = LockRecord::new(full_path, relative_path, session.clone(), hash);
        self.store.put(&record)?;
        info!(
            "locked {} for session {}",
            record.relative_path.display(),
            session
        );
        Ok(record)
    }

    /// Releases the session's own lock on `file_path`.
    ///
    /// With `verify`, the current token is recomputed and a mismatch is
    /// reported as a detected conflict; release proceeds regardless, since
    /// refusing would strand the lock.
    pub fn release(
        &self,
        file_path: &Path,
        session: &SessionId,
        verify: bool,
    ) -> Result<ReleaseOutcome, LockError> {
        let full_path = resolve(file_path);
        let record = self.store.get(&full_path, session)?.ok_or_else(|| {
            LockError::Release(format!(
                "no lock on {} is held by session {}",
                full_path.display(),
                session
            ))
        })?;

        let mut conflict_detected = false;
        let mut current_hash = None;
        let mut warning = None;
        if verify && full_path.exists() {
            if let Some(current) = self.oracle.identity(&full_path) {
                if current != record.hash {
                    conflict_detected = true;
                    warning = Some(format!(
                        "content changed while locked: was {}, now {}",
                        record.hash, current
                    ));
                    current_hash = Some(current);
                }
            }
        }

        self.store.delete(&full_path, session)?;
        info!(
            "released {} for session {}{}",
            record.relative_path.display(),
            session,
            if conflict_detected {
                " (content diverged)"
            } else {
                ""
            }
        );

        Ok(ReleaseOutcome {
            file_path: record.file_path,
            session: record.session,
            released_at: chrono::Local::now(),
            original_hash: record.hash,
            conflict_detected,
            current_hash,
            warning,
        })
    }

    /// Read-only audit of every persisted lock across all sessions. A
    /// missing target classifies as `file_deleted`; a token mismatch as
    /// `hash_mismatch`. Nothing is mutated.
    pub fn scan_conflicts(&self) -> Vec<LockConflict> {
        let mut conflicts = Vec::new();
        for record in self.store.list_all(None) {
            if !record.file_path.exists() {
                conflicts.push(LockConflict::file_deleted(record));
                continue;
            }
            if let Some(current) = self.oracle.identity(&record.file_path) {
                if current != record.hash {
                    conflicts.push(LockConflict::hash_mismatch(record, current));
                }
            }
        }
        conflicts
    }

    /// Releases every lock in the session's namespace.
    ///
    /// Without `force`, a record whose file still exists but diverged is
    /// left in place and reported as a conflict. Cleanup is atomic per
    /// record, not across the session: read or delete failures are
    /// captured in the report while the remaining records are processed.
    pub fn cleanup(&self, session: &SessionId, force: bool) -> Result<CleanupReport, LockError> {
        let mut report = CleanupReport::new(session.clone());
        for path in self.store.entry_paths(session)? {
            let record = match self.store.read_record(&path) {
                Ok(record) => record,
                Err(err) => {
                    report.errors.push(CleanupError {
                        file: entry_name(&path),
                        error: err.to_string(),
                    });
                    continue;
                }
            };

            if !force && record.file_path.exists() {
                if let Some(current) = self.oracle.identity(&record.file_path) {
                    if current != record.hash {
                        debug!(
                            "leaving diverged lock {} in place",
                            record.relative_path.display()
                        );
                        report.conflicts.push(CleanupConflict {
                            file: record.relative_path.clone(),
                            original_hash: record.hash.clone(),
                            current_hash: current,
                        });
                        continue;
                    }
                }
            }

            match fs::remove_file(&path) {
                Ok(()) => report
                    .released
                    .push(record.relative_path.display().to_string()),
                Err(err) => report.errors.push(CleanupError {
                    file: entry_name(&path),
                    error: err.to_string(),
                }),
            }
        }
        self.store.prune_session_dir(session)?;
        info!(
            "cleanup for {}: {} released, {} conflicts, {} errors",
            session,
            report.released.len(),
            report.conflicts.len(),
            report.errors.len()
        );
        Ok(report)
    }

    fn relative_path(&self, full_path: &Path) -> PathBuf {
        full_path
            .strip_prefix(self.store.project_root())
            .map_or_else(|_| full_path.to_path_buf(), Path::to_path_buf)
    }
}

/// Best-effort canonicalization: release and cleanup must still find the
/// record when the target file has been deleted.
fn resolve(path: &Path) -> PathBuf {
    path.canonicalize().unwrap_or_else(|_| path.to_path_buf())
}

fn entry_name(path: &Path) -> String {
    path.file_name()
        .map_or_else(|| path.display().to_string(), |n| {
            n.to_string_lossy().into_owned()
        })
}
