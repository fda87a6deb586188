// ABOUTME: Filesystem-backed session registry, one JSON record per session

use std::fs;
use std::path::{Path, PathBuf};

use tracing::{debug, warn};

use super::error::SessionError;
use crate::models::{SessionId, SessionRecord, SessionStatus};

/// Persists session records under `<store>/sessions/<id>.json`.
///
/// The registry is append-only: records are created and updated, never
/// deleted. A session only ever transitions to a terminal status.
pub struct SessionRegistry {
    sessions_dir: PathBuf,
}

impl SessionRegistry {
    pub fn new(sessions_dir: PathBuf) -> Self {
        Self { sessions_dir }
    }

    pub fn sessions_dir(&self) -> &Path {
        &self.sessions_dir
    }

    fn record_path(&self, session: &SessionId) -> PathBuf {
        self.sessions_dir.join(format!("{session}.json"))
    }

    pub fn save(&self, record: &SessionRecord) -> Result<(), SessionError> {
        fs::create_dir_all(&self.sessions_dir)?;
        let path = self.record_path(&record.session_id);
        let json = serde_json::to_string_pretty(record)?;
        fs::write(&path, json)?;
        debug!("wrote session record {}", path.display());
        Ok(())
    }

    pub fn load(&self, session: &SessionId) -> Result<Option<SessionRecord>, SessionError> {
        let path = self.record_path(session);
        if !path.exists() {
            return Ok(None);
        }
        let raw = fs::read_to_string(&path)?;
        Ok(Some(serde_json::from_str(&raw)?))
    }

    /// All session records, newest first, optionally filtered by status.
    /// Unreadable or malformed records are skipped with a warning so one
    /// corrupt file cannot hide the rest.
    pub fn list(&self, status: Option<SessionStatus>) -> Vec<SessionRecord> {
        if !self.sessions_dir.exists() {
            return Vec::new();
        }
        let Ok(entries) = fs::read_dir(&self.sessions_dir) else {
            warn!(
                "cannot read sessions directory {}",
                self.sessions_dir.display()
            );
            return Vec::new();
        };

        let mut records: Vec<SessionRecord> = entries
            .flatten()
            .map(|entry| entry.path())
            .filter(|path| path.extension().and_then(|e| e.to_str()) == Some("json"))
            .filter_map(|path| match fs::read_to_string(&path) {
                Ok(raw) => match serde_json::from_str(&raw) {
                    Ok(record) => Some(record),
                    Err(err) => {
                        warn!("skipping session record {}: {}", path.display(), err);
                        None
                    }
                },
                Err(err) => {
                    warn!("skipping session record {}: {}", path.display(), err);
                    None
                }
            })
            .filter(|record: &SessionRecord| status.map_or(true, |s| record.status == s))
            .collect();
        records.sort_by(|a, b| b.started_at.cmp(&a.started_at));
        records
    }

    /// The active session whose recorded branch is `branch`, if any. This
    /// is how the current session is recovered from the checked-out branch
    /// without any session-id tracking file.
    pub fn find_active_by_branch(&self, branch: &str) -> Option<SessionRecord> {
        self.list(Some(SessionStatus::Active))
            .into_iter()
            .find(|record| record.branch == branch)
    }
}
