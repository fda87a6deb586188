// ABOUTME: Session lifecycle orchestration: start, end, active lookup, work-item ids

use chrono::Local;
use tracing::{info, warn};

use super::error::SessionError;
use super::registry::SessionRegistry;
use crate::git::{GitRepository, VersionOracle};
use crate::locks::LockCoordinator;
use crate::models::{
    CleanupReport, LockCleanup, SessionId, SessionRecord, SessionStatus, WI_ID_PREFIX,
};

/// Upper bound on fresh-id attempts when a generated branch name already
/// exists. The id format makes collisions astronomically unlikely; the
/// bound keeps a pathological sequence from looping forever.
const MAX_ID_ATTEMPTS: u32 = 16;

/// Everything `end` did, for the CLI to report. The registry record
/// carries the durable summary; the transient details live here.
#[derive(Debug)]
pub struct EndReport {
    pub record: SessionRecord,
    pub cleanup: Option<CleanupReport>,
    pub merged: bool,
    pub merge_error: Option<String>,
    pub branch_warning: Option<String>,
}

/// Orchestrates session start and end over the registry, the git
/// repository, and the lock coordinator.
pub struct SessionLifecycle<O> {
    registry: SessionRegistry,
    coordinator: LockCoordinator<O>,
    repo: GitRepository,
    branch_prefix: String,
    base_branch: String,
}

impl<O: VersionOracle> SessionLifecycle<O> {
    pub fn new(
        registry: SessionRegistry,
        coordinator: LockCoordinator<O>,
        repo: GitRepository,
        branch_prefix: String,
        base_branch: String,
    ) -> Self {
        Self {
            registry,
            coordinator,
            repo,
            branch_prefix,
            base_branch,
        }
    }

    pub fn registry(&self) -> &SessionRegistry {
        &self.registry
    }

    pub fn coordinator(&self) -> &LockCoordinator<O> {
        &self.coordinator
    }

    /// Starts a new session: generates an id, creates and checks out its
    /// branch, and persists an active registry entry. Branch creation
    /// failure is fatal and leaves nothing persisted.
    pub fn start(&self, req_id: Option<&str>) -> Result<SessionRecord, SessionError> {
        let original_branch = self.repo.current_branch();

        let mut id = SessionId::generate();
        let mut branch = self.branch_name(&id);
        let mut attempts = 1;
        while self.repo.branch_exists(&branch) {
            if attempts >= MAX_ID_ATTEMPTS {
                return Err(SessionError::Branch(format!(
                    "could not find an unused session branch after {MAX_ID_ATTEMPTS} attempts"
                )));
            }
            warn!("branch {branch} already exists, regenerating session id");
            id = SessionId::generate();
            branch = self.branch_name(&id);
            attempts += 1;
        }

        self.repo.create_and_checkout(&branch)?;
        let record = SessionRecord::new(id, branch, original_branch, req_id);
        self.registry.save(&record)?;
        info!(
            "started session {} on branch {}",
            record.session_id, record.branch
        );
        Ok(record)
    }

    /// Ends a session: releases its locks, marks it completed, and
    /// optionally merges its branch back. Lock-cleanup and merge failures
    /// are captured in the report, never fatal to the end itself.
    pub fn end(
        &self,
        session: &SessionId,
        auto_merge: bool,
        skip_lock_cleanup: bool,
    ) -> Result<EndReport, SessionError> {
        let mut record = self
            .registry
            .load(session)?
            .ok_or_else(|| SessionError::NotFound(session.clone()))?;
        if !record.is_active() {
            return Err(SessionError::AlreadyEnded {
                id: record.session_id,
                status: record.status,
            });
        }

        let mut cleanup = None;
        if !skip_lock_cleanup {
            match self.coordinator.cleanup(session, false) {
                Ok(report) => {
                    record.lock_cleanup = Some(LockCleanup::Summary {
                        released: report.released.len(),
                        conflicts: report.conflicts.len(),
                        cleaned_at: report.cleaned_at,
                    });
                    cleanup = Some(report);
                }
                Err(err) => {
                    warn!("lock cleanup for {session} failed: {err}");
                    record.lock_cleanup = Some(LockCleanup::Failed {
                        error: err.to_string(),
                    });
                }
            }
        }

        record.status = SessionStatus::Completed;
        record.ended_at = Some(Local::now());

        let original = record
            .original_branch
            .clone()
            .unwrap_or_else(|| self.base_branch.clone());

        let mut merged = false;
        let mut merge_error = None;
        let mut branch_warning = None;
        if auto_merge {
            match self
                .repo
                .checkout(&original)
                .and_then(|()| self.repo.merge_no_edit(&record.branch))
            {
                Ok(()) => {
                    record.status = SessionStatus::Merged;
                    merged = true;
                }
                Err(err) => {
                    warn!("auto-merge of {} failed: {err}", record.branch);
                    merge_error = Some(err.to_string());
                }
            }
        } else if self.repo.current_branch().as_deref() == Some(record.branch.as_str()) {
            if let Err(err) = self.repo.checkout(&original) {
                warn!("could not switch back to {original}: {err}");
                branch_warning = Some(format!("could not switch back to {original}: {err}"));
            }
        }

        self.registry.save(&record)?;
        info!("ended session {} ({})", record.session_id, record.status);
        Ok(EndReport {
            record,
            cleanup,
            merged,
            merge_error,
            branch_warning,
        })
    }

    /// The session owning the currently checked-out branch, if that branch
    /// belongs to an active registry entry.
    pub fn active(&self) -> Option<SessionRecord> {
        let branch = self.repo.current_branch()?;
        self.registry.find_active_by_branch(&branch)
    }

    /// Builds a work-item id: `WI-YYYYMMDD-SES-<suffix>-NNN`.
    ///
    /// With an explicit counter this is a pure formatter. Without one the
    /// session's counter is incremented and the new id is appended to its
    /// work-item list and persisted.
    pub fn generate_wi_id(
        &self,
        session: &SessionId,
        counter: Option<u32>,
    ) -> Result<String, SessionError> {
        let mut record = self
            .registry
            .load(session)?
            .ok_or_else(|| SessionError::NotFound(session.clone()))?;

        let date = Local::now().format("%Y%m%d");
        let suffix = record.session_id.suffix().to_string();

        match counter {
            Some(n) => Ok(format!("{WI_ID_PREFIX}-{date}-SES-{suffix}-{n:03}")),
            None => {
                record.wi_counter += 1;
                let wi_id = format!(
                    "{WI_ID_PREFIX}-{date}-SES-{suffix}-{:03}",
                    record.wi_counter
                );
                record.wi_ids.push(wi_id.clone());
                self.registry.save(&record)?;
                Ok(wi_id)
            }
        }
    }

    /// Idempotently links a requirement id to the session.
    pub fn add_requirement(
        &self,
        session: &SessionId,
        req_id: &str,
    ) -> Result<SessionRecord, SessionError> {
        let mut record = self
            .registry
            .load(session)?
            .ok_or_else(|| SessionError::NotFound(session.clone()))?;
        if !record.req_ids.iter().any(|r| r == req_id) {
            record.req_ids.push(req_id.to_string());
            self.registry.save(&record)?;
        }
        Ok(record)
    }

    fn branch_name(&self, id: &SessionId) -> String {
        format!("{}{}", self.branch_prefix, id.short())
    }
}
