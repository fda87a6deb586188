// ABOUTME: Error types for lock acquisition, release, and store access

use std::path::PathBuf;

use thiserror::Error;

use crate::models::LockRecord;

#[derive(Debug, Error)]
pub enum LockError {
    #[error("file does not exist: {0}")]
    FileNotFound(PathBuf),

    #[error("{}", conflict_summary(.0))]
    Conflict(Vec<LockRecord>),

    #[error("lock acquisition failed: {0}")]
    Acquire(String),

    #[error("lock release failed: {0}")]
    Release(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("malformed lock record: {0}")]
    Malformed(#[from] serde_json::Error),
}

impl LockError {
    /// Exit code this failure maps to, so calling automation can branch
    /// on outcome without parsing text.
    pub fn exit_code(&self) -> u8 {
        match self {
            LockError::Conflict(_) => 2,
            _ => 1,
        }
    }
}

fn conflict_summary(conflicts: &[LockRecord]) -> String {
    let holders: Vec<&str> = conflicts
        .iter()
        .map(|lock| lock.session.as_str())
        .collect();
    format!("already locked by another session: {}", holders.join(", "))
}
