// ABOUTME: Error types for session registry access and lifecycle transitions

use thiserror::Error;

use crate::git::GitError;
use crate::models::{InvalidSessionId, SessionId, SessionStatus};

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("session not found: {0}")]
    NotFound(SessionId),

    #[error("session {id} is not active (status: {status})")]
    AlreadyEnded { id: SessionId, status: SessionStatus },

    #[error(transparent)]
    InvalidId(#[from] InvalidSessionId),

    #[error("branch operation failed: {0}")]
    Branch(String),

    #[error(transparent)]
    Git(#[from] GitError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("malformed session record: {0}")]
    Malformed(#[from] serde_json::Error),
}
