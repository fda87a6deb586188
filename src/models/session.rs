// ABOUTME: Session data model representing one bounded unit of work tied to a git branch

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

/// Prefix of every generated session identity.
pub const SESSION_ID_PREFIX: &str = "SES";

/// Prefix of every generated work-item identity.
pub const WI_ID_PREFIX: &str = "WI";

#[derive(Debug, Error)]
#[error("invalid session id: {0:?}")]
pub struct InvalidSessionId(pub String);

/// Identity of a session.
///
/// The lifecycle generates the canonical form `SES-YYYYMMDD-HHmm-xxxx`
/// (timestamp plus a four-hex-char random suffix), but any cooperating
/// tool's id is accepted as long as it cannot escape the store namespace
/// when used as a directory name.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionId(String);

impl SessionId {
    /// Wraps an externally supplied id, rejecting values that are empty
    /// or unusable as a single path segment.
    pub fn new(id: impl Into<String>) -> Result<Self, InvalidSessionId> {
        let id = id.into();
        let trimmed = id.trim();
        if trimmed.is_empty()
            || trimmed == "."
            || trimmed == ".."
            || trimmed.contains(['/', '\\'])
        {
            return Err(InvalidSessionId(id));
        }
        Ok(Self(trimmed.to_string()))
    }

    /// Generates a fresh canonical id: `SES-YYYYMMDD-HHmm-xxxx`.
    pub fn generate() -> Self {
        let timestamp = Local::now().format("%Y%m%d-%H%M");
        let random = Uuid::new_v4().simple().to_string();
        Self(format!("{SESSION_ID_PREFIX}-{timestamp}-{}", &random[..4]))
    }

    /// Short form used as the lock-store namespace directory.
    ///
    /// `SES-20260129-1432-a7f3` becomes `SES-a7f3`; ids that do not split
    /// into at least four parts are used as-is.
    pub fn short(&self) -> String {
        let parts: Vec<&str> = self.0.split('-').collect();
        match parts.last() {
            Some(last) if parts.len() >= 4 => format!("{SESSION_ID_PREFIX}-{last}"),
            _ => self.0.clone(),
        }
    }

    /// Last dash-separated segment, used for branch and work-item names.
    pub fn suffix(&self) -> &str {
        self.0.rsplit('-').next().unwrap_or(&self.0)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for SessionId {
    type Err = InvalidSessionId;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionStatus {
    Active,
    Completed,
    Merged,
}

impl SessionStatus {
    pub fn indicator(&self) -> &'static str {
        match self {
            SessionStatus::Active => "[Active]",
            SessionStatus::Completed => "[Completed]",
            SessionStatus::Merged => "[Merged]",
        }
    }

    pub fn is_active(&self) -> bool {
        matches!(self, SessionStatus::Active)
    }
}

impl fmt::Display for SessionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            SessionStatus::Active => "active",
            SessionStatus::Completed => "completed",
            SessionStatus::Merged => "merged",
        };
        f.write_str(s)
    }
}

impl FromStr for SessionStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "active" => Ok(SessionStatus::Active),
            "completed" => Ok(SessionStatus::Completed),
            "merged" => Ok(SessionStatus::Merged),
            other => Err(format!(
                "unknown status {other:?} (expected active, completed or merged)"
            )),
        }
    }
}

/// Outcome of the lock cleanup that ran while ending a session, recorded
/// in the session file. `Failed` is written when cleanup could not run at
/// all; per-record problems stay inside the counts.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum LockCleanup {
    Summary {
        released: usize,
        conflicts: usize,
        cleaned_at: DateTime<Local>,
    },
    Failed {
        error: String,
    },
}

/// Persisted per-session metadata. Records are append-only: a session is
/// never deleted, it only transitions to a terminal status.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionRecord {
    pub session_id: SessionId,
    pub started_at: DateTime<Local>,
    pub branch: String,
    pub original_branch: Option<String>,
    pub req_ids: Vec<String>,
    pub wi_ids: Vec<String>,
    pub wi_counter: u32,
    pub status: SessionStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ended_at: Option<DateTime<Local>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lock_cleanup: Option<LockCleanup>,
}

impl SessionRecord {
    pub fn new(
        session_id: SessionId,
        branch: String,
        original_branch: Option<String>,
        req_id: Option<&str>,
    ) -> Self {
        Self {
            session_id,
            started_at: Local::now(),
            branch,
            original_branch,
            req_ids: req_id.map(str::to_string).into_iter().collect(),
            wi_ids: Vec::new(),
            wi_counter: 0,
            status: SessionStatus::Active,
            ended_at: None,
            lock_cleanup: None,
        }
    }

    pub fn is_active(&self) -> bool {
        self.status.is_active()
    }
}
