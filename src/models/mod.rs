// ABOUTME: Core data models for lock records, sessions, and derived conflict reports

pub mod lock;
pub mod session;

pub use lock::{
    CleanupConflict, CleanupError, CleanupReport, ConflictKind, LockConflict, LockRecord,
    ReleaseOutcome,
};
pub use session::{
    InvalidSessionId, LockCleanup, SessionId, SessionRecord, SessionStatus, SESSION_ID_PREFIX,
    WI_ID_PREFIX,
};
