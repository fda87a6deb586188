// ABOUTME: Session subsystem: registry persistence and lifecycle orchestration

pub mod error;
pub mod lifecycle;
pub mod registry;

pub use error::SessionError;
pub use lifecycle::{EndReport, SessionLifecycle};
pub use registry::SessionRegistry;
