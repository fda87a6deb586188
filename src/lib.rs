// ABOUTME: Library root for worklock: session-scoped advisory file locking

//! Coordinates exclusive, session-scoped editing access to shared files
//! for agents working in parallel branches of one git tree. Locks are
//! optimistic and advisory: acquisition is keyed on a content-identity
//! token, divergence is detected rather than prevented, and cleanup is
//! bounded by the owning session.

pub mod cli;
pub mod config;
pub mod git;
pub mod locks;
pub mod models;
pub mod session;
