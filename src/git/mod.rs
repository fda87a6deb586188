// ABOUTME: Git integration module for root discovery, branch operations, and content identity

pub mod oracle;
pub mod repository;

pub use oracle::{GitVersionOracle, VersionOracle};
pub use repository::{GitError, GitRepository};
