// ABOUTME: Lock subsystem: filesystem store plus the optimistic coordinator

pub mod coordinator;
pub mod error;
pub mod store;

pub use coordinator::LockCoordinator;
pub use error::LockError;
pub use store::LockStore;
