//! engine
//!
//! The coordination layer. One [`SyncCoordinator`](coordinator::SyncCoordinator)
//! drives each edit request through locking, version control, sharing
//! validation, and the closing disk-to-database sync, recording progress
//! in a per-request [`JobLog`](job::JobLog).

pub mod coordinator;
pub mod job;
pub mod lock;

pub use coordinator::{CoordinatorError, SaveReport, SyncCoordinator};
pub use job::{JobFlag, JobLog, JobLogger};
pub use lock::{CourseLock, LockError};
