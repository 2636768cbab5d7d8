//! git
//!
//! Single interface for all version-control operations.
//!
//! # Architecture
//!
//! This module is the **ONLY doorway** to Git. Every repository mutation
//! the edit protocol performs (clean, reset, remote set-url, add, commit,
//! push, fetch) flows through the [`VcsRunner`] trait. No other module
//! imports `git2`.
//!
//! # Responsibilities
//!
//! - Reading the head commit for rollback targets and sync baselines
//! - Re-pointing the remote at the course's configured repository
//! - Clean-and-reset of the working tree (to remote, HEAD, or a commit)
//! - Staging and committing an edit under the acting user's identity
//! - Push and fetch against the tracked branch
//!
//! # Invariants
//!
//! - Only the coordinator invokes these operations, under the course lock
//! - Push rejection is a typed outcome, not a generic failure

mod interface;

pub use interface::{Git, VcsError, VcsRunner};
