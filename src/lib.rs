//! Coursewright - safe, serialized edits to version-controlled course content
//!
//! Coursewright is the editing backbone for course repositories: it names
//! new content without collisions, confines every write to the course
//! directory, and drives each edit through a commit-validate-push protocol
//! that keeps the repository, the working tree, and the content database
//! consistent even when pushes race or an edit turns out to be invalid.
//!
//! # Architecture
//!
//! The codebase follows a strict layered architecture:
//!
//! - [`engine`] - Orchestrates lock → reset → write → validate → push → sync
//! - [`edit`] - The edit operations (add, copy, rename, delete, upload)
//! - [`core`] - Naming, path containment, course layout, filesystem primitives
//! - [`git`] - Single interface for all Git operations
//! - [`sync`] - Seams to the content database: loader, validator, sync engine
//!
//! # Correctness Invariants
//!
//! Coursewright maintains the following invariants:
//!
//! 1. Every write lands inside the course directory, checked before any mutation
//! 2. Edits to one course are serialized by an exclusive lock
//! 3. Allocated names never collide with existing content on either axis
//! 4. A rejected push is retried exactly once against refreshed remote state
//! 5. An edit that would break the sharing configuration is rolled back whole
//! 6. The content database is re-synced from disk on every edit, success or not

pub mod core;
pub mod edit;
pub mod engine;
pub mod git;
pub mod sync;
