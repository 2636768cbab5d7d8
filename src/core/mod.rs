//! core
//!
//! Core domain types and pure algorithms for coursewright.
//!
//! # Modules
//!
//! - [`types`] - Strong types: CourseId, EntityId, CommitHash, Actor, Course
//! - [`naming`] - Collision-avoiding name allocation
//! - [`paths`] - Path containment checking and course layout routing
//! - [`fsops`] - Filesystem primitives shared by edit operations
//! - [`config`] - Coordinator configuration schema and loading
//!
//! # Design Principles
//!
//! - Strong typing prevents invalid states at compile time
//! - Naming and containment are pure functions over caller-supplied state
//! - Every mutation-capable primitive fails loudly on a lost race

pub mod config;
pub mod fsops;
pub mod naming;
pub mod paths;
pub mod types;
