//! core::types
//!
//! Strong types for core domain concepts.
//!
//! # Types
//!
//! - [`CourseId`] - Database identifier of a course
//! - [`EntityId`] - Opaque unique identifier carried by every entity's info file
//! - [`CommitHash`] - Opaque version-control snapshot identifier
//! - [`Actor`] - The acting user plus authorization flags
//! - [`Course`] - The target course repository and its policy flags
//!
//! # Validation
//!
//! [`CommitHash`] enforces a plausible hex format at construction time.
//! Invalid values cannot be represented, preventing entire classes of bugs.
//!
//! # Examples
//!
//! ```
//! use coursewright::core::types::{CommitHash, EntityId};
//!
//! let hash = CommitHash::new("abc123def4567890abc123def4567890abc12345").unwrap();
//! assert_eq!(hash.short(7), "abc123d");
//!
//! let id = EntityId::generate();
//! assert_ne!(id, EntityId::generate());
//! ```

use std::fmt;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

/// Errors from type validation.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum TypeError {
    #[error("invalid commit hash: {0}")]
    InvalidCommitHash(String),
}

/// Database identifier of a course.
///
/// Opaque to this crate; it is threaded through to the sync engine and
/// the sharing validator unchanged.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CourseId(String);

impl CourseId {
    /// Wrap a raw course id.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Get the id as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CourseId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Opaque unique identifier carried by every entity's info file.
///
/// Freshly generated whenever an entity is created or copied, so no two
/// entities ever share an identifier even across courses.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EntityId(String);

impl EntityId {
    /// Wrap an identifier read back from an existing info file.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Generate a fresh random identifier.
    pub fn generate() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    /// Get the identifier as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A validated version-control commit hash.
///
/// Used both as the rollback target after a rejected edit and as the
/// sync engine's diff baseline.
///
/// # Example
///
/// ```
/// use coursewright::core::types::CommitHash;
///
/// let hash = CommitHash::new("abc123def4567890abc123def4567890abc12345").unwrap();
/// assert_eq!(hash.short(7), "abc123d");
///
/// assert!(CommitHash::new("not-a-hash").is_err());
/// assert!(CommitHash::new("").is_err());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct CommitHash(String);

impl CommitHash {
    /// Create a validated commit hash.
    ///
    /// # Errors
    ///
    /// Returns `TypeError::InvalidCommitHash` if the string is empty or
    /// contains non-hex characters.
    pub fn new(hash: impl Into<String>) -> Result<Self, TypeError> {
        let hash = hash.into();
        if hash.is_empty() {
            return Err(TypeError::InvalidCommitHash(
                "commit hash cannot be empty".into(),
            ));
        }
        if !hash.chars().all(|c| c.is_ascii_hexdigit()) {
            return Err(TypeError::InvalidCommitHash(format!(
                "commit hash must be hexadecimal: {hash}"
            )));
        }
        Ok(Self(hash.to_ascii_lowercase()))
    }

    /// Get the hash as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Get an abbreviated form of the hash.
    pub fn short(&self, len: usize) -> &str {
        let end = self.0.len().min(len);
        &self.0[..end]
    }
}

impl fmt::Display for CommitHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl TryFrom<String> for CommitHash {
    type Error = TypeError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<CommitHash> for String {
    fn from(hash: CommitHash) -> Self {
        hash.0
    }
}

/// The acting user plus authorization flags.
///
/// Read-only input to every edit operation; never mutated by the core.
/// The name and email become the commit identity when an edit is committed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Actor {
    /// Display name of the acting user.
    pub name: String,
    /// Email of the acting user.
    pub email: String,
    /// Whether the actor holds course-edit permission.
    pub can_edit: bool,
}

impl Actor {
    /// Create an actor.
    pub fn new(name: impl Into<String>, email: impl Into<String>, can_edit: bool) -> Self {
        Self {
            name: name.into(),
            email: email.into(),
            can_edit,
        }
    }
}

/// The target course repository and its policy flags.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Course {
    /// Database identifier of the course.
    pub id: CourseId,
    /// Absolute path of the course's working tree on disk.
    pub path: PathBuf,
    /// Remote repository location, if one is configured.
    ///
    /// Re-pointed before every edit so repository relocation since the
    /// last edit is handled transparently.
    pub repository: Option<String>,
    /// Branch the course tracks on the remote.
    pub branch: String,
    /// Whether this is the protected example course, which nobody may edit.
    pub example_course: bool,
}

impl Course {
    /// Create a course description.
    pub fn new(id: CourseId, path: PathBuf) -> Self {
        Self {
            id,
            path,
            repository: None,
            branch: "master".to_string(),
            example_course: false,
        }
    }

    /// Set the remote repository location.
    pub fn with_repository(mut self, repository: impl Into<String>) -> Self {
        self.repository = Some(repository.into());
        self
    }

    /// Set the tracked branch.
    pub fn with_branch(mut self, branch: impl Into<String>) -> Self {
        self.branch = branch.into();
        self
    }

    /// Mark this course as the protected example course.
    pub fn as_example_course(mut self) -> Self {
        self.example_course = true;
        self
    }
}
