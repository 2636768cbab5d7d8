//! edit
//!
//! The uniform edit-operation contract and its concrete variants.
//!
//! # Architecture
//!
//! Every mutation of a course working tree is expressed as one
//! [`EditOperation`]: a capability with exactly two methods. The
//! coordinator never knows which variant it is running; it only calls
//! `assert_can_edit` before touching anything and `write` inside the
//! locked, version-controlled critical section.
//!
//! Variants are a closed set of strategy objects rather than an
//! inheritance chain. The shared authorization check lives in
//! [`assert_can_edit`] and variants call it, layering their own
//! path-containment checks on top where they touch restricted roots.
//!
//! # Modules
//!
//! - [`course_instance`] - add / copy / rename / delete of course instances
//! - [`assessment`] - add / copy / rename / delete of assessments
//! - [`question`] - add / copy / delete / rename-with-reference-rewrite
//! - [`file`] - upload / modify / rename / delete of single files
//! - [`multi`] - ordered composite of several operations

pub mod assessment;
pub mod course_instance;
mod entity;
pub mod file;
pub mod multi;
pub mod question;

use std::collections::BTreeSet;
use std::path::PathBuf;

use thiserror::Error;

use crate::core::fsops::FsError;
use crate::core::paths::PathViolation;
use crate::core::types::{Actor, Course};

/// Errors from edit operations.
#[derive(Debug, Error)]
pub enum EditError {
    /// The actor lacks permission, or the target is the example course.
    #[error("not authorized: {0}")]
    Unauthorized(String),

    /// A computed path escaped its designated root.
    #[error(transparent)]
    PathViolation(#[from] PathViolation),

    /// The exclusive-create target already exists: a racing editor got
    /// there first.
    #[error("name collision: {path}")]
    NameCollision {
        /// The path that already exists.
        path: String,
    },

    /// Another user changed the file since the caller read it.
    #[error("another user made changes to the file you were editing: {path}")]
    StaleEdit {
        /// The file whose hash no longer matches.
        path: String,
    },

    /// The operation's source entity does not exist.
    #[error("no such entity: {path}")]
    MissingEntity {
        /// The missing path.
        path: String,
    },

    /// Filesystem failure.
    #[error(transparent)]
    Fs(FsError),
}

impl From<FsError> for EditError {
    fn from(err: FsError) -> Self {
        match err {
            FsError::AlreadyExists { path } => EditError::NameCollision { path },
            other => EditError::Fs(other),
        }
    }
}

/// The staged outcome of one successful `write`.
///
/// `None` from `write` means "no change, skip commit"; this struct is the
/// non-trivial case.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WriteResult {
    /// Absolute paths to stage for commit. Additions, modifications, and
    /// removals alike: the version-control runner stages whatever state
    /// each path is in.
    pub paths_to_add: BTreeSet<PathBuf>,
    /// Commit message describing the edit.
    pub commit_message: String,
}

impl WriteResult {
    /// Build a result from an iterator of paths and a message.
    pub fn new(
        paths: impl IntoIterator<Item = PathBuf>,
        commit_message: impl Into<String>,
    ) -> Self {
        Self {
            paths_to_add: paths.into_iter().collect(),
            commit_message: commit_message.into(),
        }
    }
}

/// One logical change to a course working tree.
///
/// Implementations compute and stage exactly one change. They must raise
/// every authorization and containment error before mutating anything;
/// failures inside `write` may leave only what that call already wrote.
pub trait EditOperation {
    /// Human-readable description of the operation, used in job logs.
    fn description(&self) -> String;

    /// Check that the actor may perform this operation.
    ///
    /// # Errors
    ///
    /// Returns [`EditError::Unauthorized`] or [`EditError::PathViolation`];
    /// never mutates.
    fn assert_can_edit(&self) -> Result<(), EditError>;

    /// Apply the change to the working tree.
    ///
    /// Returns `Ok(None)` when the operation turned out to be a no-op
    /// (byte-identical upload, rename onto itself), signalling the
    /// coordinator to skip the commit.
    fn write(&self) -> Result<Option<WriteResult>, EditError>;
}

/// The base authorization check shared by every variant.
///
/// # Errors
///
/// Returns [`EditError::Unauthorized`] if the actor lacks course-edit
/// permission or the target is the protected example course.
pub fn assert_can_edit(actor: &Actor, course: &Course) -> Result<(), EditError> {
    if !actor.can_edit {
        return Err(EditError::Unauthorized(
            "user does not have permission to edit this course".into(),
        ));
    }
    if course.example_course {
        return Err(EditError::Unauthorized(
            "the example course cannot be edited".into(),
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::types::CourseId;

    fn actor(can_edit: bool) -> Actor {
        Actor::new("Ada", "ada@example.com", can_edit)
    }

    fn course(example: bool) -> Course {
        let c = Course::new(CourseId::new("1"), PathBuf::from("/course"));
        if example {
            c.as_example_course()
        } else {
            c
        }
    }

    #[test]
    fn editor_with_permission_passes() {
        assert!(assert_can_edit(&actor(true), &course(false)).is_ok());
    }

    #[test]
    fn missing_permission_is_rejected() {
        let err = assert_can_edit(&actor(false), &course(false)).unwrap_err();
        assert!(matches!(err, EditError::Unauthorized(_)));
    }

    #[test]
    fn example_course_is_protected_even_for_editors() {
        let err = assert_can_edit(&actor(true), &course(true)).unwrap_err();
        assert!(err.to_string().contains("example course"));
    }

    #[test]
    fn already_exists_maps_to_name_collision() {
        let err: EditError = FsError::AlreadyExists {
            path: "/course/questions/q1".into(),
        }
        .into();
        assert!(matches!(err, EditError::NameCollision { .. }));
    }
}
