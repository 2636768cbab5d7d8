//! sync
//!
//! Collaborator seams around the edit protocol: the disk-to-database sync
//! engine, the full-course loader, and the sharing-configuration
//! validator. The coordinator consumes all three as traits; only the
//! loader has a concrete implementation here, because the coordinator
//! itself needs a parsed snapshot for sharing validation and for handing
//! to the sync engine without a redundant disk read.

use std::collections::BTreeMap;
use std::path::Path;

use serde_json::Value;
use thiserror::Error;

use crate::core::fsops::{self, FsError};
use crate::core::paths::{CoursePaths, ASSESSMENT_INFO, COURSE_INSTANCE_INFO, QUESTION_INFO};
use crate::core::types::{CommitHash, CourseId};
use crate::engine::job::JobLogger;

/// Errors from loading or syncing course content.
#[derive(Debug, Error)]
pub enum SyncError {
    /// Filesystem failure while reading course content.
    #[error(transparent)]
    Fs(#[from] FsError),

    /// The sync engine failed.
    #[error("sync failed: {0}")]
    Failed(String),
}

/// Fully parsed in-memory course content at one point in time.
///
/// Created fresh per edit request. Info files that fail to parse are
/// recorded rather than failing the load; downstream consumers decide
/// how strict to be.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CourseSnapshot {
    /// The course's own info file, if readable.
    pub course: Option<Value>,
    /// Question info keyed by question id.
    pub questions: BTreeMap<String, Value>,
    /// Course-instance info keyed by instance id.
    pub course_instances: BTreeMap<String, Value>,
    /// Assessment info keyed by (instance id, assessment id).
    pub assessments: BTreeMap<(String, String), Value>,
    /// Info files that failed to parse, by path.
    pub json_errors: Vec<String>,
}

impl CourseSnapshot {
    /// Whether any info file failed to parse during the load.
    pub fn had_json_errors(&self) -> bool {
        !self.json_errors.is_empty()
    }
}

/// Loads a full course from disk into a [`CourseSnapshot`].
pub trait CourseLoader {
    /// Parse every info file under `course_path`.
    fn load(&self, course_id: &CourseId, course_path: &Path) -> Result<CourseSnapshot, SyncError>;
}

/// Validates the sharing configuration of a snapshot.
///
/// Diagnostics go to the job log; the boolean gates whether a push is
/// allowed to stand.
pub trait SharingValidator {
    /// Whether the snapshot's sharing configuration is consistent.
    fn validate(
        &self,
        course_id: &CourseId,
        snapshot: &CourseSnapshot,
        job: &mut dyn JobLogger,
    ) -> bool;
}

/// Status reported by the sync engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncStatus {
    /// The database reflects the disk state.
    Complete,
    /// Sync completed but recorded a sharing inconsistency.
    SharingError,
}

/// Result of one disk-to-database sync pass.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncOutcome {
    /// Terminal status of the pass.
    pub status: SyncStatus,
    /// Whether any info file had JSON errors.
    pub had_json_errors: bool,
}

/// The disk-to-database sync engine.
///
/// Runs unconditionally at the end of every coordinated edit, so the
/// database never drifts further out of sync than the actual disk state,
/// even when an earlier phase failed.
pub trait SyncEngine {
    /// Synchronize the database with the on-disk course content.
    ///
    /// `start_commit` is the pre-edit commit used as the diff baseline
    /// (absent in disk-only mode); `snapshot` is an optional preloaded
    /// parse of the course, reused to avoid a second disk read.
    fn sync(
        &self,
        course_id: &CourseId,
        course_path: &Path,
        job: &mut dyn JobLogger,
        start_commit: Option<&CommitHash>,
        snapshot: Option<&CourseSnapshot>,
    ) -> Result<SyncOutcome, SyncError>;
}

/// The default loader: walks the course layout and parses every info file.
#[derive(Debug, Default, Clone, Copy)]
pub struct DiskCourseLoader;

impl DiskCourseLoader {
    fn read_tolerant(path: &Path, snapshot: &mut CourseSnapshot) -> Option<Value> {
        match fsops::read_json(path) {
            Ok(value) => Some(value),
            Err(FsError::Json { path, .. }) => {
                snapshot.json_errors.push(path);
                None
            }
            Err(_) => None,
        }
    }
}

impl CourseLoader for DiskCourseLoader {
    fn load(&self, _course_id: &CourseId, course_path: &Path) -> Result<CourseSnapshot, SyncError> {
        let paths = CoursePaths::new(course_path.to_path_buf());
        let mut snapshot = CourseSnapshot::default();

        if paths.course_info().is_file() {
            snapshot.course = Self::read_tolerant(&paths.course_info(), &mut snapshot);
        }

        for qid in fsops::discover_short_names(&paths.questions_root(), QUESTION_INFO)? {
            if let Some(value) = Self::read_tolerant(&paths.question_info(&qid), &mut snapshot) {
                snapshot.questions.insert(qid, value);
            }
        }

        for ciid in
            fsops::discover_short_names(&paths.course_instances_root(), COURSE_INSTANCE_INFO)?
        {
            if let Some(value) =
                Self::read_tolerant(&paths.course_instance_info(&ciid), &mut snapshot)
            {
                snapshot.course_instances.insert(ciid.clone(), value);
            }
            for aid in
                fsops::discover_short_names(&paths.assessments_root(&ciid), ASSESSMENT_INFO)?
            {
                if let Some(value) =
                    Self::read_tolerant(&paths.assessment_info(&ciid, &aid), &mut snapshot)
                {
                    snapshot.assessments.insert((ciid.clone(), aid), value);
                }
            }
        }

        Ok(snapshot)
    }
}
