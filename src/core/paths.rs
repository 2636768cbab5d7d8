//! core::paths
//!
//! Path containment checking and centralized routing for course storage
//! locations.
//!
//! # Architecture
//!
//! Every filesystem mutation whose target path is derived even indirectly
//! from caller input (renamed paths, uploaded-file paths, per-file edits,
//! deletion targets) must pass [`check_contained`] before anything is
//! written. A failed check raises [`PathViolation`] carrying both the
//! offending path and the root, and it is raised fail-fast: no partial
//! mutation can have occurred.
//!
//! **Hard rule:** no module outside this one may concatenate course layout
//! strings. All storage locations are computed through [`CoursePaths`].
//!
//! # Storage Layout
//!
//! A course working tree is laid out as:
//! - `infoCourse.json` - course metadata
//! - `questions/<qid>/info.json` - one directory per question
//! - `courseInstances/<ciid>/infoCourseInstance.json` - one per instance
//! - `courseInstances/<ciid>/assessments/<aid>/infoAssessment.json`
//!
//! Question and assessment ids may contain `/`, nesting their directories.
//!
//! # Example
//!
//! ```
//! use coursewright::core::paths::{contains, CoursePaths};
//! use std::path::{Path, PathBuf};
//!
//! assert!(contains(Path::new("/course"), Path::new("/course/questions/q1")));
//! assert!(!contains(Path::new("/course"), Path::new("/course/../etc")));
//!
//! let paths = CoursePaths::new(PathBuf::from("/course"));
//! assert_eq!(
//!     paths.question_info("unit1/q1"),
//!     PathBuf::from("/course/questions/unit1/q1/info.json")
//! );
//! ```

use std::path::{Component, Path, PathBuf};

use thiserror::Error;

/// Info-file basename for a question directory.
pub const QUESTION_INFO: &str = "info.json";
/// Info-file basename for an assessment directory.
pub const ASSESSMENT_INFO: &str = "infoAssessment.json";
/// Info-file basename for a course-instance directory.
pub const COURSE_INSTANCE_INFO: &str = "infoCourseInstance.json";
/// Info-file basename for the course root.
pub const COURSE_INFO: &str = "infoCourse.json";

/// A computed path escaped its designated root.
///
/// Raised before any write occurs, so a violation never leaves partial
/// state behind.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("path {path} is not contained in {root}")]
pub struct PathViolation {
    /// The offending path.
    pub path: String,
    /// The root it was required to stay within.
    pub root: String,
}

/// Lexically normalize a path: drop `.` segments and resolve `..` against
/// preceding segments. A `..` that cannot be resolved (it would climb past
/// the start of the path) is kept, which makes the escape visible to the
/// containment check.
pub fn normalize(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                let popped = matches!(
                    out.components().next_back(),
                    Some(Component::Normal(_))
                ) && out.pop();
                if !popped {
                    out.push("..");
                }
            }
            other => out.push(other.as_os_str()),
        }
    }
    out
}

/// Check whether `candidate` is `root` itself or a path-separator-bounded
/// descendant of it, after lexical normalization of both paths.
pub fn contains(root: &Path, candidate: &Path) -> bool {
    let root = normalize(root);
    let candidate = normalize(candidate);
    if candidate
        .components()
        .any(|c| matches!(c, Component::ParentDir))
    {
        // Unresolvable `..` segments always escape.
        return false;
    }
    candidate.starts_with(&root)
}

/// Require that `candidate` is contained in `root`.
///
/// # Errors
///
/// Returns [`PathViolation`] naming both paths if the check fails.
pub fn check_contained(root: &Path, candidate: &Path) -> Result<(), PathViolation> {
    if contains(root, candidate) {
        Ok(())
    } else {
        Err(PathViolation {
            path: candidate.display().to_string(),
            root: root.display().to_string(),
        })
    }
}

/// Join a slash-separated relative id onto a base path, one segment at a
/// time, so ids nest naturally on every platform.
pub fn join_relative(base: &Path, relative: &str) -> PathBuf {
    relative
        .split('/')
        .filter(|s| !s.is_empty())
        .fold(base.to_path_buf(), |p, seg| p.join(seg))
}

/// Centralized path routing for a course working tree.
///
/// # Invariants
///
/// - All entity storage locations are computed here, never ad hoc
/// - Entity ids are slash-separated and platform-independent
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CoursePaths {
    root: PathBuf,
}

impl CoursePaths {
    /// Create path routing for a course rooted at `root`.
    pub fn new(root: PathBuf) -> Self {
        Self { root }
    }

    /// The course root directory.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// The course's own info file.
    pub fn course_info(&self) -> PathBuf {
        self.root.join(COURSE_INFO)
    }

    /// Root directory holding all questions.
    pub fn questions_root(&self) -> PathBuf {
        self.root.join("questions")
    }

    /// Root directory holding all course instances.
    pub fn course_instances_root(&self) -> PathBuf {
        self.root.join("courseInstances")
    }

    /// Directory of one question.
    pub fn question_dir(&self, qid: &str) -> PathBuf {
        join_relative(&self.questions_root(), qid)
    }

    /// Info file of one question.
    pub fn question_info(&self, qid: &str) -> PathBuf {
        self.question_dir(qid).join(QUESTION_INFO)
    }

    /// Directory of one course instance.
    pub fn course_instance_dir(&self, ciid: &str) -> PathBuf {
        join_relative(&self.course_instances_root(), ciid)
    }

    /// Info file of one course instance.
    pub fn course_instance_info(&self, ciid: &str) -> PathBuf {
        self.course_instance_dir(ciid).join(COURSE_INSTANCE_INFO)
    }

    /// Root directory holding one course instance's assessments.
    pub fn assessments_root(&self, ciid: &str) -> PathBuf {
        self.course_instance_dir(ciid).join("assessments")
    }

    /// Directory of one assessment.
    pub fn assessment_dir(&self, ciid: &str, aid: &str) -> PathBuf {
        join_relative(&self.assessments_root(ciid), aid)
    }

    /// Info file of one assessment.
    pub fn assessment_info(&self, ciid: &str, aid: &str) -> PathBuf {
        self.assessment_dir(ciid, aid).join(ASSESSMENT_INFO)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    mod containment {
        use super::*;

        #[test]
        fn root_contains_itself() {
            assert!(contains(Path::new("/course"), Path::new("/course")));
        }

        #[test]
        fn direct_and_nested_descendants() {
            assert!(contains(Path::new("/course"), Path::new("/course/q")));
            assert!(contains(
                Path::new("/course"),
                Path::new("/course/questions/unit1/q1")
            ));
        }

        #[test]
        fn sibling_is_outside() {
            assert!(!contains(Path::new("/course"), Path::new("/course2")));
            // Prefix match without a separator boundary must not count.
            assert!(!contains(
                Path::new("/course"),
                Path::new("/coursesecret/file")
            ));
        }

        #[test]
        fn ancestor_is_outside() {
            assert!(!contains(Path::new("/course/questions"), Path::new("/course")));
            assert!(!contains(Path::new("/course"), Path::new("/")));
        }

        #[test]
        fn dotdot_that_escapes_is_outside() {
            assert!(!contains(
                Path::new("/course"),
                Path::new("/course/../etc/passwd")
            ));
            assert!(!contains(
                Path::new("/course"),
                Path::new("/course/a/../../other")
            ));
        }

        #[test]
        fn dotdot_that_resolves_inside_is_ok() {
            assert!(contains(
                Path::new("/course"),
                Path::new("/course/a/../b")
            ));
        }

        #[test]
        fn curdir_segments_are_ignored() {
            assert!(contains(
                Path::new("/course/."),
                Path::new("/course/./questions")
            ));
        }

        #[test]
        fn violation_carries_both_paths() {
            let err = check_contained(Path::new("/course"), Path::new("/etc")).unwrap_err();
            assert_eq!(err.root, "/course");
            assert_eq!(err.path, "/etc");
            assert!(err.to_string().contains("/etc"));
            assert!(err.to_string().contains("/course"));
        }
    }

    mod routing {
        use super::*;

        fn paths() -> CoursePaths {
            CoursePaths::new(PathBuf::from("/course"))
        }

        #[test]
        fn question_locations() {
            assert_eq!(paths().questions_root(), PathBuf::from("/course/questions"));
            assert_eq!(
                paths().question_info("q1"),
                PathBuf::from("/course/questions/q1/info.json")
            );
        }

        #[test]
        fn nested_ids_become_nested_directories() {
            assert_eq!(
                paths().question_dir("unit1/part2/q3"),
                PathBuf::from("/course/questions/unit1/part2/q3")
            );
        }

        #[test]
        fn course_instance_locations() {
            assert_eq!(
                paths().course_instance_info("Fa24"),
                PathBuf::from("/course/courseInstances/Fa24/infoCourseInstance.json")
            );
            assert_eq!(
                paths().assessment_info("Fa24", "hw1"),
                PathBuf::from(
                    "/course/courseInstances/Fa24/assessments/hw1/infoAssessment.json"
                )
            );
        }

        #[test]
        fn all_locations_are_contained_in_root() {
            let p = paths();
            for candidate in [
                p.course_info(),
                p.question_info("q1"),
                p.assessment_dir("Fa24", "exams/final"),
            ] {
                assert!(contains(p.root(), &candidate));
            }
        }
    }
}
