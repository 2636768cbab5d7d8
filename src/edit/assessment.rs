//! edit::assessment
//!
//! Edit operations on assessments: graded activities inside one course
//! instance, each a directory under the instance's `assessments/` carrying
//! an `infoAssessment.json`.

use serde_json::json;

use super::entity;
use super::{assert_can_edit, EditError, EditOperation, WriteResult};
use crate::core::fsops;
use crate::core::naming;
use crate::core::paths::{check_contained, CoursePaths, ASSESSMENT_INFO};
use crate::core::types::{Actor, Course, EntityId};

fn course_paths(course: &Course) -> CoursePaths {
    CoursePaths::new(course.path.clone())
}

/// Create a new assessment with a collision-free name.
pub struct AssessmentAdd {
    actor: Actor,
    course: Course,
    course_instance: String,
    short_name: Option<String>,
    long_name: Option<String>,
}

impl AssessmentAdd {
    /// Create the operation.
    pub fn new(
        actor: Actor,
        course: Course,
        course_instance: impl Into<String>,
        short_name: Option<String>,
        long_name: Option<String>,
    ) -> Self {
        Self {
            actor,
            course,
            course_instance: course_instance.into(),
            short_name,
            long_name,
        }
    }
}

impl EditOperation for AssessmentAdd {
    fn description(&self) -> String {
        format!("add assessment in {}", self.course_instance)
    }

    fn assert_can_edit(&self) -> Result<(), EditError> {
        assert_can_edit(&self.actor, &self.course)
    }

    fn write(&self) -> Result<Option<WriteResult>, EditError> {
        let paths = course_paths(&self.course);
        let root = paths.assessments_root(&self.course_instance);
        let shorts = fsops::discover_short_names(&root, ASSESSMENT_INFO)?;
        let longs = entity::collect_long_names(&root, &shorts, ASSESSMENT_INFO, "title");

        let pair = naming::unique_names(
            &shorts,
            &longs,
            self.short_name.as_deref(),
            self.long_name.as_deref(),
        );
        let dir = paths.assessment_dir(&self.course_instance, &pair.short_name);
        check_contained(&root, &dir)?;

        let info = json!({
            "uuid": EntityId::generate().as_str(),
            "type": "Homework",
            "title": pair.long_name,
            "set": "Homework",
        });
        fsops::write_json_new(
            &paths.assessment_info(&self.course_instance, &pair.short_name),
            &info,
        )?;

        Ok(Some(WriteResult::new(
            [dir],
            format!(
                "add assessment {} in {}",
                pair.short_name, self.course_instance
            ),
        )))
    }
}

/// Copy an existing assessment under a fresh name and identifier.
pub struct AssessmentCopy {
    actor: Actor,
    course: Course,
    course_instance: String,
    from_short_name: String,
}

impl AssessmentCopy {
    /// Create the operation.
    pub fn new(
        actor: Actor,
        course: Course,
        course_instance: impl Into<String>,
        from_short_name: impl Into<String>,
    ) -> Self {
        Self {
            actor,
            course,
            course_instance: course_instance.into(),
            from_short_name: from_short_name.into(),
        }
    }
}

impl EditOperation for AssessmentCopy {
    fn description(&self) -> String {
        format!(
            "copy assessment {} in {}",
            self.from_short_name, self.course_instance
        )
    }

    fn assert_can_edit(&self) -> Result<(), EditError> {
        assert_can_edit(&self.actor, &self.course)
    }

    fn write(&self) -> Result<Option<WriteResult>, EditError> {
        let paths = course_paths(&self.course);
        let root = paths.assessments_root(&self.course_instance);
        let src = paths.assessment_dir(&self.course_instance, &self.from_short_name);
        if !src.is_dir() {
            return Err(EditError::MissingEntity {
                path: src.display().to_string(),
            });
        }

        let shorts = fsops::discover_short_names(&root, ASSESSMENT_INFO)?;
        let longs = entity::collect_long_names(&root, &shorts, ASSESSMENT_INFO, "title");
        let old_long = entity::read_long_name(
            &paths.assessment_info(&self.course_instance, &self.from_short_name),
            "title",
        );

        let pair =
            naming::names_for_copy(&self.from_short_name, &shorts, old_long.as_deref(), &longs);
        let dst = paths.assessment_dir(&self.course_instance, &pair.short_name);
        check_contained(&root, &dst)?;

        fsops::copy_tree_exclusive(&src, &dst)?;
        entity::rewrite_copied_info(
            &paths.assessment_info(&self.course_instance, &pair.short_name),
            "title",
            &pair.long_name,
        )?;

        Ok(Some(WriteResult::new(
            [dst],
            format!(
                "copy assessment {} to {} in {}",
                self.from_short_name, pair.short_name, self.course_instance
            ),
        )))
    }
}

/// Rename an assessment, pruning emptied ancestor directories.
pub struct AssessmentRename {
    actor: Actor,
    course: Course,
    course_instance: String,
    from_short_name: String,
    to_short_name: String,
}

impl AssessmentRename {
    /// Create the operation.
    pub fn new(
        actor: Actor,
        course: Course,
        course_instance: impl Into<String>,
        from_short_name: impl Into<String>,
        to_short_name: impl Into<String>,
    ) -> Self {
        Self {
            actor,
            course,
            course_instance: course_instance.into(),
            from_short_name: from_short_name.into(),
            to_short_name: to_short_name.into(),
        }
    }
}

impl EditOperation for AssessmentRename {
    fn description(&self) -> String {
        format!(
            "rename assessment {} to {} in {}",
            self.from_short_name, self.to_short_name, self.course_instance
        )
    }

    fn assert_can_edit(&self) -> Result<(), EditError> {
        assert_can_edit(&self.actor, &self.course)
    }

    fn write(&self) -> Result<Option<WriteResult>, EditError> {
        let paths = course_paths(&self.course);
        let root = paths.assessments_root(&self.course_instance);
        let old = paths.assessment_dir(&self.course_instance, &self.from_short_name);
        let new = paths.assessment_dir(&self.course_instance, &self.to_short_name);
        if old == new {
            return Ok(None);
        }
        check_contained(&root, &new)?;
        if !old.is_dir() {
            return Err(EditError::MissingEntity {
                path: old.display().to_string(),
            });
        }
        if new.exists() {
            return Err(EditError::NameCollision {
                path: new.display().to_string(),
            });
        }

        fsops::move_tree(&old, &new)?;
        fsops::prune_empty_ancestors(&root, &self.from_short_name)?;

        Ok(Some(WriteResult::new([old, new], self.description())))
    }
}

/// Delete an assessment, pruning emptied ancestor directories.
pub struct AssessmentDelete {
    actor: Actor,
    course: Course,
    course_instance: String,
    short_name: String,
}

impl AssessmentDelete {
    /// Create the operation.
    pub fn new(
        actor: Actor,
        course: Course,
        course_instance: impl Into<String>,
        short_name: impl Into<String>,
    ) -> Self {
        Self {
            actor,
            course,
            course_instance: course_instance.into(),
            short_name: short_name.into(),
        }
    }
}

impl EditOperation for AssessmentDelete {
    fn description(&self) -> String {
        format!(
            "delete assessment {} in {}",
            self.short_name, self.course_instance
        )
    }

    fn assert_can_edit(&self) -> Result<(), EditError> {
        assert_can_edit(&self.actor, &self.course)
    }

    fn write(&self) -> Result<Option<WriteResult>, EditError> {
        let paths = course_paths(&self.course);
        let root = paths.assessments_root(&self.course_instance);
        let dir = paths.assessment_dir(&self.course_instance, &self.short_name);
        if !dir.is_dir() {
            return Err(EditError::MissingEntity {
                path: dir.display().to_string(),
            });
        }

        fsops::remove_tree(&dir)?;
        fsops::prune_empty_ancestors(&root, &self.short_name)?;

        Ok(Some(WriteResult::new([dir], self.description())))
    }
}
