//! edit::course_instance
//!
//! Edit operations on course instances: the dated offerings of a course,
//! each a directory under `courseInstances/` carrying an
//! `infoCourseInstance.json`.

use serde_json::json;

use super::entity;
use super::{assert_can_edit, EditError, EditOperation, WriteResult};
use crate::core::fsops;
use crate::core::naming;
use crate::core::paths::{check_contained, CoursePaths, COURSE_INSTANCE_INFO};
use crate::core::types::{Actor, Course, EntityId};

fn course_paths(course: &Course) -> CoursePaths {
    CoursePaths::new(course.path.clone())
}

/// Create a new course instance with a collision-free name.
pub struct CourseInstanceAdd {
    actor: Actor,
    course: Course,
    short_name: Option<String>,
    long_name: Option<String>,
}

impl CourseInstanceAdd {
    /// Create the operation. `short_name`/`long_name` of `None` use the
    /// anonymous default, which is numbered from its first use.
    pub fn new(
        actor: Actor,
        course: Course,
        short_name: Option<String>,
        long_name: Option<String>,
    ) -> Self {
        Self {
            actor,
            course,
            short_name,
            long_name,
        }
    }
}

impl EditOperation for CourseInstanceAdd {
    fn description(&self) -> String {
        "add course instance".to_string()
    }

    fn assert_can_edit(&self) -> Result<(), EditError> {
        assert_can_edit(&self.actor, &self.course)
    }

    fn write(&self) -> Result<Option<WriteResult>, EditError> {
        let paths = course_paths(&self.course);
        let root = paths.course_instances_root();
        let shorts = fsops::discover_short_names(&root, COURSE_INSTANCE_INFO)?;
        let longs = entity::collect_long_names(&root, &shorts, COURSE_INSTANCE_INFO, "longName");

        let pair = naming::unique_names(
            &shorts,
            &longs,
            self.short_name.as_deref(),
            self.long_name.as_deref(),
        );
        let dir = paths.course_instance_dir(&pair.short_name);
        check_contained(&root, &dir)?;

        let info = json!({
            "uuid": EntityId::generate().as_str(),
            "longName": pair.long_name,
            "allowAccess": [],
        });
        fsops::write_json_new(&paths.course_instance_info(&pair.short_name), &info)?;

        Ok(Some(WriteResult::new(
            [dir],
            format!("add course instance {}", pair.short_name),
        )))
    }
}

/// Copy an existing course instance under a fresh name and identifier.
pub struct CourseInstanceCopy {
    actor: Actor,
    course: Course,
    from_short_name: String,
}

impl CourseInstanceCopy {
    /// Create the operation.
    pub fn new(actor: Actor, course: Course, from_short_name: impl Into<String>) -> Self {
        Self {
            actor,
            course,
            from_short_name: from_short_name.into(),
        }
    }
}

impl EditOperation for CourseInstanceCopy {
    fn description(&self) -> String {
        format!("copy course instance {}", self.from_short_name)
    }

    fn assert_can_edit(&self) -> Result<(), EditError> {
        assert_can_edit(&self.actor, &self.course)
    }

    fn write(&self) -> Result<Option<WriteResult>, EditError> {
        let paths = course_paths(&self.course);
        let root = paths.course_instances_root();
        let src = paths.course_instance_dir(&self.from_short_name);
        if !src.is_dir() {
            return Err(EditError::MissingEntity {
                path: src.display().to_string(),
            });
        }

        let shorts = fsops::discover_short_names(&root, COURSE_INSTANCE_INFO)?;
        let longs = entity::collect_long_names(&root, &shorts, COURSE_INSTANCE_INFO, "longName");
        let old_long = entity::read_long_name(
            &paths.course_instance_info(&self.from_short_name),
            "longName",
        );

        let pair =
            naming::names_for_copy(&self.from_short_name, &shorts, old_long.as_deref(), &longs);
        let dst = paths.course_instance_dir(&pair.short_name);
        check_contained(&root, &dst)?;

        fsops::copy_tree_exclusive(&src, &dst)?;
        entity::rewrite_copied_info(
            &paths.course_instance_info(&pair.short_name),
            "longName",
            &pair.long_name,
        )?;

        Ok(Some(WriteResult::new(
            [dst],
            format!(
                "copy course instance {} to {}",
                self.from_short_name, pair.short_name
            ),
        )))
    }
}

/// Rename a course instance, pruning emptied ancestor directories.
pub struct CourseInstanceRename {
    actor: Actor,
    course: Course,
    from_short_name: String,
    to_short_name: String,
}

impl CourseInstanceRename {
    /// Create the operation.
    pub fn new(
        actor: Actor,
        course: Course,
        from_short_name: impl Into<String>,
        to_short_name: impl Into<String>,
    ) -> Self {
        Self {
            actor,
            course,
            from_short_name: from_short_name.into(),
            to_short_name: to_short_name.into(),
        }
    }
}

impl EditOperation for CourseInstanceRename {
    fn description(&self) -> String {
        format!(
            "rename course instance {} to {}",
            self.from_short_name, self.to_short_name
        )
    }

    fn assert_can_edit(&self) -> Result<(), EditError> {
        assert_can_edit(&self.actor, &self.course)
    }

    fn write(&self) -> Result<Option<WriteResult>, EditError> {
        let paths = course_paths(&self.course);
        let root = paths.course_instances_root();
        let old = paths.course_instance_dir(&self.from_short_name);
        let new = paths.course_instance_dir(&self.to_short_name);
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

        Ok(Some(WriteResult::new(
            [old, new],
            self.description(),
        )))
    }
}

/// Delete a course instance, pruning emptied ancestor directories.
pub struct CourseInstanceDelete {
    actor: Actor,
    course: Course,
    short_name: String,
}

impl CourseInstanceDelete {
    /// Create the operation.
    pub fn new(actor: Actor, course: Course, short_name: impl Into<String>) -> Self {
        Self {
            actor,
            course,
            short_name: short_name.into(),
        }
    }
}

impl EditOperation for CourseInstanceDelete {
    fn description(&self) -> String {
        format!("delete course instance {}", self.short_name)
    }

    fn assert_can_edit(&self) -> Result<(), EditError> {
        assert_can_edit(&self.actor, &self.course)
    }

    fn write(&self) -> Result<Option<WriteResult>, EditError> {
        let paths = course_paths(&self.course);
        let root = paths.course_instances_root();
        let dir = paths.course_instance_dir(&self.short_name);
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
