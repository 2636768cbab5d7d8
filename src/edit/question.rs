//! edit::question
//!
//! Edit operations on questions, each a directory under `questions/`
//! carrying an `info.json`.
//!
//! Renaming a question is the one operation that reaches outside its own
//! directory: every assessment in every course instance may reference the
//! question by id, either through a plain `id` field or inside a nested
//! `alternatives` group, and those references are rewritten best-effort.
//! An assessment file that cannot be parsed is logged and skipped rather
//! than failing the rename; metadata-reference consistency is not
//! transactional.

use std::collections::BTreeSet;
use std::path::PathBuf;

use serde_json::{json, Value};
use tracing::warn;

use super::entity;
use super::{assert_can_edit, EditError, EditOperation, WriteResult};
use crate::core::fsops;
use crate::core::naming;
use crate::core::paths::{
    check_contained, CoursePaths, ASSESSMENT_INFO, COURSE_INSTANCE_INFO, QUESTION_INFO,
};
use crate::core::types::{Actor, Course, EntityId};

fn course_paths(course: &Course) -> CoursePaths {
    CoursePaths::new(course.path.clone())
}

/// Create a new question with a collision-free name.
pub struct QuestionAdd {
    actor: Actor,
    course: Course,
    short_name: Option<String>,
    long_name: Option<String>,
}

impl QuestionAdd {
    /// Create the operation.
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

impl EditOperation for QuestionAdd {
    fn description(&self) -> String {
        "add question".to_string()
    }

    fn assert_can_edit(&self) -> Result<(), EditError> {
        assert_can_edit(&self.actor, &self.course)
    }

    fn write(&self) -> Result<Option<WriteResult>, EditError> {
        let paths = course_paths(&self.course);
        let root = paths.questions_root();
        let shorts = fsops::discover_short_names(&root, QUESTION_INFO)?;
        let longs = entity::collect_long_names(&root, &shorts, QUESTION_INFO, "title");

        let pair = naming::unique_names(
            &shorts,
            &longs,
            self.short_name.as_deref(),
            self.long_name.as_deref(),
        );
        let dir = paths.question_dir(&pair.short_name);
        check_contained(&root, &dir)?;

        let info = json!({
            "uuid": EntityId::generate().as_str(),
            "title": pair.long_name,
            "topic": "Default",
            "type": "v3",
        });
        fsops::write_json_new(&paths.question_info(&pair.short_name), &info)?;

        Ok(Some(WriteResult::new(
            [dir],
            format!("add question {}", pair.short_name),
        )))
    }
}

/// Copy an existing question under a fresh name and identifier.
///
/// The copy gets a new opaque identifier and loses every sharing
/// declaration; shared content must be re-shared deliberately, never
/// inherited by duplication.
pub struct QuestionCopy {
    actor: Actor,
    course: Course,
    from_short_name: String,
}

impl QuestionCopy {
    /// Create the operation.
    pub fn new(actor: Actor, course: Course, from_short_name: impl Into<String>) -> Self {
        Self {
            actor,
            course,
            from_short_name: from_short_name.into(),
        }
    }
}

impl EditOperation for QuestionCopy {
    fn description(&self) -> String {
        format!("copy question {}", self.from_short_name)
    }

    fn assert_can_edit(&self) -> Result<(), EditError> {
        assert_can_edit(&self.actor, &self.course)
    }

    fn write(&self) -> Result<Option<WriteResult>, EditError> {
        let paths = course_paths(&self.course);
        let root = paths.questions_root();
        let src = paths.question_dir(&self.from_short_name);
        if !src.is_dir() {
            return Err(EditError::MissingEntity {
                path: src.display().to_string(),
            });
        }

        let shorts = fsops::discover_short_names(&root, QUESTION_INFO)?;
        let longs = entity::collect_long_names(&root, &shorts, QUESTION_INFO, "title");
        let old_long =
            entity::read_long_name(&paths.question_info(&self.from_short_name), "title");

        let pair =
            naming::names_for_copy(&self.from_short_name, &shorts, old_long.as_deref(), &longs);
        let dst = paths.question_dir(&pair.short_name);
        check_contained(&root, &dst)?;

        fsops::copy_tree_exclusive(&src, &dst)?;
        entity::rewrite_copied_info(
            &paths.question_info(&pair.short_name),
            "title",
            &pair.long_name,
        )?;

        Ok(Some(WriteResult::new(
            [dst],
            format!(
                "copy question {} to {}",
                self.from_short_name, pair.short_name
            ),
        )))
    }
}

/// Delete a question, pruning emptied ancestor directories.
pub struct QuestionDelete {
    actor: Actor,
    course: Course,
    short_name: String,
}

impl QuestionDelete {
    /// Create the operation.
    pub fn new(actor: Actor, course: Course, short_name: impl Into<String>) -> Self {
        Self {
            actor,
            course,
            short_name: short_name.into(),
        }
    }
}

impl EditOperation for QuestionDelete {
    fn description(&self) -> String {
        format!("delete question {}", self.short_name)
    }

    fn assert_can_edit(&self) -> Result<(), EditError> {
        assert_can_edit(&self.actor, &self.course)
    }

    fn write(&self) -> Result<Option<WriteResult>, EditError> {
        let paths = course_paths(&self.course);
        let root = paths.questions_root();
        let dir = paths.question_dir(&self.short_name);
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

/// Rename a question and rewrite every assessment reference to it.
pub struct QuestionRename {
    actor: Actor,
    course: Course,
    from_short_name: String,
    to_short_name: String,
}

impl QuestionRename {
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

    /// Rewrite references in every assessment's metadata, returning the
    /// info files that were modified.
    fn rewrite_references(&self, paths: &CoursePaths) -> Result<Vec<PathBuf>, EditError> {
        let mut modified = Vec::new();
        let instances = fsops::discover_short_names(
            &paths.course_instances_root(),
            COURSE_INSTANCE_INFO,
        )?;
        for ciid in &instances {
            let assessments =
                fsops::discover_short_names(&paths.assessments_root(ciid), ASSESSMENT_INFO)?;
            for aid in &assessments {
                let info_path = paths.assessment_info(ciid, aid);
                let mut info = match fsops::read_json(&info_path) {
                    Ok(info) => info,
                    Err(err) => {
                        warn!(
                            assessment = %info_path.display(),
                            error = %err,
                            "skipping unreadable assessment metadata during question rename"
                        );
                        continue;
                    }
                };
                if rewrite_question_ids(&mut info, &self.from_short_name, &self.to_short_name) {
                    fsops::write_json(&info_path, &info)?;
                    modified.push(info_path);
                }
            }
        }
        Ok(modified)
    }
}

/// Replace `old` question ids with `new` in an assessment's metadata,
/// covering both plain `id` fields and nested `alternatives` groups.
/// Returns whether anything changed.
fn rewrite_question_ids(info: &mut Value, old: &str, new: &str) -> bool {
    let mut changed = false;
    let Some(zones) = info.get_mut("zones").and_then(Value::as_array_mut) else {
        return false;
    };
    for zone in zones {
        let Some(questions) = zone.get_mut("questions").and_then(Value::as_array_mut) else {
            continue;
        };
        for question in questions.iter_mut() {
            let Some(entry) = question.as_object_mut() else {
                continue;
            };
            if entry.get("id").and_then(Value::as_str) == Some(old) {
                entry.insert("id".to_string(), Value::String(new.to_string()));
                changed = true;
            }
            if let Some(alternatives) = entry.get_mut("alternatives").and_then(Value::as_array_mut)
            {
                for alternative in alternatives.iter_mut() {
                    let Some(alt) = alternative.as_object_mut() else {
                        continue;
                    };
                    if alt.get("id").and_then(Value::as_str) == Some(old) {
                        alt.insert("id".to_string(), Value::String(new.to_string()));
                        changed = true;
                    }
                }
            }
        }
    }
    changed
}

impl EditOperation for QuestionRename {
    fn description(&self) -> String {
        format!(
            "rename question {} to {}",
            self.from_short_name, self.to_short_name
        )
    }

    fn assert_can_edit(&self) -> Result<(), EditError> {
        assert_can_edit(&self.actor, &self.course)
    }

    fn write(&self) -> Result<Option<WriteResult>, EditError> {
        let paths = course_paths(&self.course);
        let root = paths.questions_root();
        let old = paths.question_dir(&self.from_short_name);
        let new = paths.question_dir(&self.to_short_name);
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

        let mut staged: BTreeSet<PathBuf> = [old, new].into_iter().collect();
        staged.extend(self.rewrite_references(&paths)?);

        Ok(Some(WriteResult {
            paths_to_add: staged,
            commit_message: self.description(),
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::fsops::read_json;
    use crate::core::types::CourseId;
    use std::path::Path;
    use tempfile::TempDir;

    fn actor() -> Actor {
        Actor::new("Ada", "ada@example.com", true)
    }

    fn course(root: &Path) -> Course {
        Course::new(CourseId::new("1"), root.to_path_buf())
    }

    fn seed_question(root: &Path, qid: &str, title: &str) {
        let dir = crate::core::paths::join_relative(&root.join("questions"), qid);
        std::fs::create_dir_all(&dir).unwrap();
        fsops::write_json(
            &dir.join(QUESTION_INFO),
            &json!({
                "uuid": format!("uuid-{qid}"),
                "title": title,
                "sharingSets": ["network"],
                "sharePublicly": true
            }),
        )
        .unwrap();
    }

    fn seed_assessment(root: &Path, ci: &str, aid: &str, info: Value) {
        let dir = root
            .join("courseInstances")
            .join(ci)
            .join("assessments")
            .join(aid);
        std::fs::create_dir_all(&dir).unwrap();
        fsops::write_json(&dir.join(ASSESSMENT_INFO), &info).unwrap();
        // The instance needs its own info file to be discoverable.
        let ci_info = root
            .join("courseInstances")
            .join(ci)
            .join(COURSE_INSTANCE_INFO);
        if !ci_info.exists() {
            fsops::write_json(&ci_info, &json!({"uuid": format!("uuid-{ci}"), "longName": ci}))
                .unwrap();
        }
    }

    #[test]
    fn copy_strips_sharing_declarations() {
        let temp = TempDir::new().unwrap();
        seed_question(temp.path(), "q1", "Question 1");

        let op = QuestionCopy::new(actor(), course(temp.path()), "q1");
        op.write().unwrap().unwrap();

        let info = read_json(
            &temp
                .path()
                .join("questions/q1_copy1")
                .join(QUESTION_INFO),
        )
        .unwrap();
        assert!(info.get("sharingSets").is_none());
        assert!(info.get("sharePublicly").is_none());
        assert_ne!(info["uuid"], json!("uuid-q1"));
    }

    #[test]
    fn rename_rewrites_plain_and_alternative_references() {
        let temp = TempDir::new().unwrap();
        seed_question(temp.path(), "q1", "Question 1");
        seed_assessment(
            temp.path(),
            "Fa24",
            "hw1",
            json!({
                "uuid": "a1",
                "title": "HW 1",
                "zones": [{"questions": [{"id": "q1", "points": 5}]}]
            }),
        );
        seed_assessment(
            temp.path(),
            "Fa24",
            "hw2",
            json!({
                "uuid": "a2",
                "title": "HW 2",
                "zones": [{"questions": [
                    {"points": 3, "alternatives": [{"id": "q1"}, {"id": "other"}]}
                ]}]
            }),
        );

        let op = QuestionRename::new(actor(), course(temp.path()), "q1", "q2");
        let result = op.write().unwrap().unwrap();

        // Old dir, new dir, and both referencing assessment info files.
        assert_eq!(result.paths_to_add.len(), 4);
        assert!(temp.path().join("questions/q2").is_dir());
        assert!(!temp.path().join("questions/q1").exists());

        let hw1 = read_json(
            &temp
                .path()
                .join("courseInstances/Fa24/assessments/hw1")
                .join(ASSESSMENT_INFO),
        )
        .unwrap();
        assert_eq!(hw1["zones"][0]["questions"][0]["id"], json!("q2"));
        let hw2 = read_json(
            &temp
                .path()
                .join("courseInstances/Fa24/assessments/hw2")
                .join(ASSESSMENT_INFO),
        )
        .unwrap();
        assert_eq!(
            hw2["zones"][0]["questions"][0]["alternatives"][0]["id"],
            json!("q2")
        );
        assert_eq!(
            hw2["zones"][0]["questions"][0]["alternatives"][1]["id"],
            json!("other")
        );
    }

    #[test]
    fn rename_skips_unreferencing_and_unreadable_assessments() {
        let temp = TempDir::new().unwrap();
        seed_question(temp.path(), "q1", "Question 1");
        seed_assessment(
            temp.path(),
            "Fa24",
            "hw1",
            json!({"uuid": "a1", "zones": [{"questions": [{"id": "unrelated"}]}]}),
        );
        // An unreadable assessment file must not fail the rename.
        let broken_dir = temp
            .path()
            .join("courseInstances/Fa24/assessments/broken");
        std::fs::create_dir_all(&broken_dir).unwrap();
        std::fs::write(broken_dir.join(ASSESSMENT_INFO), "not json").unwrap();

        let op = QuestionRename::new(actor(), course(temp.path()), "q1", "q2");
        let result = op.write().unwrap().unwrap();

        // Only the question's own old and new dirs are staged.
        assert_eq!(result.paths_to_add.len(), 2);
    }

    #[test]
    fn rename_within_nested_group_prunes_the_group() {
        let temp = TempDir::new().unwrap();
        seed_question(temp.path(), "unit1/q1", "Question 1");

        let op = QuestionRename::new(actor(), course(temp.path()), "unit1/q1", "q1");
        op.write().unwrap().unwrap();

        assert!(temp.path().join("questions/q1").is_dir());
        assert!(!temp.path().join("questions/unit1").exists());
    }

    #[test]
    fn add_defaults_are_numbered() {
        let temp = TempDir::new().unwrap();
        let op = QuestionAdd::new(actor(), course(temp.path()), None, None);
        op.write().unwrap().unwrap();
        let op = QuestionAdd::new(actor(), course(temp.path()), None, None);
        op.write().unwrap().unwrap();
        assert!(temp.path().join("questions/New_1").is_dir());
        assert!(temp.path().join("questions/New_2").is_dir());
    }

    #[test]
    fn delete_removes_question() {
        let temp = TempDir::new().unwrap();
        seed_question(temp.path(), "q1", "Question 1");
        let op = QuestionDelete::new(actor(), course(temp.path()), "q1");
        let result = op.write().unwrap().unwrap();
        assert!(!temp.path().join("questions/q1").exists());
        assert_eq!(result.paths_to_add.len(), 1);
    }
}
