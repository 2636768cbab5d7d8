//! edit::multi
//!
//! An ordered composite of edit operations that commits as one change.

use std::collections::BTreeSet;

use super::{assert_can_edit, EditError, EditOperation, WriteResult};
use crate::core::types::{Actor, Course};

/// Run several operations in order and stage their union as one commit.
///
/// Sub-operation results are folded into a single [`WriteResult`]: staged
/// paths are unioned and commit messages joined with `"; "`. The composite
/// reports "no change" only when every sub-operation did.
pub struct MultiEdit {
    actor: Actor,
    course: Course,
    description: String,
    operations: Vec<Box<dyn EditOperation>>,
}

impl MultiEdit {
    /// Create a composite over an ordered list of operations.
    pub fn new(
        actor: Actor,
        course: Course,
        description: impl Into<String>,
        operations: Vec<Box<dyn EditOperation>>,
    ) -> Self {
        Self {
            actor,
            course,
            description: description.into(),
            operations,
        }
    }
}

impl EditOperation for MultiEdit {
    fn description(&self) -> String {
        self.description.clone()
    }

    fn assert_can_edit(&self) -> Result<(), EditError> {
        assert_can_edit(&self.actor, &self.course)?;
        for operation in &self.operations {
            operation.assert_can_edit()?;
        }
        Ok(())
    }

    fn write(&self) -> Result<Option<WriteResult>, EditError> {
        let folded = self.operations.iter().try_fold(
            (BTreeSet::new(), Vec::new()),
            |(mut paths, mut messages), operation| {
                if let Some(result) = operation.write()? {
                    paths.extend(result.paths_to_add);
                    messages.push(result.commit_message);
                }
                Ok::<_, EditError>((paths, messages))
            },
        )?;
        let (paths, messages) = folded;
        if messages.is_empty() {
            return Ok(None);
        }
        Ok(Some(WriteResult {
            paths_to_add: paths,
            commit_message: messages.join("; "),
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::types::CourseId;
    use std::path::PathBuf;

    fn actor() -> Actor {
        Actor::new("Ada", "ada@example.com", true)
    }

    fn course() -> Course {
        Course::new(CourseId::new("1"), PathBuf::from("/course"))
    }

    /// A canned operation for exercising the fold.
    struct Fake {
        result: Option<WriteResult>,
        authorized: bool,
    }

    impl EditOperation for Fake {
        fn description(&self) -> String {
            "fake".to_string()
        }

        fn assert_can_edit(&self) -> Result<(), EditError> {
            if self.authorized {
                Ok(())
            } else {
                Err(EditError::Unauthorized("sub-operation denied".into()))
            }
        }

        fn write(&self) -> Result<Option<WriteResult>, EditError> {
            Ok(self.result.clone())
        }
    }

    fn writes(paths: &[&str], message: &str) -> Box<dyn EditOperation> {
        Box::new(Fake {
            result: Some(WriteResult::new(
                paths.iter().map(PathBuf::from),
                message,
            )),
            authorized: true,
        })
    }

    fn noop() -> Box<dyn EditOperation> {
        Box::new(Fake {
            result: None,
            authorized: true,
        })
    }

    #[test]
    fn results_are_unioned_and_messages_joined() {
        let multi = MultiEdit::new(
            actor(),
            course(),
            "batch edit",
            vec![
                writes(&["/course/a", "/course/b"], "first"),
                noop(),
                writes(&["/course/b", "/course/c"], "second"),
            ],
        );
        let result = multi.write().unwrap().unwrap();
        assert_eq!(result.paths_to_add.len(), 3);
        assert_eq!(result.commit_message, "first; second");
    }

    #[test]
    fn all_noops_fold_to_no_change() {
        let multi = MultiEdit::new(actor(), course(), "batch", vec![noop(), noop()]);
        assert!(multi.write().unwrap().is_none());
    }

    #[test]
    fn any_denied_suboperation_denies_the_composite() {
        let multi = MultiEdit::new(
            actor(),
            course(),
            "batch",
            vec![
                noop(),
                Box::new(Fake {
                    result: None,
                    authorized: false,
                }),
            ],
        );
        assert!(matches!(
            multi.assert_can_edit().unwrap_err(),
            EditError::Unauthorized(_)
        ));
    }

    #[test]
    fn composite_base_check_applies_to_the_example_course() {
        let multi = MultiEdit::new(
            actor(),
            course().as_example_course(),
            "batch",
            vec![noop()],
        );
        assert!(multi.assert_can_edit().is_err());
    }
}
