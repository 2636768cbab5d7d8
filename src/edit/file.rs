//! edit::file
//!
//! Edit operations on single files under a content root.
//!
//! Every variant here takes a [`FileContext`]: the root the target must
//! stay within plus a list of forbidden sub-roots (entity metadata areas
//! that may only be touched through their own operations). Containment is
//! checked in `assert_can_edit`, before the base authorization check and
//! before any write.
//!
//! Modify carries the content hash the caller read; a mismatch against the
//! on-disk hash means another user changed the file in the meantime, which
//! is a fatal stale-edit conflict rather than a merge.

use std::path::{Path, PathBuf};

use super::{assert_can_edit, EditError, EditOperation, WriteResult};
use crate::core::fsops;
use crate::core::paths::{check_contained, contains, PathViolation};
use crate::core::types::{Actor, Course};

/// The containment contract for a file operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileContext {
    /// The root every target path must stay within.
    pub root: PathBuf,
    /// Sub-roots no target path may touch.
    pub forbidden: Vec<PathBuf>,
}

impl FileContext {
    /// A context rooted at `root` with no forbidden sub-roots.
    pub fn rooted_at(root: PathBuf) -> Self {
        Self {
            root,
            forbidden: Vec::new(),
        }
    }

    /// Add a forbidden sub-root.
    pub fn forbidding(mut self, path: PathBuf) -> Self {
        self.forbidden.push(path);
        self
    }

    /// Require that `target` lies inside the root and outside every
    /// forbidden sub-root.
    fn check(&self, target: &Path) -> Result<(), EditError> {
        check_contained(&self.root, target)?;
        for forbidden in &self.forbidden {
            if contains(forbidden, target) {
                return Err(EditError::PathViolation(PathViolation {
                    path: target.display().to_string(),
                    root: forbidden.display().to_string(),
                }));
            }
        }
        Ok(())
    }

    /// The target's slash-separated path relative to the root, for
    /// ancestor pruning.
    fn relative(&self, target: &Path) -> Option<String> {
        let rel = target.strip_prefix(&self.root).ok()?;
        let parts: Vec<String> = rel
            .components()
            .map(|c| c.as_os_str().to_string_lossy().into_owned())
            .collect();
        Some(parts.join("/"))
    }
}

/// Write caller-supplied bytes to a file, creating or overwriting it.
pub struct FileUpload {
    actor: Actor,
    course: Course,
    context: FileContext,
    file_path: PathBuf,
    contents: Vec<u8>,
}

impl FileUpload {
    /// Create the operation. `file_path` is absolute.
    pub fn new(
        actor: Actor,
        course: Course,
        context: FileContext,
        file_path: PathBuf,
        contents: Vec<u8>,
    ) -> Self {
        Self {
            actor,
            course,
            context,
            file_path,
            contents,
        }
    }
}

impl EditOperation for FileUpload {
    fn description(&self) -> String {
        format!("upload file {}", self.file_path.display())
    }

    fn assert_can_edit(&self) -> Result<(), EditError> {
        self.context.check(&self.file_path)?;
        assert_can_edit(&self.actor, &self.course)
    }

    fn write(&self) -> Result<Option<WriteResult>, EditError> {
        if let Some(existing) = fsops::read_optional(&self.file_path)? {
            if fsops::sha256_hex(&existing) == fsops::sha256_hex(&self.contents) {
                return Ok(None);
            }
        }
        if let Some(parent) = self.file_path.parent() {
            std::fs::create_dir_all(parent).map_err(|source| {
                EditError::Fs(fsops::FsError::Io {
                    context: format!("creating {}", parent.display()),
                    source,
                })
            })?;
        }
        std::fs::write(&self.file_path, &self.contents).map_err(|source| {
            EditError::Fs(fsops::FsError::Io {
                context: format!("writing {}", self.file_path.display()),
                source,
            })
        })?;
        Ok(Some(WriteResult::new(
            [self.file_path.clone()],
            self.description(),
        )))
    }
}

/// Overwrite a file's contents, gated on an optimistic-concurrency hash.
pub struct FileModify {
    actor: Actor,
    course: Course,
    context: FileContext,
    file_path: PathBuf,
    contents: Vec<u8>,
    /// Hex SHA-256 of the contents the caller believes are on disk.
    expected_hash: String,
}

impl FileModify {
    /// Create the operation.
    pub fn new(
        actor: Actor,
        course: Course,
        context: FileContext,
        file_path: PathBuf,
        contents: Vec<u8>,
        expected_hash: impl Into<String>,
    ) -> Self {
        Self {
            actor,
            course,
            context,
            file_path,
            contents,
            expected_hash: expected_hash.into(),
        }
    }
}

impl EditOperation for FileModify {
    fn description(&self) -> String {
        format!("modify file {}", self.file_path.display())
    }

    fn assert_can_edit(&self) -> Result<(), EditError> {
        self.context.check(&self.file_path)?;
        assert_can_edit(&self.actor, &self.course)
    }

    fn write(&self) -> Result<Option<WriteResult>, EditError> {
        let Some(existing) = fsops::read_optional(&self.file_path)? else {
            return Err(EditError::MissingEntity {
                path: self.file_path.display().to_string(),
            });
        };
        if fsops::sha256_hex(&existing) != self.expected_hash {
            return Err(EditError::StaleEdit {
                path: self.file_path.display().to_string(),
            });
        }
        if existing == self.contents {
            return Ok(None);
        }
        std::fs::write(&self.file_path, &self.contents).map_err(|source| {
            EditError::Fs(fsops::FsError::Io {
                context: format!("writing {}", self.file_path.display()),
                source,
            })
        })?;
        Ok(Some(WriteResult::new(
            [self.file_path.clone()],
            self.description(),
        )))
    }
}

/// Move a file within its content root.
pub struct FileRename {
    actor: Actor,
    course: Course,
    context: FileContext,
    old_file_path: PathBuf,
    new_file_path: PathBuf,
}

impl FileRename {
    /// Create the operation.
    pub fn new(
        actor: Actor,
        course: Course,
        context: FileContext,
        old_file_path: PathBuf,
        new_file_path: PathBuf,
    ) -> Self {
        Self {
            actor,
            course,
            context,
            old_file_path,
            new_file_path,
        }
    }
}

impl EditOperation for FileRename {
    fn description(&self) -> String {
        format!(
            "rename file {} to {}",
            self.old_file_path.display(),
            self.new_file_path.display()
        )
    }

    fn assert_can_edit(&self) -> Result<(), EditError> {
        self.context.check(&self.old_file_path)?;
        self.context.check(&self.new_file_path)?;
        assert_can_edit(&self.actor, &self.course)
    }

    fn write(&self) -> Result<Option<WriteResult>, EditError> {
        if self.old_file_path == self.new_file_path {
            return Ok(None);
        }
        if !self.old_file_path.is_file() {
            return Err(EditError::MissingEntity {
                path: self.old_file_path.display().to_string(),
            });
        }
        if self.new_file_path.exists() {
            return Err(EditError::NameCollision {
                path: self.new_file_path.display().to_string(),
            });
        }
        fsops::move_tree(&self.old_file_path, &self.new_file_path)?;
        if let Some(relative) = self.context.relative(&self.old_file_path) {
            fsops::prune_empty_ancestors(&self.context.root, &relative)?;
        }
        Ok(Some(WriteResult::new(
            [self.old_file_path.clone(), self.new_file_path.clone()],
            self.description(),
        )))
    }
}

/// Delete a file, pruning emptied ancestor directories.
pub struct FileDelete {
    actor: Actor,
    course: Course,
    context: FileContext,
    file_path: PathBuf,
}

impl FileDelete {
    /// Create the operation.
    pub fn new(actor: Actor, course: Course, context: FileContext, file_path: PathBuf) -> Self {
        Self {
            actor,
            course,
            context,
            file_path,
        }
    }
}

impl EditOperation for FileDelete {
    fn description(&self) -> String {
        format!("delete file {}", self.file_path.display())
    }

    fn assert_can_edit(&self) -> Result<(), EditError> {
        self.context.check(&self.file_path)?;
        assert_can_edit(&self.actor, &self.course)
    }

    fn write(&self) -> Result<Option<WriteResult>, EditError> {
        if !self.file_path.is_file() {
            return Err(EditError::MissingEntity {
                path: self.file_path.display().to_string(),
            });
        }
        std::fs::remove_file(&self.file_path).map_err(|source| {
            EditError::Fs(fsops::FsError::Io {
                context: format!("removing {}", self.file_path.display()),
                source,
            })
        })?;
        if let Some(relative) = self.context.relative(&self.file_path) {
            fsops::prune_empty_ancestors(&self.context.root, &relative)?;
        }
        Ok(Some(WriteResult::new(
            [self.file_path.clone()],
            self.description(),
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::types::CourseId;
    use std::fs;
    use std::path::Path;
    use tempfile::TempDir;

    fn actor() -> Actor {
        Actor::new("Ada", "ada@example.com", true)
    }

    fn course(root: &Path) -> Course {
        Course::new(CourseId::new("1"), root.to_path_buf())
    }

    #[test]
    fn upload_creates_file_and_stages_it() {
        let temp = TempDir::new().unwrap();
        let target = temp.path().join("clientFilesCourse/notes.md");
        let op = FileUpload::new(
            actor(),
            course(temp.path()),
            FileContext::rooted_at(temp.path().to_path_buf()),
            target.clone(),
            b"# Notes\n".to_vec(),
        );
        op.assert_can_edit().unwrap();
        let result = op.write().unwrap().unwrap();
        assert_eq!(fs::read(&target).unwrap(), b"# Notes\n");
        assert!(result.paths_to_add.contains(&target));
    }

    #[test]
    fn byte_identical_upload_is_a_noop() {
        let temp = TempDir::new().unwrap();
        let target = temp.path().join("notes.md");
        fs::write(&target, b"same").unwrap();
        let op = FileUpload::new(
            actor(),
            course(temp.path()),
            FileContext::rooted_at(temp.path().to_path_buf()),
            target,
            b"same".to_vec(),
        );
        assert!(op.write().unwrap().is_none());
    }

    #[test]
    fn modify_with_matching_hash_writes() {
        let temp = TempDir::new().unwrap();
        let target = temp.path().join("q.html");
        fs::write(&target, b"old").unwrap();
        let op = FileModify::new(
            actor(),
            course(temp.path()),
            FileContext::rooted_at(temp.path().to_path_buf()),
            target.clone(),
            b"new".to_vec(),
            fsops::sha256_hex(b"old"),
        );
        op.write().unwrap().unwrap();
        assert_eq!(fs::read(&target).unwrap(), b"new");
    }

    #[test]
    fn modify_with_stale_hash_is_a_conflict() {
        let temp = TempDir::new().unwrap();
        let target = temp.path().join("q.html");
        fs::write(&target, b"changed by someone else").unwrap();
        let op = FileModify::new(
            actor(),
            course(temp.path()),
            FileContext::rooted_at(temp.path().to_path_buf()),
            target.clone(),
            b"new".to_vec(),
            fsops::sha256_hex(b"what I read earlier"),
        );
        let err = op.write().unwrap_err();
        assert!(matches!(err, EditError::StaleEdit { .. }));
        // Nothing was written.
        assert_eq!(fs::read(&target).unwrap(), b"changed by someone else");
    }

    #[test]
    fn modify_identical_content_is_a_noop() {
        let temp = TempDir::new().unwrap();
        let target = temp.path().join("q.html");
        fs::write(&target, b"same").unwrap();
        let op = FileModify::new(
            actor(),
            course(temp.path()),
            FileContext::rooted_at(temp.path().to_path_buf()),
            target,
            b"same".to_vec(),
            fsops::sha256_hex(b"same"),
        );
        assert!(op.write().unwrap().is_none());
    }

    #[test]
    fn target_outside_root_is_rejected() {
        let temp = TempDir::new().unwrap();
        let op = FileUpload::new(
            actor(),
            course(temp.path()),
            FileContext::rooted_at(temp.path().join("course")),
            temp.path().join("elsewhere/file.txt"),
            b"x".to_vec(),
        );
        assert!(matches!(
            op.assert_can_edit().unwrap_err(),
            EditError::PathViolation(_)
        ));
    }

    #[test]
    fn target_inside_forbidden_subroot_is_rejected() {
        let temp = TempDir::new().unwrap();
        let root = temp.path().to_path_buf();
        let context = FileContext::rooted_at(root.clone()).forbidding(root.join("questions"));
        let op = FileDelete::new(
            actor(),
            course(temp.path()),
            context,
            root.join("questions/q1/info.json"),
        );
        assert!(matches!(
            op.assert_can_edit().unwrap_err(),
            EditError::PathViolation(_)
        ));
    }

    #[test]
    fn rename_moves_and_prunes() {
        let temp = TempDir::new().unwrap();
        fs::create_dir_all(temp.path().join("a/b")).unwrap();
        fs::write(temp.path().join("a/b/file.txt"), "x").unwrap();
        let op = FileRename::new(
            actor(),
            course(temp.path()),
            FileContext::rooted_at(temp.path().to_path_buf()),
            temp.path().join("a/b/file.txt"),
            temp.path().join("c/file.txt"),
        );
        let result = op.write().unwrap().unwrap();
        assert!(temp.path().join("c/file.txt").is_file());
        assert!(!temp.path().join("a").exists());
        assert_eq!(result.paths_to_add.len(), 2);
    }

    #[test]
    fn delete_missing_file_is_reported() {
        let temp = TempDir::new().unwrap();
        let op = FileDelete::new(
            actor(),
            course(temp.path()),
            FileContext::rooted_at(temp.path().to_path_buf()),
            temp.path().join("nope.txt"),
        );
        assert!(matches!(
            op.write().unwrap_err(),
            EditError::MissingEntity { .. }
        ));
    }
}
