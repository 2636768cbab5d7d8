//! git::interface
//!
//! Version-control runner implementation using git2.
//!
//! This module is the **single doorway** to all version-control operations
//! in coursewright. No other module imports `git2`. The coordinator only
//! consumes the [`VcsRunner`] trait, which captures the exact command
//! contract the edit protocol needs: read the head commit, re-point the
//! remote, clean-and-reset, stage-and-commit, push, fetch, hard reset.
//!
//! # Error Handling
//!
//! Errors are categorized into typed variants. [`VcsError::PushRejected`]
//! is the load-bearing one: the coordinator interprets it as "the remote
//! has diverged" and performs its single fetch-reset-rewrite retry.

use std::collections::BTreeSet;
use std::fs;
use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::core::types::CommitHash;

/// The remote name every course repository uses.
const REMOTE: &str = "origin";

/// Errors from version-control operations.
#[derive(Debug, Error)]
pub enum VcsError {
    /// Not inside a version-controlled repository.
    #[error("not a git repository: {path}")]
    NotARepo {
        /// The path that was searched.
        path: PathBuf,
    },

    /// Repository is bare (no working directory).
    #[error("bare repository not supported")]
    BareRepo,

    /// Requested ref does not exist.
    #[error("ref not found: {refname}")]
    RefNotFound {
        /// The ref that was not found.
        refname: String,
    },

    /// The remote rejected the push.
    ///
    /// Interpreted by the coordinator as "the remote has diverged since
    /// the working tree was reset."
    #[error("push rejected: {message}")]
    PushRejected {
        /// The rejection message from the transport.
        message: String,
    },

    /// Internal git2 error.
    #[error("git error: {message}")]
    Internal {
        /// The error message.
        message: String,
    },
}

impl From<git2::Error> for VcsError {
    fn from(err: git2::Error) -> Self {
        match err.code() {
            git2::ErrorCode::NotFound => VcsError::RefNotFound {
                refname: err.message().to_string(),
            },
            _ => VcsError::Internal {
                message: err.message().to_string(),
            },
        }
    }
}

/// The version-control command contract consumed by the coordinator.
///
/// Only the success/failure contract of each command matters to the edit
/// protocol; how the commands execute is this module's concern.
pub trait VcsRunner {
    /// The commit the working tree's HEAD currently points at.
    fn head_commit(&self) -> Result<CommitHash, VcsError>;

    /// Point the repository's remote at `url`.
    fn set_remote_url(&self, url: &str) -> Result<(), VcsError>;

    /// Fetch the tracked branch from the remote.
    fn fetch(&self, branch: &str) -> Result<(), VcsError>;

    /// Discard every local change and untracked file, resetting the
    /// working tree to the remote tracking branch.
    fn clean_and_reset_to_remote(&self, branch: &str) -> Result<(), VcsError>;

    /// Discard uncommitted changes and untracked files, keeping HEAD.
    fn clean_and_reset_to_head(&self) -> Result<(), VcsError>;

    /// Hard-reset the working tree to `commit`.
    fn reset_hard(&self, commit: &CommitHash) -> Result<(), VcsError>;

    /// Stage `paths` (additions, modifications, and removals alike) and
    /// commit with the given identity. Returns the new commit.
    fn commit_paths(
        &self,
        paths: &BTreeSet<PathBuf>,
        message: &str,
        author_name: &str,
        author_email: &str,
    ) -> Result<CommitHash, VcsError>;

    /// Push the branch to the remote.
    fn push(&self, branch: &str) -> Result<(), VcsError>;
}

/// The git2-backed runner.
pub struct Git {
    repo: git2::Repository,
}

impl Git {
    /// Open the repository at `path`.
    ///
    /// # Errors
    ///
    /// Returns [`VcsError::NotARepo`] if `path` is not a repository.
    pub fn open(path: &Path) -> Result<Self, VcsError> {
        let repo = git2::Repository::open(path).map_err(|_| VcsError::NotARepo {
            path: path.to_path_buf(),
        })?;
        Ok(Self { repo })
    }

    fn workdir(&self) -> Result<&Path, VcsError> {
        self.repo.workdir().ok_or(VcsError::BareRepo)
    }

    fn reset_hard_to_object(&self, object: &git2::Object<'_>) -> Result<(), VcsError> {
        let mut checkout = git2::build::CheckoutBuilder::new();
        checkout.force();
        self.repo
            .reset(object, git2::ResetType::Hard, Some(&mut checkout))?;
        Ok(())
    }

    /// Delete untracked files, then sweep away directories left empty.
    /// Renames leave emptied source directories behind that git does not
    /// track; the sweep keeps the tree canonical.
    fn remove_untracked(&self) -> Result<(), VcsError> {
        let workdir = self.workdir()?.to_path_buf();
        let mut opts = git2::StatusOptions::new();
        opts.include_untracked(true)
            .recurse_untracked_dirs(true)
            .include_ignored(false);
        let statuses = self.repo.statuses(Some(&mut opts))?;
        for entry in statuses.iter() {
            if entry.status().contains(git2::Status::WT_NEW) {
                if let Some(rel) = entry.path() {
                    let full = workdir.join(rel);
                    let result = if full.is_dir() {
                        fs::remove_dir_all(&full)
                    } else {
                        fs::remove_file(&full)
                    };
                    if let Err(err) = result {
                        if err.kind() != std::io::ErrorKind::NotFound {
                            return Err(VcsError::Internal {
                                message: format!("cannot remove {}: {err}", full.display()),
                            });
                        }
                    }
                }
            }
        }
        remove_empty_dirs(&workdir)?;
        Ok(())
    }
}

/// Post-order sweep deleting empty directories under `root`, skipping the
/// repository's own metadata directory. Returns whether `root` itself
/// ended up empty (it is never deleted).
fn remove_empty_dirs(root: &Path) -> Result<bool, VcsError> {
    let mut empty = true;
    let entries = fs::read_dir(root).map_err(|err| VcsError::Internal {
        message: format!("cannot read {}: {err}", root.display()),
    })?;
    for entry in entries {
        let entry = entry.map_err(|err| VcsError::Internal {
            message: format!("cannot read {}: {err}", root.display()),
        })?;
        let path = entry.path();
        if path.is_dir() {
            if entry.file_name() == ".git" {
                empty = false;
                continue;
            }
            if remove_empty_dirs(&path)? {
                fs::remove_dir(&path).map_err(|err| VcsError::Internal {
                    message: format!("cannot remove {}: {err}", path.display()),
                })?;
            } else {
                empty = false;
            }
        } else {
            empty = false;
        }
    }
    Ok(empty)
}

impl VcsRunner for Git {
    fn head_commit(&self) -> Result<CommitHash, VcsError> {
        let head = self.repo.head()?.peel_to_commit()?;
        CommitHash::new(head.id().to_string()).map_err(|err| VcsError::Internal {
            message: err.to_string(),
        })
    }

    fn set_remote_url(&self, url: &str) -> Result<(), VcsError> {
        self.repo.remote_set_url(REMOTE, url)?;
        Ok(())
    }

    fn fetch(&self, branch: &str) -> Result<(), VcsError> {
        let mut remote = self.repo.find_remote(REMOTE)?;
        // Explicit refspec so the remote-tracking ref is updated even on
        // repositories with a sparse fetch configuration.
        let refspec = format!("+refs/heads/{branch}:refs/remotes/{REMOTE}/{branch}");
        remote.fetch(&[refspec.as_str()], None, None)?;
        Ok(())
    }

    fn clean_and_reset_to_remote(&self, branch: &str) -> Result<(), VcsError> {
        let refname = format!("refs/remotes/{REMOTE}/{branch}");
        let reference = self
            .repo
            .find_reference(&refname)
            .map_err(|_| VcsError::RefNotFound {
                refname: refname.clone(),
            })?;
        let object = reference.peel(git2::ObjectType::Commit)?;
        self.reset_hard_to_object(&object)?;
        self.remove_untracked()
    }

    fn clean_and_reset_to_head(&self) -> Result<(), VcsError> {
        let object = self.repo.head()?.peel(git2::ObjectType::Commit)?;
        self.reset_hard_to_object(&object)?;
        self.remove_untracked()
    }

    fn reset_hard(&self, commit: &CommitHash) -> Result<(), VcsError> {
        let oid = git2::Oid::from_str(commit.as_str())?;
        let object = self.repo.find_object(oid, Some(git2::ObjectType::Commit))?;
        self.reset_hard_to_object(&object)?;
        self.remove_untracked()
    }

    fn commit_paths(
        &self,
        paths: &BTreeSet<PathBuf>,
        message: &str,
        author_name: &str,
        author_email: &str,
    ) -> Result<CommitHash, VcsError> {
        let workdir = self.workdir()?.to_path_buf();
        let specs: Vec<String> = paths
            .iter()
            .map(|path| {
                path.strip_prefix(&workdir)
                    .unwrap_or(path)
                    .to_string_lossy()
                    .into_owned()
            })
            .collect();

        let mut index = self.repo.index()?;
        // add_all stages new and modified paths; update_all stages removals.
        index.add_all(specs.iter(), git2::IndexAddOption::DEFAULT, None)?;
        index.update_all(specs.iter(), None)?;
        index.write()?;

        let tree_id = index.write_tree()?;
        let tree = self.repo.find_tree(tree_id)?;
        let signature = git2::Signature::now(author_name, author_email)?;
        let parent = self.repo.head().ok().and_then(|h| h.peel_to_commit().ok());
        let parents: Vec<&git2::Commit<'_>> = parent.iter().collect();

        let oid = self.repo.commit(
            Some("HEAD"),
            &signature,
            &signature,
            message,
            &tree,
            &parents,
        )?;
        CommitHash::new(oid.to_string()).map_err(|err| VcsError::Internal {
            message: err.to_string(),
        })
    }

    fn push(&self, branch: &str) -> Result<(), VcsError> {
        let mut remote = self.repo.find_remote(REMOTE)?;
        let refspec = format!("refs/heads/{branch}:refs/heads/{branch}");
        remote
            .push(&[refspec.as_str()], None)
            .map_err(|err| VcsError::PushRejected {
                message: err.message().to_string(),
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::process::Command;
    use tempfile::TempDir;

    fn run_git(dir: &Path, args: &[&str]) {
        let status = Command::new("git")
            .args(args)
            .current_dir(dir)
            .status()
            .expect("run git");
        assert!(status.success(), "git {args:?} failed");
    }

    /// A working tree with one commit, plus a bare remote it tracks.
    struct TestRepo {
        _dir: TempDir,
        work: PathBuf,
    }

    impl TestRepo {
        fn new() -> Self {
            let dir = TempDir::new().expect("create temp dir");
            let remote = dir.path().join("remote.git");
            let work = dir.path().join("work");
            fs::create_dir_all(&remote).unwrap();
            run_git(&remote, &["init", "--bare", "--initial-branch=master"]);

            fs::create_dir_all(&work).unwrap();
            run_git(&work, &["init", "--initial-branch=master"]);
            run_git(&work, &["config", "user.email", "test@example.com"]);
            run_git(&work, &["config", "user.name", "Test User"]);
            fs::write(work.join("infoCourse.json"), "{}\n").unwrap();
            run_git(&work, &["add", "infoCourse.json"]);
            run_git(&work, &["commit", "-m", "initial"]);
            run_git(&work, &["remote", "add", "origin", remote.to_str().unwrap()]);
            run_git(&work, &["push", "-u", "origin", "master"]);

            Self { _dir: dir, work }
        }

        fn git(&self) -> Git {
            Git::open(&self.work).expect("open test repo")
        }
    }

    #[test]
    fn open_of_non_repo_fails() {
        let temp = TempDir::new().unwrap();
        assert!(matches!(
            Git::open(temp.path()),
            Err(VcsError::NotARepo { .. })
        ));
    }

    #[test]
    fn head_commit_is_stable_until_commit() {
        let repo = TestRepo::new();
        let git = repo.git();
        let before = git.head_commit().unwrap();
        assert_eq!(before, git.head_commit().unwrap());
    }

    #[test]
    fn commit_paths_stages_additions_and_removals() {
        let repo = TestRepo::new();
        let git = repo.git();
        let before = git.head_commit().unwrap();

        fs::create_dir_all(repo.work.join("questions/q1")).unwrap();
        fs::write(repo.work.join("questions/q1/info.json"), "{}\n").unwrap();
        let mut paths = BTreeSet::new();
        paths.insert(repo.work.join("questions/q1"));
        let after = git
            .commit_paths(&paths, "add question q1", "Ada", "ada@example.com")
            .unwrap();
        assert_ne!(before, after);
        assert_eq!(after, git.head_commit().unwrap());

        // Now remove it and commit the removal through the same call.
        fs::remove_dir_all(repo.work.join("questions")).unwrap();
        let removed = git
            .commit_paths(&paths, "delete question q1", "Ada", "ada@example.com")
            .unwrap();
        assert_ne!(after, removed);
    }

    #[test]
    fn clean_and_reset_discards_stray_files_and_empty_dirs() {
        let repo = TestRepo::new();
        let git = repo.git();

        fs::write(repo.work.join("stray.txt"), "x").unwrap();
        fs::create_dir_all(repo.work.join("empty/nested")).unwrap();
        git.clean_and_reset_to_remote("master").unwrap();

        assert!(!repo.work.join("stray.txt").exists());
        assert!(!repo.work.join("empty").exists());
        assert!(repo.work.join("infoCourse.json").exists());
    }

    #[test]
    fn reset_hard_returns_to_earlier_commit() {
        let repo = TestRepo::new();
        let git = repo.git();
        let start = git.head_commit().unwrap();

        fs::write(repo.work.join("new.txt"), "x").unwrap();
        let mut paths = BTreeSet::new();
        paths.insert(repo.work.join("new.txt"));
        git.commit_paths(&paths, "add file", "Ada", "ada@example.com")
            .unwrap();

        git.reset_hard(&start).unwrap();
        assert_eq!(git.head_commit().unwrap(), start);
        assert!(!repo.work.join("new.txt").exists());
    }

    #[test]
    fn push_and_fetch_roundtrip() {
        let repo = TestRepo::new();
        let git = repo.git();

        fs::write(repo.work.join("new.txt"), "x").unwrap();
        let mut paths = BTreeSet::new();
        paths.insert(repo.work.join("new.txt"));
        git.commit_paths(&paths, "add file", "Ada", "ada@example.com")
            .unwrap();
        git.push("master").unwrap();
        git.fetch("master").unwrap();
        git.clean_and_reset_to_remote("master").unwrap();
        assert!(repo.work.join("new.txt").exists());
    }

    #[test]
    fn set_remote_url_repoints_origin() {
        let repo = TestRepo::new();
        let git = repo.git();
        git.set_remote_url("/nowhere/else.git").unwrap();
        // Fetch from the bogus location must now fail.
        assert!(git.fetch("master").is_err());
    }
}
