//! engine::coordinator
//!
//! Orchestrates a single edit request end to end: authorization, course
//! lock, working-tree reset, write-and-commit, sharing validation with
//! rollback, push with one retry, and the closing disk-to-database sync.
//!
//! # Invariants
//!
//! - All repository mutation happens under the course lock
//! - A rejected push is retried at most once, against refreshed remote state
//! - An edit that would invalidate the sharing configuration is rolled
//!   back to the pre-edit commit and reported as an error
//! - The disk-to-database sync runs on every exit path that reached the
//!   working tree, so the database tracks whatever state disk ended in
//! - The lock is released on every exit path

use thiserror::Error;
use tracing::{debug, warn};

use crate::core::config::CoordinatorConfig;
use crate::core::types::{Actor, CommitHash, Course};
use crate::edit::{EditError, EditOperation};
use crate::git::{VcsError, VcsRunner};
use crate::sync::{CourseLoader, CourseSnapshot, SharingValidator, SyncEngine, SyncError};

use super::job::{JobFlag, JobLogger};
use super::lock::{CourseLock, LockError};

/// Errors surfaced from a coordinated edit.
#[derive(Debug, Error)]
pub enum CoordinatorError {
    /// Another edit held the course lock for the whole wait window.
    #[error("another operation is in progress for this course")]
    LockTimeout,

    /// Lock infrastructure failure other than contention.
    #[error(transparent)]
    Lock(LockError),

    /// The edit itself failed (authorization, collision, stale content).
    #[error(transparent)]
    Edit(#[from] EditError),

    /// A version-control operation failed.
    #[error(transparent)]
    Vcs(#[from] VcsError),

    /// The edit would have produced an invalid sharing configuration and
    /// was rolled back.
    #[error("edit rolled back: {description}")]
    SharingViolation { description: String },

    /// The push was rejected again after the one permitted retry.
    #[error("push failed after retrying against the updated remote: {message}")]
    PushConflict { message: String },

    /// The disk-to-database sync failed.
    #[error(transparent)]
    Sync(#[from] SyncError),

    /// The coordinator was constructed inconsistently with its config.
    #[error("coordinator misconfigured: {0}")]
    Misconfigured(String),
}

impl From<LockError> for CoordinatorError {
    fn from(err: LockError) -> Self {
        match err {
            LockError::Timeout => CoordinatorError::LockTimeout,
            other => CoordinatorError::Lock(other),
        }
    }
}

/// What a successful coordinated edit did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SaveReport {
    /// Whether the edit produced a change (a no-op write commits nothing).
    pub changed: bool,
    /// Whether the push was rejected once and retried.
    pub retried: bool,
}

/// Runs edit operations against a course under the full save protocol.
///
/// The coordinator owns no course state itself; it wires an
/// [`EditOperation`] to the version-control doorway and the sync
/// collaborators according to the configured mode.
pub struct SyncCoordinator<'a> {
    config: &'a CoordinatorConfig,
    vcs: Option<&'a dyn VcsRunner>,
    loader: &'a dyn CourseLoader,
    validator: &'a dyn SharingValidator,
    sync_engine: &'a dyn SyncEngine,
}

impl<'a> SyncCoordinator<'a> {
    pub fn new(
        config: &'a CoordinatorConfig,
        loader: &'a dyn CourseLoader,
        validator: &'a dyn SharingValidator,
        sync_engine: &'a dyn SyncEngine,
    ) -> Self {
        Self {
            config,
            vcs: None,
            loader,
            validator,
            sync_engine,
        }
    }

    /// Attach the version-control runner used in VCS-backed mode.
    pub fn with_vcs(mut self, vcs: &'a dyn VcsRunner) -> Self {
        self.vcs = Some(vcs);
        self
    }

    /// Run one edit to completion.
    ///
    /// In VCS-backed mode this is the full protocol: lock, reset to the
    /// remote, write and commit, validate sharing, push with one retry,
    /// then sync. In disk-only mode the operation writes and the sync
    /// runs, nothing more.
    pub fn save_and_sync(
        &self,
        actor: &Actor,
        course: &Course,
        operation: &dyn EditOperation,
        job: &mut dyn JobLogger,
    ) -> Result<SaveReport, CoordinatorError> {
        operation.assert_can_edit()?;

        if !self.config.vcs_backed {
            return self.save_disk_only(course, operation, job);
        }
        let vcs = self
            .vcs
            .ok_or_else(|| CoordinatorError::Misconfigured("vcs_backed is set but no version-control runner was attached".into()))?;

        debug!(course = %course.id, "acquiring course lock");
        job.info("waiting for the course lock");
        let mut lock = CourseLock::acquire(
            &self.config.locks_dir(),
            &course.path,
            self.config.lock_timeout(),
        )?;

        // The pre-edit commit anchors both rollback and the sync diff.
        // If it cannot be read nothing has been touched yet, so there is
        // no state for the sync to pick up.
        let start = vcs.head_commit()?;
        debug!(course = %course.id, start = start.short(8), "edit baseline recorded");

        let saved = self.run_save_phases(vcs, actor, course, operation, job, &start);

        job.set_flag(JobFlag::SyncAttempted, true);
        let snapshot = match &saved {
            Ok((snapshot, _)) => snapshot.as_ref(),
            Err(_) => None,
        };
        let synced =
            self.sync_engine
                .sync(&course.id, &course.path, job, Some(&start), snapshot);
        match synced {
            Ok(_) => job.set_flag(JobFlag::SyncSucceeded, true),
            Err(ref err) => {
                warn!(course = %course.id, error = %err, "sync failed after edit");
                job.fail(&format!("sync failed: {err}"));
            }
        }

        lock.release();

        // A save failure outranks a sync failure in what the caller sees;
        // both are in the job log either way.
        let (_, report) = saved?;
        synced?;
        job.info("edit complete");
        Ok(report)
    }

    fn save_disk_only(
        &self,
        course: &Course,
        operation: &dyn EditOperation,
        job: &mut dyn JobLogger,
    ) -> Result<SaveReport, CoordinatorError> {
        job.set_flag(JobFlag::SaveAttempted, true);
        job.info(&format!("saving: {}", operation.description()));
        let changed = operation.write()?.is_some();
        job.set_flag(JobFlag::SaveSucceeded, true);

        job.set_flag(JobFlag::SyncAttempted, true);
        self.sync_engine
            .sync(&course.id, &course.path, job, None, None)?;
        job.set_flag(JobFlag::SyncSucceeded, true);
        Ok(SaveReport {
            changed,
            retried: false,
        })
    }

    /// Phases between taking the baseline and the closing sync. Returns
    /// the snapshot to hand to the sync engine; it is withheld after a
    /// push retry because the retry rewrote the tree after it was taken.
    fn run_save_phases(
        &self,
        vcs: &dyn VcsRunner,
        actor: &Actor,
        course: &Course,
        operation: &dyn EditOperation,
        job: &mut dyn JobLogger,
        start: &CommitHash,
    ) -> Result<(Option<CourseSnapshot>, SaveReport), CoordinatorError> {
        if let Some(url) = &course.repository {
            vcs.set_remote_url(url)?;
        }

        debug!(course = %course.id, branch = %course.branch, "resetting to remote");
        vcs.clean_and_reset_to_remote(&course.branch)?;

        job.set_flag(JobFlag::SaveAttempted, true);
        let mut changed = self.write_and_commit(vcs, actor, operation, job)?;

        // Drop anything the write left unstaged, then judge the tree as
        // the remote will see it.
        vcs.clean_and_reset_to_head()?;
        let snapshot = self.loader.load(&course.id, &course.path)?;
        if !self.validator.validate(&course.id, &snapshot, job) {
            warn!(course = %course.id, "sharing validation failed, rolling back");
            job.fail("edit rejected: it would invalidate the course sharing configuration");
            vcs.reset_hard(start)?;
            return Err(CoordinatorError::SharingViolation {
                description: "the edit would invalidate the course sharing configuration".into(),
            });
        }

        let mut retried = false;
        let mut retained = Some(snapshot);
        if changed {
            if let Err(first) = vcs.push(&course.branch) {
                retried = true;
                retained = None;
                job.set_flag(JobFlag::Retried, true);
                job.info(&format!(
                    "push rejected ({first}); refreshing from the remote and retrying once"
                ));
                debug!(course = %course.id, "push rejected, retrying");

                let retry = (|| -> Result<bool, CoordinatorError> {
                    vcs.fetch(&course.branch)?;
                    vcs.clean_and_reset_to_remote(&course.branch)?;
                    let changed = self.write_and_commit(vcs, actor, operation, job)?;
                    if changed {
                        vcs.push(&course.branch)
                            .map_err(|err| CoordinatorError::PushConflict {
                                message: err.to_string(),
                            })?;
                    }
                    Ok(changed)
                })();

                // Leave the tree matching the remote whichever way the
                // retry went; renames can otherwise strand empty dirs.
                let cleanup = vcs.clean_and_reset_to_remote(&course.branch);
                changed = retry?;
                cleanup?;
            }
        }

        job.set_flag(JobFlag::SaveSucceeded, true);
        Ok((retained, SaveReport { changed, retried }))
    }

    fn write_and_commit(
        &self,
        vcs: &dyn VcsRunner,
        actor: &Actor,
        operation: &dyn EditOperation,
        job: &mut dyn JobLogger,
    ) -> Result<bool, CoordinatorError> {
        job.info(&format!("saving: {}", operation.description()));
        match operation.write()? {
            Some(result) => {
                let commit = vcs.commit_paths(
                    &result.paths_to_add,
                    &result.commit_message,
                    &actor.name,
                    &actor.email,
                )?;
                debug!(commit = commit.short(8), "edit committed");
                job.info(&format!("committed {}", commit.short(8)));
                Ok(true)
            }
            None => {
                job.info("no changes to save");
                Ok(false)
            }
        }
    }
}
