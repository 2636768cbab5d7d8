//! engine::lock
//!
//! Per-course advisory lock. Edits to one course are serialized by an
//! exclusive flock on a file named after the course path, acquired with
//! a bounded wait. Lock files live outside the course tree so they are
//! never committed.

use std::fs::{self, File, OpenOptions};
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use fs2::FileExt;
use thiserror::Error;
use tracing::debug;

use crate::core::fsops::sha256_hex;

const RETRY_INTERVAL: Duration = Duration::from_millis(50);

/// Errors from lock acquisition.
#[derive(Debug, Error)]
pub enum LockError {
    /// Another process held the lock for the whole wait window.
    #[error("another operation is in progress for this course")]
    Timeout,

    /// The lock file could not be created.
    #[error("failed to create lock file {path}: {source}")]
    CreateFailed {
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// The flock call itself failed.
    #[error("failed to acquire lock: {0}")]
    AcquireFailed(#[source] std::io::Error),
}

/// Exclusive advisory lock over one course, released on drop.
#[derive(Debug)]
pub struct CourseLock {
    path: PathBuf,
    file: Option<File>,
}

impl CourseLock {
    /// Acquire the lock for `course_path`, waiting up to `timeout`.
    ///
    /// The lock file name is derived from a hash of the course path, so
    /// any two processes editing the same course contend on the same
    /// file regardless of how they spell the path string.
    pub fn acquire(
        locks_dir: &Path,
        course_path: &Path,
        timeout: Duration,
    ) -> Result<Self, LockError> {
        fs::create_dir_all(locks_dir).map_err(|source| LockError::CreateFailed {
            path: locks_dir.display().to_string(),
            source,
        })?;
        let digest = sha256_hex(course_path.display().to_string().as_bytes());
        let path = locks_dir.join(format!("course-{}.lock", &digest[..32]));
        let file = OpenOptions::new()
            .create(true)
            .truncate(false)
            .write(true)
            .open(&path)
            .map_err(|source| LockError::CreateFailed {
                path: path.display().to_string(),
                source,
            })?;

        let deadline = Instant::now() + timeout;
        loop {
            // Qualified call: newer std has an inherent method of the same
            // name with a different error type.
            match FileExt::try_lock_exclusive(&file) {
                Ok(()) => {
                    debug!(lock = %path.display(), "course lock acquired");
                    return Ok(Self {
                        path,
                        file: Some(file),
                    });
                }
                Err(err) if err.kind() == std::io::ErrorKind::WouldBlock => {
                    if Instant::now() >= deadline {
                        return Err(LockError::Timeout);
                    }
                    std::thread::sleep(RETRY_INTERVAL.min(
                        deadline.saturating_duration_since(Instant::now()),
                    ));
                }
                Err(err) => return Err(LockError::AcquireFailed(err)),
            }
        }
    }

    /// Path of the underlying lock file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Release the lock early.
    pub fn release(&mut self) {
        if let Some(file) = self.file.take() {
            if let Err(err) = FileExt::unlock(&file) {
                debug!(lock = %self.path.display(), error = %err, "unlock failed");
            } else {
                debug!(lock = %self.path.display(), "course lock released");
            }
        }
    }
}

impl Drop for CourseLock {
    fn drop(&mut self) {
        self.release();
    }
}
