//! engine::job
//!
//! Per-request job log. Every coordinated edit carries one; collaborators
//! append progress messages and set outcome flags as phases complete, so
//! a caller can reconstruct what happened even when the overall request
//! failed partway.

use chrono::{DateTime, Utc};
use uuid::Uuid;

/// Outcome flags a job accumulates as phases complete.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobFlag {
    /// The edit's write phase was entered.
    SaveAttempted,
    /// The edit was written (and, in VCS mode, pushed or found to be a no-op).
    SaveSucceeded,
    /// The disk-to-database sync was entered.
    SyncAttempted,
    /// The sync completed.
    SyncSucceeded,
    /// The push was rejected once and retried.
    Retried,
}

/// Sink for job progress. The coordinator and its collaborators write
/// here; implementations decide where the transcript lives.
pub trait JobLogger {
    /// Record a progress message.
    fn info(&mut self, message: &str);

    /// Record a failure message.
    fn fail(&mut self, message: &str);

    /// Set an outcome flag.
    fn set_flag(&mut self, flag: JobFlag, value: bool);
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Level {
    Info,
    Fail,
}

#[derive(Debug, Clone)]
struct Entry {
    at: DateTime<Utc>,
    level: Level,
    message: String,
}

/// In-memory job log with a unique id and timestamped transcript.
#[derive(Debug)]
pub struct JobLog {
    id: String,
    entries: Vec<Entry>,
    save_attempted: bool,
    save_succeeded: bool,
    sync_attempted: bool,
    sync_succeeded: bool,
    retried: bool,
}

impl JobLog {
    pub fn new() -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            entries: Vec::new(),
            save_attempted: false,
            save_succeeded: false,
            sync_attempted: false,
            sync_succeeded: false,
            retried: false,
        }
    }

    /// Unique id for this job.
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Read back an outcome flag.
    pub fn flag(&self, flag: JobFlag) -> bool {
        match flag {
            JobFlag::SaveAttempted => self.save_attempted,
            JobFlag::SaveSucceeded => self.save_succeeded,
            JobFlag::SyncAttempted => self.sync_attempted,
            JobFlag::SyncSucceeded => self.sync_succeeded,
            JobFlag::Retried => self.retried,
        }
    }

    /// All recorded messages in order.
    pub fn messages(&self) -> Vec<&str> {
        self.entries.iter().map(|e| e.message.as_str()).collect()
    }

    /// Render the transcript, one timestamped line per entry.
    pub fn dump(&self) -> String {
        let mut out = String::new();
        for entry in &self.entries {
            let level = match entry.level {
                Level::Info => "info",
                Level::Fail => "fail",
            };
            out.push_str(&format!(
                "{} [{}] {}\n",
                entry.at.format("%Y-%m-%dT%H:%M:%S%.3fZ"),
                level,
                entry.message
            ));
        }
        out
    }

    fn push(&mut self, level: Level, message: &str) {
        self.entries.push(Entry {
            at: Utc::now(),
            level,
            message: message.to_string(),
        });
    }
}

impl Default for JobLog {
    fn default() -> Self {
        Self::new()
    }
}

impl JobLogger for JobLog {
    fn info(&mut self, message: &str) {
        self.push(Level::Info, message);
    }

    fn fail(&mut self, message: &str) {
        self.push(Level::Fail, message);
    }

    fn set_flag(&mut self, flag: JobFlag, value: bool) {
        match flag {
            JobFlag::SaveAttempted => self.save_attempted = value,
            JobFlag::SaveSucceeded => self.save_succeeded = value,
            JobFlag::SyncAttempted => self.sync_attempted = value,
            JobFlag::SyncSucceeded => self.sync_succeeded = value,
            JobFlag::Retried => self.retried = value,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flags_start_unset_and_round_trip() {
        let mut job = JobLog::new();
        assert!(!job.flag(JobFlag::SaveAttempted));
        job.set_flag(JobFlag::SaveAttempted, true);
        job.set_flag(JobFlag::Retried, true);
        assert!(job.flag(JobFlag::SaveAttempted));
        assert!(job.flag(JobFlag::Retried));
        assert!(!job.flag(JobFlag::SyncAttempted));
    }

    #[test]
    fn dump_preserves_message_order_and_levels() {
        let mut job = JobLog::new();
        job.info("starting");
        job.fail("push rejected");
        job.info("retrying");
        let dump = job.dump();
        let lines: Vec<&str> = dump.lines().collect();
        assert_eq!(lines.len(), 3);
        assert!(lines[0].contains("[info] starting"));
        assert!(lines[1].contains("[fail] push rejected"));
        assert!(lines[2].contains("[info] retrying"));
    }

    #[test]
    fn jobs_get_distinct_ids() {
        assert_ne!(JobLog::new().id(), JobLog::new().id());
    }
}
