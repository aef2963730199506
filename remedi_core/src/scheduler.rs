//! Notification scheduler port and its implementations.
//!
//! The synchronizer talks to the platform notification subsystem through
//! the [`Scheduler`] trait. The contract mirrors what mobile notification
//! plumbing offers: schedule by integer id, cancel by id, bulk cancel, and
//! a pending list carrying each reminder's payload tag for lookup.
//!
//! Past-due timestamps are accepted by both implementations; platform
//! schedulers either fire such entries immediately or drop them, and the
//! synchronizer intentionally submits the full window without filtering.

use crate::{Error, Result};
use chrono::{DateTime, Utc};
use fs2::FileExt;
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::{Read, Write};
use std::path::PathBuf;
use tempfile::NamedTempFile;

/// One reminder submission
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct ReminderRequest {
    /// Deterministic id; scheduling an id that is already pending replaces it
    pub id: u32,
    pub title: String,
    pub body: String,
    /// When the reminder should fire
    pub at: DateTime<Utc>,
    /// Tag used to bulk-locate a medication's reminders, e.g. `medication:<id>`
    pub payload: String,
}

/// Pending-reminder summary returned by [`Scheduler::list_pending`]
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PendingReminder {
    pub id: u32,
    pub payload: String,
}

/// Port to the notification-delivery mechanism
pub trait Scheduler {
    fn schedule(&mut self, request: ReminderRequest) -> Result<()>;
    fn cancel(&mut self, id: u32) -> Result<()>;
    fn cancel_all(&mut self) -> Result<()>;
    fn list_pending(&self) -> Result<Vec<PendingReminder>>;
}

/// In-memory scheduler, used in tests and embedding
#[derive(Debug, Default)]
pub struct MemoryScheduler {
    pending: Vec<ReminderRequest>,
}

impl MemoryScheduler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Full pending requests, for inspection
    pub fn pending(&self) -> &[ReminderRequest] {
        &self.pending
    }
}

impl Scheduler for MemoryScheduler {
    fn schedule(&mut self, request: ReminderRequest) -> Result<()> {
        self.pending.retain(|r| r.id != request.id);
        self.pending.push(request);
        Ok(())
    }

    fn cancel(&mut self, id: u32) -> Result<()> {
        self.pending.retain(|r| r.id != id);
        Ok(())
    }

    fn cancel_all(&mut self) -> Result<()> {
        self.pending.clear();
        Ok(())
    }

    fn list_pending(&self) -> Result<Vec<PendingReminder>> {
        Ok(self
            .pending
            .iter()
            .map(|r| PendingReminder {
                id: r.id,
                payload: r.payload.clone(),
            })
            .collect())
    }
}

/// File-backed scheduler: pending reminders live in one JSON file.
///
/// Stands in for platform notification plumbing in the CLI. Writes are
/// atomic (locked temp file, rename); an unreadable file is treated as an
/// empty pending set with a warning rather than an error, so a corrupt
/// reminder file never wedges the registry.
#[derive(Debug, Clone)]
pub struct FileScheduler {
    path: PathBuf,
}

impl FileScheduler {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    fn load(&self) -> Result<Vec<ReminderRequest>> {
        if !self.path.exists() {
            return Ok(Vec::new());
        }

        let file = File::open(&self.path)?;
        file.lock_shared()?;

        let mut contents = String::new();
        let mut reader = std::io::BufReader::new(&file);
        let read_result = reader.read_to_string(&mut contents);
        file.unlock()?;
        read_result?;

        match serde_json::from_str(&contents) {
            Ok(pending) => Ok(pending),
            Err(e) => {
                tracing::warn!(
                    "Unreadable reminder file {:?}: {}. Treating as empty.",
                    self.path,
                    e
                );
                Ok(Vec::new())
            }
        }
    }

    fn save(&self, pending: &[ReminderRequest]) -> Result<()> {
        let parent = self.path.parent().ok_or_else(|| {
            Error::Scheduler(format!("reminder path {:?} has no parent", self.path))
        })?;
        std::fs::create_dir_all(parent)?;

        let temp = NamedTempFile::new_in(parent)?;
        temp.as_file().lock_exclusive()?;

        {
            let mut writer = std::io::BufWriter::new(temp.as_file());
            let contents = serde_json::to_string(pending)?;
            writer.write_all(contents.as_bytes())?;
            writer.flush()?;
        }

        temp.as_file().sync_all()?;
        temp.as_file().unlock()?;
        temp.persist(&self.path).map_err(|e| Error::Io(e.error))?;
        Ok(())
    }
}

impl Scheduler for FileScheduler {
    fn schedule(&mut self, request: ReminderRequest) -> Result<()> {
        let mut pending = self.load()?;
        pending.retain(|r| r.id != request.id);
        pending.push(request);
        self.save(&pending)
    }

    fn cancel(&mut self, id: u32) -> Result<()> {
        let mut pending = self.load()?;
        pending.retain(|r| r.id != id);
        self.save(&pending)
    }

    fn cancel_all(&mut self) -> Result<()> {
        self.save(&[])
    }

    fn list_pending(&self) -> Result<Vec<PendingReminder>> {
        Ok(self
            .load()?
            .iter()
            .map(|r| PendingReminder {
                id: r.id,
                payload: r.payload.clone(),
            })
            .collect())
    }
}
