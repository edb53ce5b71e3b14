// ABOUTME: Audit sinks - the file-backed dump log and an in-memory recorder.
// ABOUTME: The dump log appends one line per event and flushes after each.

use std::fs::{File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use parking_lot::Mutex;

use super::AuditRecord;
use crate::error::AuditError;

/// Destination for audit records.
///
/// Sinks are called from the coordinator's checkpoint calls and may be
/// called concurrently.
pub trait AuditSink: Send + Sync {
    /// Persist one record.
    fn record(&self, record: &AuditRecord) -> Result<(), AuditError>;

    /// Release any resources. Later records may fail.
    fn close(&self) -> Result<(), AuditError> {
        Ok(())
    }
}

/// Append-only dump log on disk.
pub struct DumpLog {
    path: PathBuf,
    writer: Mutex<Option<BufWriter<File>>>,
}

impl DumpLog {
    /// Open `path` for appending, creating it if needed.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, AuditError> {
        let path = path.as_ref().to_path_buf();
        let file = OpenOptions::new().create(true).append(true).open(&path)?;
        Ok(Self {
            path,
            writer: Mutex::new(Some(BufWriter::new(file))),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl AuditSink for DumpLog {
    fn record(&self, record: &AuditRecord) -> Result<(), AuditError> {
        let mut guard = self.writer.lock();
        let writer = guard.as_mut().ok_or(AuditError::Closed)?;
        writeln!(writer, "{}", record.render())?;
        writer.flush()?;
        Ok(())
    }

    fn close(&self) -> Result<(), AuditError> {
        if let Some(mut writer) = self.writer.lock().take() {
            writer.flush()?;
        }
        Ok(())
    }
}

impl std::fmt::Debug for DumpLog {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DumpLog").field("path", &self.path).finish()
    }
}

/// Keeps records in memory.
#[derive(Debug, Default)]
pub struct MemoryAudit {
    records: Mutex<Vec<AuditRecord>>,
    closed: Mutex<bool>,
}

impl MemoryAudit {
    pub fn new() -> Self {
        Self::default()
    }

    /// All records so far.
    pub fn records(&self) -> Vec<AuditRecord> {
        self.records.lock().clone()
    }

    /// All records rendered as dump log lines.
    pub fn lines(&self) -> Vec<String> {
        self.records.lock().iter().map(AuditRecord::render).collect()
    }

    pub fn is_closed(&self) -> bool {
        *self.closed.lock()
    }
}

impl AuditSink for MemoryAudit {
    fn record(&self, record: &AuditRecord) -> Result<(), AuditError> {
        if self.is_closed() {
            return Err(AuditError::Closed);
        }
        self.records.lock().push(record.clone());
        Ok(())
    }

    fn close(&self) -> Result<(), AuditError> {
        *self.closed.lock() = true;
        Ok(())
    }
}

/// Discards every record.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoAudit;

impl AuditSink for NoAudit {
    fn record(&self, _record: &AuditRecord) -> Result<(), AuditError> {
        Ok(())
    }
}
