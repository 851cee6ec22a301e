//! Append-only execution log.
//!
//! One record per executed device command, stored as JSON Lines. Appends are
//! serialized through a mutex so concurrent chains never interleave partial
//! lines.

use std::fs::{File, OpenOptions};
use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use agri_core::types::{DeviceCommand, Params};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::StorageError;

/// Status recorded for a command the dispatcher accepted.
pub const STATUS_OK: &str = "ok";

/// One executed device command.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExecutionLogEntry {
    #[serde(rename = "ts")]
    pub timestamp: DateTime<Utc>,
    pub task_id: String,
    pub trace_id: String,
    pub device_id: String,
    pub command: String,
    #[serde(default)]
    pub params: Params,
    pub status: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub elapsed_ms: u64,
}

impl ExecutionLogEntry {
    /// Entry for a command that completed successfully.
    pub fn ok(command: &DeviceCommand, elapsed: Duration) -> Self {
        Self {
            timestamp: Utc::now(),
            task_id: command.task_id.clone(),
            trace_id: command.trace_id.clone(),
            device_id: command.device_id.clone(),
            command: command.command.clone(),
            params: command.params.clone(),
            status: STATUS_OK.to_string(),
            error: None,
            elapsed_ms: elapsed.as_millis().min(u64::MAX as u128) as u64,
        }
    }

    /// Rebuild the device command this entry recorded, verbatim.
    pub fn to_command(&self) -> DeviceCommand {
        DeviceCommand {
            device_id: self.device_id.clone(),
            command: self.command.clone(),
            params: self.params.clone(),
            task_id: self.task_id.clone(),
            trace_id: self.trace_id.clone(),
        }
    }
}

/// Recorder for executed commands. Callers treat append failures as
/// non-fatal.
///
/// `append` is synchronous and is called from async tasks, so an
/// implementation blocks the calling runtime thread for the duration of
/// the write. Implementations must keep it short: a single buffered write,
/// not a network round trip.
pub trait ExecutionLog: Send + Sync {
    fn append(&self, entry: &ExecutionLogEntry) -> Result<(), StorageError>;
}

/// JSON Lines file log.
pub struct JsonlExecutionLog {
    path: PathBuf,
    file: Mutex<File>,
}

impl JsonlExecutionLog {
    /// Open (or create) the log file in append mode, creating parent
    /// directories as needed.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, StorageError> {
        let path = path.as_ref().to_path_buf();
        let io_err = |source| StorageError::Io {
            path: path.display().to_string(),
            source,
        };

        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent).map_err(io_err)?;
            }
        }
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .map_err(io_err)?;

        tracing::debug!(path = %path.display(), "Execution log opened");
        Ok(Self {
            path,
            file: Mutex::new(file),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read every entry currently in the file.
    pub fn read_all(&self) -> Result<Vec<ExecutionLogEntry>, StorageError> {
        read_all(&self.path)
    }
}

impl ExecutionLog for JsonlExecutionLog {
    /// Write and flush one line while holding the file lock. Blocks on disk I/O.
    fn append(&self, entry: &ExecutionLogEntry) -> Result<(), StorageError> {
        let mut line = serde_json::to_vec(entry)?;
        line.push(b'\n');

        let mut file = self.file.lock().map_err(|_| StorageError::LockPoisoned)?;
        file.write_all(&line)
            .and_then(|_| file.flush())
            .map_err(|source| StorageError::Io {
                path: self.path.display().to_string(),
                source,
            })
    }
}

/// Read a JSON Lines execution log. Blank lines are skipped; any other
/// undecodable line is an error naming its 1-based line number.
pub fn read_all(path: impl AsRef<Path>) -> Result<Vec<ExecutionLogEntry>, StorageError> {
    let path = path.as_ref();
    let io_err = |source| StorageError::Io {
        path: path.display().to_string(),
        source,
    };

    let file = File::open(path).map_err(io_err)?;
    let mut entries = Vec::new();
    for (idx, line) in BufReader::new(file).lines().enumerate() {
        let line = line.map_err(io_err)?;
        if line.trim().is_empty() {
            continue;
        }
        let entry = serde_json::from_str(&line).map_err(|e| StorageError::Malformed {
            line: idx + 1,
            message: e.to_string(),
        })?;
        entries.push(entry);
    }
    Ok(entries)
}

/// In-memory log, handy for tests and for running without a data directory.
#[derive(Default)]
pub struct MemoryExecutionLog {
    entries: Mutex<Vec<ExecutionLogEntry>>,
    failing: AtomicBool,
}

impl MemoryExecutionLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every subsequent append fail (or succeed again).
    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    pub fn entries(&self) -> Vec<ExecutionLogEntry> {
        self.entries.lock().map(|e| e.clone()).unwrap_or_default()
    }

    pub fn len(&self) -> usize {
        self.entries.lock().map(|e| e.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl ExecutionLog for MemoryExecutionLog {
    fn append(&self, entry: &ExecutionLogEntry) -> Result<(), StorageError> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(StorageError::Io {
                path: "<memory>".to_string(),
                source: std::io::Error::new(std::io::ErrorKind::Other, "simulated failure"),
            });
        }
        self.entries
            .lock()
            .map_err(|_| StorageError::LockPoisoned)?
            .push(entry.clone());
        Ok(())
    }
}
