//! Append-only operation history.
//!
//! One line per encrypt/decrypt attempt:
//! ```text
//! [2026-10-16 14:03:22] ENCRYPTION - report.pdf - SUCCESS - out/report.pdf.enc
//! [2026-10-16 14:05:10] DECRYPTION - a.pdf.enc - FAILED - incorrect password or corrupted file - a
//! ```
//!
//! `FileHistory` serializes every access through a mutex so concurrent
//! requests never interleave partial lines.

use chrono::{DateTime, Local};
use std::fmt;
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};

use crate::error::LockboxResult;

pub const NO_HISTORY: &str = "No history available.";
pub const NO_RECENT_HISTORY: &str = "No recent history.";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    Encryption,
    Decryption,
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Operation::Encryption => f.write_str("ENCRYPTION"),
            Operation::Decryption => f.write_str("DECRYPTION"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    Success,
    Failed(String),
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Outcome::Success => f.write_str("SUCCESS"),
            Outcome::Failed(reason) => write!(f, "FAILED - {}", single_line(reason)),
        }
    }
}

#[derive(Debug, Clone)]
pub struct HistoryEvent {
    pub timestamp: DateTime<Local>,
    pub operation: Operation,
    /// Name of the source file as the user supplied it
    pub filename: String,
    pub outcome: Outcome,
    pub output_path: Option<PathBuf>,
}

impl HistoryEvent {
    pub fn new(
        operation: Operation,
        filename: impl Into<String>,
        outcome: Outcome,
        output_path: Option<PathBuf>,
    ) -> Self {
        Self {
            timestamp: Local::now(),
            operation,
            filename: filename.into(),
            outcome,
            output_path,
        }
    }
}

impl fmt::Display for HistoryEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let output = self
            .output_path
            .as_ref()
            .map(|p| p.display().to_string())
            .unwrap_or_default();
        write!(
            f,
            "[{}] {} - {} - {} - {}",
            self.timestamp.format("%Y-%m-%d %H:%M:%S"),
            self.operation,
            single_line(&self.filename),
            self.outcome,
            single_line(&output),
        )
    }
}

fn single_line(s: &str) -> String {
    s.replace(['\r', '\n'], " ")
}

/// Storage for operation history.
pub trait HistoryStore: Send + Sync {
    fn append(&self, event: &HistoryEvent) -> LockboxResult<()>;

    /// Entire log, or [`NO_HISTORY`] if nothing was ever recorded.
    fn read_all(&self) -> LockboxResult<String>;

    /// Last `lines` entries, newest last. `0` means every entry.
    fn read_recent(&self, lines: usize) -> LockboxResult<String>;

    /// Drop all entries.
    fn clear(&self) -> LockboxResult<()>;
}

/// History kept in a plain text file.
pub struct FileHistory {
    path: PathBuf,
    lock: Mutex<()>,
}

impl FileHistory {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn guard(&self) -> MutexGuard<'_, ()> {
        // The guarded data is (), so a poisoned lock carries no broken state
        self.lock.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn read_existing(&self) -> LockboxResult<Option<String>> {
        match fs::read_to_string(&self.path) {
            Ok(content) => Ok(Some(content)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }
}

impl HistoryStore for FileHistory {
    fn append(&self, event: &HistoryEvent) -> LockboxResult<()> {
        let _guard = self.guard();
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;
        // One write call per line
        file.write_all(format!("{event}\n").as_bytes())?;
        tracing::debug!(
            operation = %event.operation,
            filename = %event.filename,
            outcome = %event.outcome,
            "history event recorded"
        );
        Ok(())
    }

    fn read_all(&self) -> LockboxResult<String> {
        let _guard = self.guard();
        Ok(match self.read_existing()? {
            Some(content) => content.trim().to_string(),
            None => NO_HISTORY.to_string(),
        })
    }

    fn read_recent(&self, lines: usize) -> LockboxResult<String> {
        let _guard = self.guard();
        let Some(content) = self.read_existing()? else {
            return Ok(NO_HISTORY.to_string());
        };

        let all: Vec<&str> = content.lines().collect();
        if all.is_empty() {
            return Ok(NO_RECENT_HISTORY.to_string());
        }
        let start = match lines {
            0 => 0,
            n => all.len().saturating_sub(n),
        };
        let mut recent = all[start..].join("\n");
        recent.push('\n');
        Ok(recent)
    }

    fn clear(&self) -> LockboxResult<()> {
        let _guard = self.guard();
        // Truncate rather than delete so the file keeps its permissions
        OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(true)
            .open(&self.path)?;
        Ok(())
    }
}
