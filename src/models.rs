use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::error::StoreError;

/// Snapshot of one remote entry as returned by a listing call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum RemoteEntry {
    File {
        path: String,
        name: String,
        size: u64,
        modified: Option<DateTime<Utc>>,
    },
    Directory {
        path: String,
        name: String,
    },
}

impl RemoteEntry {
    pub fn path(&self) -> &str {
        match self {
            RemoteEntry::File { path, .. } => path,
            RemoteEntry::Directory { path, .. } => path,
        }
    }

    pub fn name(&self) -> &str {
        match self {
            RemoteEntry::File { name, .. } => name,
            RemoteEntry::Directory { name, .. } => name,
        }
    }

    pub fn is_dir(&self) -> bool {
        matches!(self, RemoteEntry::Directory { .. })
    }
}

/// A local path known to be a regular file or a directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LocalEntry {
    File(PathBuf),
    Directory(PathBuf),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    Upload,
    Download,
}

/// Emitted once per completed single-file transfer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransferEvent {
    pub direction: Direction,
    pub local_path: PathBuf,
    pub remote_path: String,
    pub bytes: u64,
}

#[derive(Debug)]
pub struct TransferFailure {
    /// Remote path for downloads, local path (displayed) for uploads.
    pub path: String,
    pub error: StoreError,
}

/// Outcome of a recursive transfer. Per-entry failures land here instead
/// of aborting the walk.
#[derive(Debug, Default)]
pub struct TransferReport {
    pub transferred: Vec<PathBuf>,
    pub skipped: Vec<PathBuf>,
    pub failures: Vec<TransferFailure>,
    pub bytes: u64,
}

impl TransferReport {
    pub fn is_clean(&self) -> bool {
        self.failures.is_empty()
    }

    pub(crate) fn record_failure(&mut self, path: impl Into<String>, error: StoreError) {
        let path = path.into();
        tracing::warn!("Transfer of {} failed: {}", path, error);
        self.failures.push(TransferFailure { path, error });
    }

    pub(crate) fn merge(&mut self, other: TransferReport) {
        self.transferred.extend(other.transferred);
        self.skipped.extend(other.skipped);
        self.failures.extend(other.failures);
        self.bytes += other.bytes;
    }
}
