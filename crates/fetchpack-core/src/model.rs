use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::EpochMs;

/// Lifecycle state of a task.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    /// Created, still collecting files.
    Pending,
    /// Downloads and archiving in flight.
    Processing,
    /// Archive written; terminal.
    Completed,
    /// Archive could not be produced; terminal.
    Failed,
}

/// Retrieval state of one attached file.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum FileStatus {
    /// Accepted, waiting for the batch download to start.
    Queued,
    /// Fetched into the staging directory.
    Downloaded,
    /// Could not be fetched; see the entry's error.
    Failed,
}

/// One URL attached to a task and its retrieval outcome.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FileEntry {
    /// The URL as submitted.
    pub url: String,
    /// Retrieval state.
    pub status: FileStatus,
    /// Failure reason, present iff `status` is failed.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// Where the downloaded body lives locally. Never exposed on the wire.
    #[serde(skip)]
    pub local_path: Option<PathBuf>,
}

impl FileEntry {
    /// A freshly attached entry waiting for its batch.
    pub fn queued(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            status: FileStatus::Queued,
            error: None,
            local_path: None,
        }
    }
}

/// One user-submitted batch of files to download and archive together.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Task {
    /// ULID, assigned at creation.
    pub id: String,
    /// Lifecycle state.
    pub status: TaskStatus,
    /// Attached files, in attachment order.
    pub files: Vec<FileEntry>,
    /// Creation timestamp.
    pub created_at_ms: EpochMs,
    /// Set when the task reaches a terminal state.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completed_at_ms: Option<EpochMs>,
    /// Where the finished archive lives. Never exposed on the wire.
    #[serde(skip)]
    pub archive_path: Option<PathBuf>,
}

impl Task {
    /// A new pending task with no files.
    pub fn new(id: impl Into<String>, created_at_ms: EpochMs) -> Self {
        Self {
            id: id.into(),
            status: TaskStatus::Pending,
            files: Vec::new(),
            created_at_ms,
            completed_at_ms: None,
            archive_path: None,
        }
    }
}
