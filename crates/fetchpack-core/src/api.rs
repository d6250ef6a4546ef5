use serde::{Deserialize, Serialize};

use crate::model::{FileEntry, TaskStatus};
use crate::EpochMs;

/// Response to task creation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateTaskResponse {
    /// Id of the new task.
    pub id: String,
}

/// Request to attach one URL to a task.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AddFileRequest {
    /// Remote file URL.
    pub url: String,
}

/// Point-in-time view of a task.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskStatusResponse {
    /// Lifecycle state.
    pub status: TaskStatus,
    /// Attached files in attachment order.
    pub files: Vec<FileEntry>,
    /// Relative download link, present once the archive is ready.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub archive: Option<String>,
    /// Creation timestamp.
    pub created_at_ms: EpochMs,
}
