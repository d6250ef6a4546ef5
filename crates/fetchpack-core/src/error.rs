use thiserror::Error;

/// Errors returned by the synchronous task operations.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum TaskError {
    /// Every active-task slot is taken; try again later.
    #[error("too many active tasks")]
    Busy,
    /// No task with the given id.
    #[error("task not found")]
    NotFound,
    /// The task already holds its maximum number of files.
    #[error("max files per task reached")]
    MaxFiles,
    /// The URL's extension is not in the allow-list.
    #[error("file type not allowed")]
    InvalidFileType,
    /// The task has not produced an archive (yet).
    #[error("archive not available")]
    ArchiveNotReady,
}
