//! The task manager: registry, bounded admission, and the per-task
//! download-then-archive pipeline.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::{Arc, Mutex, MutexGuard};

use fetchpack_core::error::TaskError;
use fetchpack_core::model::{FileEntry, FileStatus, Task, TaskStatus};
use fetchpack_core::{new_ulid, now_ms, validation};
use tokio::sync::{OwnedSemaphorePermit, Semaphore};
use tokio::time::Instant;
use tracing::{info, warn};

use crate::archive;
use crate::config::DaemonConfig;
use crate::download;

/// A registered task plus the admission permit it holds until its pipeline
/// run starts.
struct TaskEntry {
    task: Task,
    permit: Option<OwnedSemaphorePermit>,
}

/// Main service implementing the task pipeline.
///
/// The registry lock and the per-task locks are independent: a status read
/// never contends with another task's pipeline, and neither lock is held
/// across network or file I/O.
pub struct TaskManager {
    cfg: DaemonConfig,
    client: reqwest::Client,
    slots: Arc<Semaphore>,
    tasks: Mutex<HashMap<String, Arc<Mutex<TaskEntry>>>>,
}

impl TaskManager {
    /// Creates a manager with `cfg.max_active_tasks` admission slots.
    pub fn new(cfg: DaemonConfig) -> Self {
        Self {
            client: reqwest::Client::new(),
            slots: Arc::new(Semaphore::new(cfg.max_active_tasks)),
            tasks: Mutex::new(HashMap::new()),
            cfg,
        }
    }

    /// Registers a new pending task, reserving one admission slot.
    ///
    /// The slot stays reserved until the task's pipeline run ends. With no
    /// slot free this rejects immediately rather than queueing.
    pub fn create_task(&self) -> Result<Task, TaskError> {
        let mut tasks = lock(&self.tasks);
        let permit = Arc::clone(&self.slots)
            .try_acquire_owned()
            .map_err(|_| TaskError::Busy)?;

        let task = Task::new(new_ulid().to_string(), now_ms());
        tasks.insert(
            task.id.clone(),
            Arc::new(Mutex::new(TaskEntry {
                task: task.clone(),
                permit: Some(permit),
            })),
        );
        info!(task_id = %task.id, "task created");
        Ok(task)
    }

    /// Attaches one URL to a task.
    ///
    /// The attach that fills the quota hands the task to a detached pipeline
    /// run; the length transition under the task lock guarantees that spawn
    /// happens exactly once.
    pub fn add_file(&self, task_id: &str, url: &str) -> Result<(), TaskError> {
        let handle = self.entry(task_id)?;
        let mut entry = lock(&handle);

        if entry.task.files.len() >= self.cfg.max_files_per_task {
            return Err(TaskError::MaxFiles);
        }
        if !validation::extension_allowed(url, &self.cfg.allowed_extensions) {
            return Err(TaskError::InvalidFileType);
        }

        entry.task.files.push(FileEntry::queued(url));
        if entry.task.files.len() == self.cfg.max_files_per_task {
            let permit = entry.permit.take();
            drop(entry);
            tokio::spawn(process_task(
                self.cfg.clone(),
                self.client.clone(),
                Arc::clone(&handle),
                permit,
            ));
        }
        Ok(())
    }

    /// Point-in-time snapshot of a task. Never waits on the pipeline.
    pub fn get_task(&self, task_id: &str) -> Result<Task, TaskError> {
        let handle = self.entry(task_id)?;
        let entry = lock(&handle);
        Ok(entry.task.clone())
    }

    /// Path of the finished archive, available only once the task completed.
    pub fn archive_path(&self, task_id: &str) -> Result<PathBuf, TaskError> {
        let handle = self.entry(task_id)?;
        let entry = lock(&handle);
        match (entry.task.status, &entry.task.archive_path) {
            (TaskStatus::Completed, Some(path)) => Ok(path.clone()),
            _ => Err(TaskError::ArchiveNotReady),
        }
    }

    fn entry(&self, task_id: &str) -> Result<Arc<Mutex<TaskEntry>>, TaskError> {
        let tasks = lock(&self.tasks);
        tasks.get(task_id).cloned().ok_or(TaskError::NotFound)
    }
}

/// One detached pipeline run: download everything, record the per-file
/// outcomes, build the archive, stamp the terminal state.
///
/// The admission permit rides along and is released when this future ends,
/// whatever the outcome.
async fn process_task(
    cfg: DaemonConfig,
    client: reqwest::Client,
    handle: Arc<Mutex<TaskEntry>>,
    permit: Option<OwnedSemaphorePermit>,
) {
    let (task_id, urls) = {
        let mut entry = lock(&handle);
        entry.task.status = TaskStatus::Processing;
        let urls: Vec<String> = entry.task.files.iter().map(|f| f.url.clone()).collect();
        (entry.task.id.clone(), urls)
    };
    info!(task_id = %task_id, files = urls.len(), "processing task");

    let deadline = Instant::now() + cfg.download_timeout.min(cfg.processing_timeout);
    let results = download::download_batch(&client, &urls, &cfg.temp_dir, deadline).await;

    let (sources, names) = {
        let mut entry = lock(&handle);
        for (file, result) in entry.task.files.iter_mut().zip(&results) {
            match result {
                Ok(path) => {
                    file.status = FileStatus::Downloaded;
                    file.local_path = Some(path.clone());
                }
                Err(e) => {
                    file.status = FileStatus::Failed;
                    file.error = Some(e.to_string());
                }
            }
        }
        let sources: Vec<Option<PathBuf>> = entry
            .task
            .files
            .iter()
            .map(|f| f.local_path.clone())
            .collect();
        let names: Vec<String> = entry
            .task
            .files
            .iter()
            .map(|f| {
                validation::url_file_name(&f.url)
                    .unwrap_or("download.bin")
                    .to_string()
            })
            .collect();
        (sources, names)
    };

    let dest = cfg.archive_dir.join(format!("{task_id}.zip"));
    let built = {
        let dest = dest.clone();
        tokio::task::spawn_blocking(move || archive::build_archive(&sources, &names, &dest)).await
    };

    let mut entry = lock(&handle);
    // The slot must be free by the time the terminal status is visible:
    // whoever observes a finished task can create a new one right away.
    drop(permit);
    match built {
        Ok(Ok(())) => {
            entry.task.status = TaskStatus::Completed;
            entry.task.archive_path = Some(dest);
            entry.task.completed_at_ms = Some(now_ms());
            info!(task_id = %task_id, "task completed");
        }
        Ok(Err(e)) => {
            entry.task.status = TaskStatus::Failed;
            entry.task.completed_at_ms = Some(now_ms());
            warn!(task_id = %task_id, error = %e, "archive build failed");
        }
        Err(e) => {
            entry.task.status = TaskStatus::Failed;
            entry.task.completed_at_ms = Some(now_ms());
            warn!(task_id = %task_id, "archive build panicked: {e}");
        }
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|e| e.into_inner())
}
