use std::path::PathBuf;
use std::time::Duration;

/// Runtime configuration for the daemon.
///
/// `temp_dir` and `archive_dir` must exist and be writable before the
/// service starts; `main` creates them from the CLI flags.
#[derive(Debug, Clone)]
pub struct DaemonConfig {
    /// How many tasks may be live (created but not yet finished) at once.
    pub max_active_tasks: usize,
    /// How many files a task collects before its pipeline starts.
    pub max_files_per_task: usize,
    /// Upper bound on one task's whole processing run.
    pub processing_timeout: Duration,
    /// Upper bound on one task's download batch.
    pub download_timeout: Duration,
    /// Allowed file extensions for attached URLs, leading dot included.
    pub allowed_extensions: Vec<String>,
    /// Where downloads are staged before archiving.
    pub temp_dir: PathBuf,
    /// Where finished archives are stored.
    pub archive_dir: PathBuf,
}
