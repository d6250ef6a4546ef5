//! Concurrent retrieval of a task's URLs into the staging directory.

use std::path::{Path, PathBuf};

use fetchpack_core::validation;
use reqwest::Client;
use thiserror::Error;
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tokio::task::JoinSet;
use tokio::time::{timeout_at, Instant};
use tracing::warn;
use uuid::Uuid;

/// Why a single download failed.
#[derive(Debug, Error)]
pub enum DownloadError {
    /// The request could not be sent or the body read.
    #[error("request failed: {0}")]
    Request(#[from] reqwest::Error),
    /// The server answered with a non-success status.
    #[error("unexpected status {0}")]
    Status(reqwest::StatusCode),
    /// Local file error while writing the body.
    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),
    /// The shared batch deadline expired mid-download.
    #[error("deadline exceeded")]
    DeadlineExceeded,
}

/// Downloads every URL concurrently into `dest_dir`.
///
/// Returns one result per URL, in input order. A failed or slow URL only
/// affects its own slot, and no download outlives `deadline`.
pub async fn download_batch(
    client: &Client,
    urls: &[String],
    dest_dir: &Path,
    deadline: Instant,
) -> Vec<Result<PathBuf, DownloadError>> {
    let mut set = JoinSet::new();
    for (idx, url) in urls.iter().enumerate() {
        let client = client.clone();
        let url = url.clone();
        let dest = dest_dir.to_path_buf();
        set.spawn(async move { (idx, fetch_one(&client, &url, &dest, deadline).await) });
    }

    let mut slots: Vec<Option<Result<PathBuf, DownloadError>>> =
        urls.iter().map(|_| None).collect();
    while let Some(joined) = set.join_next().await {
        match joined {
            Ok((idx, result)) => slots[idx] = Some(result),
            Err(e) => warn!("download worker failed to join: {e}"),
        }
    }

    slots
        .into_iter()
        .map(|slot| slot.unwrap_or(Err(DownloadError::DeadlineExceeded)))
        .collect()
}

/// Fetches one URL into a fresh uniquely named file under `dest_dir`.
///
/// Only a success status is accepted. The partial file is removed before an
/// error is returned, so a failed download leaves nothing behind.
pub async fn fetch_one(
    client: &Client,
    url: &str,
    dest_dir: &Path,
    deadline: Instant,
) -> Result<PathBuf, DownloadError> {
    let mut resp = match timeout_at(deadline, client.get(url).send()).await {
        Ok(resp) => resp?,
        Err(_) => return Err(DownloadError::DeadlineExceeded),
    };
    if !resp.status().is_success() {
        return Err(DownloadError::Status(resp.status()));
    }

    let ext = validation::url_extension(url).unwrap_or(".bin");
    let path = dest_dir.join(format!("dl-{}{ext}", Uuid::new_v4()));
    let mut file = fs::File::create(&path).await?;

    loop {
        match timeout_at(deadline, resp.chunk()).await {
            Ok(Ok(Some(chunk))) => {
                if let Err(e) = file.write_all(&chunk).await {
                    return Err(discard(file, &path, e.into()).await);
                }
            }
            Ok(Ok(None)) => break,
            Ok(Err(e)) => return Err(discard(file, &path, e.into()).await),
            Err(_) => return Err(discard(file, &path, DownloadError::DeadlineExceeded).await),
        }
    }

    if let Err(e) = file.flush().await {
        return Err(discard(file, &path, e.into()).await);
    }
    Ok(path)
}

/// Drops the handle and best-effort removes the partial file.
async fn discard(file: fs::File, path: &Path, err: DownloadError) -> DownloadError {
    drop(file);
    if let Err(e) = fs::remove_file(path).await {
        warn!(path = %path.display(), "failed to remove partial download: {e}");
    }
    err
}
