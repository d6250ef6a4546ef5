//! HTTP surface over the task manager.

use std::sync::Arc;

use axum::extract::{Path, State};
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use fetchpack_core::api::{AddFileRequest, CreateTaskResponse, TaskStatusResponse};
use fetchpack_core::error::TaskError;
use fetchpack_core::model::TaskStatus;
use serde_json::json;

use crate::service::TaskManager;

/// Shared handler state.
#[derive(Clone)]
pub struct AppState {
    manager: Arc<TaskManager>,
}

impl AppState {
    /// Wraps the manager for the router.
    pub fn new(manager: Arc<TaskManager>) -> Self {
        Self { manager }
    }
}

/// `TaskError` carried to the HTTP boundary.
#[derive(Debug)]
pub struct ApiError(TaskError);

impl From<TaskError> for ApiError {
    fn from(err: TaskError) -> Self {
        Self(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let code = match self.0 {
            TaskError::Busy => StatusCode::TOO_MANY_REQUESTS,
            TaskError::NotFound | TaskError::ArchiveNotReady => StatusCode::NOT_FOUND,
            TaskError::MaxFiles | TaskError::InvalidFileType => StatusCode::BAD_REQUEST,
        };
        (code, Json(json!({ "error": self.0.to_string() }))).into_response()
    }
}

pub async fn healthz() -> &'static str {
    "ok"
}

pub async fn create_task(
    State(state): State<AppState>,
) -> Result<(StatusCode, Json<CreateTaskResponse>), ApiError> {
    let task = state.manager.create_task()?;
    Ok((StatusCode::CREATED, Json(CreateTaskResponse { id: task.id })))
}

pub async fn add_file(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(req): Json<AddFileRequest>,
) -> Result<StatusCode, ApiError> {
    state.manager.add_file(&id, &req.url)?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn task_status(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<TaskStatusResponse>, ApiError> {
    let task = state.manager.get_task(&id)?;
    let archive = matches!(task.status, TaskStatus::Completed)
        .then(|| format!("/v1/tasks/{}/archive", task.id));
    Ok(Json(TaskStatusResponse {
        status: task.status,
        files: task.files,
        archive,
        created_at_ms: task.created_at_ms,
    }))
}

pub async fn download_archive(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Response, ApiError> {
    let path = state.manager.archive_path(&id)?;
    let bytes = tokio::fs::read(&path).await.map_err(|e| {
        tracing::warn!(path = %path.display(), "failed to read archive: {e}");
        ApiError(TaskError::ArchiveNotReady)
    })?;

    let headers = [
        (header::CONTENT_TYPE, "application/zip".to_string()),
        (
            header::CONTENT_DISPOSITION,
            format!("attachment; filename=\"{id}.zip\""),
        ),
    ];
    Ok((headers, bytes).into_response())
}
