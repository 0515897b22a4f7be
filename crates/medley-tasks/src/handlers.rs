//! Task API handlers.

use axum::{
    extract::{FromRequest, FromRequestParts, Path, State},
    http::StatusCode,
    Json,
};
use medley_common::{new_id, now};
use tracing::info;

use crate::error::TaskError;
use crate::models::{Task, TaskDraft, TaskPatch, TaskStats};
use crate::router::TaskState;
use crate::store::TaskFilter;

/// JSON body whose rejections become `422 {detail}`.
#[derive(FromRequest)]
#[from_request(via(axum::Json), rejection(TaskError))]
pub struct TaskJson<T>(pub T);

/// Query string whose rejections become `422 {detail}`.
#[derive(FromRequestParts)]
#[from_request(via(axum::extract::Query), rejection(TaskError))]
pub struct TaskQuery<T>(pub T);

/// GET /api/tasks
pub async fn list_tasks(
    State(state): State<TaskState>,
    TaskQuery(filter): TaskQuery<TaskFilter>,
) -> Result<Json<Vec<Task>>, TaskError> {
    Ok(Json(state.store.list(&filter).await?))
}

/// GET /api/tasks/{id}
pub async fn get_task(State(state): State<TaskState>, Path(id): Path<String>) -> Result<Json<Task>, TaskError> {
    state.store.get(&id).await?.map(Json).ok_or(TaskError::NotFound)
}

/// POST /api/tasks
pub async fn create_task(
    State(state): State<TaskState>,
    TaskJson(draft): TaskJson<TaskDraft>,
) -> Result<(StatusCode, Json<Task>), TaskError> {
    draft.validate()?;
    let task = state.store.insert(draft.into_task(new_id(), now())).await?;
    info!(id = %task.id, priority = task.priority.as_str(), "task created");
    Ok((StatusCode::CREATED, Json(task)))
}

/// PUT /api/tasks/{id}
pub async fn update_task(
    State(state): State<TaskState>,
    Path(id): Path<String>,
    TaskJson(patch): TaskJson<TaskPatch>,
) -> Result<Json<Task>, TaskError> {
    patch.validate()?;
    state.store.update(&id, patch).await?.map(Json).ok_or(TaskError::NotFound)
}

/// PATCH /api/tasks/{id}/complete
pub async fn toggle_complete(State(state): State<TaskState>, Path(id): Path<String>) -> Result<Json<Task>, TaskError> {
    state.store.toggle_completed(&id).await?.map(Json).ok_or(TaskError::NotFound)
}

/// DELETE /api/tasks/{id}
pub async fn delete_task(State(state): State<TaskState>, Path(id): Path<String>) -> Result<StatusCode, TaskError> {
    if state.store.delete(&id).await? {
        info!(id = %id, "task deleted");
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(TaskError::NotFound)
    }
}

/// GET /api/tasks/stats/summary
pub async fn summary(State(state): State<TaskState>) -> Result<Json<TaskStats>, TaskError> {
    let tasks = state.store.list(&TaskFilter::default()).await?;
    Ok(Json(TaskStats::from_tasks(&tasks)))
}
