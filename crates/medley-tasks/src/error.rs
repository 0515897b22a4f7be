use axum::{
    extract::rejection::{JsonRejection, QueryRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum TaskError {
    #[error("Task not found")]
    NotFound,

    #[error("{0}")]
    Validation(String),

    #[error("storage error: {0}")]
    Storage(String),
}

impl From<JsonRejection> for TaskError {
    fn from(rejection: JsonRejection) -> Self {
        TaskError::Validation(rejection.body_text())
    }
}

impl From<QueryRejection> for TaskError {
    fn from(rejection: QueryRejection) -> Self {
        TaskError::Validation(rejection.body_text())
    }
}

impl IntoResponse for TaskError {
    fn into_response(self) -> Response {
        let status = match &self {
            TaskError::NotFound => StatusCode::NOT_FOUND,
            TaskError::Validation(_) => StatusCode::UNPROCESSABLE_ENTITY,
            TaskError::Storage(e) => {
                tracing::error!("task storage failure: {e}");
                StatusCode::INTERNAL_SERVER_ERROR
            }
        };
        (status, Json(json!({ "detail": self.to_string() }))).into_response()
    }
}
