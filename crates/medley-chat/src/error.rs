use axum::{
    extract::rejection::{JsonRejection, QueryRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ChatError {
    #[error("Unauthorized")]
    Unauthorized,

    #[error("Invalid username or password")]
    InvalidCredentials,

    #[error("Username already taken")]
    UsernameTaken,

    #[error("{0}")]
    Validation(String),

    #[error("{0} not found")]
    NotFound(&'static str),

    #[error("Nothing to undo")]
    NothingToUndo,

    #[error("Internal error: {0}")]
    Internal(String),
}

impl ChatError {
    pub fn status(&self) -> StatusCode {
        match self {
            ChatError::Unauthorized | ChatError::InvalidCredentials => StatusCode::UNAUTHORIZED,
            ChatError::UsernameTaken | ChatError::Validation(_) | ChatError::NothingToUndo => {
                StatusCode::BAD_REQUEST
            }
            ChatError::NotFound(_) => StatusCode::NOT_FOUND,
            ChatError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<JsonRejection> for ChatError {
    fn from(rejection: JsonRejection) -> Self {
        ChatError::Validation(rejection.body_text())
    }
}

impl From<QueryRejection> for ChatError {
    fn from(rejection: QueryRejection) -> Self {
        ChatError::Validation(rejection.body_text())
    }
}

impl IntoResponse for ChatError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!("chat request failed: {self}");
        }
        (status, Json(json!({ "ok": false, "error": self.to_string() }))).into_response()
    }
}
