use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use medley_llm::LlmError;
use serde_json::json;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum RagError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Embedding failed: {0}")]
    Embedding(String),

    #[error("Index error: {0}")]
    Index(String),

    #[error("LLM error: {0}")]
    Llm(#[from] LlmError),

    #[error("Invalid upload: {0}")]
    Upload(String),
}

impl IntoResponse for RagError {
    fn into_response(self) -> Response {
        let status = match &self {
            RagError::Upload(_) => StatusCode::BAD_REQUEST,
            RagError::Llm(_) => StatusCode::BAD_GATEWAY,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };
        tracing::error!(%status, "rag request failed: {self}");
        (status, Json(json!({ "error": self.to_string() }))).into_response()
    }
}
