use axum::{
    extract::rejection::{JsonRejection, QueryRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum UmsError {
    #[error("{0} not found")]
    NotFound(&'static str),

    #[error("{0}")]
    Validation(String),

    #[error("{0}")]
    Conflict(String),

    #[error("{0}")]
    Unauthorized(&'static str),

    #[error("Request entity too large")]
    TooLarge,

    #[error("Too many requests, please try again later.")]
    TooManyRequests,

    #[error("Internal Server Error")]
    Internal(String),
}

impl UmsError {
    pub fn status(&self) -> StatusCode {
        match self {
            UmsError::NotFound(_) => StatusCode::NOT_FOUND,
            UmsError::Validation(_) => StatusCode::BAD_REQUEST,
            UmsError::Conflict(_) => StatusCode::CONFLICT,
            UmsError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            UmsError::TooLarge => StatusCode::PAYLOAD_TOO_LARGE,
            UmsError::TooManyRequests => StatusCode::TOO_MANY_REQUESTS,
            UmsError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<JsonRejection> for UmsError {
    fn from(rejection: JsonRejection) -> Self {
        if rejection.status() == StatusCode::PAYLOAD_TOO_LARGE {
            UmsError::TooLarge
        } else {
            UmsError::Validation(rejection.body_text())
        }
    }
}

impl From<QueryRejection> for UmsError {
    fn from(rejection: QueryRejection) -> Self {
        UmsError::Validation(rejection.body_text())
    }
}

impl From<serde_json::Error> for UmsError {
    fn from(e: serde_json::Error) -> Self {
        UmsError::Validation(e.to_string())
    }
}

impl IntoResponse for UmsError {
    fn into_response(self) -> Response {
        if let UmsError::Internal(detail) = &self {
            tracing::error!("ums request failed: {detail}");
        }
        let status = self.status();
        (status, Json(json!({ "success": false, "message": self.to_string() }))).into_response()
    }
}
