//! RAG routes.

use std::sync::Arc;

use axum::{
    routing::{get, post},
    Router,
};

use crate::engine::RagEngine;
use crate::handlers::{ask, status, upload};

pub fn build_router(engine: Arc<RagEngine>) -> Router {
    Router::new()
        .route("/upload", post(upload))
        .route("/ask",    post(ask))
        .route("/status", get(status))
        .with_state(engine)
}
