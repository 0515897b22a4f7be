use std::sync::Arc;

use axum::{
    body::Bytes,
    extract::{Multipart, State},
    Json,
};
use serde_json::{json, Value};
use tracing::info;

use crate::engine::{RagEngine, RagStatus, INVALID_REQUEST};
use crate::error::RagError;

/// POST /upload. Multipart field `files`, any number of parts.
pub async fn upload(State(engine): State<Arc<RagEngine>>, mut multipart: Multipart) -> Result<Json<Value>, RagError> {
    let mut received = 0usize;
    let mut saved = Vec::new();

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| RagError::Upload(e.body_text()))?
    {
        if field.name() != Some("files") {
            continue;
        }
        let Some(filename) = field.file_name().filter(|n| !n.is_empty()).map(str::to_owned) else {
            continue;
        };
        received += 1;
        let contents = field.bytes().await.map_err(|e| RagError::Upload(e.body_text()))?;
        if let Some(name) = engine.save_upload(&filename, &contents).await? {
            saved.push(name);
        }
    }

    if received == 0 {
        return Ok(Json(json!({ "status": "no_files" })));
    }

    engine.rebuild().await?;
    info!(received, saved = saved.len(), "upload processed");
    Ok(Json(json!({ "status": "success", "saved": saved })))
}

/// POST /ask `{question}`. Always answers with `{answer}`; only transport
/// failures talking to the LLM produce an error status.
pub async fn ask(State(engine): State<Arc<RagEngine>>, body: Bytes) -> Result<Json<Value>, RagError> {
    let question = serde_json::from_slice::<Value>(&body)
        .ok()
        .and_then(|v| v.get("question").and_then(Value::as_str).map(str::to_owned));
    let answer = match question {
        Some(question) => engine.ask(&question).await?,
        None => INVALID_REQUEST.to_string(),
    };
    Ok(Json(json!({ "answer": answer })))
}

/// GET /status
pub async fn status(State(engine): State<Arc<RagEngine>>) -> Json<RagStatus> {
    Json(engine.status().await)
}
