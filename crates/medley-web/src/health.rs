use std::sync::Arc;
use std::time::Instant;

use axum::{extract::State, Json};
use serde::Serialize;

#[derive(Debug, Clone)]
pub struct HealthState {
    started: Instant,
    apps: Vec<&'static str>,
}

impl HealthState {
    pub fn new(apps: Vec<&'static str>) -> Self {
        Self { started: Instant::now(), apps }
    }
}

#[derive(Debug, Serialize)]
pub struct Health {
    pub status: &'static str,
    pub timestamp: String,
    /// Seconds since startup.
    pub uptime: f64,
    pub apps: Vec<&'static str>,
}

/// GET /health
pub async fn health(State(state): State<Arc<HealthState>>) -> Json<Health> {
    Json(Health {
        status: "ok",
        timestamp: medley_common::now().to_rfc3339(),
        uptime: state.started.elapsed().as_secs_f64(),
        apps: state.apps.clone(),
    })
}
