//! Assemble the enabled applications into one router.

use std::sync::Arc;

use anyhow::Context;
use axum::{
    http::HeaderValue,
    routing::get,
    Router,
};
use medley_chat::ChatState;
use medley_config::Config;
use medley_rag::RagEngine;
use medley_tasks::MemoryTaskStore;
use medley_ums::{UmsAuth, UmsDb};
use tower_http::{
    compression::CompressionLayer,
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};
use tracing::{info, warn};

use crate::health::{health, HealthState};

/// CORS for the chat, tasks and RAG routes. No configured origins means any
/// origin is accepted.
pub fn server_cors(origins: &[String]) -> CorsLayer {
    if origins.is_empty() {
        return CorsLayer::permissive();
    }
    let allowed: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|origin| match HeaderValue::from_str(origin) {
            Ok(value) => Some(value),
            Err(_) => {
                warn!(origin = %origin, "ignoring invalid CORS origin");
                None
            }
        })
        .collect();
    CorsLayer::new()
        .allow_origin(allowed)
        .allow_methods(Any)
        .allow_headers(Any)
}

/// Build the full router for `config`. Seeds UMS demo data and builds the
/// RAG index from existing uploads when those apps are enabled.
pub async fn build_app(config: &Config) -> anyhow::Result<Router> {
    let mut enabled = Vec::new();
    let mut shared = Router::new();

    if config.apps.chat {
        let state = ChatState::new(config.chat.clone(), &config.security)
            .context("initialising chat password hasher")?;
        shared = shared.merge(medley_chat::build_router(Arc::new(state)));
        enabled.push("chat");
    }

    if config.apps.tasks {
        shared = shared.merge(medley_tasks::build_router(Arc::new(MemoryTaskStore::new())));
        enabled.push("tasks");
    }

    if config.apps.rag {
        let engine = RagEngine::from_config(config.rag.clone(), &config.llm);
        engine
            .rebuild()
            .await
            .with_context(|| format!("building RAG index from {}", config.rag.upload_dir.display()))?;
        shared = shared.merge(medley_rag::build_router(Arc::new(engine)));
        enabled.push("rag");
    }

    let ums = if config.apps.ums {
        let db = Arc::new(UmsDb::new());
        let accounts = Arc::new(UmsAuth::from_config(&config.security).context("initialising UMS password hasher")?);
        if config.ums.seed_demo_data {
            medley_ums::seed::seed_demo_data(&db).context("seeding UMS demo data")?;
            medley_ums::seed::seed_demo_admin(&accounts).context("seeding UMS demo admin")?;
        }
        enabled.push("ums");
        Some(medley_ums::build_router(&config.ums, db, accounts))
    } else {
        None
    };

    info!(apps = ?enabled, "applications mounted");

    let health_routes = Router::new()
        .route("/health", get(health))
        .with_state(Arc::new(HealthState::new(enabled)));

    // The UMS router carries its own frontend CORS policy.
    let mut app = shared
        .merge(health_routes)
        .layer(server_cors(&config.server.cors_origins));
    if let Some(ums) = ums {
        app = app.merge(ums);
    }

    Ok(app
        .fallback(medley_ums::not_found)
        .layer(CompressionLayer::new())
        .layer(TraceLayer::new_for_http()))
}

