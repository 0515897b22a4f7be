//! UMS routes and their middleware stack.

use std::sync::Arc;
use std::time::Duration;

use axum::{
    extract::DefaultBodyLimit,
    http::StatusCode,
    middleware::from_fn_with_state,
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use medley_config::UmsConfig;
use medley_security::{with_security_headers, RateLimiter};
use serde_json::json;

use crate::auth::{self, require_session, SharedAuth};
use crate::dashboard;
use crate::db::SharedDb;
use crate::handlers::{create, get_one, list, remove, update};
use crate::middleware::{frontend_cors, rate_limit};
use crate::models::{Course, Department, Faculty, Notice, Student};
use crate::resource::Resource;

fn resource_routes<R: Resource>(path: &str) -> Router<SharedDb> {
    Router::new()
        .route(path, get(list::<R>).post(create::<R>))
        .route(&format!("{path}/{{id}}"), get(get_one::<R>).put(update::<R>).delete(remove::<R>))
}

/// Build the UMS router: account routes, CRUD resources and the dashboard
/// under `/api/`, wrapped in rate limiting, frontend CORS, security headers
/// and the body limit. Resources need a session unless
/// `config.require_auth` is off.
pub fn build_router(config: &UmsConfig, db: SharedDb, accounts: SharedAuth) -> Router {
    let limiter = Arc::new(RateLimiter::new(
        Duration::from_millis(config.rate_limit_window_ms),
        config.rate_limit_max,
    ));

    let mut resources: Router = Router::new()
        .merge(resource_routes::<Department>("/api/departments"))
        .merge(resource_routes::<Student>("/api/students"))
        .merge(resource_routes::<Faculty>("/api/faculty"))
        .merge(resource_routes::<Course>("/api/courses"))
        .merge(resource_routes::<Notice>("/api/notices"))
        .route("/api/dashboard/stats", get(dashboard::stats))
        .with_state(db);
    if config.require_auth {
        resources = resources.layer(from_fn_with_state(accounts.clone(), require_session));
    }

    let session: Router = Router::new()
        .route("/api/ums/auth/me", get(auth::me))
        .route("/api/ums/auth/logout", post(auth::logout))
        .layer(from_fn_with_state(accounts.clone(), require_session))
        .with_state(accounts.clone());

    let api = Router::new()
        .route("/api/ums/auth/register", post(auth::register))
        .route("/api/ums/auth/login", post(auth::login))
        .with_state(accounts)
        .merge(session)
        .merge(resources)
        .layer(DefaultBodyLimit::max(config.body_limit_bytes))
        .layer(from_fn_with_state(limiter, rate_limit))
        .layer(frontend_cors(&config.frontend_url));

    with_security_headers(api)
}

/// Fallback for any unmatched path.
pub async fn not_found() -> impl IntoResponse {
    (StatusCode::NOT_FOUND, Json(json!({ "success": false, "message": "Route not found" })))
}
