//! Task routes.

use std::sync::Arc;

use axum::{
    routing::{get, patch},
    Router,
};

use crate::handlers::{create_task, delete_task, get_task, list_tasks, summary, toggle_complete, update_task};
use crate::store::TaskStore;

#[derive(Clone)]
pub struct TaskState {
    pub store: Arc<dyn TaskStore>,
}

pub fn build_router(store: Arc<dyn TaskStore>) -> Router {
    Router::new()
        .route("/api/tasks",               get(list_tasks).post(create_task))
        .route("/api/tasks/stats/summary", get(summary))
        .route("/api/tasks/{id}",          get(get_task).put(update_task).delete(delete_task))
        .route("/api/tasks/{id}/complete", patch(toggle_complete))
        .with_state(TaskState { store })
}
