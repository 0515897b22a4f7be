//! medley-web — The single server hosting every Medley application.
//! Mounts the chat, tasks, UMS and RAG routers side by side, adds the shared
//! CORS, compression and request tracing layers and an aggregated
//! `/health` endpoint.

pub mod app;
pub mod health;

pub use app::build_app;
