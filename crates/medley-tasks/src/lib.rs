//! medley-tasks — Task manager CRUD API.
//! Tasks carry a priority, optional due date and free-form tags; the store
//! sits behind [`TaskStore`] so persistence can be swapped.

pub mod error;
pub mod handlers;
pub mod models;
pub mod router;
pub mod store;

pub use error::TaskError;
pub use models::{Priority, Task, TaskDraft, TaskPatch, TaskStats};
pub use router::build_router;
pub use store::{MemoryTaskStore, TaskFilter, TaskStore};
