//! Task persistence.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::Utc;
use serde::Deserialize;
use tokio::sync::RwLock;

use crate::error::TaskError;
use crate::models::{Priority, Task, TaskPatch};

/// Query-string filters for listing tasks.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TaskFilter {
    pub completed: Option<bool>,
    pub priority: Option<Priority>,
    pub tag: Option<String>,
}

impl TaskFilter {
    pub fn matches(&self, task: &Task) -> bool {
        self.completed.map_or(true, |c| task.completed == c)
            && self.priority.map_or(true, |p| task.priority == p)
            && self.tag.as_ref().map_or(true, |tag| task.tags.contains(tag))
    }
}

#[async_trait]
pub trait TaskStore: Send + Sync {
    async fn insert(&self, task: Task) -> Result<Task, TaskError>;
    async fn get(&self, id: &str) -> Result<Option<Task>, TaskError>;
    /// Matching tasks, newest first.
    async fn list(&self, filter: &TaskFilter) -> Result<Vec<Task>, TaskError>;
    /// Applies `patch` and bumps `updated_at`. `None` if the id is unknown.
    async fn update(&self, id: &str, patch: TaskPatch) -> Result<Option<Task>, TaskError>;
    /// Flips `completed` and bumps `updated_at` in one step. `None` if the id is unknown.
    async fn toggle_completed(&self, id: &str) -> Result<Option<Task>, TaskError>;
    async fn delete(&self, id: &str) -> Result<bool, TaskError>;
}

#[derive(Default)]
pub struct MemoryTaskStore {
    tasks: RwLock<HashMap<String, Task>>,
}

impl MemoryTaskStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl TaskStore for MemoryTaskStore {
    async fn insert(&self, task: Task) -> Result<Task, TaskError> {
        self.tasks.write().await.insert(task.id.clone(), task.clone());
        Ok(task)
    }

    async fn get(&self, id: &str) -> Result<Option<Task>, TaskError> {
        Ok(self.tasks.read().await.get(id).cloned())
    }

    async fn list(&self, filter: &TaskFilter) -> Result<Vec<Task>, TaskError> {
        let mut tasks: Vec<Task> = self
            .tasks
            .read()
            .await
            .values()
            .filter(|t| filter.matches(t))
            .cloned()
            .collect();
        tasks.sort_by(|a, b| b.created_at.cmp(&a.created_at).then_with(|| b.id.cmp(&a.id)));
        Ok(tasks)
    }

    async fn update(&self, id: &str, patch: TaskPatch) -> Result<Option<Task>, TaskError> {
        let mut tasks = self.tasks.write().await;
        Ok(tasks.get_mut(id).map(|task| {
            task.apply(patch, Utc::now());
            task.clone()
        }))
    }

    async fn toggle_completed(&self, id: &str) -> Result<Option<Task>, TaskError> {
        let mut tasks = self.tasks.write().await;
        Ok(tasks.get_mut(id).map(|task| {
            let completed = !task.completed;
            task.apply(TaskPatch::completed(completed), Utc::now());
            task.clone()
        }))
    }

    async fn delete(&self, id: &str) -> Result<bool, TaskError> {
        Ok(self.tasks.write().await.remove(id).is_some())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::TaskDraft;
    use chrono::Duration;
    use pretty_assertions::assert_eq;

    fn draft(title: &str, priority: Priority, tags: &[&str]) -> TaskDraft {
        TaskDraft {
            title: title.into(),
            priority,
            tags: tags.iter().map(|t| t.to_string()).collect(),
            ..TaskDraft::default()
        }
    }

    fn seeded() -> MemoryTaskStore {
        let store = MemoryTaskStore::new();
        let base = Utc::now();
        let drafts = [
            draft("oldest", Priority::Low, &["home"]),
            draft("middle", Priority::High, &["work"]),
            draft("newest", Priority::High, &["work", "urgent"]),
        ];
        tokio_test::block_on(async {
            for (i, d) in drafts.into_iter().enumerate() {
                let task = d.into_task(format!("t{i}"), base + Duration::seconds(i as i64));
                store.insert(task).await.unwrap();
            }
        });
        store
    }

    fn titles(tasks: &[Task]) -> Vec<&str> {
        tasks.iter().map(|t| t.title.as_str()).collect()
    }

    #[test]
    fn test_list_is_newest_first() {
        let store = seeded();
        let all = tokio_test::block_on(store.list(&TaskFilter::default())).unwrap();
        assert_eq!(titles(&all), vec!["newest", "middle", "oldest"]);
    }

    #[test]
    fn test_filters_combine() {
        let store = seeded();
        let filter = TaskFilter { priority: Some(Priority::High), tag: Some("urgent".into()), ..TaskFilter::default() };
        let hits = tokio_test::block_on(store.list(&filter)).unwrap();
        assert_eq!(titles(&hits), vec!["newest"]);

        let filter = TaskFilter { completed: Some(true), ..TaskFilter::default() };
        assert!(tokio_test::block_on(store.list(&filter)).unwrap().is_empty());
    }

    #[test]
    fn test_update_and_delete_unknown_ids() {
        let store = seeded();
        tokio_test::block_on(async {
            assert!(store.update("nope", TaskPatch::completed(true)).await.unwrap().is_none());
            assert!(!store.delete("nope").await.unwrap());

            let updated = store.update("t0", TaskPatch::completed(true)).await.unwrap().unwrap();
            assert!(updated.completed);
            assert!(store.delete("t0").await.unwrap());
            assert!(store.get("t0").await.unwrap().is_none());
        });
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_toggles_are_not_lost() {
        let store = std::sync::Arc::new(MemoryTaskStore::new());
        store.insert(draft("contended", Priority::Low, &[]).into_task("t1".into(), Utc::now())).await.unwrap();
        let handles: Vec<_> = (0..101)
            .map(|_| {
                let store = store.clone();
                tokio::spawn(async move { store.toggle_completed("t1").await.unwrap() })
            })
            .collect();
        for handle in handles {
            assert!(handle.await.unwrap().is_some());
        }
        assert!(store.get("t1").await.unwrap().unwrap().completed);
        assert!(store.toggle_completed("nope").await.unwrap().is_none());
    }
}
