//! Task records and the request shapes that create or change them.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};

use crate::error::TaskError;

const MAX_TITLE: usize = 200;
const MAX_DESCRIPTION: usize = 1000;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    Low,
    #[default]
    Medium,
    High,
}

impl Priority {
    pub const ALL: [Priority; 3] = [Priority::Low, Priority::Medium, Priority::High];

    pub fn as_str(self) -> &'static str {
        match self {
            Priority::Low => "low",
            Priority::Medium => "medium",
            Priority::High => "high",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Task {
    pub id: String,
    pub title: String,
    pub description: String,
    pub priority: Priority,
    pub completed: bool,
    pub due_date: Option<String>,
    pub tags: Vec<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Body of `POST /api/tasks`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TaskDraft {
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub priority: Priority,
    #[serde(default)]
    pub due_date: Option<String>,
    #[serde(default)]
    pub tags: Vec<String>,
}

impl TaskDraft {
    pub fn validate(&self) -> Result<(), TaskError> {
        validate_title(&self.title)?;
        validate_description(self.description.as_deref().unwrap_or(""))
    }

    pub fn into_task(self, id: String, now: DateTime<Utc>) -> Task {
        Task {
            id,
            title: self.title,
            description: self.description.unwrap_or_default(),
            priority: self.priority,
            completed: false,
            due_date: self.due_date,
            tags: self.tags,
            created_at: now,
            updated_at: now,
        }
    }
}

/// Body of `PUT /api/tasks/{id}`. Absent fields are left alone; an explicit
/// `"due_date": null` clears the due date.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TaskPatch {
    pub title: Option<String>,
    pub description: Option<String>,
    pub priority: Option<Priority>,
    pub completed: Option<bool>,
    #[serde(default, deserialize_with = "present")]
    pub due_date: Option<Option<String>>,
    pub tags: Option<Vec<String>>,
}

/// Wraps whatever was sent, `null` included, so only a missing key stays `None`.
fn present<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    T::deserialize(deserializer).map(Some)
}

impl TaskPatch {
    pub fn completed(completed: bool) -> Self {
        Self { completed: Some(completed), ..Self::default() }
    }

    pub fn validate(&self) -> Result<(), TaskError> {
        if let Some(title) = &self.title {
            validate_title(title)?;
        }
        if let Some(description) = &self.description {
            validate_description(description)?;
        }
        Ok(())
    }
}

impl Task {
    pub fn apply(&mut self, patch: TaskPatch, now: DateTime<Utc>) {
        if let Some(title) = patch.title { self.title = title; }
        if let Some(description) = patch.description { self.description = description; }
        if let Some(priority) = patch.priority { self.priority = priority; }
        if let Some(completed) = patch.completed { self.completed = completed; }
        if let Some(due_date) = patch.due_date { self.due_date = due_date; }
        if let Some(tags) = patch.tags { self.tags = tags; }
        self.updated_at = now;
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TaskStats {
    pub total: usize,
    pub completed: usize,
    pub pending: usize,
    pub by_priority: BTreeMap<&'static str, usize>,
}

impl TaskStats {
    pub fn from_tasks(tasks: &[Task]) -> Self {
        let mut by_priority: BTreeMap<&'static str, usize> =
            Priority::ALL.iter().map(|p| (p.as_str(), 0)).collect();
        for task in tasks {
            *by_priority.entry(task.priority.as_str()).or_insert(0) += 1;
        }
        let completed = tasks.iter().filter(|t| t.completed).count();
        Self {
            total: tasks.len(),
            completed,
            pending: tasks.len() - completed,
            by_priority,
        }
    }
}

fn validate_title(title: &str) -> Result<(), TaskError> {
    let len = title.chars().count();
    if len == 0 || len > MAX_TITLE {
        return Err(TaskError::Validation(format!("title must be 1-{MAX_TITLE} characters")));
    }
    Ok(())
}

fn validate_description(description: &str) -> Result<(), TaskError> {
    if description.chars().count() > MAX_DESCRIPTION {
        return Err(TaskError::Validation(format!(
            "description must be at most {MAX_DESCRIPTION} characters"
        )));
    }
    Ok(())
}
