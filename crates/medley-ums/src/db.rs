//! In-memory collections standing in for the document store.

use std::sync::{Arc, Mutex, MutexGuard, RwLock};

use medley_common::sync::{lock, read, write};
use medley_common::{new_id, now};
use serde_json::{json, Value};

use crate::error::UmsError;
use crate::models::{Course, Department, Faculty, Notice, Record, Student};
use crate::resource::Resource;

/// One entity type's records, oldest first.
pub struct Collection<T> {
    records: RwLock<Vec<Record<T>>>,
}

impl<T> Default for Collection<T> {
    fn default() -> Self {
        Self { records: RwLock::new(Vec::new()) }
    }
}

impl<T: Resource> Collection<T> {
    fn ensure_unique(records: &[Record<T>], data: &T, except: Option<&str>) -> Result<(), UmsError> {
        let Some((field, key)) = data.unique_key() else {
            return Ok(());
        };
        let taken = records
            .iter()
            .filter(|r| Some(r.id.as_str()) != except)
            .any(|r| r.data.unique_key().is_some_and(|(_, k)| k == key));
        if taken {
            return Err(UmsError::Conflict(format!("{} with {field} '{key}' already exists", T::LABEL)));
        }
        Ok(())
    }

    pub fn insert(&self, data: T) -> Result<Record<T>, UmsError> {
        let mut records = write(&self.records);
        Self::ensure_unique(&records, &data, None)?;
        let stamp = now();
        let record = Record { id: new_id(), data, created_at: stamp, updated_at: stamp };
        records.push(record.clone());
        Ok(record)
    }

    pub fn get(&self, id: &str) -> Option<Record<T>> {
        read(&self.records).iter().find(|r| r.id == id).cloned()
    }

    pub fn contains(&self, id: &str) -> bool {
        read(&self.records).iter().any(|r| r.id == id)
    }

    /// Swap in new data, keeping id and `createdAt`. `None` for unknown ids.
    pub fn replace(&self, id: &str, data: T) -> Result<Option<Record<T>>, UmsError> {
        let mut records = write(&self.records);
        Self::ensure_unique(&records, &data, Some(id))?;
        Ok(records.iter_mut().find(|r| r.id == id).map(|record| {
            record.data = data;
            record.updated_at = now();
            record.clone()
        }))
    }

    pub fn remove(&self, id: &str) -> Option<Record<T>> {
        let mut records = write(&self.records);
        let pos = records.iter().position(|r| r.id == id)?;
        Some(records.remove(pos))
    }

    /// Newest first. `search` matches any of the entity's text fields,
    /// case-insensitively. Returns the page and the total match count.
    pub fn page(&self, search: Option<&str>, page: usize, limit: usize) -> (Vec<Record<T>>, usize) {
        let needle = search.map(str::trim).filter(|s| !s.is_empty()).map(str::to_lowercase);
        let records = read(&self.records);
        let matches: Vec<&Record<T>> = records
            .iter()
            .rev()
            .filter(|r| match &needle {
                Some(needle) => r.data.search_fields().iter().any(|f| f.to_lowercase().contains(needle)),
                None => true,
            })
            .collect();
        let total = matches.len();
        let skip = page.saturating_sub(1).saturating_mul(limit);
        let items = matches.into_iter().skip(skip).take(limit).cloned().collect();
        (items, total)
    }

    pub fn newest(&self, n: usize) -> Vec<Record<T>> {
        read(&self.records).iter().rev().take(n).cloned().collect()
    }

    pub fn len(&self) -> usize {
        read(&self.records).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn count_where(&self, pred: impl Fn(&T) -> bool) -> usize {
        read(&self.records).iter().filter(|r| pred(&r.data)).count()
    }
}

#[derive(Default)]
pub struct UmsDb {
    pub departments: Collection<Department>,
    pub students: Collection<Student>,
    pub faculty: Collection<Faculty>,
    pub courses: Collection<Course>,
    pub notices: Collection<Notice>,
    writes: Mutex<()>,
}

pub type SharedDb = Arc<UmsDb>;

impl UmsDb {
    pub fn new() -> Self {
        Self::default()
    }

    /// Serialises writers so reference checks and the mutation they guard
    /// see the same state across collections.
    pub fn write_guard(&self) -> MutexGuard<'_, ()> {
        lock(&self.writes)
    }

    /// `{_id, code, name}` for a department id, `null` when it is gone.
    pub fn department_ref(&self, id: &str) -> Value {
        self.departments
            .get(id)
            .map(|d| json!({ "_id": d.id, "code": d.data.code, "name": d.data.name }))
            .unwrap_or(Value::Null)
    }

    /// `{_id, facultyId, name}` for a faculty id, `null` when it is gone.
    pub fn faculty_ref(&self, id: &str) -> Value {
        self.faculty
            .get(id)
            .map(|f| json!({ "_id": f.id, "facultyId": f.data.faculty_id, "name": f.data.name }))
            .unwrap_or(Value::Null)
    }
}
