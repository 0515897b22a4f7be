//! Per-entity behaviour plugged into the generic CRUD handlers.

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;

use crate::db::{Collection, UmsDb};
use crate::error::UmsError;
use crate::models::{Course, Department, Faculty, Notice, Record, Student};

pub trait Resource: Clone + Serialize + DeserializeOwned + Send + Sync + 'static {
    /// Singular name used in messages ("Student not found").
    const LABEL: &'static str;

    fn collection(db: &UmsDb) -> &Collection<Self>;

    /// Canonicalise user input before validation.
    fn normalize(&mut self) {}

    fn validate(&self) -> Result<(), UmsError> {
        Ok(())
    }

    /// Field name and value that must be unique within the collection.
    fn unique_key(&self) -> Option<(&'static str, String)> {
        None
    }

    /// Text matched by `?search=`.
    fn search_fields(&self) -> Vec<&str>;

    /// Every id this entity points at must exist.
    fn check_references(&self, _db: &UmsDb) -> Result<(), UmsError> {
        Ok(())
    }

    /// Refuse deletion while other records still point at `id`.
    fn ensure_deletable(_id: &str, _db: &UmsDb) -> Result<(), UmsError> {
        Ok(())
    }

    /// Response JSON with reference ids expanded.
    fn populate(record: &Record<Self>, _db: &UmsDb) -> Value {
        serde_json::to_value(record).unwrap_or(Value::Null)
    }
}

pub(crate) fn required(field: &str, value: &str) -> Result<(), UmsError> {
    if value.trim().is_empty() {
        return Err(UmsError::Validation(format!("{field} is required")));
    }
    Ok(())
}

pub(crate) fn email(value: &str) -> Result<(), UmsError> {
    required("email", value)?;
    if !value.contains('@') {
        return Err(UmsError::Validation("email must be a valid address".into()));
    }
    Ok(())
}

fn semester(value: u8) -> Result<(), UmsError> {
    if !(1..=12).contains(&value) {
        return Err(UmsError::Validation("semester must be between 1 and 12".into()));
    }
    Ok(())
}

fn department_exists(db: &UmsDb, id: &str) -> Result<(), UmsError> {
    if db.departments.contains(id) {
        Ok(())
    } else {
        Err(UmsError::Validation(format!("department '{id}' does not exist")))
    }
}

fn faculty_exists(db: &UmsDb, id: &str) -> Result<(), UmsError> {
    if db.faculty.contains(id) {
        Ok(())
    } else {
        Err(UmsError::Validation(format!("faculty '{id}' does not exist")))
    }
}

fn with_ref(record: Value, field: &str, expanded: Value) -> Value {
    let mut record = record;
    if let Some(obj) = record.as_object_mut() {
        obj.insert(field.to_string(), expanded);
    }
    record
}

// ── Department ────────────────────────────────────────────────────────────────

impl Resource for Department {
    const LABEL: &'static str = "Department";

    fn collection(db: &UmsDb) -> &Collection<Self> {
        &db.departments
    }

    fn normalize(&mut self) {
        self.code = self.code.trim().to_uppercase();
        self.name = self.name.trim().to_string();
    }

    fn validate(&self) -> Result<(), UmsError> {
        required("code", &self.code)?;
        required("name", &self.name)
    }

    fn unique_key(&self) -> Option<(&'static str, String)> {
        Some(("code", self.code.clone()))
    }

    fn search_fields(&self) -> Vec<&str> {
        vec![self.code.as_str(), self.name.as_str(), self.description.as_str()]
    }

    fn check_references(&self, db: &UmsDb) -> Result<(), UmsError> {
        match &self.head {
            Some(head) => faculty_exists(db, head),
            None => Ok(()),
        }
    }

    fn ensure_deletable(id: &str, db: &UmsDb) -> Result<(), UmsError> {
        let students = db.students.count_where(|s| s.department == id);
        let faculty = db.faculty.count_where(|f| f.department == id);
        let courses = db.courses.count_where(|c| c.department == id);
        if students + faculty + courses > 0 {
            return Err(UmsError::Conflict(format!(
                "Department is still referenced by {students} students, {faculty} faculty and {courses} courses"
            )));
        }
        Ok(())
    }

    fn populate(record: &Record<Self>, db: &UmsDb) -> Value {
        let value = serde_json::to_value(record).unwrap_or(Value::Null);
        match &record.data.head {
            Some(head) => with_ref(value, "head", db.faculty_ref(head)),
            None => value,
        }
    }
}

// ── Student ───────────────────────────────────────────────────────────────────

impl Resource for Student {
    const LABEL: &'static str = "Student";

    fn collection(db: &UmsDb) -> &Collection<Self> {
        &db.students
    }

    fn normalize(&mut self) {
        self.student_id = self.student_id.trim().to_string();
        self.email = self.email.trim().to_lowercase();
    }

    fn validate(&self) -> Result<(), UmsError> {
        required("studentId", &self.student_id)?;
        required("name", &self.name)?;
        email(&self.email)?;
        semester(self.semester)?;
        if !(0.0..=10.0).contains(&self.cgpa) {
            return Err(UmsError::Validation("cgpa must be between 0 and 10".into()));
        }
        Ok(())
    }

    fn unique_key(&self) -> Option<(&'static str, String)> {
        Some(("studentId", self.student_id.clone()))
    }

    fn search_fields(&self) -> Vec<&str> {
        vec![self.student_id.as_str(), self.name.as_str(), self.email.as_str(), self.program.as_str()]
    }

    fn check_references(&self, db: &UmsDb) -> Result<(), UmsError> {
        department_exists(db, &self.department)
    }

    fn populate(record: &Record<Self>, db: &UmsDb) -> Value {
        let value = serde_json::to_value(record).unwrap_or(Value::Null);
        with_ref(value, "department", db.department_ref(&record.data.department))
    }
}

// ── Faculty ───────────────────────────────────────────────────────────────────

impl Resource for Faculty {
    const LABEL: &'static str = "Faculty";

    fn collection(db: &UmsDb) -> &Collection<Self> {
        &db.faculty
    }

    fn normalize(&mut self) {
        self.faculty_id = self.faculty_id.trim().to_string();
        self.email = self.email.trim().to_lowercase();
    }

    fn validate(&self) -> Result<(), UmsError> {
        required("facultyId", &self.faculty_id)?;
        required("name", &self.name)?;
        email(&self.email)
    }

    fn unique_key(&self) -> Option<(&'static str, String)> {
        Some(("facultyId", self.faculty_id.clone()))
    }

    fn search_fields(&self) -> Vec<&str> {
        vec![self.faculty_id.as_str(), self.name.as_str(), self.email.as_str(), self.designation.as_str()]
    }

    fn check_references(&self, db: &UmsDb) -> Result<(), UmsError> {
        department_exists(db, &self.department)
    }

    fn ensure_deletable(id: &str, db: &UmsDb) -> Result<(), UmsError> {
        let courses = db.courses.count_where(|c| c.faculty.as_deref() == Some(id));
        let headed = db.departments.count_where(|d| d.head.as_deref() == Some(id));
        if courses + headed > 0 {
            return Err(UmsError::Conflict(format!(
                "Faculty member still teaches {courses} courses and heads {headed} departments"
            )));
        }
        Ok(())
    }

    fn populate(record: &Record<Self>, db: &UmsDb) -> Value {
        let value = serde_json::to_value(record).unwrap_or(Value::Null);
        with_ref(value, "department", db.department_ref(&record.data.department))
    }
}

// ── Course ────────────────────────────────────────────────────────────────────

impl Resource for Course {
    const LABEL: &'static str = "Course";

    fn collection(db: &UmsDb) -> &Collection<Self> {
        &db.courses
    }

    fn normalize(&mut self) {
        self.code = self.code.trim().to_uppercase();
    }

    fn validate(&self) -> Result<(), UmsError> {
        required("code", &self.code)?;
        required("title", &self.title)?;
        if !(1..=10).contains(&self.credits) {
            return Err(UmsError::Validation("credits must be between 1 and 10".into()));
        }
        semester(self.semester)
    }

    fn unique_key(&self) -> Option<(&'static str, String)> {
        Some(("code", self.code.clone()))
    }

    fn search_fields(&self) -> Vec<&str> {
        vec![self.code.as_str(), self.title.as_str()]
    }

    fn check_references(&self, db: &UmsDb) -> Result<(), UmsError> {
        department_exists(db, &self.department)?;
        match &self.faculty {
            Some(faculty) => faculty_exists(db, faculty),
            None => Ok(()),
        }
    }

    fn populate(record: &Record<Self>, db: &UmsDb) -> Value {
        let value = serde_json::to_value(record).unwrap_or(Value::Null);
        let value = with_ref(value, "department", db.department_ref(&record.data.department));
        match &record.data.faculty {
            Some(faculty) => with_ref(value, "faculty", db.faculty_ref(faculty)),
            None => value,
        }
    }
}

// ── Notice ────────────────────────────────────────────────────────────────────

impl Resource for Notice {
    const LABEL: &'static str = "Notice";

    fn collection(db: &UmsDb) -> &Collection<Self> {
        &db.notices
    }

    fn validate(&self) -> Result<(), UmsError> {
        required("title", &self.title)?;
        required("content", &self.content)
    }

    fn search_fields(&self) -> Vec<&str> {
        vec![self.title.as_str(), self.content.as_str(), self.posted_by.as_str()]
    }
}
