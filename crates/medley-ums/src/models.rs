//! UMS entities. Every stored entity is wrapped in a [`Record`] carrying its
//! id and timestamps; references to other entities are stored as ids.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Record<T> {
    #[serde(rename = "_id")]
    pub id: String,
    #[serde(flatten)]
    pub data: T,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

fn yes() -> bool { true }
fn first_semester() -> u8 { 1 }
fn default_credits() -> u8 { 3 }
fn admin() -> String { "Admin".to_string() }

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Department {
    pub code: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
    /// Faculty id
    #[serde(default)]
    pub head: Option<String>,
    #[serde(default)]
    pub programs: Vec<String>,
    #[serde(default)]
    pub total_seats: u32,
    #[serde(default = "yes")]
    pub is_active: bool,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StudentStatus {
    #[default]
    Active,
    Inactive,
    Graduated,
    Suspended,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Student {
    pub student_id: String,
    pub name: String,
    pub email: String,
    /// Department id
    pub department: String,
    #[serde(default = "first_semester")]
    pub semester: u8,
    #[serde(default)]
    pub program: String,
    #[serde(default)]
    pub cgpa: f64,
    #[serde(default)]
    pub status: StudentStatus,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FacultyStatus {
    #[default]
    Active,
    OnLeave,
    Retired,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Faculty {
    pub faculty_id: String,
    pub name: String,
    pub email: String,
    /// Department id
    pub department: String,
    #[serde(default)]
    pub designation: String,
    #[serde(default)]
    pub experience: u32,
    #[serde(default)]
    pub status: FacultyStatus,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CourseKind {
    #[default]
    Core,
    Elective,
    Lab,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Course {
    pub code: String,
    pub title: String,
    /// Department id
    pub department: String,
    /// Faculty id
    #[serde(default)]
    pub faculty: Option<String>,
    #[serde(default = "default_credits")]
    pub credits: u8,
    #[serde(rename = "type", default)]
    pub kind: CourseKind,
    #[serde(default = "first_semester")]
    pub semester: u8,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NoticeKind {
    #[default]
    General,
    Academic,
    Exam,
    Event,
    Urgent,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Notice {
    pub title: String,
    pub content: String,
    #[serde(rename = "type", default)]
    pub kind: NoticeKind,
    #[serde(default = "admin")]
    pub posted_by: String,
}
