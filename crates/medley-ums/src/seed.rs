//! Demo records for a fresh in-memory database.

use tracing::info;

use crate::auth::{RegisterRequest, Role, UmsAuth};
use crate::db::UmsDb;
use crate::error::UmsError;
use crate::models::{
    Course, CourseKind, Department, Faculty, FacultyStatus, Notice, NoticeKind, Student, StudentStatus,
};

/// Populate an empty database with a small campus. Does nothing when any
/// department already exists.
pub fn seed_demo_data(db: &UmsDb) -> Result<(), UmsError> {
    if !db.departments.is_empty() {
        return Ok(());
    }

    let mut dept_ids = Vec::new();
    for (code, name, seats) in [("CS", "Computer Science", 120), ("ECE", "Electronics", 90), ("MATH", "Mathematics", 60)] {
        let record = db.departments.insert(Department {
            code: code.to_string(),
            name: name.to_string(),
            description: format!("Department of {name}"),
            head: None,
            programs: vec!["B.Tech".to_string(), "M.Tech".to_string()],
            total_seats: seats,
            is_active: true,
        })?;
        dept_ids.push(record.id);
    }

    let mut faculty_ids = Vec::new();
    for (i, (name, designation)) in [("Grace Hopper", "Professor"), ("Claude Shannon", "Associate Professor"), ("Emmy Noether", "Professor")]
        .into_iter()
        .enumerate()
    {
        let record = db.faculty.insert(Faculty {
            faculty_id: format!("FAC{:03}", i + 1),
            name: name.to_string(),
            email: format!("{}@university.edu", name.split(' ').next().unwrap_or("staff").to_lowercase()),
            department: dept_ids[i].clone(),
            designation: designation.to_string(),
            experience: 10 + i as u32 * 4,
            status: FacultyStatus::Active,
        })?;
        faculty_ids.push(record.id);
    }

    for (i, name) in ["Ada Lovelace", "Alan Turing", "Barbara Liskov", "Donald Knuth", "Edsger Dijkstra", "Frances Allen"]
        .into_iter()
        .enumerate()
    {
        db.students.insert(Student {
            student_id: format!("STU{:04}", i + 1),
            name: name.to_string(),
            email: format!("student{}@university.edu", i + 1),
            department: dept_ids[i % dept_ids.len()].clone(),
            semester: (i % 8) as u8 + 1,
            program: "B.Tech".to_string(),
            cgpa: 7.0 + (i as f64) * 0.4,
            status: StudentStatus::Active,
        })?;
    }

    for (i, (code, title, kind)) in [
        ("CS101", "Programming Fundamentals", CourseKind::Core),
        ("ECE210", "Signals and Systems", CourseKind::Core),
        ("MATH305", "Abstract Algebra", CourseKind::Elective),
    ]
    .into_iter()
    .enumerate()
    {
        db.courses.insert(Course {
            code: code.to_string(),
            title: title.to_string(),
            department: dept_ids[i].clone(),
            faculty: Some(faculty_ids[i].clone()),
            credits: 4,
            kind,
            semester: 1 + i as u8 * 2,
        })?;
    }

    for (title, kind) in [
        ("Semester Examination Schedule", NoticeKind::Exam),
        ("Annual Technical Symposium", NoticeKind::Academic),
        ("Fee Payment Deadline", NoticeKind::Urgent),
    ] {
        db.notices.insert(Notice {
            title: title.to_string(),
            content: format!("{title}: details are on the notice board."),
            kind,
            posted_by: "Admin".to_string(),
        })?;
    }

    info!(
        departments = db.departments.len(),
        faculty = db.faculty.len(),
        students = db.students.len(),
        courses = db.courses.len(),
        "seeded demo university data"
    );
    Ok(())
}

pub const DEMO_ADMIN_EMAIL: &str = "admin@university.edu";
pub const DEMO_ADMIN_PASSWORD: &str = "admin123";

/// Create the demo administrator login unless one exists already.
pub fn seed_demo_admin(auth: &UmsAuth) -> Result<(), UmsError> {
    if !auth.is_empty() {
        return Ok(());
    }
    auth.register(RegisterRequest {
        name: "Administrator".to_string(),
        email: DEMO_ADMIN_EMAIL.to_string(),
        password: DEMO_ADMIN_PASSWORD.to_string(),
        role: Role::Admin,
    })?;
    Ok(())
}
