//! Dashboard aggregates.

use axum::{extract::State, Json};
use serde_json::{json, Value};

use crate::db::SharedDb;
use crate::models::Notice;
use crate::resource::Resource;

const RECENT_NOTICES: usize = 5;

/// GET /api/dashboard/stats
pub async fn stats(State(db): State<SharedDb>) -> Json<Value> {
    let departments = db.departments.newest(usize::MAX);
    let mut dept_stats: Vec<Value> = departments
        .iter()
        .map(|d| {
            let count = db.students.count_where(|s| s.department == d.id);
            json!({ "_id": d.id, "name": d.data.name, "code": d.data.code, "count": count })
        })
        .collect();
    dept_stats.sort_by(|a, b| b["count"].as_u64().cmp(&a["count"].as_u64()));

    let recent: Vec<Value> = db
        .notices
        .newest(RECENT_NOTICES)
        .iter()
        .map(|n| Notice::populate(n, &db))
        .collect();

    Json(json!({
        "success": true,
        "data": {
            "overview": {
                "totalStudents": db.students.len(),
                "totalFaculty": db.faculty.len(),
                "totalCourses": db.courses.len(),
                "totalDepts": db.departments.len(),
                "totalNotices": db.notices.len(),
            },
            "deptStats": dept_stats,
            "recentNotices": recent,
        }
    }))
}
