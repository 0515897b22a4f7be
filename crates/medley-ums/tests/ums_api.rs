//! UMS resources, references and the middleware stack.

use std::sync::Arc;

use axum::http::StatusCode;
use axum::Router;
use medley_config::UmsConfig;
use medley_security::PasswordHasher;
use medley_test_utils::TestRequest;
use medley_ums::{build_router, not_found, UmsAuth, UmsDb};
use pretty_assertions::assert_eq;
use serde_json::{json, Value};

fn app_with(config: UmsConfig) -> Router {
    let accounts = UmsAuth::new(PasswordHasher::new(1024, 1).unwrap());
    build_router(&config, Arc::new(UmsDb::new()), Arc::new(accounts)).fallback(not_found)
}

/// Resource routes without the session requirement.
fn open() -> UmsConfig {
    UmsConfig { require_auth: false, ..UmsConfig::default() }
}

fn app() -> Router {
    app_with(open())
}

async fn post(app: &Router, uri: &str, body: Value) -> Value {
    let resp = TestRequest::post(uri).json(&body).send(app).await;
    assert_eq!(resp.status, StatusCode::CREATED, "{}", resp.text());
    resp.json()["data"].clone()
}

async fn department(app: &Router, code: &str) -> String {
    let dept = post(app, "/api/departments", json!({ "code": code, "name": format!("{code} dept") })).await;
    dept["_id"].as_str().unwrap().to_string()
}

fn student(id: &str, dept: &str) -> Value {
    json!({
        "studentId": id,
        "name": format!("Student {id}"),
        "email": format!("{id}@uni.edu"),
        "department": dept,
        "semester": 2,
        "cgpa": 8.1
    })
}

#[tokio::test]
async fn student_crud_with_populated_department() {
    let app = app();
    let cs = department(&app, "cs").await;

    let created = post(&app, "/api/students", student("S1", &cs)).await;
    assert_eq!(created["department"], json!({ "_id": cs, "code": "CS", "name": "cs dept" }));
    assert_eq!(created["status"], json!("active"));
    let id = created["_id"].as_str().unwrap();

    let fetched = TestRequest::get(format!("/api/students/{id}")).send(&app).await.json();
    assert_eq!(fetched["success"], json!(true));
    assert_eq!(fetched["data"]["studentId"], json!("S1"));

    let updated = TestRequest::put(format!("/api/students/{id}"))
        .json(&json!({ "semester": 3 }))
        .send(&app)
        .await
        .json();
    assert_eq!(updated["data"]["semester"], json!(3));
    assert_eq!(updated["data"]["cgpa"], json!(8.1));
    assert_eq!(updated["data"]["createdAt"], created["createdAt"]);

    let deleted = TestRequest::delete(format!("/api/students/{id}")).send(&app).await;
    assert_eq!(deleted.json(), json!({ "success": true, "message": "Student deleted" }));

    let missing = TestRequest::get(format!("/api/students/{id}")).send(&app).await;
    assert_eq!(missing.status, StatusCode::NOT_FOUND);
    assert_eq!(missing.json(), json!({ "success": false, "message": "Student not found" }));
}

#[tokio::test]
async fn list_paginates_newest_first_and_searches() {
    let app = app();
    let cs = department(&app, "CS").await;
    for i in 1..=12 {
        post(&app, "/api/students", student(&format!("S{i:02}"), &cs)).await;
    }

    let page = TestRequest::get("/api/students?page=2&limit=5").send(&app).await.json();
    assert_eq!(page["total"], json!(12));
    assert_eq!(page["pages"], json!(3));
    assert_eq!(page["page"], json!(2));
    assert_eq!(page["data"][0]["studentId"], json!("S07"));
    assert_eq!(page["data"].as_array().unwrap().len(), 5);

    let default_page = TestRequest::get("/api/students").send(&app).await.json();
    assert_eq!(default_page["data"].as_array().unwrap().len(), 10);

    let hits = TestRequest::get("/api/students?search=s03").send(&app).await.json();
    assert_eq!(hits["total"], json!(1));
}

#[tokio::test]
async fn validation_and_reference_errors() {
    let app = app();
    let cs = department(&app, "CS").await;

    let mut bad_cgpa = student("S1", &cs);
    bad_cgpa["cgpa"] = json!(11.0);
    let resp = TestRequest::post("/api/students").json(&bad_cgpa).send(&app).await;
    assert_eq!(resp.status, StatusCode::BAD_REQUEST);
    assert_eq!(resp.json()["success"], json!(false));

    let resp = TestRequest::post("/api/students").json(&student("S1", "no-such-dept")).send(&app).await;
    assert_eq!(resp.status, StatusCode::BAD_REQUEST);

    let resp = TestRequest::post("/api/courses")
        .json(&json!({ "code": "CS101", "title": "Intro", "department": cs, "credits": 0 }))
        .send(&app)
        .await;
    assert_eq!(resp.status, StatusCode::BAD_REQUEST);

    let resp = TestRequest::post("/api/students").body("application/json", "{not json").send(&app).await;
    assert_eq!(resp.status, StatusCode::BAD_REQUEST);
    assert_eq!(resp.json()["success"], json!(false));
}

#[tokio::test]
async fn unique_codes_conflict() {
    let app = app();
    department(&app, "CS").await;
    let resp = TestRequest::post("/api/departments").json(&json!({ "code": "cs", "name": "Again" })).send(&app).await;
    assert_eq!(resp.status, StatusCode::CONFLICT);
}

#[tokio::test]
async fn referenced_department_cannot_be_deleted() {
    let app = app();
    let cs = department(&app, "CS").await;
    let s = post(&app, "/api/students", student("S1", &cs)).await;

    let resp = TestRequest::delete(format!("/api/departments/{cs}")).send(&app).await;
    assert_eq!(resp.status, StatusCode::CONFLICT);

    TestRequest::delete(format!("/api/students/{}", s["_id"].as_str().unwrap())).send(&app).await;
    let resp = TestRequest::delete(format!("/api/departments/{cs}")).send(&app).await;
    assert_eq!(resp.status, StatusCode::OK);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn racing_delete_never_leaves_a_dangling_reference() {
    let app = app_with(UmsConfig { rate_limit_max: 10_000, ..open() });
    for round in 0..25 {
        let dept = department(&app, &format!("D{round}")).await;

        let create = {
            let (app, body) = (app.clone(), student(&format!("S{round}"), &dept));
            tokio::spawn(async move { TestRequest::post("/api/students").json(&body).send(&app).await.status })
        };
        let delete = {
            let (app, uri) = (app.clone(), format!("/api/departments/{dept}"));
            tokio::spawn(async move { TestRequest::delete(uri).send(&app).await.status })
        };
        let (created, deleted) = (create.await.unwrap(), delete.await.unwrap());

        assert!(
            !(created == StatusCode::CREATED && deleted == StatusCode::OK),
            "round {round}: student created against a department deleted concurrently"
        );
    }
}

#[tokio::test]
async fn course_populates_faculty_and_type() {
    let app = app();
    let cs = department(&app, "CS").await;
    let prof = post(
        &app,
        "/api/faculty",
        json!({ "facultyId": "F1", "name": "Grace", "email": "grace@uni.edu", "department": cs }),
    )
    .await;
    let course = post(
        &app,
        "/api/courses",
        json!({ "code": "cs101", "title": "Intro", "department": cs, "faculty": prof["_id"], "type": "lab" }),
    )
    .await;
    assert_eq!(course["code"], json!("CS101"));
    assert_eq!(course["type"], json!("lab"));
    assert_eq!(course["faculty"]["facultyId"], json!("F1"));
    assert_eq!(course["department"]["code"], json!("CS"));
}

#[tokio::test]
async fn dashboard_aggregates() {
    let app = app();
    let cs = department(&app, "CS").await;
    department(&app, "EE").await;
    post(&app, "/api/students", student("S1", &cs)).await;
    post(&app, "/api/notices", json!({ "title": "Exams", "content": "Soon", "type": "exam" })).await;

    let stats = TestRequest::get("/api/dashboard/stats").send(&app).await.json();
    let data = &stats["data"];
    assert_eq!(data["overview"]["totalStudents"], json!(1));
    assert_eq!(data["overview"]["totalDepts"], json!(2));
    assert_eq!(data["deptStats"][0]["code"], json!("CS"));
    assert_eq!(data["deptStats"][0]["count"], json!(1));
    assert_eq!(data["recentNotices"][0]["postedBy"], json!("Admin"));
}

#[tokio::test]
async fn rate_limit_returns_429_envelope() {
    let app = app_with(UmsConfig { rate_limit_max: 2, ..open() });
    for _ in 0..2 {
        let resp = TestRequest::get("/api/notices").header("x-forwarded-for", "10.0.0.1").send(&app).await;
        assert_eq!(resp.status, StatusCode::OK);
    }
    let resp = TestRequest::get("/api/notices").header("x-forwarded-for", "10.0.0.1").send(&app).await;
    assert_eq!(resp.status, StatusCode::TOO_MANY_REQUESTS);
    assert_eq!(
        resp.json(),
        json!({ "success": false, "message": "Too many requests, please try again later." })
    );
    assert_eq!(resp.header("x-ratelimit-remaining"), Some("0"));

    let other = TestRequest::get("/api/notices").header("x-forwarded-for", "10.0.0.2").send(&app).await;
    assert_eq!(other.status, StatusCode::OK);
}

#[tokio::test]
async fn security_and_cors_headers() {
    let app = app();
    let resp = TestRequest::get("/api/notices").header("origin", "http://localhost:3000").send(&app).await;
    assert_eq!(resp.header("x-content-type-options"), Some("nosniff"));
    assert_eq!(resp.header("access-control-allow-origin"), Some("http://localhost:3000"));
    assert_eq!(resp.header("access-control-allow-credentials"), Some("true"));

    let foreign = TestRequest::get("/api/notices").header("origin", "http://evil.test").send(&app).await;
    assert_eq!(foreign.header("access-control-allow-origin"), None);
}

#[tokio::test]
async fn oversized_body_is_rejected() {
    let app = app_with(UmsConfig { body_limit_bytes: 64, ..open() });
    let resp = TestRequest::post("/api/notices")
        .json(&json!({ "title": "t", "content": "x".repeat(500) }))
        .send(&app)
        .await;
    assert_eq!(resp.status, StatusCode::PAYLOAD_TOO_LARGE);
}

#[tokio::test]
async fn unknown_route_uses_envelope() {
    let resp = TestRequest::get("/api/nope").send(&app()).await;
    assert_eq!(resp.status, StatusCode::NOT_FOUND);
    assert_eq!(resp.json(), json!({ "success": false, "message": "Route not found" }));
}

async fn register(app: &Router, email: &str) -> String {
    let resp = TestRequest::post("/api/ums/auth/register")
        .json(&json!({ "name": "Dana", "email": email, "password": "secret1", "role": "admin" }))
        .send(app)
        .await;
    assert_eq!(resp.status, StatusCode::CREATED, "{}", resp.text());
    let body = resp.json();
    assert_eq!(body["user"]["email"], json!(email));
    assert_eq!(body["user"]["role"], json!("admin"));
    assert!(body["user"].get("passwordHash").is_none());
    body["token"].as_str().unwrap().to_string()
}

#[tokio::test]
async fn resources_require_a_session() {
    let app = app_with(UmsConfig::default());

    for req in [
        TestRequest::get("/api/students"),
        TestRequest::get("/api/dashboard/stats"),
        TestRequest::post("/api/notices").json(&json!({ "title": "t", "content": "c" })),
        TestRequest::get("/api/notices").bearer("made-up"),
    ] {
        let resp = req.send(&app).await;
        assert_eq!(resp.status, StatusCode::UNAUTHORIZED);
        assert_eq!(resp.json()["success"], json!(false));
    }

    let token = register(&app, "dana@uni.edu").await;
    let resp = TestRequest::get("/api/students").bearer(&token).send(&app).await;
    assert_eq!(resp.status, StatusCode::OK);
    assert_eq!(resp.json()["total"], json!(0));
}

#[tokio::test]
async fn login_me_and_logout() {
    let app = app_with(UmsConfig::default());
    register(&app, "dana@uni.edu").await;

    let resp = TestRequest::post("/api/ums/auth/login")
        .json(&json!({ "email": "dana@uni.edu", "password": "wrong1" }))
        .send(&app)
        .await;
    assert_eq!(resp.status, StatusCode::UNAUTHORIZED);
    assert_eq!(resp.json(), json!({ "success": false, "message": "Invalid email or password" }));

    let resp = TestRequest::post("/api/ums/auth/login")
        .json(&json!({ "email": "DANA@uni.edu", "password": "secret1" }))
        .send(&app)
        .await;
    assert_eq!(resp.status, StatusCode::OK);
    let token = resp.json()["token"].as_str().unwrap().to_string();

    let me = TestRequest::get("/api/ums/auth/me").bearer(&token).send(&app).await.json();
    assert_eq!(me["data"]["name"], json!("Dana"));

    let resp = TestRequest::post("/api/ums/auth/logout").bearer(&token).send(&app).await;
    assert_eq!(resp.status, StatusCode::OK);
    let resp = TestRequest::get("/api/ums/auth/me").bearer(&token).send(&app).await;
    assert_eq!(resp.status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn duplicate_and_invalid_registrations() {
    let app = app();
    register(&app, "dana@uni.edu").await;

    let resp = TestRequest::post("/api/ums/auth/register")
        .json(&json!({ "name": "Again", "email": "Dana@uni.edu", "password": "secret1" }))
        .send(&app)
        .await;
    assert_eq!(resp.status, StatusCode::CONFLICT);

    let resp = TestRequest::post("/api/ums/auth/register")
        .json(&json!({ "name": "Short", "email": "short@uni.edu", "password": "abc" }))
        .send(&app)
        .await;
    assert_eq!(resp.status, StatusCode::BAD_REQUEST);
    assert_eq!(resp.json()["success"], json!(false));
}
