mod common;

use std::env;

use axum::{
    body::{to_bytes, Body},
    http::{Request, StatusCode},
    Router,
};
use jsonwebtoken::{encode, EncodingKey, Header};
use serde_json::{json, Value as JsonValue};
use tower::ServiceExt;

use common::{harness, JWT_SECRET};
use consultation_scheduler::middleware::auth::Claims;
use consultation_scheduler::routes;

fn bearer(sub: &str, email: &str, role: Option<&str>) -> String {
    let claims = Claims {
        sub: sub.to_string(),
        exp: (chrono::Utc::now().timestamp() + 3600) as usize,
        name: Some(format!("User {}", sub)),
        email: Some(email.to_string()),
        role: role.map(str::to_string),
    };
    let token = encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(JWT_SECRET.as_bytes()),
    )
    .expect("encode token");
    format!("Bearer {}", token)
}

async fn call(
    app: &Router,
    method: &str,
    uri: &str,
    auth: Option<&str>,
    body: Option<JsonValue>,
) -> (StatusCode, JsonValue) {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(auth) = auth {
        builder = builder.header("authorization", auth);
    }
    let request = match body {
        Some(body) => builder
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };
    let response = app.clone().oneshot(request).await.expect("response");
    let status = response.status();
    let bytes = to_bytes(response.into_body(), 1024 * 1024).await.unwrap();
    let value = if bytes.is_empty() {
        JsonValue::Null
    } else {
        serde_json::from_slice(&bytes).unwrap_or(JsonValue::Null)
    };
    (status, value)
}

#[tokio::test]
async fn config_is_loaded_from_environment() {
    env::set_var("SERVER_ADDRESS", "127.0.0.1:0");
    env::set_var("DATABASE_URL", "postgres://localhost/unused");
    env::set_var("JWT_SECRET", JWT_SECRET);
    env::set_var("GOOGLE_CLIENT_ID", "client");
    env::set_var("GOOGLE_CLIENT_SECRET", "secret");
    env::set_var("ADMIN_EMAILS", "Root@Example.com, lead@example.com");
    env::set_var("CALENDAR_TIME_ZONE", "Asia/Tokyo");

    consultation_scheduler::config::init_config().expect("init config");
    let config = consultation_scheduler::config::get_config();
    assert_eq!(config.admin_emails, vec!["root@example.com", "lead@example.com"]);
    assert_eq!(config.calendar_time_zone, chrono_tz::Asia::Tokyo);
    assert_eq!(config.calendar_id, "primary");
    assert!(consultation_scheduler::config::init_config().is_err());
}

#[tokio::test]
async fn scheduling_api_end_to_end() {
    let h = harness();
    h.link_calendar("inst-1").await;
    h.link_calendar("admin-1").await;
    let app = routes::router(h.state.clone());

    let instructor = bearer("inst-1", "inst1@example.com", Some("instructor"));
    let other_instructor = bearer("inst-2", "inst2@example.com", None);
    let admin = bearer("admin-1", "ops@example.com", Some("admin"));
    // Admin through ADMIN_EMAILS only, no role claim.
    let configured_admin = bearer("admin-2", "root@example.com", None);

    let (status, body) = call(&app, "GET", "/health", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");

    let (status, _) = call(&app, "GET", "/api/candidates", None, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, _) = call(&app, "GET", "/api/candidates", Some("Bearer not-a-jwt"), None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    // Instructors submit as themselves even when naming someone else.
    let (status, created) = call(
        &app,
        "POST",
        "/api/candidates",
        Some(&instructor),
        Some(json!({
            "instructorId": "inst-9",
            "date": "2026-01-15",
            "timeSlot": "21:00-23:00",
            "memo": "first choice"
        })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(created["instructorId"], "inst-1");
    assert_eq!(created["status"], "submitted");
    assert_eq!(created["month"], "2026-01");
    let first_id = created["id"].as_str().unwrap().to_string();

    let (status, _) = call(
        &app,
        "POST",
        "/api/candidates",
        Some(&instructor),
        Some(json!({ "date": "2026-01-15", "timeSlot": "20:00-22:00" })),
    )
    .await;
    assert!(status.is_client_error());

    let (status, _) = call(
        &app,
        "PATCH",
        &format!("/api/candidates/{}", first_id),
        Some(&other_instructor),
        Some(json!({ "memo": "hijack" })),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _) = call(
        &app,
        "POST",
        &format!("/api/admin/candidates/{}/confirm", first_id),
        Some(&instructor),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, outcome) = call(
        &app,
        "POST",
        &format!("/api/admin/candidates/{}/confirm", first_id),
        Some(&admin),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(outcome["candidate"]["status"], "confirmed");
    assert_eq!(outcome["title"], "session");
    assert_eq!(outcome["warnings"], json!([]));
    assert!(outcome["candidate"]["instructorCalendarEventId"].is_string());

    let (status, body) = call(
        &app,
        "POST",
        &format!("/api/admin/candidates/{}/confirm", first_id),
        Some(&admin),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"], "already_confirmed");

    // Fill the slot, then a batch that would overflow it is rejected.
    let mut extra_ids = Vec::new();
    for instructor_id in ["inst-3", "inst-4", "inst-5"] {
        let (status, created) = call(
            &app,
            "POST",
            "/api/candidates",
            Some(&admin),
            Some(json!({
                "instructorId": instructor_id,
                "instructorName": format!("Tutor {}", instructor_id),
                "date": "2026-01-15",
                "timeSlot": "21:00-23:00"
            })),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(created["instructorId"], instructor_id);
        extra_ids.push(created["id"].as_str().unwrap().to_string());
    }

    let (status, body) = call(
        &app,
        "POST",
        "/api/admin/candidates/confirm",
        Some(&configured_admin),
        Some(json!({ "candidateIds": [extra_ids[0], extra_ids[1]] })),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"], "capacity_exceeded");
    assert_eq!(body["violations"][0]["existing"], 1);
    assert_eq!(body["violations"][0]["inBatch"], 2);

    let (status, report) = call(
        &app,
        "POST",
        "/api/admin/candidates/confirm",
        Some(&admin),
        Some(json!({ "candidateIds": [extra_ids[0]] })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(report["confirmed"][0]["title"], "paired_session");
    // inst-3 has no linked calendar.
    assert_eq!(report["warnings"][0]["target"], "instructor");

    let (status, body) = call(
        &app,
        "POST",
        &format!("/api/admin/candidates/{}/confirm", extra_ids[2]),
        Some(&admin),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"], "capacity_exceeded");

    let (status, mine) = call(&app, "GET", "/api/candidates/mine", Some(&instructor), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(mine.as_array().unwrap().len(), 1);

    let (status, confirmed) = call(
        &app,
        "GET",
        "/api/candidates?status=confirmed&month=2026-01",
        Some(&instructor),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(confirmed.as_array().unwrap().len(), 2);

    let (status, logs) = call(&app, "GET", "/api/admin/audit-logs", Some(&admin), None).await;
    assert_eq!(status, StatusCode::OK);
    let logs = logs.as_array().unwrap();
    assert_eq!(logs.len(), 2);
    assert_eq!(logs[0]["candidateId"], extra_ids[0].as_str());

    // Owner cannot delete a confirmed candidate; an admin can.
    let (status, _) = call(
        &app,
        "DELETE",
        &format!("/api/candidates/{}", first_id),
        Some(&instructor),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, outcome) = call(
        &app,
        "DELETE",
        &format!("/api/candidates/{}", first_id),
        Some(&admin),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(outcome["deleted"], true);
    assert!(h.calendar.events_for(&common::token_for("inst-1")).is_empty());

    let (status, _) = call(
        &app,
        "GET",
        &format!("/api/candidates/{}", first_id),
        Some(&admin),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn account_and_credential_endpoints() {
    let h = harness();
    let app = routes::router(h.state.clone());
    let admin = bearer("admin-1", "ops@example.com", Some("admin"));
    let instructor = bearer("inst-1", "tutor@example.com", None);

    let (status, _) = call(&app, "GET", "/api/admin/accounts", Some(&instructor), None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _) = call(
        &app,
        "POST",
        "/api/admin/accounts",
        Some(&admin),
        Some(json!({ "email": " Tutor@Example.com ", "role": "instructor" })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);

    let (status, body) = call(
        &app,
        "POST",
        "/api/admin/accounts",
        Some(&admin),
        Some(json!({ "email": "tutor@example.com", "role": "admin" })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].as_str().unwrap().contains("already registered"));

    let (status, _) = call(
        &app,
        "PUT",
        "/api/calendar/credentials",
        Some(&instructor),
        Some(json!({ "access_token": "a-token", "refresh_token": "r-token" })),
    )
    .await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (status, listing) = call(&app, "GET", "/api/admin/accounts", Some(&admin), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(listing["instructors"][0]["email"], "tutor@example.com");
    assert_eq!(listing["instructors"][0]["user_id"], "inst-1");

    // A DB admin row grants admin rights without a role claim.
    let (status, _) = call(
        &app,
        "POST",
        "/api/admin/accounts",
        Some(&admin),
        Some(json!({ "email": "lead@example.com", "role": "admin" })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    let lead = bearer("lead-1", "lead@example.com", None);
    let (status, _) = call(&app, "GET", "/api/admin/audit-logs", Some(&lead), None).await;
    assert_eq!(status, StatusCode::OK);

    let (status, _) = call(
        &app,
        "DELETE",
        "/api/admin/accounts",
        Some(&lead),
        Some(json!({ "email": "lead@example.com" })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = call(
        &app,
        "DELETE",
        "/api/admin/accounts",
        Some(&lead),
        Some(json!({ "email": "tutor@example.com" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
}
