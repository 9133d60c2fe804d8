//! End-to-end tests for the license request endpoint.
//!
//! Requests are driven through the full router (middleware included) against
//! an in-memory SQLite database.

use axum::{
    body::Body,
    http::{header, HeaderMap, Request, StatusCode},
};
use chrono::{Days, Months, NaiveDateTime, Utc};
use serde_json::{json, Value};
use sqlx::sqlite::{SqlitePool, SqlitePoolOptions};
use std::sync::Arc;
use tower::ServiceExt;

use licensedesk::server::database::Database;
use licensedesk::server::handlers::AppState;
use licensedesk::server::logging::REQUEST_ID_HEADER;
use licensedesk::server::routes::build_router;

/// Helper to create a seeded in-memory database and app state.
async fn setup_test_app() -> (AppState, SqlitePool) {
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .connect("sqlite::memory:")
        .await
        .expect("failed to open in-memory database");

    sqlx::query(
        r#"
        CREATE TABLE users (
            national_id TEXT PRIMARY KEY,
            first_name  TEXT NOT NULL,
            last_name   TEXT NOT NULL
        )
        "#,
    )
    .execute(&pool)
    .await
    .expect("failed to create users table");

    sqlx::query(
        r#"
        CREATE TABLE licenses (
            license_id    TEXT PRIMARY KEY,
            title         TEXT NOT NULL,
            validaty      INTEGER NOT NULL,
            validaty_unit INTEGER NOT NULL
        )
        "#,
    )
    .execute(&pool)
    .await
    .expect("failed to create licenses table");

    sqlx::query(
        r#"
        CREATE TABLE licenserequests (
            id              INTEGER PRIMARY KEY AUTOINCREMENT,
            approval_status TEXT NOT NULL,
            national_id     TEXT NOT NULL,
            license         TEXT NOT NULL,
            ExpireTime      DATETIME NULL
        )
        "#,
    )
    .execute(&pool)
    .await
    .expect("failed to create licenserequests table");

    sqlx::query(
        "INSERT INTO users (national_id, first_name, last_name) \
         VALUES ('0012345678', 'Sara', 'Ahmadi')",
    )
    .execute(&pool)
    .await
    .expect("failed to seed users");

    sqlx::query(
        "INSERT INTO licenses (license_id, title, validaty, validaty_unit) VALUES \
         ('LIC-1', 'Fishing', 3, 2), \
         ('LIC-DAYS', 'Day pass', 10, 1), \
         ('LIC-YEARS', 'Pilot', 2, 3), \
         ('LIC-BAD', 'Broken unit', 1, 4)",
    )
    .execute(&pool)
    .await
    .expect("failed to seed licenses");

    let state = AppState {
        db: Arc::new(Database::SQLite(pool.clone())),
    };

    (state, pool)
}

/// Helper to make a request with a raw body to the app.
async fn raw_request(
    app: axum::Router,
    method: &str,
    uri: &str,
    body: Vec<u8>,
) -> (StatusCode, HeaderMap, Value) {
    let request = Request::builder()
        .method(method)
        .uri(uri)
        .header("Content-Type", "application/json")
        .body(Body::from(body))
        .unwrap();

    send(app, request).await
}

async fn send(app: axum::Router, request: Request<Body>) -> (StatusCode, HeaderMap, Value) {
    let response = app.oneshot(request).await.unwrap();
    let status = response.status();
    let headers = response.headers().clone();

    let body_bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let body: Value = serde_json::from_slice(&body_bytes).unwrap_or(json!({}));

    (status, headers, body)
}

/// Helper to make a JSON request to the app.
async fn json_request(
    app: axum::Router,
    method: &str,
    uri: &str,
    body: Option<Value>,
) -> (StatusCode, Value) {
    let body_bytes = body
        .map(|v| serde_json::to_vec(&v).unwrap())
        .unwrap_or_default();

    let (status, _, body) = raw_request(app, method, uri, body_bytes).await;
    (status, body)
}

async fn count_requests(pool: &SqlitePool) -> i64 {
    sqlx::query_scalar("SELECT COUNT(*) FROM licenserequests")
        .fetch_one(pool)
        .await
        .unwrap()
}

async fn create_request(state: &AppState, national_id: &str, license_id: &str) -> i64 {
    let (status, body) = json_request(
        build_router(state.clone()),
        "POST",
        "/",
        Some(json!({ "national_id": national_id, "license_id": license_id })),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "create failed: {body}");
    body["license_request"].as_i64().unwrap()
}

fn parse_expire_time(body: &Value) -> NaiveDateTime {
    body["expire_time"]
        .as_str()
        .expect("expire_time should be a string")
        .parse()
        .expect("expire_time should be an ISO timestamp")
}

fn assert_close(actual: NaiveDateTime, expected: NaiveDateTime) {
    let skew = (actual - expected).num_seconds().abs();
    assert!(skew <= 5, "expected ~{expected}, got {actual}");
}

// ============================================================================
// Create (POST)
// ============================================================================

#[tokio::test]
async fn create_returns_user_license_and_pending_request() {
    let (state, _pool) = setup_test_app().await;

    let (status, body) = json_request(
        build_router(state.clone()),
        "POST",
        "/",
        Some(json!({ "national_id": "0012345678", "license_id": "LIC-1" })),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        body["user"],
        json!({ "national_id": "0012345678", "first_name": "Sara", "last_name": "Ahmadi" })
    );
    assert_eq!(body["license"]["license_id"], "LIC-1");
    assert_eq!(body["license"]["validaty"], 3);
    assert_eq!(body["license"]["validaty_unit"], 2);

    let id = body["license_request"].as_i64().unwrap();
    let row = state.db.get_license_request(id).await.unwrap().unwrap();
    assert_eq!(row.approval_status, "pending");
    assert_eq!(row.national_id, "0012345678");
    assert_eq!(row.license, "LIC-1");
    assert!(row.expire_time.is_none());
}

#[tokio::test]
async fn create_without_matching_records_still_inserts() {
    let (state, pool) = setup_test_app().await;

    let (status, body) = json_request(
        build_router(state),
        "POST",
        "/",
        Some(json!({ "national_id": "0099999999", "license_id": "LIC-404" })),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["user"], Value::Null);
    assert_eq!(body["license"], Value::Null);
    assert!(body["license_request"].as_i64().is_some());
    assert_eq!(count_requests(&pool).await, 1);
}

#[tokio::test]
async fn create_trims_identifiers() {
    let (state, _pool) = setup_test_app().await;

    let id = create_request(&state, "  0012345678 ", "\tLIC-1 ").await;

    let row = state.db.get_license_request(id).await.unwrap().unwrap();
    assert_eq!(row.national_id, "0012345678");
    assert_eq!(row.license, "LIC-1");
}

#[tokio::test]
async fn create_rejects_empty_or_missing_fields() {
    let (state, pool) = setup_test_app().await;

    for payload in [
        json!({ "national_id": "", "license_id": "LIC-1" }),
        json!({ "national_id": "0012345678", "license_id": "   " }),
        json!({ "national_id": "0012345678" }),
        json!({ "license_id": "LIC-1" }),
        json!({ "national_id": null, "license_id": "LIC-1" }),
        json!({}),
    ] {
        let (status, body) =
            json_request(build_router(state.clone()), "POST", "/", Some(payload.clone())).await;

        assert_eq!(status, StatusCode::BAD_REQUEST, "payload {payload}");
        assert!(body["error"].is_string(), "payload {payload}");
    }

    assert_eq!(count_requests(&pool).await, 0);
}

#[tokio::test]
async fn create_accepts_body_without_content_type() {
    let (state, pool) = setup_test_app().await;

    let body = serde_json::to_vec(&json!({ "national_id": "0012345678", "license_id": "LIC-1" }))
        .unwrap();
    let request = Request::builder()
        .method("POST")
        .uri("/")
        .header("Content-Type", "text/plain")
        .body(Body::from(body.clone()))
        .unwrap();
    let (status, _, created) = send(build_router(state.clone()), request).await;
    assert_eq!(status, StatusCode::OK);
    assert!(created["license_request"].as_i64().is_some());

    let request = Request::builder()
        .method("POST")
        .uri("/")
        .body(Body::from(body))
        .unwrap();
    let (status, _, _) = send(build_router(state), request).await;
    assert_eq!(status, StatusCode::OK);

    assert_eq!(count_requests(&pool).await, 2);
}

#[tokio::test]
async fn create_rejects_empty_body() {
    let (state, pool) = setup_test_app().await;

    let (status, headers, body) = raw_request(build_router(state), "POST", "/", Vec::new()).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(headers[header::CONTENT_TYPE], "application/json");
    assert!(body["error"].is_string());
    assert_eq!(count_requests(&pool).await, 0);
}

#[tokio::test]
async fn create_rejects_malformed_json() {
    let (state, pool) = setup_test_app().await;

    let (status, headers, body) =
        raw_request(build_router(state), "POST", "/", b"{not json".to_vec()).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(headers[header::CONTENT_TYPE], "application/json");
    assert!(body["error"].is_string());
    assert_eq!(count_requests(&pool).await, 0);
}

// ============================================================================
// Update (PUT / PATCH)
// ============================================================================

#[tokio::test]
async fn approve_sets_expiration_from_license_months() {
    let (state, _pool) = setup_test_app().await;
    let id = create_request(&state, "0012345678", "LIC-1").await;

    let (status, body) = json_request(
        build_router(state.clone()),
        "PUT",
        "/",
        Some(json!({ "request_id": id, "status": "Approved" })),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["request_id"], id);
    assert_eq!(body["status"], "approved");
    assert_eq!(body["update_result"], true);

    let expected = Utc::now()
        .naive_utc()
        .checked_add_months(Months::new(3))
        .unwrap();
    let expire_time = parse_expire_time(&body);
    assert_close(expire_time, expected);

    let row = state.db.get_license_request(id).await.unwrap().unwrap();
    assert_eq!(row.approval_status, "approved");
    assert_eq!(row.expire_time, Some(expire_time));
}

#[tokio::test]
async fn approve_with_numeric_token_and_days_unit() {
    let (state, _pool) = setup_test_app().await;
    let id = create_request(&state, "0012345678", "LIC-DAYS").await;

    let (status, body) = json_request(
        build_router(state),
        "PATCH",
        "/",
        Some(json!({ "request_id": id.to_string(), "status": "1" })),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "approved");

    let expected = Utc::now().naive_utc().checked_add_days(Days::new(10)).unwrap();
    assert_close(parse_expire_time(&body), expected);
}

#[tokio::test]
async fn integer_status_tokens_are_accepted() {
    let (state, _pool) = setup_test_app().await;
    let id = create_request(&state, "0012345678", "LIC-1").await;

    let (status, body) = json_request(
        build_router(state.clone()),
        "PUT",
        "/",
        Some(json!({ "request_id": id, "status": 1 })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "approved");
    assert!(body["expire_time"].is_string());

    let (status, body) = json_request(
        build_router(state.clone()),
        "PATCH",
        "/",
        Some(json!({ "request_id": id, "status": 0 })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "rejected");
    assert_eq!(body["expire_time"], Value::Null);

    let (status, body) = json_request(
        build_router(state.clone()),
        "PUT",
        "/",
        Some(json!({ "request_id": id, "status": 2 })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body, json!({ "error": "Invalid status value: 2" }));

    let (status, body) = json_request(
        build_router(state),
        "PUT",
        "/",
        Some(json!({ "request_id": id, "status": true })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(
        body,
        json!({ "error": "status: must be a string or an integer" })
    );
}

#[tokio::test]
async fn approve_with_years_unit() {
    let (state, _pool) = setup_test_app().await;
    let id = create_request(&state, "0012345678", "LIC-YEARS").await;

    let (status, body) = json_request(
        build_router(state),
        "PUT",
        "/",
        Some(json!({ "request_id": id, "status": "approved" })),
    )
    .await;

    assert_eq!(status, StatusCode::OK);

    let expected = Utc::now()
        .naive_utc()
        .checked_add_months(Months::new(24))
        .unwrap();
    assert_close(parse_expire_time(&body), expected);
}

#[tokio::test]
async fn reject_clears_expiration() {
    let (state, _pool) = setup_test_app().await;
    let id = create_request(&state, "0012345678", "LIC-1").await;

    let (status, _) = json_request(
        build_router(state.clone()),
        "PUT",
        "/",
        Some(json!({ "request_id": id, "status": "approved" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = json_request(
        build_router(state.clone()),
        "PUT",
        "/",
        Some(json!({ "request_id": id, "status": "0" })),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "rejected");
    assert_eq!(body["update_result"], true);
    assert_eq!(body["expire_time"], Value::Null);

    let row = state.db.get_license_request(id).await.unwrap().unwrap();
    assert_eq!(row.approval_status, "rejected");
    assert!(row.expire_time.is_none());
}

#[tokio::test]
async fn reject_unknown_request_reports_no_update() {
    let (state, _pool) = setup_test_app().await;

    let (status, body) = json_request(
        build_router(state),
        "PUT",
        "/",
        Some(json!({ "request_id": 9999, "status": "rejected" })),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["update_result"], false);
}

#[tokio::test]
async fn approve_unknown_request_is_not_found() {
    let (state, pool) = setup_test_app().await;

    let (status, body) = json_request(
        build_router(state),
        "PUT",
        "/",
        Some(json!({ "request_id": 9999, "status": "approved" })),
    )
    .await;

    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body, json!({ "error": "License request not found for ID: 9999" }));
    assert_eq!(count_requests(&pool).await, 0);
}

#[tokio::test]
async fn approve_with_missing_license_is_not_found_and_writes_nothing() {
    let (state, _pool) = setup_test_app().await;
    let id = create_request(&state, "0012345678", "LIC-404").await;

    let (status, body) = json_request(
        build_router(state.clone()),
        "PUT",
        "/",
        Some(json!({ "request_id": id, "status": "approved" })),
    )
    .await;

    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(
        body["error"],
        "License not found for license ID: LIC-404"
    );

    let row = state.db.get_license_request(id).await.unwrap().unwrap();
    assert_eq!(row.approval_status, "pending");
    assert!(row.expire_time.is_none());
}

#[tokio::test]
async fn approve_with_invalid_unit_fails_and_writes_nothing() {
    let (state, _pool) = setup_test_app().await;
    let id = create_request(&state, "0012345678", "LIC-BAD").await;

    let (status, body) = json_request(
        build_router(state.clone()),
        "PUT",
        "/",
        Some(json!({ "request_id": id, "status": "approved" })),
    )
    .await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body, json!({ "error": "Invalid validaty unit: 4" }));

    let row = state.db.get_license_request(id).await.unwrap().unwrap();
    assert_eq!(row.approval_status, "pending");
    assert!(row.expire_time.is_none());
}

#[tokio::test]
async fn unknown_status_is_rejected_and_writes_nothing() {
    let (state, _pool) = setup_test_app().await;
    let id = create_request(&state, "0012345678", "LIC-1").await;

    for value in ["maybe", "pending", "2"] {
        let (status, body) = json_request(
            build_router(state.clone()),
            "PATCH",
            "/",
            Some(json!({ "request_id": id, "status": value })),
        )
        .await;

        assert_eq!(status, StatusCode::BAD_REQUEST, "status {value}");
        assert_eq!(body["error"], format!("Invalid status value: {value}"));
    }

    let row = state.db.get_license_request(id).await.unwrap().unwrap();
    assert_eq!(row.approval_status, "pending");
}

#[tokio::test]
async fn update_rejects_missing_or_empty_fields() {
    let (state, _pool) = setup_test_app().await;

    for payload in [
        json!({ "status": "approved" }),
        json!({ "request_id": 0, "status": "approved" }),
        json!({ "request_id": "", "status": "approved" }),
        json!({ "request_id": "abc", "status": "approved" }),
        json!({ "request_id": 1 }),
        json!({ "request_id": 1, "status": "" }),
    ] {
        let (status, body) =
            json_request(build_router(state.clone()), "PUT", "/", Some(payload.clone())).await;

        assert_eq!(status, StatusCode::BAD_REQUEST, "payload {payload}");
        assert!(body["error"].is_string(), "payload {payload}");
    }
}

// ============================================================================
// Method dispatch and ambient behaviour
// ============================================================================

#[tokio::test]
async fn unsupported_methods_are_405() {
    let (state, _pool) = setup_test_app().await;

    for method in ["DELETE", "GET"] {
        let (status, headers, body) =
            raw_request(build_router(state.clone()), method, "/", Vec::new()).await;

        assert_eq!(status, StatusCode::METHOD_NOT_ALLOWED, "method {method}");
        assert_eq!(headers[header::CONTENT_TYPE], "application/json");
        assert_eq!(body, json!({ "error": "Method not allowed" }));
    }
}

#[tokio::test]
async fn unknown_paths_are_json_404() {
    let (state, _pool) = setup_test_app().await;

    let (status, headers, body) =
        raw_request(build_router(state), "GET", "/nope", Vec::new()).await;

    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(headers[header::CONTENT_TYPE], "application/json");
    assert!(headers.contains_key(REQUEST_ID_HEADER));
    assert_eq!(
        body,
        json!({ "error": "The requested resource was not found" })
    );
}

#[tokio::test]
async fn health_rejects_other_methods_with_json_405() {
    let (state, _pool) = setup_test_app().await;

    let (status, headers, body) =
        raw_request(build_router(state), "POST", "/health", Vec::new()).await;

    assert_eq!(status, StatusCode::METHOD_NOT_ALLOWED);
    assert_eq!(headers[header::CONTENT_TYPE], "application/json");
    assert_eq!(body, json!({ "error": "Method not allowed" }));
}

#[tokio::test]
async fn responses_carry_request_id_and_json_content_type() {
    let (state, _pool) = setup_test_app().await;

    let body = serde_json::to_vec(&json!({ "national_id": "0012345678", "license_id": "LIC-1" }))
        .unwrap();
    let (status, headers, _) = raw_request(build_router(state), "POST", "/", body).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(headers[header::CONTENT_TYPE], "application/json");
    let request_id = headers[REQUEST_ID_HEADER].to_str().unwrap();
    assert!(uuid::Uuid::parse_str(request_id).is_ok());
}

#[tokio::test]
async fn health_reports_database() {
    let (state, _pool) = setup_test_app().await;

    let (status, body) = json_request(build_router(state), "GET", "/health", None).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "healthy");
    assert_eq!(body["service"], "licensedesk");
    assert_eq!(body["database"]["connected"], true);
    assert_eq!(body["database"]["db_type"], "sqlite");
}
