//! End-to-end API tests.
//!
//! Each test builds the full router against a temporary SQLite database and
//! drives it through `tower::ServiceExt::oneshot`, covering registration,
//! login, the loan workflow, and role gating.

use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::Router;
use http_body_util::BodyExt;
use loanbase_backend::api::{create_router, AppState};
use loanbase_backend::auth::{JwtHandler, UserStore};
use loanbase_backend::loans::LoanStore;
use serde_json::{json, Value};
use std::sync::Arc;
use tempfile::NamedTempFile;
use tower::ServiceExt;

fn test_app() -> (Router, NamedTempFile) {
    let temp_file = NamedTempFile::new().unwrap();
    let db_path = temp_file.path().to_str().unwrap();

    let user_store = Arc::new(UserStore::new(db_path).unwrap());
    let loan_store = Arc::new(LoanStore::new(db_path).unwrap());
    let jwt_handler = Arc::new(JwtHandler::new("test-secret-key".to_string(), 24));

    let app = create_router(AppState::new(user_store, loan_store, jwt_handler));
    (app, temp_file)
}

async fn body_json(resp: axum::response::Response) -> Value {
    let bytes = resp.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

async fn request(
    app: &Router,
    method: &str,
    uri: &str,
    token: Option<&str>,
    body: Option<Value>,
) -> axum::response::Response {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        builder = builder.header("Authorization", format!("Bearer {}", token));
    }
    let req = match body {
        Some(body) => builder
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };
    app.clone().oneshot(req).await.unwrap()
}

/// Register a user and return (id, token)
async fn register(app: &Router, name: &str, email: &str, role: Option<&str>) -> (String, String) {
    let mut payload = json!({
        "name": name,
        "email": email,
        "password": "secret1",
    });
    if let Some(role) = role {
        payload["role"] = json!(role);
    }

    let resp = request(app, "POST", "/api/auth/register", None, Some(payload)).await;
    assert_eq!(resp.status(), StatusCode::CREATED);
    let body = body_json(resp).await;
    assert_eq!(body["success"], true);
    (
        body["data"]["id"].as_str().unwrap().to_string(),
        body["data"]["token"].as_str().unwrap().to_string(),
    )
}

async fn apply_for_loan(app: &Router, token: &str) -> String {
    let resp = request(
        app,
        "POST",
        "/api/loans",
        Some(token),
        Some(json!({
            "amount": 500,
            "purpose": "Home repair",
            "term": 12,
            "fullName": "Alice Example",
            "employmentStatus": "employed",
            "employmentAddress": "1 Work St",
        })),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::CREATED);
    let body = body_json(resp).await;
    assert_eq!(body["data"]["status"], "pending");
    body["data"]["id"].as_str().unwrap().to_string()
}

#[tokio::test]
async fn health_check_is_public() {
    let (app, _db) = test_app();
    let resp = request(&app, "GET", "/health", None, None).await;
    assert_eq!(resp.status(), StatusCode::OK);
}

#[tokio::test]
async fn unknown_route_returns_envelope_404() {
    let (app, _db) = test_app();
    let resp = request(&app, "GET", "/api/nope", None, None).await;
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    let body = body_json(resp).await;
    assert_eq!(body["success"], false);
    assert_eq!(body["message"], "Route not found");
}

#[tokio::test]
async fn duplicate_registration_fails() {
    let (app, _db) = test_app();
    register(&app, "Alice", "a@x.com", None).await;

    let resp = request(
        &app,
        "POST",
        "/api/auth/register",
        None,
        Some(json!({"name": "Alice 2", "email": "a@x.com", "password": "secret2"})),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    let body = body_json(resp).await;
    assert_eq!(body["message"], "User already exists");
}

#[tokio::test]
async fn registration_validation_errors() {
    let (app, _db) = test_app();
    let resp = request(
        &app,
        "POST",
        "/api/auth/register",
        None,
        Some(json!({"name": "", "email": "not-an-email", "password": "abc"})),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    let body = body_json(resp).await;
    assert_eq!(body["success"], false);
    assert_eq!(body["errors"].as_array().unwrap().len(), 3);
}

#[tokio::test]
async fn login_round_trip() {
    let (app, _db) = test_app();
    let (user_id, _token) = register(&app, "Alice", "a@x.com", None).await;

    let resp = request(
        &app,
        "POST",
        "/api/auth/login",
        None,
        Some(json!({"email": "a@x.com", "password": "secret1"})),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::OK);
    let body = body_json(resp).await;
    assert_eq!(body["data"]["id"], user_id.as_str());
    assert_eq!(body["data"]["role"], "applicant");
    assert!(body["data"]["token"].as_str().is_some());
}

#[tokio::test]
async fn login_rejects_bad_credentials_identically() {
    let (app, _db) = test_app();
    register(&app, "Alice", "a@x.com", None).await;

    // Wrong password
    let resp = request(
        &app,
        "POST",
        "/api/auth/login",
        None,
        Some(json!({"email": "a@x.com", "password": "wrong-pass"})),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
    let wrong_pass = body_json(resp).await;

    // Unknown email
    let resp = request(
        &app,
        "POST",
        "/api/auth/login",
        None,
        Some(json!({"email": "nobody@x.com", "password": "secret1"})),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
    let unknown = body_json(resp).await;

    // Identical message: account existence must not leak
    assert_eq!(wrong_pass["message"], unknown["message"]);
    assert_eq!(wrong_pass["message"], "Invalid credentials");
}

#[tokio::test]
async fn me_returns_current_user() {
    let (app, _db) = test_app();
    let (user_id, token) = register(&app, "Alice", "a@x.com", None).await;

    let resp = request(&app, "GET", "/api/auth/me", Some(&token), None).await;
    assert_eq!(resp.status(), StatusCode::OK);
    let body = body_json(resp).await;
    assert_eq!(body["data"]["id"], user_id.as_str());
    assert_eq!(body["data"]["email"], "a@x.com");
}

#[tokio::test]
async fn protected_routes_require_token() {
    let (app, _db) = test_app();

    let resp = request(&app, "GET", "/api/loans", None, None).await;
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);

    let resp = request(&app, "GET", "/api/loans", Some("garbage.token.here"), None).await;
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn full_loan_workflow() {
    let (app, _db) = test_app();
    let (_alice_id, alice) = register(&app, "Alice", "a@x.com", None).await;
    let (_v_id, verifier) = register(&app, "Vera", "v@x.com", Some("verifier")).await;
    let (_admin_id, admin) = register(&app, "Ada", "admin@x.com", Some("admin")).await;

    let loan_id = apply_for_loan(&app, &alice).await;

    // Verify
    let resp = request(
        &app,
        "PUT",
        &format!("/api/loans/{}/verify", loan_id),
        Some(&verifier),
        Some(json!({"notes": "docs look good"})),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::OK);
    let body = body_json(resp).await;
    assert_eq!(body["data"]["status"], "verified");
    assert_eq!(body["data"]["notes"], "docs look good");
    assert!(body["data"]["verificationDate"].as_str().is_some());

    // Approve
    let resp = request(
        &app,
        "PUT",
        &format!("/api/loans/{}/approve", loan_id),
        Some(&admin),
        None,
    )
    .await;
    assert_eq!(resp.status(), StatusCode::OK);
    let body = body_json(resp).await;
    assert_eq!(body["data"]["status"], "approved");

    // Verifying an approved loan fails, naming the current status
    let resp = request(
        &app,
        "PUT",
        &format!("/api/loans/{}/verify", loan_id),
        Some(&verifier),
        None,
    )
    .await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    let body = body_json(resp).await;
    assert_eq!(body["message"], "Loan is already approved");
}

#[tokio::test]
async fn approve_requires_verified_status() {
    let (app, _db) = test_app();
    let (_alice_id, alice) = register(&app, "Alice", "a@x.com", None).await;
    let (_admin_id, admin) = register(&app, "Ada", "admin@x.com", Some("admin")).await;

    let loan_id = apply_for_loan(&app, &alice).await;

    let resp = request(
        &app,
        "PUT",
        &format!("/api/loans/{}/approve", loan_id),
        Some(&admin),
        None,
    )
    .await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    let body = body_json(resp).await;
    assert_eq!(body["message"], "Loan must be verified before approval");
}

#[tokio::test]
async fn reject_allowed_from_pending_and_by_admin() {
    let (app, _db) = test_app();
    let (_alice_id, alice) = register(&app, "Alice", "a@x.com", None).await;
    let (_admin_id, admin) = register(&app, "Ada", "admin@x.com", Some("admin")).await;

    let loan_id = apply_for_loan(&app, &alice).await;

    let resp = request(
        &app,
        "PUT",
        &format!("/api/loans/{}/reject", loan_id),
        Some(&admin),
        Some(json!({"notes": "insufficient income"})),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::OK);
    let body = body_json(resp).await;
    assert_eq!(body["data"]["status"], "rejected");

    // Rejecting again fails
    let resp = request(
        &app,
        "PUT",
        &format!("/api/loans/{}/reject", loan_id),
        Some(&admin),
        None,
    )
    .await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    let body = body_json(resp).await;
    assert_eq!(body["message"], "Loan is already rejected");
}

#[tokio::test]
async fn role_gates_on_transitions() {
    let (app, _db) = test_app();
    let (_alice_id, alice) = register(&app, "Alice", "a@x.com", None).await;
    let (_v_id, verifier) = register(&app, "Vera", "v@x.com", Some("verifier")).await;

    let loan_id = apply_for_loan(&app, &alice).await;

    // Applicant cannot verify
    let resp = request(
        &app,
        "PUT",
        &format!("/api/loans/{}/verify", loan_id),
        Some(&alice),
        None,
    )
    .await;
    assert_eq!(resp.status(), StatusCode::FORBIDDEN);

    // Verifier cannot approve
    let resp = request(
        &app,
        "PUT",
        &format!("/api/loans/{}/approve", loan_id),
        Some(&verifier),
        None,
    )
    .await;
    assert_eq!(resp.status(), StatusCode::FORBIDDEN);

    // Verifier cannot apply
    let resp = request(
        &app,
        "POST",
        "/api/loans",
        Some(&verifier),
        Some(json!({
            "amount": 500, "purpose": "p", "term": 12,
            "fullName": "V", "employmentStatus": "e", "employmentAddress": "a",
        })),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn loan_listing_is_role_filtered() {
    let (app, _db) = test_app();
    let (_alice_id, alice) = register(&app, "Alice", "a@x.com", None).await;
    let (_bob_id, bob) = register(&app, "Bob", "b@x.com", None).await;
    let (_v_id, verifier) = register(&app, "Vera", "v@x.com", Some("verifier")).await;
    let (_admin_id, admin) = register(&app, "Ada", "admin@x.com", Some("admin")).await;

    let a1 = apply_for_loan(&app, &alice).await;
    apply_for_loan(&app, &alice).await;
    apply_for_loan(&app, &bob).await;

    // Move one of Alice's loans out of pending
    let resp = request(
        &app,
        "PUT",
        &format!("/api/loans/{}/verify", a1),
        Some(&verifier),
        None,
    )
    .await;
    assert_eq!(resp.status(), StatusCode::OK);

    // Applicant sees only their own loans
    let resp = request(&app, "GET", "/api/loans", Some(&alice), None).await;
    let body = body_json(resp).await;
    assert_eq!(body["count"], 2);

    // Verifier sees only pending loans
    let resp = request(&app, "GET", "/api/loans", Some(&verifier), None).await;
    let body = body_json(resp).await;
    assert_eq!(body["count"], 2);
    for loan in body["data"].as_array().unwrap() {
        assert_eq!(loan["status"], "pending");
    }

    // Admin sees everything
    let resp = request(&app, "GET", "/api/loans", Some(&admin), None).await;
    let body = body_json(resp).await;
    assert_eq!(body["count"], 3);
}

#[tokio::test]
async fn loan_visibility_for_single_loan() {
    let (app, _db) = test_app();
    let (_alice_id, alice) = register(&app, "Alice", "a@x.com", None).await;
    let (_bob_id, bob) = register(&app, "Bob", "b@x.com", None).await;
    let (_v_id, verifier) = register(&app, "Vera", "v@x.com", Some("verifier")).await;

    let loan_id = apply_for_loan(&app, &alice).await;
    let uri = format!("/api/loans/{}", loan_id);

    // Owner can view
    let resp = request(&app, "GET", &uri, Some(&alice), None).await;
    assert_eq!(resp.status(), StatusCode::OK);

    // Verifier can view
    let resp = request(&app, "GET", &uri, Some(&verifier), None).await;
    assert_eq!(resp.status(), StatusCode::OK);

    // Another applicant cannot
    let resp = request(&app, "GET", &uri, Some(&bob), None).await;
    assert_eq!(resp.status(), StatusCode::FORBIDDEN);

    // Missing loan
    let resp = request(
        &app,
        "GET",
        &format!("/api/loans/{}", uuid::Uuid::new_v4()),
        Some(&alice),
        None,
    )
    .await;
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn loan_application_is_validated() {
    let (app, _db) = test_app();
    let (_alice_id, alice) = register(&app, "Alice", "a@x.com", None).await;

    let resp = request(
        &app,
        "POST",
        "/api/loans",
        Some(&alice),
        Some(json!({
            "amount": 50, "purpose": "", "term": 0,
            "fullName": "", "employmentStatus": "e", "employmentAddress": "a",
        })),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    let body = body_json(resp).await;
    assert_eq!(body["errors"].as_array().unwrap().len(), 4);
}

#[tokio::test]
async fn user_management_is_admin_only() {
    let (app, _db) = test_app();
    let (_alice_id, alice) = register(&app, "Alice", "a@x.com", None).await;
    let (admin_id, admin) = register(&app, "Ada", "admin@x.com", Some("admin")).await;

    // Non-admin is forbidden
    let resp = request(&app, "GET", "/api/users", Some(&alice), None).await;
    assert_eq!(resp.status(), StatusCode::FORBIDDEN);

    // Admin lists users
    let resp = request(&app, "GET", "/api/users", Some(&admin), None).await;
    assert_eq!(resp.status(), StatusCode::OK);
    let body = body_json(resp).await;
    assert_eq!(body["count"], 2);

    // Admin creates a verifier
    let resp = request(
        &app,
        "POST",
        "/api/users/verifier",
        Some(&admin),
        Some(json!({"name": "Vera", "email": "v@x.com", "password": "secret1"})),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::CREATED);
    let body = body_json(resp).await;
    assert_eq!(body["data"]["role"], "verifier");
    let verifier_id = body["data"]["id"].as_str().unwrap().to_string();

    // Self-deletion is refused and the record survives
    let resp = request(
        &app,
        "DELETE",
        &format!("/api/users/{}", admin_id),
        Some(&admin),
        None,
    )
    .await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    let body = body_json(resp).await;
    assert_eq!(body["message"], "Cannot delete your own account");

    let resp = request(
        &app,
        "GET",
        &format!("/api/users/{}", admin_id),
        Some(&admin),
        None,
    )
    .await;
    assert_eq!(resp.status(), StatusCode::OK);

    // Deleting someone else works, then 404s
    let resp = request(
        &app,
        "DELETE",
        &format!("/api/users/{}", verifier_id),
        Some(&admin),
        None,
    )
    .await;
    assert_eq!(resp.status(), StatusCode::OK);

    let resp = request(
        &app,
        "GET",
        &format!("/api/users/{}", verifier_id),
        Some(&admin),
        None,
    )
    .await;
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn token_in_cookie_is_accepted() {
    let (app, _db) = test_app();
    let (_alice_id, token) = register(&app, "Alice", "a@x.com", None).await;

    let req = Request::builder()
        .method("GET")
        .uri("/api/auth/me")
        .header("Cookie", format!("session=abc; jwt={}", token))
        .body(Body::empty())
        .unwrap();
    let resp = app.clone().oneshot(req).await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
}
