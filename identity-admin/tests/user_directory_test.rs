//! Admin user directory over HTTP.

mod common;

use axum::http::StatusCode;
use common::TestApp;
use identity_admin::services::IdentityStore;
use serde_json::json;

#[tokio::test]
async fn test_list_users_searches_and_pages() {
    let app = TestApp::new();
    let (_, token) = app.admin().await;
    app.seed_user("alice@student.chula.ac.th", &["student"]).await;
    app.seed_user("bob@chula.ac.th", &["staff"]).await;
    app.seed_user("carol@gmail.com", &["user"]).await;

    let all = app.get("/api/auth/admin/list-users", &token).await;
    assert_eq!(all.status, StatusCode::OK);
    assert_eq!(all.body["total"], 4);
    assert_eq!(all.body["users"].as_array().unwrap().len(), 4);

    let by_role = app
        .get("/api/auth/admin/list-users?searchValue=STAFF", &token)
        .await;
    assert_eq!(by_role.body["total"], 1);
    assert_eq!(by_role.body["users"][0]["email"], "bob@chula.ac.th");

    let paged = app
        .get("/api/auth/admin/list-users?limit=2&offset=3", &token)
        .await;
    assert_eq!(paged.body["total"], 4);
    assert_eq!(paged.body["users"].as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn test_list_users_rejects_oversized_page() {
    let app = TestApp::new();
    let (_, token) = app.admin().await;

    let response = app
        .get("/api/auth/admin/list-users?limit=5000", &token)
        .await;

    assert_eq!(response.status, StatusCode::UNPROCESSABLE_ENTITY);
    assert!(response.body["details"]["limit"].is_array());
}

#[tokio::test]
async fn test_student_cannot_list_users() {
    let app = TestApp::new();
    let (_, token) = app
        .seed_user("alice@student.chula.ac.th", &["student"])
        .await;

    let response = app.get("/api/auth/admin/list-users", &token).await;

    assert_eq!(response.status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_set_role_replaces_role_set() {
    let app = TestApp::new();
    let (_, token) = app.admin().await;
    let (target, _) = app.seed_user("bob@chula.ac.th", &["user"]).await;

    let response = app
        .post(
            "/api/auth/admin/set-role",
            &token,
            json!({ "userId": target.id, "role": ["staff", "developer", "staff"] }),
        )
        .await;
    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.body["success"], true);

    let stored = app.store.find_identity(target.id).await.unwrap().unwrap();
    let roles: Vec<&str> = stored.roles.iter().map(String::as_str).collect();
    assert_eq!(roles, vec!["developer", "staff"]);
}

#[tokio::test]
async fn test_set_role_rejects_unknown_role() {
    let app = TestApp::new();
    let (_, token) = app.admin().await;
    let (target, _) = app.seed_user("bob@chula.ac.th", &["user"]).await;

    let response = app
        .post(
            "/api/auth/admin/set-role",
            &token,
            json!({ "userId": target.id, "role": "superuser" }),
        )
        .await;

    assert_eq!(response.status, StatusCode::UNPROCESSABLE_ENTITY);
    assert!(response.body["details"]["role"].is_array());
    let stored = app.store.find_identity(target.id).await.unwrap().unwrap();
    assert!(stored.roles.contains("user"));
    assert_eq!(stored.roles.len(), 1);
}

#[tokio::test]
async fn test_set_role_unknown_user_is_not_found() {
    let app = TestApp::new();
    let (_, token) = app.admin().await;

    let response = app
        .post(
            "/api/auth/admin/set-role",
            &token,
            json!({ "userId": uuid::Uuid::new_v4(), "role": "student" }),
        )
        .await;

    assert_eq!(response.status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_ban_then_unban_clears_state() {
    let app = TestApp::new();
    let (_, token) = app.admin().await;
    let (target, target_token) = app.seed_user("bob@chula.ac.th", &["developer"]).await;

    let banned = app
        .post(
            "/api/auth/admin/ban-user",
            &token,
            json!({ "userId": target.id, "banReason": "spam", "banExpiresIn": 3600 }),
        )
        .await;
    assert_eq!(banned.status, StatusCode::OK);

    let stored = app.store.find_identity(target.id).await.unwrap().unwrap();
    assert!(stored.banned);
    assert_eq!(stored.ban_reason.as_deref(), Some("spam"));
    assert!(stored.ban_expires.is_some());

    let blocked = app
        .get("/api/auth/admin/list-oidc-clients", &target_token)
        .await;
    assert_eq!(blocked.status, StatusCode::FORBIDDEN);

    let unbanned = app
        .post(
            "/api/auth/admin/unban-user",
            &token,
            json!({ "userId": target.id }),
        )
        .await;
    assert_eq!(unbanned.status, StatusCode::OK);

    let stored = app.store.find_identity(target.id).await.unwrap().unwrap();
    assert!(!stored.banned);
    assert!(stored.ban_reason.is_none());
    assert!(stored.ban_expires.is_none());

    let allowed = app
        .get("/api/auth/admin/list-oidc-clients", &target_token)
        .await;
    assert_eq!(allowed.status, StatusCode::OK);
}

#[tokio::test]
async fn test_ban_without_reason_uses_default() {
    let app = TestApp::new();
    let (_, token) = app.admin().await;
    let (target, _) = app.seed_user("bob@chula.ac.th", &["user"]).await;

    let response = app
        .post(
            "/api/auth/admin/ban-user",
            &token,
            json!({ "userId": target.id }),
        )
        .await;
    assert_eq!(response.status, StatusCode::OK);

    let stored = app.store.find_identity(target.id).await.unwrap().unwrap();
    assert_eq!(stored.ban_reason.as_deref(), Some("No reason provided"));
    assert!(stored.ban_expires.is_none());
}

#[tokio::test]
async fn test_ban_rejects_non_positive_expiry() {
    let app = TestApp::new();
    let (_, token) = app.admin().await;
    let (target, _) = app.seed_user("bob@chula.ac.th", &["user"]).await;

    let response = app
        .post(
            "/api/auth/admin/ban-user",
            &token,
            json!({ "userId": target.id, "banExpiresIn": 0 }),
        )
        .await;

    assert_eq!(response.status, StatusCode::UNPROCESSABLE_ENTITY);
    assert!(response.body["details"]["banExpiresIn"].is_array());
}

#[tokio::test]
async fn test_admin_cannot_ban_self() {
    let app = TestApp::new();
    let (admin, token) = app.admin().await;

    let response = app
        .post(
            "/api/auth/admin/ban-user",
            &token,
            json!({ "userId": admin.id }),
        )
        .await;

    assert_eq!(response.status, StatusCode::UNPROCESSABLE_ENTITY);
    let stored = app.store.find_identity(admin.id).await.unwrap().unwrap();
    assert!(!stored.banned);
}
