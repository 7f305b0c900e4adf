//! Ticket introspection and logout.

mod common;

use axum::http::StatusCode;
use axum_test::TestServer;
use common::*;
use oauth_ticket_server::entity::ticket;
use sea_orm::{ActiveModelTrait, ActiveValue::Set, DatabaseConnection};
use time::{Duration, OffsetDateTime};

async fn insert_ticket(db: &DatabaseConnection, id: &str, username: &str, age: Duration) {
    ticket::ActiveModel {
        id: Set(id.into()),
        username: Set(username.into()),
        application: Set(APP_ID.into()),
        from_browser: Set(false),
        remember_me: Set(false),
        created_at: Set(OffsetDateTime::now_utc() - age),
    }
    .insert(db)
    .await
    .expect("insert ticket");
}

async fn login(server: &TestServer, username: &str) -> String {
    let response = server
        .post("/oauth/token")
        .form(&[
            ("grant_type", "password"),
            ("client_id", APP_ID),
            ("client_secret", APP_SECRET),
            ("username", username),
            ("password", PASSWORD),
        ])
        .await;
    response.assert_status_ok();
    let body: serde_json::Value = response.json();
    body["access_token"]
        .as_str()
        .expect("access token")
        .to_string()
}

#[tokio::test]
async fn test_subject_lists_groups() {
    let (server, _) = create_test_server().await;
    let token = login(&server, "bob").await;

    let response = server.get(&format!("/ticket/{token}/subject")).await;

    response.assert_status_ok();
    let body: serde_json::Value = response.json();
    assert_eq!(body["username"], "bob");
    assert_eq!(body["groups"], serde_json::json!(["staff"]));
}

#[tokio::test]
async fn test_username_is_plain_text() {
    let (server, _) = create_test_server().await;
    let token = login(&server, "alice").await;

    let response = server.get(&format!("/ticket/{token}/username")).await;

    response.assert_status_ok();
    response.assert_text("alice");
}

#[tokio::test]
async fn test_subject_of_removed_user_has_no_groups() {
    let (server, resources) = create_test_server().await;
    insert_ticket(resources.db.as_ref(), "orphan", "ghost", Duration::ZERO).await;

    let response = server.get("/ticket/orphan/subject").await;

    response.assert_status_ok();
    let body: serde_json::Value = response.json();
    assert_eq!(body["username"], "ghost");
    assert_eq!(body["groups"], serde_json::json!([]));
}

#[tokio::test]
async fn test_unknown_ticket_is_not_found() {
    let (server, _) = create_test_server().await;

    let response = server.get("/ticket/missing/subject").await;
    response.assert_status_not_found();
    let body: serde_json::Value = response.json();
    assert_eq!(body["error"], "not_found");

    server
        .get("/ticket/missing/username")
        .await
        .assert_status_not_found();
}

#[tokio::test]
async fn test_expired_ticket_is_not_found() {
    let (server, resources) = create_test_server().await;
    let ttl = resources.config.tickets.default_ttl;
    insert_ticket(
        resources.db.as_ref(),
        "stale",
        "alice",
        Duration::seconds(ttl + 60),
    )
    .await;
    insert_ticket(resources.db.as_ref(), "fresh", "alice", Duration::seconds(ttl - 60)).await;

    server
        .get("/ticket/stale/username")
        .await
        .assert_status_not_found();
    server
        .get("/ticket/fresh/username")
        .await
        .assert_status_ok();
}

#[tokio::test]
async fn test_logout_deletes_ticket() {
    let (server, _) = create_test_server().await;
    let token = login(&server, "alice").await;

    let response = server.delete(&format!("/ticket/{token}")).await;
    assert_eq!(response.status_code(), StatusCode::NO_CONTENT);

    server
        .get(&format!("/ticket/{token}/subject"))
        .await
        .assert_status_not_found();

    // Logging out twice is fine
    let response = server.delete(&format!("/ticket/{token}")).await;
    assert_eq!(response.status_code(), StatusCode::NO_CONTENT);
}

#[tokio::test]
async fn test_deleted_ticket_no_longer_authorizes() {
    let (server, _) = create_test_server().await;
    let token = login(&server, "alice").await;
    server.delete(&format!("/ticket/{token}")).await;

    let response = server
        .get("/oauth/authz")
        .add_header(axum::http::header::AUTHORIZATION, bearer(&token))
        .add_query_param("client_id", APP_ID)
        .await;

    response.assert_status_unauthorized();
}
